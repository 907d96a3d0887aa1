//! Metadata extraction: parse one file, read the schema fields, never panic.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use dicom::transfer_syntax::entries;
use dicom_object::meta::FileMetaTable;
use dicom_object::{FileDicomObject, InMemDicomObject, OpenFileOptions};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RtqaError};
use crate::schema::{self, FieldKind, FieldSpec, NOT_AVAILABLE};

/// A dataset parsed from disk, remembering which phase produced it.
pub enum ParsedDataset {
    /// Strict parse: the file carried a valid `DICM` signature and meta group.
    Strict(FileDicomObject<InMemDicomObject>),
    /// Forced parse: headerless dataset decoded directly.
    Forced(InMemDicomObject),
}

impl ParsedDataset {
    pub fn dataset(&self) -> &InMemDicomObject {
        match self {
            ParsedDataset::Strict(obj) => obj,
            ParsedDataset::Forced(obj) => obj,
        }
    }

    pub fn meta(&self) -> Option<&FileMetaTable> {
        match self {
            ParsedDataset::Strict(obj) => Some(obj.meta()),
            ParsedDataset::Forced(_) => None,
        }
    }

    pub fn into_dataset(self) -> InMemDicomObject {
        match self {
            ParsedDataset::Strict(obj) => (*obj).clone(),
            ParsedDataset::Forced(obj) => obj,
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, ParsedDataset::Forced(_))
    }
}

/// One processed file: path, size, extracted fields, or an error message.
///
/// Immutable after creation. Either `fields` holds a value for every schema
/// field (with `"N/A"` substituted for absent ones) or `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub byte_size: u64,
    pub fields: BTreeMap<&'static str, String>,
    pub error: Option<String>,
}

impl FileRecord {
    /// Value of a schema field, `"N/A"` when absent or on an error record.
    pub fn field(&self, name: &str) -> &str {
        self.fields
            .get(name)
            .map(String::as_str)
            .unwrap_or(NOT_AVAILABLE)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Parse a file with the two-phase policy: strict first, forced on failure.
pub fn read_dataset(path: &Path) -> Result<ParsedDataset> {
    match read_dataset_strict(path) {
        Ok(obj) => Ok(ParsedDataset::Strict(obj)),
        Err(strict_err) => {
            debug!("strict parse of {} failed, trying forced parse", path.display());
            read_dataset_forced(path, &strict_err).map(ParsedDataset::Forced)
        }
    }
}

/// Strict parse: requires the 128-byte preamble, `DICM` signature and a
/// well-formed file meta group.
pub fn read_dataset_strict(path: &Path) -> Result<FileDicomObject<InMemDicomObject>> {
    OpenFileOptions::new()
        .open_file(path)
        .map_err(|e| RtqaError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Forced parse: decode the file as a bare dataset with no signature.
///
/// Files that *do* carry the `DICM` signature but still failed the strict
/// parse are broken beyond the missing-preamble case this fallback exists
/// for, so the strict error is reported as-is. Everything else is handed to
/// the library's dataset decoder, first as Implicit VR Little Endian (the
/// encoding of every known headerless export), then Explicit VR as a last
/// resort.
fn read_dataset_forced(path: &Path, strict_err: &RtqaError) -> Result<InMemDicomObject> {
    let mut file = BufReader::new(File::open(path)?);

    let mut preamble = [0u8; 132];
    let has_magic = file.read_exact(&mut preamble).is_ok() && &preamble[128..132] == b"DICM";
    if has_magic {
        return Err(RtqaError::Parse {
            path: path.to_path_buf(),
            message: strict_err.to_string(),
        });
    }
    file.seek(SeekFrom::Start(0))?;

    let implicit = entries::IMPLICIT_VR_LITTLE_ENDIAN.erased();
    let dataset = match InMemDicomObject::read_dataset_with_ts(&mut file, &implicit) {
        Ok(obj) => obj,
        Err(implicit_err) => {
            file.seek(SeekFrom::Start(0))?;
            let explicit = entries::EXPLICIT_VR_LITTLE_ENDIAN.erased();
            InMemDicomObject::read_dataset_with_ts(&mut file, &explicit).map_err(|_| {
                RtqaError::Parse {
                    path: path.to_path_buf(),
                    message: implicit_err.to_string(),
                }
            })?
        }
    };

    if dataset.iter().next().is_none() {
        return Err(RtqaError::Parse {
            path: path.to_path_buf(),
            message: "no data elements found".into(),
        });
    }
    Ok(dataset)
}

/// Extract the schema fields from one file. Never fails: parse errors come
/// back as an error record so a batch loop can log and continue.
pub fn extract(path: &Path) -> FileRecord {
    let byte_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    match read_dataset(path) {
        Ok(parsed) => FileRecord {
            path: path.to_path_buf(),
            byte_size,
            fields: extract_fields(parsed.dataset()),
            error: None,
        },
        Err(e) => FileRecord {
            path: path.to_path_buf(),
            byte_size,
            fields: BTreeMap::new(),
            error: Some(e.to_string()),
        },
    }
}

/// Read every schema field from an already-parsed dataset.
pub fn extract_fields(dataset: &InMemDicomObject) -> BTreeMap<&'static str, String> {
    schema::FIELDS
        .iter()
        .map(|spec| (spec.name, field_value(dataset, spec)))
        .collect()
}

/// Read one field, substituting `"N/A"` when absent or empty, and applying
/// the display formatting for its kind.
pub fn field_value(dataset: &InMemDicomObject, spec: &FieldSpec) -> String {
    let raw = dataset
        .element_opt(spec.tag)
        .ok()
        .flatten()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    if raw.is_empty() {
        return NOT_AVAILABLE.to_string();
    }

    match spec.kind {
        FieldKind::Text => raw,
        FieldKind::Date => format_dicom_date(&raw),
        FieldKind::Time => format_dicom_time(&raw),
    }
}

/// Reformat an 8-digit DICOM date (YYYYMMDD) as DD/MM/YYYY.
/// Anything unparsable passes through unchanged.
pub fn format_dicom_date(raw: &str) -> String {
    if raw.len() == 8 {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
            return date.format("%d/%m/%Y").to_string();
        }
    }
    raw.to_string()
}

/// Reformat a DICOM time (HHMMSS[.ffffff]) as HH:MM:SS, dropping the
/// fractional part. Anything unparsable passes through unchanged.
pub fn format_dicom_time(raw: &str) -> String {
    let digits = raw.split('.').next().unwrap_or(raw);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return raw.to_string();
    }
    if digits.len() >= 6 {
        format!("{}:{}:{}", &digits[0..2], &digits[2..4], &digits[4..6])
    } else if digits.len() >= 4 {
        format!("{}:{}", &digits[0..2], &digits[2..4])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{DataElement, PrimitiveValue, VR};
    use dicom_dictionary_std::tags;
    use rstest::rstest;

    pub(crate) fn sample_dataset(patient_id: &str) -> InMemDicomObject {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(
            tags::PATIENT_NAME,
            VR::PN,
            PrimitiveValue::from("Doe^Jane"),
        ));
        obj.put(DataElement::new(
            tags::PATIENT_ID,
            VR::LO,
            PrimitiveValue::from(patient_id),
        ));
        obj.put(DataElement::new(
            tags::PATIENT_BIRTH_DATE,
            VR::DA,
            PrimitiveValue::from("19601231"),
        ));
        obj.put(DataElement::new(
            tags::STUDY_TIME,
            VR::TM,
            PrimitiveValue::from("142530.123456"),
        ));
        obj
    }

    fn write_headerless(dir: &Path, name: &str, obj: &InMemDicomObject) -> PathBuf {
        let path = dir.join(name);
        let ts = entries::IMPLICIT_VR_LITTLE_ENDIAN.erased();
        let mut file = File::create(&path).unwrap();
        obj.write_dataset_with_ts(&mut file, &ts).unwrap();
        path
    }

    #[rstest]
    #[case("20240115", "15/01/2024")]
    #[case("19601231", "31/12/1960")]
    #[case("2024011", "2024011")]
    #[case("not-a-date", "not-a-date")]
    #[case("20241301", "20241301")]
    fn date_formatting(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_dicom_date(raw), expected);
    }

    #[rstest]
    #[case("142530.123456", "14:25:30")]
    #[case("142530", "14:25:30")]
    #[case("1425", "14:25")]
    #[case("14", "14")]
    #[case("morning", "morning")]
    fn time_formatting(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_dicom_time(raw), expected);
    }

    #[test]
    fn missing_field_yields_sentinel() {
        let obj = sample_dataset("A1");
        let spec = schema::field("Modality").unwrap();
        assert_eq!(field_value(&obj, spec), NOT_AVAILABLE);
    }

    #[test]
    fn present_fields_are_formatted() {
        let obj = sample_dataset("A1");
        assert_eq!(
            field_value(&obj, schema::field("PatientBirthDate").unwrap()),
            "31/12/1960"
        );
        assert_eq!(
            field_value(&obj, schema::field("StudyTime").unwrap()),
            "14:25:30"
        );
        assert_eq!(field_value(&obj, schema::field("PatientID").unwrap()), "A1");
    }

    #[test]
    fn headerless_file_falls_back_to_forced_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_headerless(dir.path(), "raw.dcm", &sample_dataset("A1"));

        assert!(read_dataset_strict(&path).is_err());
        let parsed = read_dataset(&path).unwrap();
        assert!(parsed.is_forced());

        let record = extract(&path);
        assert!(record.error.is_none());
        assert_eq!(record.field("PatientID"), "A1");
        assert_eq!(record.field("Modality"), NOT_AVAILABLE);
        assert!(record.byte_size > 0);
    }

    #[test]
    fn garbage_file_becomes_error_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.dcm");
        std::fs::write(&path, b"\x01").unwrap();

        let record = extract(&path);
        assert!(record.error.is_some());
        assert!(record.fields.is_empty());
        assert_eq!(record.field("PatientID"), NOT_AVAILABLE);
    }
}
