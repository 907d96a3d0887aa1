//! Plain-text report rendering.
//!
//! Rendering is a pure function of the aggregation, so running it twice
//! over the same data produces byte-identical output.

use std::fmt::Write as _;

use crate::aggregate::{Aggregation, FolderClassification};
use crate::extract::FileRecord;

const BANNER_WIDTH: usize = 80;

/// How many error records are listed in full before the rest is summarized.
const MAX_ERRORS_SHOWN: usize = 5;

fn banner(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", "=".repeat(BANNER_WIDTH));
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(BANNER_WIDTH));
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", "-".repeat(BANNER_WIDTH));
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "-".repeat(BANNER_WIDTH));
}

/// Render the full patient summary report for a scan.
pub fn render_scan_report(agg: &Aggregation) -> String {
    let mut out = String::new();
    banner(&mut out, "DICOM SCAN REPORT");
    let _ = writeln!(out, "\nFiles processed: {}", agg.total_files);

    for (idx, group) in agg.groups.values().enumerate() {
        let _ = writeln!(out);
        banner(&mut out, &format!("PATIENT #{}", idx + 1));
        let _ = writeln!(out, "Name: {}", group.name);
        let _ = writeln!(out, "ID: {}", group.patient_id);
        let _ = writeln!(out, "Birth Date: {}", group.birth_date);
        let _ = writeln!(out, "Sex: {}", group.sex);

        let _ = writeln!(out, "\nStatistics:");
        let _ = writeln!(out, "  Total files: {}", group.file_count);
        let _ = writeln!(out, "  Modalities: {}", join(&group.modalities));
        let _ = writeln!(out, "  Distinct studies: {}", group.study_uids.len());
        let _ = writeln!(out, "  Distinct series: {}", group.series_uids.len());
        let _ = writeln!(out, "  Study descriptions: {}", join(&group.study_descriptions));
        let _ = writeln!(
            out,
            "  Institutions: {}",
            join_excluding_na(&group.institutions)
        );

        let sample = &group.sample;
        let _ = writeln!(out, "\nSample file:");
        let _ = writeln!(out, "  File: {}", sample.file_name());
        let _ = writeln!(out, "  Modality: {}", sample.field("Modality"));
        let _ = writeln!(out, "  Study Date: {}", sample.field("StudyDate"));
        let _ = writeln!(out, "  Study Time: {}", sample.field("StudyTime"));
        let _ = writeln!(out, "  Study Description: {}", sample.field("StudyDescription"));
        let _ = writeln!(out, "  Manufacturer: {}", sample.field("Manufacturer"));
        let _ = writeln!(out, "  Model: {}", sample.field("ManufacturerModelName"));
    }

    if !agg.errors.is_empty() {
        let _ = writeln!(out);
        banner(
            &mut out,
            &format!("ERRORS ({} file(s))", agg.errors.len()),
        );
        for (path, message) in agg.errors.iter().take(MAX_ERRORS_SHOWN) {
            let _ = writeln!(out, "  File: {}", path.display());
            let _ = writeln!(out, "  Error: {message}\n");
        }
        if agg.errors.len() > MAX_ERRORS_SHOWN {
            let _ = writeln!(out, "  ... and {} more", agg.errors.len() - MAX_ERRORS_SHOWN);
        }
    }

    let _ = writeln!(out);
    banner(
        &mut out,
        &format!(
            "END OF REPORT - {} patient(s), {} file(s), {} error(s)",
            agg.groups.len(),
            agg.total_files,
            agg.error_count()
        ),
    );
    out
}

/// Render the folder classification summary for `analyze`.
pub fn render_classification(agg: &Aggregation) -> String {
    let mut out = String::new();
    banner(&mut out, "FOLDER ANALYSIS");

    match agg.classify() {
        FolderClassification::NoPatientIdentified => {
            let _ = writeln!(out, "\nNo patient identified.");
        }
        FolderClassification::SinglePatient { patient_id } => {
            let group = &agg.groups[&patient_id];
            let _ = writeln!(out, "\nSingle patient.");
            let _ = writeln!(
                out,
                "  {} (ID: {}) - {} file(s)",
                group.name, group.patient_id, group.file_count
            );
        }
        FolderClassification::MultiplePatients { count } => {
            let _ = writeln!(out, "\nMultiple patients ({count}).");
            for group in agg.groups.values() {
                let _ = writeln!(
                    out,
                    "  {} (ID: {}) - {} file(s), modalities: {}",
                    group.name,
                    group.patient_id,
                    group.file_count,
                    join(&group.modalities)
                );
            }
        }
    }

    let _ = writeln!(
        out,
        "\n{} file(s) processed, {} error(s)",
        agg.total_files,
        agg.error_count()
    );
    out
}

/// Render the sectioned single-file report for `inspect`.
pub fn render_file_report(record: &FileRecord) -> String {
    let mut out = String::new();
    banner(&mut out, "DICOM FILE INFORMATION");
    let _ = writeln!(out, "\nFile: {}", record.file_name());
    let _ = writeln!(out, "Size: {:.2} KB", record.byte_size as f64 / 1024.0);

    if let Some(message) = &record.error {
        let _ = writeln!(out, "\nERROR reading file: {message}");
        return out;
    }

    section(&mut out, "PATIENT");
    for name in ["PatientName", "PatientID", "PatientBirthDate", "PatientSex", "PatientAge"] {
        let _ = writeln!(out, "{}: {}", label(name), record.field(name));
    }

    section(&mut out, "STUDY");
    for name in ["Modality", "StudyDescription", "StudyDate", "StudyTime", "StudyInstanceUID"] {
        let _ = writeln!(out, "{}: {}", label(name), record.field(name));
    }

    section(&mut out, "SERIES");
    for name in ["SeriesDescription", "SeriesNumber", "SeriesDate", "SeriesInstanceUID"] {
        let _ = writeln!(out, "{}: {}", label(name), record.field(name));
    }

    section(&mut out, "EQUIPMENT");
    for name in ["Manufacturer", "ManufacturerModelName", "StationName", "InstitutionName"] {
        let _ = writeln!(out, "{}: {}", label(name), record.field(name));
    }

    section(&mut out, "IMAGE");
    let _ = writeln!(
        out,
        "Dimensions: {} x {} pixels",
        record.field("Rows"),
        record.field("Columns")
    );
    let _ = writeln!(out, "Bits Allocated: {}", record.field("BitsAllocated"));
    let _ = writeln!(
        out,
        "Photometric Interpretation: {}",
        record.field("PhotometricInterpretation")
    );

    section(&mut out, "IDENTIFIERS");
    for name in ["SOPClassUID", "SOPInstanceUID", "InstanceNumber"] {
        let _ = writeln!(out, "{}: {}", label(name), record.field(name));
    }

    out
}

/// Render an aggregation as pretty JSON (for `scan --format json`).
pub fn render_json(agg: &Aggregation) -> serde_json::Result<String> {
    serde_json::to_string_pretty(agg)
}

/// Split a DICOM keyword into a spaced label ("PatientBirthDate" ->
/// "Patient Birth Date"); runs of capitals stay together ("SOPClassUID" ->
/// "SOP Class UID").
fn label(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len() + 4);
    let chars: Vec<char> = keyword.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if i > 0
            && c.is_ascii_uppercase()
            && (chars[i - 1].is_ascii_lowercase()
                || (i + 1 < chars.len() && chars[i + 1].is_ascii_lowercase()))
        {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

fn join(values: &std::collections::BTreeSet<String>) -> String {
    if values.is_empty() {
        return "-".to_string();
    }
    values.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn join_excluding_na(values: &std::collections::BTreeSet<String>) -> String {
    let filtered: Vec<_> = values
        .iter()
        .filter(|v| v.as_str() != crate::schema::NOT_AVAILABLE)
        .cloned()
        .collect();
    if filtered.is_empty() {
        "-".to_string()
    } else {
        filtered.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;

    fn record(path: &str, patient_id: &str, modality: &str) -> FileRecord {
        let mut fields: BTreeMap<&'static str, String> = BTreeMap::new();
        fields.insert("PatientName", format!("Name^{patient_id}"));
        fields.insert("PatientID", patient_id.to_string());
        fields.insert("Modality", modality.to_string());
        FileRecord {
            path: Path::new(path).to_path_buf(),
            byte_size: 2048,
            fields,
            error: None,
        }
    }

    fn sample_aggregation() -> Aggregation {
        let mut agg = Aggregation::default();
        agg.fold_all([
            record("1.dcm", "A1", "CT"),
            record("2.dcm", "A1", "RTIMAGE"),
            record("3.dcm", "B2", "MR"),
        ]);
        agg
    }

    #[test]
    fn scan_report_is_idempotent() {
        let agg = sample_aggregation();
        assert_eq!(render_scan_report(&agg), render_scan_report(&agg));
    }

    #[test]
    fn scan_report_enumerates_patients_and_tally() {
        let mut agg = sample_aggregation();
        agg.fold(FileRecord {
            path: Path::new("bad.dcm").to_path_buf(),
            byte_size: 0,
            fields: BTreeMap::new(),
            error: Some("broken".into()),
        });

        let text = render_scan_report(&agg);
        assert!(text.contains("PATIENT #1"));
        assert!(text.contains("PATIENT #2"));
        assert!(text.contains("ERRORS (1 file(s))"));
        assert!(text.contains("2 patient(s), 4 file(s), 1 error(s)"));
    }

    #[test]
    fn classification_report_lists_groups_with_counts() {
        let agg = sample_aggregation();
        let text = render_classification(&agg);
        assert!(text.contains("Multiple patients (2)."));
        assert!(text.contains("(ID: A1) - 2 file(s)"));
        assert!(text.contains("(ID: B2) - 1 file(s)"));
    }

    #[test]
    fn file_report_shows_sentinel_for_missing_fields() {
        let text = render_file_report(&record("x.dcm", "A1", "CT"));
        assert!(text.contains("Patient ID: A1"));
        assert!(text.contains("Manufacturer: N/A"));
    }

    #[test]
    fn keyword_labels_are_spaced() {
        assert_eq!(label("PatientBirthDate"), "Patient Birth Date");
        assert_eq!(label("SOPClassUID"), "SOP Class UID");
        assert_eq!(label("Modality"), "Modality");
    }
}
