//! Side-by-side comparison of two datasets over the schema's compared tags.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use dicom_core::dictionary::DataDictionary;
use dicom_core::header::Header;
use dicom_core::Tag;
use dicom_dictionary_std::StandardDataDictionary;
use dicom_object::InMemDicomObject;

use crate::extract::ParsedDataset;
use crate::schema::{COMPARE_TAGS, NOT_AVAILABLE};

/// Maximum characters of a value shown in the comparison table. Longer
/// values are shortened for display only; the diff decision always uses
/// the full values.
const MAX_DISPLAY_LEN: usize = 25;

#[derive(Debug, Clone)]
pub struct TagComparison {
    pub name: &'static str,
    pub value_a: Option<String>,
    pub value_b: Option<String>,
}

impl TagComparison {
    pub fn differs(&self) -> bool {
        self.value_a != self.value_b
    }
}

#[derive(Debug)]
pub struct FileMetaSummary {
    pub transfer_syntax: String,
    pub implementation_class_uid: String,
    pub implementation_version_name: String,
}

#[derive(Debug)]
pub struct DatasetComparison {
    pub rows: Vec<TagComparison>,
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    pub meta_a: Option<FileMetaSummary>,
    pub meta_b: Option<FileMetaSummary>,
}

impl DatasetComparison {
    pub fn differences(&self) -> impl Iterator<Item = &TagComparison> {
        self.rows.iter().filter(|row| row.differs())
    }
}

fn element_str(dataset: &InMemDicomObject, tag: Tag) -> Option<String> {
    dataset
        .element_opt(tag)
        .ok()
        .flatten()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim_end_matches('\0').trim().to_string())
}

/// Resolve every tag present in a dataset to its dictionary name, falling
/// back to the `(gggg,eeee)` form for tags the dictionary does not know.
fn tag_names(dataset: &InMemDicomObject) -> BTreeSet<String> {
    dataset
        .iter()
        .map(|elem| {
            let tag = elem.tag();
            StandardDataDictionary
                .by_tag(tag)
                .map(|entry| entry.alias.to_string())
                .unwrap_or_else(|| format!("({:04X},{:04X})", tag.group(), tag.element()))
        })
        .collect()
}

fn meta_summary(parsed: &ParsedDataset) -> Option<FileMetaSummary> {
    parsed.meta().map(|meta| FileMetaSummary {
        transfer_syntax: meta.transfer_syntax.trim_end_matches('\0').to_string(),
        implementation_class_uid: meta.implementation_class_uid.trim().to_string(),
        implementation_version_name: meta
            .implementation_version_name
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    })
}

/// Compare two parsed datasets tag by tag.
pub fn compare(a: &ParsedDataset, b: &ParsedDataset) -> DatasetComparison {
    let ds_a = a.dataset();
    let ds_b = b.dataset();

    let rows = COMPARE_TAGS
        .iter()
        .map(|&(name, tag)| TagComparison {
            name,
            value_a: element_str(ds_a, tag),
            value_b: element_str(ds_b, tag),
        })
        .collect();

    let names_a = tag_names(ds_a);
    let names_b = tag_names(ds_b);

    DatasetComparison {
        rows,
        only_in_a: names_a.difference(&names_b).cloned().collect(),
        only_in_b: names_b.difference(&names_a).cloned().collect(),
        meta_a: meta_summary(a),
        meta_b: meta_summary(b),
    }
}

fn display_value(value: &Option<String>) -> String {
    let v = value.as_deref().unwrap_or(NOT_AVAILABLE);
    if v.chars().count() > MAX_DISPLAY_LEN {
        let head: String = v.chars().take(MAX_DISPLAY_LEN - 3).collect();
        format!("{head}...")
    } else {
        v.to_string()
    }
}

fn render_meta(out: &mut String, label: &str, meta: &Option<FileMetaSummary>) {
    let _ = writeln!(out, "\nFile {label}:");
    match meta {
        Some(meta) => {
            let _ = writeln!(out, "  Transfer Syntax UID: {}", meta.transfer_syntax);
            let _ = writeln!(
                out,
                "  Implementation Class UID: {}",
                meta.implementation_class_uid
            );
            let _ = writeln!(
                out,
                "  Implementation Version Name: {}",
                meta.implementation_version_name
            );
        }
        None => {
            let _ = writeln!(out, "  No File Meta Information header (forced parse)");
        }
    }
}

/// Render the comparison as the fixed-width text report.
pub fn render(cmp: &DatasetComparison, name_a: &str, name_b: &str) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "DICOM COMPARISON");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "\nFile A: {name_a}");
    let _ = writeln!(out, "File B: {name_b}\n");

    let _ = writeln!(out, "{:<35} {:<25} {:<25}", "TAG", "A", "B");
    let _ = writeln!(out, "{}", "-".repeat(80));
    for row in &cmp.rows {
        let marker = if row.differs() { " <- DIFFERS" } else { "" };
        let _ = writeln!(
            out,
            "{:<35} {:<25} {:<25}{marker}",
            row.name,
            display_value(&row.value_a),
            display_value(&row.value_b),
        );
    }

    let differences: Vec<_> = cmp.differences().collect();
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "DIFFERENCES ({})", differences.len());
    let _ = writeln!(out, "{rule}");
    if differences.is_empty() {
        let _ = writeln!(out, "\nNo differences in the compared tags.");
    } else {
        for row in &differences {
            let _ = writeln!(out, "\n{}:", row.name);
            let _ = writeln!(out, "  A: {}", row.value_a.as_deref().unwrap_or(NOT_AVAILABLE));
            let _ = writeln!(out, "  B: {}", row.value_b.as_deref().unwrap_or(NOT_AVAILABLE));
        }
    }

    if !cmp.only_in_a.is_empty() {
        let _ = writeln!(out, "\nTags present only in A ({}):", cmp.only_in_a.len());
        for name in &cmp.only_in_a {
            let _ = writeln!(out, "  - {name}");
        }
    }
    if !cmp.only_in_b.is_empty() {
        let _ = writeln!(out, "\nTags present only in B ({}):", cmp.only_in_b.len());
        for name in &cmp.only_in_b {
            let _ = writeln!(out, "  - {name}");
        }
    }

    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "FILE META INFORMATION");
    let _ = writeln!(out, "{rule}");
    render_meta(&mut out, "A", &cmp.meta_a);
    render_meta(&mut out, "B", &cmp.meta_b);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{DataElement, PrimitiveValue, VR};
    use dicom_dictionary_std::tags;

    fn dataset(manufacturer: &str) -> InMemDicomObject {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(
            tags::PATIENT_ID,
            VR::LO,
            PrimitiveValue::from("A1"),
        ));
        obj.put(DataElement::new(
            tags::MODALITY,
            VR::CS,
            PrimitiveValue::from("RTIMAGE"),
        ));
        obj.put(DataElement::new(
            tags::MANUFACTURER,
            VR::LO,
            PrimitiveValue::from(manufacturer),
        ));
        obj
    }

    fn parsed(obj: InMemDicomObject) -> ParsedDataset {
        ParsedDataset::Forced(obj)
    }

    #[test]
    fn single_differing_tag_is_the_only_difference() {
        let a = parsed(dataset("Acme"));
        let b = parsed(dataset("Acme2"));
        let cmp = compare(&a, &b);

        let diffs: Vec<_> = cmp.differences().collect();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].name, "Manufacturer");
        assert_eq!(diffs[0].value_a.as_deref(), Some("Acme"));
        assert_eq!(diffs[0].value_b.as_deref(), Some("Acme2"));
        assert!(cmp.only_in_a.is_empty());
        assert!(cmp.only_in_b.is_empty());
    }

    #[test]
    fn diff_uses_full_values_not_truncated_display() {
        // Values share the first 25 characters, so the table shows them
        // identically, but they still must be flagged as different.
        let long_a = format!("{}A", "x".repeat(30));
        let long_b = format!("{}B", "x".repeat(30));
        let mut obj_a = dataset("Acme");
        let mut obj_b = dataset("Acme");
        obj_a.put(DataElement::new(
            tags::STUDY_DESCRIPTION,
            VR::LO,
            PrimitiveValue::from(long_a.as_str()),
        ));
        obj_b.put(DataElement::new(
            tags::STUDY_DESCRIPTION,
            VR::LO,
            PrimitiveValue::from(long_b.as_str()),
        ));

        let cmp = compare(&parsed(obj_a), &parsed(obj_b));
        let row = cmp
            .rows
            .iter()
            .find(|r| r.name == "StudyDescription")
            .unwrap();
        assert!(row.differs());
        assert_eq!(display_value(&row.value_a), display_value(&row.value_b));
        assert!(display_value(&row.value_a).ends_with("..."));
    }

    #[test]
    fn tag_only_in_one_side_is_listed() {
        let mut obj_a = dataset("Acme");
        obj_a.put(DataElement::new(
            tags::STATION_NAME,
            VR::SH,
            PrimitiveValue::from("LINAC1"),
        ));
        let obj_b = dataset("Acme");

        let cmp = compare(&parsed(obj_a), &parsed(obj_b));
        assert_eq!(cmp.only_in_a, vec!["StationName".to_string()]);
        assert!(cmp.only_in_b.is_empty());
    }

    #[test]
    fn missing_tag_renders_as_sentinel_and_counts_as_difference() {
        let obj_a = dataset("Acme");
        let mut obj_b = dataset("Acme");
        obj_b.take_element(tags::MANUFACTURER).unwrap();

        let cmp = compare(&parsed(obj_a), &parsed(obj_b));
        let row = cmp.rows.iter().find(|r| r.name == "Manufacturer").unwrap();
        assert!(row.differs());
        assert_eq!(display_value(&row.value_b), NOT_AVAILABLE);
    }

    #[test]
    fn rendering_is_idempotent() {
        let a = parsed(dataset("Acme"));
        let b = parsed(dataset("Acme2"));
        let cmp = compare(&a, &b);
        assert_eq!(render(&cmp, "a.dcm", "b.dcm"), render(&cmp, "a.dcm", "b.dcm"));
    }
}
