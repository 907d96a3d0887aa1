//! Output filename synthesis for converted datasets.

use std::path::{Path, PathBuf};

use dicom_object::InMemDicomObject;

use crate::extract::field_value;
use crate::schema::{self, NOT_AVAILABLE};

/// Strip characters that are illegal in filenames on the supported
/// filesystems, keeping an allow-list of alphanumerics, space, dot, dash
/// and underscore. Path separators become underscores so multi-part
/// descriptions stay readable; everything else is dropped.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_') {
                Some(c)
            } else if matches!(c, '/' | '\\') {
                Some('_')
            } else {
                None
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn candidate(value: &str) -> Option<String> {
    let cleaned = sanitize_filename(value);
    if cleaned.is_empty() || cleaned == NOT_AVAILABLE {
        None
    } else {
        Some(cleaned)
    }
}

/// Synthesize an output stem from a dataset, in priority order: series
/// description, RT image label, patient id (with study date when present),
/// then the input filename with a `_converted` suffix.
pub fn suggested_stem(dataset: &InMemDicomObject, input: &Path) -> String {
    let read = |name: &str| field_value(dataset, schema::field(name).expect("schema field"));

    if let Some(stem) = candidate(&read("SeriesDescription")) {
        return stem;
    }
    if let Some(stem) = candidate(&read("RTImageLabel")) {
        return stem;
    }
    if let Some(mut stem) = candidate(&read("PatientID")) {
        // The displayed date contains slashes; sanitize again after joining.
        if let Some(date) = candidate(&read("StudyDate")) {
            stem = sanitize_filename(&format!("{stem}_{date}"));
        }
        return stem;
    }

    let base = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let fallback = sanitize_filename(&format!("{base}_converted"));
    if fallback == "_converted" || fallback.is_empty() {
        "converted".to_string()
    } else {
        fallback
    }
}

/// Full suggested output path: the synthesized stem next to the input file
/// with a `.dcm` extension, with collisions resolved by a numeric suffix.
pub fn suggested_output_path(dataset: &InMemDicomObject, input: &Path) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = suggested_stem(dataset, input);
    resolve_collision(dir, &stem)
}

/// Find the first free `<stem>.dcm`, `<stem>_1.dcm`, `<stem>_2.dcm`, ...
/// under `dir`.
pub fn resolve_collision(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.dcm"));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{stem}_{counter}.dcm"));
        counter += 1;
    }
    path
}
