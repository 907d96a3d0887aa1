//! Fold per-file records into per-patient groups.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::extract::FileRecord;
use crate::schema::NOT_AVAILABLE;

/// Grouping key used when a record carries no patient identifier.
pub const UNKNOWN_PATIENT: &str = "unknown";

/// Everything accumulated for one patient identifier.
///
/// Identity fields come from the group's sample record (the record with the
/// lexicographically smallest path), so the group's content does not depend
/// on the order records were folded in.
#[derive(Debug, Clone, Serialize)]
pub struct PatientGroup {
    pub patient_id: String,
    pub name: String,
    pub birth_date: String,
    pub sex: String,
    pub file_count: usize,
    pub modalities: BTreeSet<String>,
    pub study_descriptions: BTreeSet<String>,
    pub series_descriptions: BTreeSet<String>,
    pub study_uids: BTreeSet<String>,
    pub series_uids: BTreeSet<String>,
    pub institutions: BTreeSet<String>,
    pub sample: FileRecord,
}

impl PatientGroup {
    fn new(patient_id: String, record: &FileRecord) -> Self {
        Self {
            patient_id,
            name: record.field("PatientName").to_string(),
            birth_date: record.field("PatientBirthDate").to_string(),
            sex: record.field("PatientSex").to_string(),
            file_count: 0,
            modalities: BTreeSet::new(),
            study_descriptions: BTreeSet::new(),
            series_descriptions: BTreeSet::new(),
            study_uids: BTreeSet::new(),
            series_uids: BTreeSet::new(),
            institutions: BTreeSet::new(),
            sample: record.clone(),
        }
    }

    fn fold(&mut self, record: &FileRecord) {
        self.file_count += 1;
        self.modalities.insert(record.field("Modality").to_string());
        self.study_descriptions
            .insert(record.field("StudyDescription").to_string());
        self.series_descriptions
            .insert(record.field("SeriesDescription").to_string());
        self.study_uids
            .insert(record.field("StudyInstanceUID").to_string());
        self.series_uids
            .insert(record.field("SeriesInstanceUID").to_string());
        self.institutions
            .insert(record.field("InstitutionName").to_string());

        if record.path < self.sample.path {
            self.name = record.field("PatientName").to_string();
            self.birth_date = record.field("PatientBirthDate").to_string();
            self.sex = record.field("PatientSex").to_string();
            self.sample = record.clone();
        }
    }
}

/// The result of folding a scan: groups keyed by patient id, plus the files
/// that could not be extracted.
#[derive(Debug, Default, Serialize)]
pub struct Aggregation {
    pub groups: BTreeMap<String, PatientGroup>,
    pub errors: BTreeMap<PathBuf, String>,
    pub total_files: usize,
}

/// Outcome of classifying one folder by its patient groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FolderClassification {
    /// All extractions failed; no group was formed.
    NoPatientIdentified,
    SinglePatient { patient_id: String },
    MultiplePatients { count: usize },
}

impl Aggregation {
    /// Fold one record in. Error records go to the error tally; everything
    /// else lands in exactly one group, keyed by patient id (or the
    /// `"unknown"` bucket when the dataset has none).
    pub fn fold(&mut self, record: FileRecord) {
        self.total_files += 1;

        if let Some(message) = &record.error {
            self.errors.insert(record.path.clone(), message.clone());
            return;
        }

        let raw_id = record.field("PatientID");
        let patient_id = if raw_id == NOT_AVAILABLE || raw_id.is_empty() {
            UNKNOWN_PATIENT.to_string()
        } else {
            raw_id.to_string()
        };

        self.groups
            .entry(patient_id.clone())
            .or_insert_with(|| PatientGroup::new(patient_id, &record))
            .fold(&record);
    }

    pub fn fold_all(&mut self, records: impl IntoIterator<Item = FileRecord>) {
        for record in records {
            self.fold(record);
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Classify the folder this aggregation came from.
    pub fn classify(&self) -> FolderClassification {
        match self.groups.len() {
            0 => FolderClassification::NoPatientIdentified,
            1 => FolderClassification::SinglePatient {
                patient_id: self.groups.keys().next().expect("one group").clone(),
            },
            count => FolderClassification::MultiplePatients { count },
        }
    }
}
