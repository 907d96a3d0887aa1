//! Dataset conversion: header repair and TIFF-to-DICOM.

pub mod batch;
pub mod params;
pub mod repair;
pub mod tiff;

use std::path::Path;

use dicom::transfer_syntax::entries;
use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, RtqaError};
use crate::extract::read_dataset_strict;

pub use params::ConversionParameters;

/// RT Image Storage SOP class.
pub const RT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.481.1";

/// Secondary Capture Image Storage SOP class, used when a repaired dataset
/// does not say what it is.
pub const SECONDARY_CAPTURE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.7";

/// Generate a unique DICOM UID under the UUID-derived `2.25` root.
pub fn generate_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

fn element_str_or(dataset: &mut InMemDicomObject, tag: dicom_core::Tag, default: impl FnOnce() -> String) -> String {
    let existing = dataset
        .element_opt(tag)
        .ok()
        .flatten()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim_end_matches('\0').trim().to_string())
        .filter(|s| !s.is_empty());

    match existing {
        Some(value) => value,
        None => {
            let value = default();
            dataset.put(DataElement::new(tag, VR::UI, PrimitiveValue::from(value.as_str())));
            value
        }
    }
}

/// Serialize a dataset to `output` with a complete, explicit file meta
/// group: Explicit VR Little Endian, media storage UIDs taken from the
/// dataset (generated when absent), a fresh implementation class UID and a
/// version name carrying this tool's version.
///
/// Returns whether the written file passed the strict re-parse check. A
/// failed check leaves the file on disk; it is a warning, not a rollback.
pub fn write_explicit(
    mut dataset: InMemDicomObject,
    output: &Path,
    fallback_sop_class: &str,
) -> Result<bool> {
    let sop_class = element_str_or(&mut dataset, tags::SOP_CLASS_UID, || {
        fallback_sop_class.to_string()
    });
    let sop_instance = element_str_or(&mut dataset, tags::SOP_INSTANCE_UID, generate_uid);

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(entries::EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid(sop_class)
        .media_storage_sop_instance_uid(sop_instance)
        .implementation_class_uid(generate_uid())
        .implementation_version_name(concat!("RTQA_DICOM ", env!("CARGO_PKG_VERSION")));

    let file_obj = dataset.with_meta(meta).map_err(|e| RtqaError::Write {
        path: output.to_path_buf(),
        message: e.to_string(),
    })?;

    file_obj.write_to_file(output).map_err(|e| RtqaError::Write {
        path: output.to_path_buf(),
        message: e.to_string(),
    })?;

    let verified = read_dataset_strict(output).is_ok();
    if !verified {
        warn!("written file failed the strict re-parse check: {}", output.display());
    }
    Ok(verified)
}
