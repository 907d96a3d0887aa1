//! TIFF portal image to RT Image dataset conversion.

use std::path::{Path, PathBuf};

use chrono::Local;
use dicom_core::{dicom_value, DataElement, PrimitiveValue, Tag, VR};
use dicom_dictionary_std::tags;
use dicom_object::InMemDicomObject;
use tracing::info;

use crate::convert::{generate_uid, write_explicit, ConversionParameters, RT_IMAGE_STORAGE};
use crate::error::{Result, RtqaError};
use crate::naming;

#[derive(Debug)]
pub struct ConvertOutcome {
    pub output: PathBuf,
    pub verified: bool,
    pub rows: u16,
    pub columns: u16,
}

fn put_str(dataset: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    dataset.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

fn format_ds(value: f64) -> String {
    // DS values; whole angles stay integral ("90", not "90.0").
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Decode a TIFF file and build an RT Image dataset around it.
///
/// Pixel data is normalized to 16-bit grayscale. Geometry comes from the
/// validated parameters; identity fields are generic QA-phantom values.
pub fn tiff_to_rt_image(input: &Path, params: &ConversionParameters) -> Result<InMemDicomObject> {
    let img = image::open(input).map_err(|e| RtqaError::ImageDecode {
        path: input.to_path_buf(),
        message: e.to_string(),
    })?;
    let gray = img.to_luma16();
    let (width, height) = gray.dimensions();
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(RtqaError::ImageDecode {
            path: input.to_path_buf(),
            message: format!("image too large for a single-frame dataset: {width}x{height}"),
        });
    }

    let now = Local::now();
    let date = now.format("%Y%m%d").to_string();
    let time = now.format("%H%M%S").to_string();
    let label = naming::sanitize_filename(
        &input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "portal".to_string()),
    );
    let spacing = format!("{:.4}", params.pixel_spacing_mm());

    let mut ds = InMemDicomObject::new_empty();

    put_str(&mut ds, tags::SOP_CLASS_UID, VR::UI, RT_IMAGE_STORAGE);
    put_str(&mut ds, tags::SOP_INSTANCE_UID, VR::UI, &generate_uid());
    put_str(&mut ds, tags::STUDY_INSTANCE_UID, VR::UI, &generate_uid());
    put_str(&mut ds, tags::SERIES_INSTANCE_UID, VR::UI, &generate_uid());
    put_str(&mut ds, tags::MODALITY, VR::CS, "RTIMAGE");
    put_str(&mut ds, tags::PATIENT_NAME, VR::PN, "QA^Phantom");
    put_str(&mut ds, tags::PATIENT_ID, VR::LO, "QA");
    put_str(&mut ds, tags::STUDY_DATE, VR::DA, &date);
    put_str(&mut ds, tags::STUDY_TIME, VR::TM, &time);
    put_str(&mut ds, tags::CONTENT_DATE, VR::DA, &date);
    put_str(&mut ds, tags::CONTENT_TIME, VR::TM, &time);
    put_str(&mut ds, tags::RT_IMAGE_LABEL, VR::SH, &label);
    put_str(&mut ds, tags::RT_IMAGE_PLANE, VR::CS, "NORMAL");

    put_str(&mut ds, tags::GANTRY_ANGLE, VR::DS, &format_ds(params.gantry));
    put_str(
        &mut ds,
        tags::BEAM_LIMITING_DEVICE_ANGLE,
        VR::DS,
        &format_ds(params.coll),
    );
    put_str(
        &mut ds,
        tags::PATIENT_SUPPORT_ANGLE,
        VR::DS,
        &format_ds(params.couch),
    );
    put_str(&mut ds, tags::RT_IMAGE_SID, VR::DS, &format_ds(params.sid));
    put_str(&mut ds, tags::RADIATION_MACHINE_SAD, VR::DS, "1000");
    ds.put(DataElement::new(
        tags::IMAGE_PLANE_PIXEL_SPACING,
        VR::DS,
        dicom_value!(Strs, [spacing.clone(), spacing]),
    ));

    ds.put(DataElement::new(
        tags::SAMPLES_PER_PIXEL,
        VR::US,
        PrimitiveValue::from(1_u16),
    ));
    put_str(&mut ds, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
    ds.put(DataElement::new(
        tags::ROWS,
        VR::US,
        PrimitiveValue::from(height as u16),
    ));
    ds.put(DataElement::new(
        tags::COLUMNS,
        VR::US,
        PrimitiveValue::from(width as u16),
    ));
    ds.put(DataElement::new(
        tags::BITS_ALLOCATED,
        VR::US,
        PrimitiveValue::from(16_u16),
    ));
    ds.put(DataElement::new(
        tags::BITS_STORED,
        VR::US,
        PrimitiveValue::from(16_u16),
    ));
    ds.put(DataElement::new(
        tags::HIGH_BIT,
        VR::US,
        PrimitiveValue::from(15_u16),
    ));
    ds.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(0_u16),
    ));
    ds.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::U16(gray.into_raw().into()),
    ));

    Ok(ds)
}

/// Convert one TIFF file to a DICOM RT Image on disk. When `output` is not
/// given, the naming policy derives it from the dataset (here: the RT image
/// label, i.e. the sanitized input stem).
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    params: &ConversionParameters,
) -> Result<ConvertOutcome> {
    let dataset = tiff_to_rt_image(input, params)?;

    let rows = dataset
        .element(tags::ROWS)
        .ok()
        .and_then(|e| e.to_int::<u16>().ok())
        .unwrap_or_default();
    let columns = dataset
        .element(tags::COLUMNS)
        .ok()
        .and_then(|e| e.to_int::<u16>().ok())
        .unwrap_or_default();

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => naming::suggested_output_path(&dataset, input),
    };

    let verified = write_explicit(dataset, &output, RT_IMAGE_STORAGE)?;
    info!(
        "converted {} -> {} ({}x{}, verified: {})",
        input.display(),
        output.display(),
        columns,
        rows,
        verified
    );

    Ok(ConvertOutcome {
        output,
        verified,
        rows,
        columns,
    })
}
