//! The fixed field schema read by the extractor and the comparison report.
//!
//! Field access goes through this table instead of ad-hoc per-call-site
//! lookups, so the set of known fields, their tags and their display
//! treatment live in one place.

use dicom_core::Tag;
use dicom_dictionary_std::tags;

/// Placeholder substituted for any field not present in a dataset.
pub const NOT_AVAILABLE: &str = "N/A";

/// How a field's raw value is rendered for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain text, trimmed.
    Text,
    /// 8-digit DICOM date (YYYYMMDD), displayed as DD/MM/YYYY.
    Date,
    /// DICOM time (HHMMSS.ffffff), displayed as HH:MM:SS.
    Time,
}

/// One extractable field: display name (the DICOM keyword), tag, kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub tag: Tag,
    pub kind: FieldKind,
}

const fn text(name: &'static str, tag: Tag) -> FieldSpec {
    FieldSpec {
        name,
        tag,
        kind: FieldKind::Text,
    }
}

const fn date(name: &'static str, tag: Tag) -> FieldSpec {
    FieldSpec {
        name,
        tag,
        kind: FieldKind::Date,
    }
}

const fn time(name: &'static str, tag: Tag) -> FieldSpec {
    FieldSpec {
        name,
        tag,
        kind: FieldKind::Time,
    }
}

/// Every field the extractor reads from a dataset, in report order.
pub const FIELDS: &[FieldSpec] = &[
    text("PatientName", tags::PATIENT_NAME),
    text("PatientID", tags::PATIENT_ID),
    date("PatientBirthDate", tags::PATIENT_BIRTH_DATE),
    text("PatientSex", tags::PATIENT_SEX),
    text("PatientAge", tags::PATIENT_AGE),
    text("Modality", tags::MODALITY),
    text("StudyDescription", tags::STUDY_DESCRIPTION),
    date("StudyDate", tags::STUDY_DATE),
    time("StudyTime", tags::STUDY_TIME),
    text("StudyInstanceUID", tags::STUDY_INSTANCE_UID),
    text("SeriesDescription", tags::SERIES_DESCRIPTION),
    text("SeriesNumber", tags::SERIES_NUMBER),
    date("SeriesDate", tags::SERIES_DATE),
    text("SeriesInstanceUID", tags::SERIES_INSTANCE_UID),
    text("Manufacturer", tags::MANUFACTURER),
    text("ManufacturerModelName", tags::MANUFACTURER_MODEL_NAME),
    text("StationName", tags::STATION_NAME),
    text("InstitutionName", tags::INSTITUTION_NAME),
    text("Rows", tags::ROWS),
    text("Columns", tags::COLUMNS),
    text("BitsAllocated", tags::BITS_ALLOCATED),
    text("PhotometricInterpretation", tags::PHOTOMETRIC_INTERPRETATION),
    text("SOPClassUID", tags::SOP_CLASS_UID),
    text("SOPInstanceUID", tags::SOP_INSTANCE_UID),
    text("InstanceNumber", tags::INSTANCE_NUMBER),
    text("RTImageLabel", tags::RT_IMAGE_LABEL),
];

/// Look a field spec up by display name.
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Tags inspected by the side-by-side comparison report.
///
/// Identity and image-format tags first, then the RT image acquisition
/// geometry block. Tags outside this list still show up in the
/// "present in only one side" section of the report.
pub const COMPARE_TAGS: &[(&str, Tag)] = &[
    ("SOPClassUID", tags::SOP_CLASS_UID),
    ("SOPInstanceUID", tags::SOP_INSTANCE_UID),
    ("Modality", tags::MODALITY),
    ("Manufacturer", tags::MANUFACTURER),
    ("ManufacturerModelName", tags::MANUFACTURER_MODEL_NAME),
    ("StationName", tags::STATION_NAME),
    ("StudyInstanceUID", tags::STUDY_INSTANCE_UID),
    ("SeriesInstanceUID", tags::SERIES_INSTANCE_UID),
    ("FrameOfReferenceUID", tags::FRAME_OF_REFERENCE_UID),
    ("PatientName", tags::PATIENT_NAME),
    ("PatientID", tags::PATIENT_ID),
    ("StudyDate", tags::STUDY_DATE),
    ("StudyTime", tags::STUDY_TIME),
    ("SeriesDate", tags::SERIES_DATE),
    ("SeriesTime", tags::SERIES_TIME),
    ("AcquisitionDate", tags::ACQUISITION_DATE),
    ("AcquisitionTime", tags::ACQUISITION_TIME),
    ("ContentDate", tags::CONTENT_DATE),
    ("ContentTime", tags::CONTENT_TIME),
    ("Rows", tags::ROWS),
    ("Columns", tags::COLUMNS),
    ("BitsAllocated", tags::BITS_ALLOCATED),
    ("BitsStored", tags::BITS_STORED),
    ("HighBit", tags::HIGH_BIT),
    ("PixelRepresentation", tags::PIXEL_REPRESENTATION),
    ("PhotometricInterpretation", tags::PHOTOMETRIC_INTERPRETATION),
    ("SamplesPerPixel", tags::SAMPLES_PER_PIXEL),
    ("PixelSpacing", tags::PIXEL_SPACING),
    ("ImageOrientationPatient", tags::IMAGE_ORIENTATION_PATIENT),
    ("ImagePositionPatient", tags::IMAGE_POSITION_PATIENT),
    ("SliceThickness", tags::SLICE_THICKNESS),
    ("RTImageLabel", tags::RT_IMAGE_LABEL),
    ("RTImageName", tags::RT_IMAGE_NAME),
    ("RTImageDescription", tags::RT_IMAGE_DESCRIPTION),
    ("RTImagePlane", tags::RT_IMAGE_PLANE),
    ("XRayImageReceptorTranslation", Tag(0x3002, 0x000D)),
    ("XRayImageReceptorAngle", Tag(0x3002, 0x000E)),
    ("RTImageOrientation", tags::RT_IMAGE_ORIENTATION),
    ("ImagePlanePixelSpacing", tags::IMAGE_PLANE_PIXEL_SPACING),
    ("RTImagePosition", tags::RT_IMAGE_POSITION),
    ("RadiationMachineName", tags::RADIATION_MACHINE_NAME),
    ("RadiationMachineSAD", tags::RADIATION_MACHINE_SAD),
    ("RadiationMachineSSD", tags::RADIATION_MACHINE_SSD),
    ("RTImageSID", tags::RT_IMAGE_SID),
    ("PrimaryDosimeterUnit", tags::PRIMARY_DOSIMETER_UNIT),
    ("GantryAngle", tags::GANTRY_ANGLE),
    ("BeamLimitingDeviceAngle", tags::BEAM_LIMITING_DEVICE_ANGLE),
    ("PatientSupportAngle", tags::PATIENT_SUPPORT_ANGLE),
    ("TableTopVerticalPosition", tags::TABLE_TOP_VERTICAL_POSITION),
    ("TableTopLongitudinalPosition", tags::TABLE_TOP_LONGITUDINAL_POSITION),
    ("TableTopLateralPosition", tags::TABLE_TOP_LATERAL_POSITION),
    ("IsocenterPosition", tags::ISOCENTER_POSITION),
];
