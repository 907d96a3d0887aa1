//! Conversion parameters for TIFF portal images.

use serde::Serialize;

use crate::error::ParameterError;

/// Acquisition parameters required to turn a raster image into an RT Image
/// dataset: source-to-image distance, the three machine rotation angles and
/// the image resolution. Fully specified by the caller; immutable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConversionParameters {
    /// Source-to-image distance in mm.
    pub sid: f64,
    /// Gantry angle in degrees, [0, 360).
    pub gantry: f64,
    /// Collimator angle in degrees, [0, 360).
    pub coll: f64,
    /// Couch (patient support) angle in degrees, [0, 360).
    pub couch: f64,
    /// Image resolution in dots per inch.
    pub dpi: f64,
}

fn check_positive(errors: &mut Vec<ParameterError>, field: &'static str, value: f64) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(ParameterError::new(field, "must be greater than 0"));
    }
}

fn check_angle(errors: &mut Vec<ParameterError>, field: &'static str, value: f64) {
    if !value.is_finite() || !(0.0..360.0).contains(&value) {
        errors.push(ParameterError::new(
            field,
            "must be at least 0 and less than 360",
        ));
    }
}

impl ConversionParameters {
    /// Validate numeric parameters. All failures are collected so the
    /// caller sees every bad field at once, and no conversion is attempted
    /// while any field is invalid.
    pub fn new(
        sid: f64,
        gantry: f64,
        coll: f64,
        couch: f64,
        dpi: f64,
    ) -> Result<Self, Vec<ParameterError>> {
        let mut errors = Vec::new();
        check_positive(&mut errors, "sid", sid);
        check_angle(&mut errors, "gantry", gantry);
        check_angle(&mut errors, "coll", coll);
        check_angle(&mut errors, "couch", couch);
        check_positive(&mut errors, "dpi", dpi);

        if errors.is_empty() {
            Ok(Self {
                sid,
                gantry,
                coll,
                couch,
                dpi,
            })
        } else {
            Err(errors)
        }
    }

    /// Parse and validate parameters given as strings (CLI input). A field
    /// that does not parse as a number is reported for that field alone and
    /// never reaches range validation.
    pub fn parse(
        sid: &str,
        gantry: &str,
        coll: &str,
        couch: &str,
        dpi: &str,
    ) -> Result<Self, Vec<ParameterError>> {
        let mut errors = Vec::new();
        let mut parse = |field: &'static str, raw: &str| -> f64 {
            match raw.trim().parse::<f64>() {
                Ok(value) => value,
                Err(_) => {
                    errors.push(ParameterError::new(field, "must be a valid number"));
                    f64::NAN
                }
            }
        };

        let sid = parse("sid", sid);
        let gantry = parse("gantry", gantry);
        let coll = parse("coll", coll);
        let couch = parse("couch", couch);
        let dpi = parse("dpi", dpi);

        if !errors.is_empty() {
            return Err(errors);
        }
        Self::new(sid, gantry, coll, couch, dpi)
    }

    /// Physical pixel spacing in mm implied by the resolution.
    pub fn pixel_spacing_mm(&self) -> f64 {
        25.4 / self.dpi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0)]
    #[case(90.0)]
    #[case(359.999)]
    fn in_range_angles_are_accepted(#[case] angle: f64) {
        assert!(ConversionParameters::new(1000.0, angle, 0.0, 0.0, 400.0).is_ok());
    }

    #[rstest]
    #[case(360.0)]
    #[case(-1.0)]
    #[case(400.0)]
    fn out_of_range_gantry_is_rejected_by_field(#[case] angle: f64) {
        let errors = ConversionParameters::new(1000.0, angle, 0.0, 0.0, 400.0).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "gantry");
    }

    #[test]
    fn all_invalid_fields_are_reported_together() {
        let errors = ConversionParameters::new(0.0, 360.0, -5.0, 720.0, 0.0).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["sid", "gantry", "coll", "couch", "dpi"]);
    }

    #[test]
    fn non_numeric_input_is_rejected_per_field() {
        let errors = ConversionParameters::parse("1000", "zero", "0", "0", "4e2").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "gantry");
        assert!(errors[0].message.contains("valid number"));
    }

    #[test]
    fn parsed_values_round_trip() {
        let params = ConversionParameters::parse("1000", "90", "0", "0", "400").unwrap();
        assert_eq!(
            params,
            ConversionParameters {
                sid: 1000.0,
                gantry: 90.0,
                coll: 0.0,
                couch: 0.0,
                dpi: 400.0
            }
        );
    }

    #[test]
    fn pixel_spacing_follows_dpi() {
        let params = ConversionParameters::new(1000.0, 0.0, 0.0, 0.0, 254.0).unwrap();
        assert!((params.pixel_spacing_mm() - 0.1).abs() < 1e-9);
    }
}
