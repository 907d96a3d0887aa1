//! Batch TIFF conversion driven by Winston-Lutz templates.
//!
//! Template items are paired with the sorted TIFF listing by position, the
//! way the acquisition sequence pairs exposures with machine angles.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use indicatif::ProgressBar;
use tracing::warn;

use crate::convert::tiff::convert_file;
use crate::convert::ConversionParameters;
use crate::discover::{self, TIFF_EXTENSIONS};
use crate::error::{Result, RtqaError};
use crate::naming;

/// One planned conversion: output name plus the machine angles for it.
#[derive(Debug, Clone, Copy)]
pub struct TemplateItem {
    pub name: &'static str,
    pub gantry: f64,
    pub coll: f64,
    pub couch: f64,
}

const fn item(name: &'static str, gantry: f64, coll: f64, couch: f64) -> TemplateItem {
    TemplateItem {
        name,
        gantry,
        coll,
        couch,
    }
}

/// Predefined Winston-Lutz acquisition templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WinstonLutzTemplate {
    /// Four cardinal gantry angles.
    Standard4,
    /// Cardinal gantry angles plus two couch angles and one collimator.
    Extended7,
    /// Full set: four gantry, four couch, one collimator.
    Complete9,
}

const STANDARD4_ITEMS: &[TemplateItem] = &[
    item("gantry_0", 0.0, 0.0, 0.0),
    item("gantry_90", 90.0, 0.0, 0.0),
    item("gantry_180", 180.0, 0.0, 0.0),
    item("gantry_270", 270.0, 0.0, 0.0),
];

const EXTENDED7_ITEMS: &[TemplateItem] = &[
    item("gantry_0", 0.0, 0.0, 0.0),
    item("gantry_90", 90.0, 0.0, 0.0),
    item("gantry_180", 180.0, 0.0, 0.0),
    item("gantry_270", 270.0, 0.0, 0.0),
    item("couch_45", 0.0, 0.0, 45.0),
    item("couch_315", 0.0, 0.0, 315.0),
    item("coll_45", 0.0, 45.0, 0.0),
];

const COMPLETE9_ITEMS: &[TemplateItem] = &[
    item("gantry_0", 0.0, 0.0, 0.0),
    item("gantry_90", 90.0, 0.0, 0.0),
    item("gantry_180", 180.0, 0.0, 0.0),
    item("gantry_270", 270.0, 0.0, 0.0),
    item("couch_45", 0.0, 0.0, 45.0),
    item("couch_90", 0.0, 0.0, 90.0),
    item("couch_270", 0.0, 0.0, 270.0),
    item("couch_315", 0.0, 0.0, 315.0),
    item("coll_45", 0.0, 45.0, 0.0),
];

impl WinstonLutzTemplate {
    pub fn items(&self) -> &'static [TemplateItem] {
        match self {
            WinstonLutzTemplate::Standard4 => STANDARD4_ITEMS,
            WinstonLutzTemplate::Extended7 => EXTENDED7_ITEMS,
            WinstonLutzTemplate::Complete9 => COMPLETE9_ITEMS,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub outputs: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, String)>,
    /// Input files beyond the template length, left unconverted.
    pub skipped: Vec<PathBuf>,
    /// Template items beyond the number of input files.
    pub unused_template_items: usize,
    /// Outputs that were written but failed the strict re-parse check.
    pub unverified: usize,
}

/// Convert every TIFF under `input_dir`, pairing the sorted listing with
/// the template items. Per-file failures are collected, not fatal.
pub fn convert_batch(
    input_dir: &Path,
    out_dir: &Path,
    template: WinstonLutzTemplate,
    sid: f64,
    dpi: f64,
    progress: Option<&ProgressBar>,
) -> Result<BatchOutcome> {
    let files = discover::discover(input_dir, TIFF_EXTENSIONS)?;
    let items = template.items();
    fs::create_dir_all(out_dir)?;

    let mut outcome = BatchOutcome::default();
    let planned = files.len().min(items.len());

    if items.len() > files.len() {
        outcome.unused_template_items = items.len() - files.len();
        warn!(
            "template has {} item(s) but only {} TIFF file(s) were found",
            items.len(),
            files.len()
        );
    }
    outcome.skipped = files.iter().skip(items.len()).cloned().collect();

    for (file, item) in files.iter().take(planned).zip(items) {
        let result = ConversionParameters::new(sid, item.gantry, item.coll, item.couch, dpi)
            .map_err(RtqaError::InvalidParameters)
            .and_then(|params| {
                let output = naming::resolve_collision(out_dir, item.name);
                convert_file(file, Some(&output), &params)
            });

        match result {
            Ok(converted) => {
                if !converted.verified {
                    outcome.unverified += 1;
                }
                outcome.outputs.push(converted.output);
            }
            Err(e) => outcome.errors.push((file.clone(), e.to_string())),
        }
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn write_tiff(path: &Path) {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(4, 4, Luma([512_u16]));
        img.save(path).unwrap();
    }

    #[test]
    fn template_sizes_match_their_names() {
        assert_eq!(WinstonLutzTemplate::Standard4.items().len(), 4);
        assert_eq!(WinstonLutzTemplate::Extended7.items().len(), 7);
        assert_eq!(WinstonLutzTemplate::Complete9.items().len(), 9);
    }

    #[test]
    fn template_angles_are_always_valid_parameters() {
        for template in [
            WinstonLutzTemplate::Standard4,
            WinstonLutzTemplate::Extended7,
            WinstonLutzTemplate::Complete9,
        ] {
            for item in template.items() {
                assert!(
                    ConversionParameters::new(1000.0, item.gantry, item.coll, item.couch, 400.0)
                        .is_ok(),
                    "invalid template item {}",
                    item.name
                );
            }
        }
    }

    #[test]
    fn batch_pairs_files_with_items_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        std::fs::create_dir_all(&input).unwrap();
        write_tiff(&input.join("b.tif"));
        write_tiff(&input.join("a.tif"));

        let outcome = convert_batch(
            &input,
            &out,
            WinstonLutzTemplate::Standard4,
            1000.0,
            400.0,
            None,
        )
        .unwrap();

        assert_eq!(outcome.outputs.len(), 2);
        assert_eq!(outcome.outputs[0], out.join("gantry_0.dcm"));
        assert_eq!(outcome.outputs[1], out.join("gantry_90.dcm"));
        assert_eq!(outcome.unused_template_items, 2);
        assert!(outcome.errors.is_empty());
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.unverified, 0);
    }

    #[test]
    fn files_beyond_the_template_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        std::fs::create_dir_all(&input).unwrap();
        for name in ["a.tif", "b.tif", "c.tif", "d.tif", "e.tif"] {
            write_tiff(&input.join(name));
        }

        let outcome = convert_batch(
            &input,
            &out,
            WinstonLutzTemplate::Standard4,
            1000.0,
            400.0,
            None,
        )
        .unwrap();

        assert_eq!(outcome.outputs.len(), 4);
        assert_eq!(outcome.skipped, vec![input.join("e.tif")]);
    }

    #[test]
    fn broken_input_is_collected_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        std::fs::create_dir_all(&input).unwrap();
        write_tiff(&input.join("a.tif"));
        std::fs::write(input.join("b.tif"), b"not a tiff").unwrap();

        let outcome = convert_batch(
            &input,
            &out,
            WinstonLutzTemplate::Standard4,
            1000.0,
            400.0,
            None,
        )
        .unwrap();

        assert_eq!(outcome.outputs.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].0, input.join("b.tif"));
    }
}
