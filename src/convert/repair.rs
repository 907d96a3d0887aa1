//! Header repair: rewrite a dataset with a complete file meta group so it
//! strict-parses everywhere, without touching its business content.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::convert::{write_explicit, SECONDARY_CAPTURE_IMAGE_STORAGE};
use crate::error::Result;
use crate::extract::read_dataset;
use crate::naming;

#[derive(Debug)]
pub struct RepairOutcome {
    pub output: PathBuf,
    /// Whether the written file passed the strict re-parse check.
    pub verified: bool,
    /// Whether the input needed the forced parse to be read at all.
    pub was_forced: bool,
}

/// Read `input` (forcing if necessary), synthesize the missing file-level
/// metadata and write the result in explicit mode. When `output` is not
/// given, the name is derived from the dataset via the naming policy.
pub fn repair_file(input: &Path, output: Option<&Path>) -> Result<RepairOutcome> {
    let parsed = read_dataset(input)?;
    let was_forced = parsed.is_forced();
    let dataset = parsed.into_dataset();

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => naming::suggested_output_path(&dataset, input),
    };

    let verified = write_explicit(dataset, &output, SECONDARY_CAPTURE_IMAGE_STORAGE)?;
    info!(
        "repaired {} -> {} (forced read: {}, verified: {})",
        input.display(),
        output.display(),
        was_forced,
        verified
    );

    Ok(RepairOutcome {
        output,
        verified,
        was_forced,
    })
}
