//! Filesystem discovery: find the files a batch operation should process.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::Result;

/// Extensions accepted when scanning for DICOM datasets.
pub const DICOM_EXTENSIONS: &[&str] = &["dcm"];

/// Extensions accepted when scanning for TIFF portal images.
pub const TIFF_EXTENSIONS: &[&str] = &["tif", "tiff"];

fn matches_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Collect every file under `input` whose extension case-insensitively
/// matches the allow-list, recursing into subdirectories.
///
/// `input` may also be a `.zip` archive (entries are extracted to a temp
/// directory and filtered the same way) or a single file, which is returned
/// as-is. Unreadable directory entries are skipped, not fatal. The result
/// is sorted so reports and tests are reproducible.
pub fn discover(input: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if input.is_file() {
        if matches_extension(input, &["zip"]) {
            files.extend(extract_zip_files(input, extensions)?);
        } else {
            files.push(input.to_path_buf());
        }
    } else if input.is_dir() {
        for entry in WalkDir::new(input).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if entry.file_type().is_file() && matches_extension(entry.path(), extensions) {
                files.push(entry.path().to_path_buf());
            }
        }
    } else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input path does not exist: {}", input.display()),
        )
        .into());
    }

    files.sort();
    debug!("discovered {} file(s) under {}", files.len(), input.display());
    Ok(files)
}

/// Extract a ZIP archive into a temp directory and return the entries that
/// pass the extension allow-list.
fn extract_zip_files(zip_path: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let mut extracted = Vec::new();

    let temp_dir = std::env::temp_dir().join(format!("rtqa_extract_{}", Uuid::new_v4()));
    fs::create_dir_all(&temp_dir)?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let out_path = temp_dir.join(entry.name());
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut output)?;

        if matches_extension(&out_path, extensions) {
            extracted.push(out_path);
        }
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn finds_matching_extensions_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("a/b");
        fs::create_dir_all(&sub).unwrap();

        touch(&dir.path().join("one.dcm"));
        touch(&dir.path().join("two.DCM"));
        touch(&sub.join("three.dcm"));
        touch(&dir.path().join("skip.txt"));
        touch(&sub.join("skip.tiff"));

        let found = discover(dir.path(), DICOM_EXTENSIONS).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|p| {
            let ext = p.extension().unwrap().to_str().unwrap();
            ext.eq_ignore_ascii_case("dcm")
        }));
    }

    #[test]
    fn result_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.dcm"));
        touch(&dir.path().join("a.dcm"));
        touch(&dir.path().join("c.dcm"));

        let found = discover(dir.path(), DICOM_EXTENSIONS).unwrap();
        let mut sorted = found.clone();
        sorted.sort();
        assert_eq!(found, sorted);
    }

    #[test]
    fn tiff_allow_list_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("g0.TIF"));
        touch(&dir.path().join("g90.tiff"));
        touch(&dir.path().join("g180.dcm"));

        let found = discover(dir.path(), TIFF_EXTENSIONS).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_does_not_abort_the_scan() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("readable.dcm"));
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        touch(&locked.join("hidden.dcm"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let found = discover(dir.path(), DICOM_EXTENSIONS).unwrap();
        assert!(found.contains(&dir.path().join("readable.dcm")));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(discover(&gone, DICOM_EXTENSIONS).is_err());
    }

    #[test]
    fn single_file_input_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.dcm");
        touch(&file);
        let found = discover(&file, DICOM_EXTENSIONS).unwrap();
        assert_eq!(found, vec![file]);
    }
}
