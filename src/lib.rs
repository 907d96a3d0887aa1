//! rtqa-dicom: inspect, compare, repair and convert DICOM files in a
//! radiotherapy QA workflow.
//!
//! The library is a small pipeline — discovery, extraction, aggregation,
//! reporting, conversion — and the `rtqa` binary is a thin subcommand shell
//! over it. All format-specific work (tag parsing, transfer syntaxes,
//! image decoding) is delegated to the `dicom-rs` family and the `image`
//! crate.

pub mod aggregate;
pub mod compare;
pub mod convert;
pub mod discover;
pub mod error;
pub mod extract;
pub mod naming;
pub mod report;
pub mod schema;

pub use error::{ParameterError, Result, RtqaError};
