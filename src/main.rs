use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use rtqa_dicom::aggregate::Aggregation;
use rtqa_dicom::convert::batch::{convert_batch, WinstonLutzTemplate};
use rtqa_dicom::convert::repair::repair_file;
use rtqa_dicom::convert::tiff::convert_file;
use rtqa_dicom::convert::ConversionParameters;
use rtqa_dicom::error::ParameterError;
use rtqa_dicom::{compare, discover, extract, report};

#[derive(Parser)]
#[command(name = "rtqa")]
#[command(about = "Inspect, compare, repair and convert DICOM files for radiotherapy QA")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ReportFormat {
    /// Plain-text report
    Text,
    /// Structured JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a folder (or ZIP archive) of DICOM files and report the
    /// patients found
    Scan {
        /// Folder, ZIP archive or single file to scan
        input: PathBuf,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,

        /// Extract metadata in parallel (faster for large folders)
        #[arg(long)]
        parallel: bool,
    },

    /// Show the metadata of a single DICOM file
    Inspect {
        /// File to inspect
        file: PathBuf,
    },

    /// Classify a folder as single-patient, multiple-patient or unreadable
    Analyze {
        /// Folder to classify
        input: PathBuf,
    },

    /// Compare two DICOM files tag by tag
    Compare {
        /// Reference file (side A)
        file_a: PathBuf,

        /// File to compare against it (side B)
        file_b: PathBuf,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite a DICOM file with a complete file meta header
    Repair {
        /// File to repair (may be a headerless export)
        file: PathBuf,

        /// Output path; derived from the dataset when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a TIFF portal image to a DICOM RT Image
    Convert {
        /// TIFF file to convert
        file: PathBuf,

        /// Source-to-image distance in mm
        #[arg(long, default_value = "1000")]
        sid: String,

        /// Gantry angle in degrees, [0, 360)
        #[arg(long, default_value = "0")]
        gantry: String,

        /// Collimator angle in degrees, [0, 360)
        #[arg(long, default_value = "0")]
        coll: String,

        /// Couch angle in degrees, [0, 360)
        #[arg(long, default_value = "0")]
        couch: String,

        /// Image resolution in dots per inch
        #[arg(long, default_value = "400")]
        dpi: String,

        /// Output path; derived from the input name when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a folder of TIFF images using a Winston-Lutz template
    Batch {
        /// Folder containing the TIFF files
        input: PathBuf,

        /// Folder for the converted DICOM files
        #[arg(long)]
        out_dir: PathBuf,

        /// Acquisition template pairing files with machine angles
        #[arg(long, value_enum, default_value = "standard4")]
        template: WinstonLutzTemplate,

        /// Source-to-image distance in mm, shared by every item
        #[arg(long, default_value = "1000")]
        sid: String,

        /// Image resolution in dots per inch, shared by every item
        #[arg(long, default_value = "400")]
        dpi: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            input,
            output,
            format,
            parallel,
        } => run_scan(&input, output.as_deref(), format, parallel),
        Commands::Inspect { file } => {
            print!("{}", report::render_file_report(&extract::extract(&file)));
            Ok(())
        }
        Commands::Analyze { input } => run_analyze(&input),
        Commands::Compare {
            file_a,
            file_b,
            output,
        } => run_compare(&file_a, &file_b, output.as_deref()),
        Commands::Repair { file, output } => run_repair(&file, output.as_deref()),
        Commands::Convert {
            file,
            sid,
            gantry,
            coll,
            couch,
            dpi,
            output,
        } => run_convert(&file, &sid, &gantry, &coll, &couch, &dpi, output.as_deref()),
        Commands::Batch {
            input,
            out_dir,
            template,
            sid,
            dpi,
        } => run_batch(&input, &out_dir, template, &sid, &dpi),
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

/// Print a report, or write it to a UTF-8 file when `output` is given.
fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("Report saved to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn scan_folder(input: &Path, parallel: bool) -> Result<Aggregation> {
    let files = discover::discover(input, discover::DICOM_EXTENSIONS)?;
    if files.is_empty() {
        bail!("no DICOM files found under {}", input.display());
    }

    let pb = progress_bar(files.len() as u64);
    let records: Vec<_> = if parallel && files.len() > 1 {
        files
            .par_iter()
            .map(|file| {
                let record = extract::extract(file);
                pb.inc(1);
                record
            })
            .collect()
    } else {
        files
            .iter()
            .map(|file| {
                let record = extract::extract(file);
                pb.inc(1);
                record
            })
            .collect()
    };
    pb.finish_and_clear();

    // Aggregation stays a single-writer fold even when extraction ran in
    // parallel.
    let mut agg = Aggregation::default();
    agg.fold_all(records);
    Ok(agg)
}

fn run_scan(
    input: &Path,
    output: Option<&Path>,
    format: ReportFormat,
    parallel: bool,
) -> Result<()> {
    let agg = scan_folder(input, parallel)?;
    let text = match format {
        ReportFormat::Text => report::render_scan_report(&agg),
        ReportFormat::Json => report::render_json(&agg).context("failed to serialize report")?,
    };
    emit(&text, output)
}

fn run_analyze(input: &Path) -> Result<()> {
    let agg = scan_folder(input, false)?;
    print!("{}", report::render_classification(&agg));
    Ok(())
}

fn run_compare(file_a: &Path, file_b: &Path, output: Option<&Path>) -> Result<()> {
    let a = extract::read_dataset(file_a)?;
    let b = extract::read_dataset(file_b)?;
    let comparison = compare::compare(&a, &b);
    let text = compare::render(
        &comparison,
        &file_a.display().to_string(),
        &file_b.display().to_string(),
    );
    emit(&text, output)
}

fn run_repair(file: &Path, output: Option<&Path>) -> Result<()> {
    let outcome = repair_file(file, output)?;
    if outcome.was_forced {
        println!("Input read with the forced (headerless) parser.");
    }
    if outcome.verified {
        println!("✓ Repaired file saved to {}", outcome.output.display());
    } else {
        println!(
            "⚠ File saved to {} but failed the re-parse check",
            outcome.output.display()
        );
    }
    Ok(())
}

fn report_parameter_errors(errors: &[ParameterError]) -> Result<()> {
    eprintln!("Invalid conversion parameters:");
    for error in errors {
        eprintln!("  - {error}");
    }
    bail!("conversion not attempted");
}

fn run_convert(
    file: &Path,
    sid: &str,
    gantry: &str,
    coll: &str,
    couch: &str,
    dpi: &str,
    output: Option<&Path>,
) -> Result<()> {
    let params = match ConversionParameters::parse(sid, gantry, coll, couch, dpi) {
        Ok(params) => params,
        Err(errors) => return report_parameter_errors(&errors),
    };

    let outcome = convert_file(file, output, &params)?;
    if outcome.verified {
        println!(
            "✓ Converted {} ({}x{}) to {}",
            file.display(),
            outcome.columns,
            outcome.rows,
            outcome.output.display()
        );
    } else {
        println!(
            "⚠ File saved to {} but failed the re-parse check",
            outcome.output.display()
        );
    }
    Ok(())
}

fn run_batch(
    input: &Path,
    out_dir: &Path,
    template: WinstonLutzTemplate,
    sid: &str,
    dpi: &str,
) -> Result<()> {
    let params = match ConversionParameters::parse(sid, "0", "0", "0", dpi) {
        Ok(params) => params,
        Err(errors) => return report_parameter_errors(&errors),
    };

    let planned = template.items().len() as u64;
    let pb = progress_bar(planned);
    let outcome = convert_batch(input, out_dir, template, params.sid, params.dpi, Some(&pb))?;
    pb.finish_and_clear();

    if outcome.outputs.is_empty() && outcome.errors.is_empty() {
        bail!("no TIFF files found under {}", input.display());
    }

    println!(
        "Converted {} file(s) to {} ({} error(s), {} unverified)",
        outcome.outputs.len(),
        out_dir.display(),
        outcome.errors.len(),
        outcome.unverified
    );
    for (path, message) in &outcome.errors {
        println!("  error: {}: {message}", path.display());
    }
    if !outcome.skipped.is_empty() {
        println!(
            "  {} file(s) beyond the template were not converted:",
            outcome.skipped.len()
        );
        for path in &outcome.skipped {
            println!("    - {}", path.display());
        }
    }
    if outcome.unused_template_items > 0 {
        println!(
            "  {} template item(s) had no matching file",
            outcome.unused_template_items
        );
    }
    Ok(())
}
