use std::path::PathBuf;

use clap::Parser;

/// Classify a medical image by modality from pixel statistics and its file name.
#[derive(Parser, Debug)]
#[command(name = "scanlens", author, version, about, long_about = None)]
pub struct Args {
    /// Image file (PNG, JPEG or TIFF)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Built-in threshold profile. Defaults to $SCANLENS_PROFILE, then clinical.
    #[arg(long, value_name = "NAME", value_parser = ["perfect", "clinical"])]
    pub profile: Option<String>,

    /// Custom threshold profile as JSON. Takes precedence over --profile.
    #[arg(long, value_name = "FILE")]
    pub thresholds: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}
