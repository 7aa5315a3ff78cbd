mod args;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use scanlens_lib::config;
use scanlens_lib::imaging::{classify_concurrent, decode_image, ImagingError, ThresholdProfile};

fn resolve_profile(args: &args::Args) -> Result<ThresholdProfile, ImagingError> {
    if let Some(path) = &args.thresholds {
        return ThresholdProfile::from_json_file(path);
    }
    match args.profile.as_deref().and_then(ThresholdProfile::from_name) {
        Some(profile) => Ok(profile),
        None => Ok(config::profile_from_env()),
    }
}

async fn run(args: &args::Args) -> Result<String, ImagingError> {
    let profile = resolve_profile(args)?;
    let bytes = tokio::fs::read(&args.file).await?;
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pixels = Arc::new(decode_image(&bytes)?);
    let result = classify_concurrent(pixels, file_name, profile).await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    Ok(json)
}

#[tokio::main]
async fn main() -> ExitCode {
    scanlens_lib::init_tracing();
    let args = args::Args::parse();

    match run(&args).await {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(file = %args.file.display(), error = %e, "Classification failed");
            eprintln!("{}: {e}", config::APP_NAME.to_lowercase());
            ExitCode::FAILURE
        }
    }
}
