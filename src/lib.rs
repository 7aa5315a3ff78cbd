pub mod config;
pub mod imaging;

pub use imaging::{
    classify_concurrent, decode_image, Analysis, ClassificationResult, DetectedModality,
    HeuristicClassifier, ImagingError, ModalityClassifier, ModalityId, PathologyId, PixelBuffer,
    ThresholdProfile,
};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// directive. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("{} v{} tracing initialised", config::APP_NAME, config::APP_VERSION);
}
