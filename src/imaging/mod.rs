pub mod types;
pub mod profile;
pub mod pixels;
pub mod visual;
pub mod structural;
pub mod texture;
pub mod filename;
pub mod pathology;
pub mod ensemble;
pub mod orchestrator;

pub use types::*;
pub use profile::*;
pub use pixels::*;
pub use visual::*;
pub use structural::*;
pub use texture::*;
pub use filename::*;
pub use pathology::*;
pub use ensemble::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("Image contains no pixel data: {0}")]
    EmptyInput(String),

    #[error("Image too large: {size} bytes (limit {max})")]
    InputTooLarge { size: usize, max: usize },

    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Image dimensions {width}x{height} exceed addressable memory")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("Invalid threshold profile: {0}")]
    InvalidProfile(String),

    #[error("Feature extraction task failed: {0}")]
    Worker(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
