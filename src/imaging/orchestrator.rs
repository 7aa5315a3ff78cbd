//! End-to-end classification: decode, extract, score, decide.
//!
//! `HeuristicClassifier` owns a validated `ThresholdProfile` and runs the
//! extractors sequentially. `classify_concurrent` runs the three pixel
//! extractors on the blocking pool and joins them before scoring; both
//! paths produce identical results.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::ensemble::{classify_features, FeatureView};
use super::filename::{score_filename, FilenameMatch};
use super::pathology::score_pathologies;
use super::pixels::{decode_image, PixelBuffer};
use super::profile::ThresholdProfile;
use super::structural::extract_structural_features;
use super::texture::extract_texture_features;
use super::types::{
    Analysis, ClassificationResult, StructuralFeatures, TextureFeatures, VisualFeatures,
};
use super::visual::extract_visual_features;
use super::ImagingError;

/// Assigns a modality to a decoded image.
///
/// Pure over its inputs: the same buffer and file name always produce the
/// same result.
pub trait ModalityClassifier: Send + Sync {
    fn classify(&self, pixels: &PixelBuffer, file_name: &str) -> ClassificationResult;
}

/// Rule-table classifier over pixel statistics and filename keywords.
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier {
    profile: ThresholdProfile,
}

impl HeuristicClassifier {
    /// Build a classifier, rejecting profiles the extractors cannot run with.
    pub fn new(profile: ThresholdProfile) -> Result<Self, ImagingError> {
        profile.validate()?;
        Ok(Self { profile })
    }

    pub fn profile(&self) -> &ThresholdProfile {
        &self.profile
    }

    /// Full analysis with every intermediate record.
    pub fn analyze(&self, pixels: &PixelBuffer, file_name: &str) -> Analysis {
        let visual = extract_visual_features(pixels, &self.profile);
        let structural = extract_structural_features(pixels, &self.profile);
        let texture = extract_texture_features(pixels, &self.profile);
        score_extracted(visual, structural, texture, file_name, &self.profile)
    }

    /// Decode encoded image bytes, then classify.
    pub fn classify_bytes(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<ClassificationResult, ImagingError> {
        let pixels = decode_image(bytes).map_err(|e| {
            warn!(file_name, error = %e, "Image could not be decoded");
            e
        })?;
        Ok(self.classify(&pixels, file_name))
    }

    /// Read, decode and classify a file. The file name used for keyword
    /// matching is the path's final component.
    pub fn classify_file(&self, path: &Path) -> Result<ClassificationResult, ImagingError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.classify_bytes(&bytes, &file_name)
    }
}

impl ModalityClassifier for HeuristicClassifier {
    fn classify(&self, pixels: &PixelBuffer, file_name: &str) -> ClassificationResult {
        self.analyze(pixels, file_name).classification
    }
}

/// Run the visual, structural and texture extractors as parallel blocking
/// tasks, then score. Result is identical to `HeuristicClassifier::classify`.
pub async fn classify_concurrent(
    pixels: Arc<PixelBuffer>,
    file_name: String,
    profile: ThresholdProfile,
) -> Result<ClassificationResult, ImagingError> {
    profile.validate()?;
    let profile = Arc::new(profile);

    let visual_task = {
        let (pixels, profile) = (Arc::clone(&pixels), Arc::clone(&profile));
        tokio::task::spawn_blocking(move || extract_visual_features(&pixels, &profile))
    };
    let structural_task = {
        let (pixels, profile) = (Arc::clone(&pixels), Arc::clone(&profile));
        tokio::task::spawn_blocking(move || extract_structural_features(&pixels, &profile))
    };
    let texture_task = {
        let (pixels, profile) = (Arc::clone(&pixels), Arc::clone(&profile));
        tokio::task::spawn_blocking(move || extract_texture_features(&pixels, &profile))
    };

    let (visual, structural, texture) =
        tokio::try_join!(visual_task, structural_task, texture_task)
            .map_err(|e| ImagingError::Worker(e.to_string()))?;

    Ok(score_extracted(visual, structural, texture, &file_name, &profile).classification)
}

/// Filename priors, pathology scoring and the ensemble over extracted features.
fn score_extracted(
    visual: VisualFeatures,
    structural: StructuralFeatures,
    texture: TextureFeatures,
    file_name: &str,
    profile: &ThresholdProfile,
) -> Analysis {
    let filename_matches: Vec<FilenameMatch> = score_filename(file_name);
    let pathology = score_pathologies(&visual, profile);

    let view = FeatureView {
        visual: &visual,
        structural: &structural,
        texture: &texture,
    };
    let classification = classify_features(&view, &filename_matches, &pathology, profile);

    info!(
        file_name,
        profile = %profile.name,
        modality = %classification.modality,
        confidence = classification.confidence,
        has_pathology = classification.has_pathology,
        "Image classified"
    );

    Analysis {
        visual,
        structural,
        texture,
        filename_matches,
        pathology,
        classification,
    }
}
