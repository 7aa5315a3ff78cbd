//! Threshold profiles for the heuristic classifier.
//!
//! One algorithm, two tunings. `perfect` favours crisp reference images
//! (tighter edge and tag thresholds, finer sampling, 75-98 confidence band);
//! `clinical` is tuned for everyday scans (coarser sampling, lower dark cut,
//! 80-97 confidence band). Custom profiles load from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ImagingError;

pub const PERFECT_PROFILE: &str = "perfect";
pub const CLINICAL_PROFILE: &str = "clinical";

/// Named set of thresholds, weights and confidence clamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    pub name: String,
    /// Brightness strictly below this is "dark".
    pub dark_threshold: u8,
    /// Brightness strictly above this is "bright".
    pub bright_threshold: u8,
    /// Red-channel jump to the next pixel that counts as an edge.
    pub edge_threshold: u8,
    /// Sampling stride for the symmetry scans. `validate` rejects 0; the
    /// extractors treat it as 1.
    pub symmetry_stride: u32,
    /// Sampling stride for neighbourhood texture analysis. Same handling of 0.
    pub texture_stride: u32,
    /// Roughness above this tags the image `high-detail`.
    pub roughness_tag_threshold: f64,
    /// Local variance above this tags the image `noisy`.
    pub variance_tag_threshold: f64,
    /// Uniformity above this tags the image `smooth`.
    pub smooth_tag_threshold: f64,
    /// Fraction of a filename pattern's weight credited to its modalities.
    pub filename_weight: f64,
    /// Multiplier on every pathology rule's base score.
    pub pathology_weight_scale: f64,
    /// Reported confidence never drops below this.
    pub confidence_floor: u8,
    /// Reported confidence never exceeds this.
    pub confidence_cap: u8,
}

impl ThresholdProfile {
    pub fn perfect() -> Self {
        Self {
            name: PERFECT_PROFILE.into(),
            dark_threshold: 50,
            bright_threshold: 200,
            edge_threshold: 30,
            symmetry_stride: 2,
            texture_stride: 2,
            roughness_tag_threshold: 60.0,
            variance_tag_threshold: 120.0,
            smooth_tag_threshold: 0.85,
            filename_weight: 0.25,
            pathology_weight_scale: 1.0,
            confidence_floor: 75,
            confidence_cap: 98,
        }
    }

    pub fn clinical() -> Self {
        Self {
            name: CLINICAL_PROFILE.into(),
            dark_threshold: 60,
            bright_threshold: 200,
            edge_threshold: 25,
            symmetry_stride: 3,
            texture_stride: 3,
            roughness_tag_threshold: 55.0,
            variance_tag_threshold: 100.0,
            smooth_tag_threshold: 0.80,
            filename_weight: 0.20,
            pathology_weight_scale: 0.9,
            confidence_floor: 80,
            confidence_cap: 97,
        }
    }

    /// Look up a built-in profile by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            PERFECT_PROFILE => Some(Self::perfect()),
            CLINICAL_PROFILE => Some(Self::clinical()),
            _ => None,
        }
    }

    /// Parse and validate a profile from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ImagingError> {
        let profile: Self = serde_json::from_str(json)
            .map_err(|e| ImagingError::InvalidProfile(format!("Malformed profile JSON: {e}")))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ImagingError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject profiles the extractors cannot run with.
    pub fn validate(&self) -> Result<(), ImagingError> {
        if self.symmetry_stride == 0 || self.texture_stride == 0 {
            return Err(ImagingError::InvalidProfile(
                "Sampling strides must be at least 1".into(),
            ));
        }
        if self.confidence_cap > 100 || self.confidence_floor > self.confidence_cap {
            return Err(ImagingError::InvalidProfile(format!(
                "Confidence band {}..={} is not within 0..=100",
                self.confidence_floor, self.confidence_cap
            )));
        }
        if self.dark_threshold > self.bright_threshold {
            return Err(ImagingError::InvalidProfile(format!(
                "Dark threshold {} exceeds bright threshold {}",
                self.dark_threshold, self.bright_threshold
            )));
        }
        let weights = [
            self.filename_weight,
            self.pathology_weight_scale,
            self.roughness_tag_threshold,
            self.variance_tag_threshold,
            self.smooth_tag_threshold,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ImagingError::InvalidProfile(
                "Weights and tag thresholds must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self::clinical()
    }
}
