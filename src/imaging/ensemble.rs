//! Rule-based ensemble that turns extracted features into a modality.
//!
//! Four stages, each producing a new `ModalityScores` snapshot:
//! filename priors, the feature rule table, anatomical bonuses, and the
//! pathology correlation bonus. Scores are additive and unnormalized; the
//! arg-max picks the modality and the profile clamps the display confidence.

use tracing::debug;

use super::filename::FilenameMatch;
use super::profile::ThresholdProfile;
use super::types::{
    AnatomicalFlags, ClassificationResult, DetectedModality, ModalityId, ModalityScores,
    PathologyReport, ScoreContribution, ScoreStage, StructuralFeatures, TextureFeatures,
    TextureTag, VisualFeatures,
};

// ═══════════════════════════════════════════════════════════
// Rule tables
// ═══════════════════════════════════════════════════════════

/// Borrowed view of the three feature records a rule may inspect.
#[derive(Debug, Clone, Copy)]
pub struct FeatureView<'a> {
    pub visual: &'a VisualFeatures,
    pub structural: &'a StructuralFeatures,
    pub texture: &'a TextureFeatures,
}

pub struct ModalityRule {
    pub name: &'static str,
    pub predicate: fn(&FeatureView<'_>) -> bool,
    pub modality: ModalityId,
    pub weight: f64,
}

fn is_square(f: &FeatureView<'_>) -> bool {
    (f.structural.aspect_ratio - 1.0).abs() < 0.15
}

pub static MODALITY_RULES: &[ModalityRule] = &[
    ModalityRule {
        name: "chest_xray_signature",
        predicate: |f| {
            f.structural.anatomy.chest_like
                && f.visual.dark_ratio > 0.6
                && f.visual.dark_ratio < 0.8
                && f.visual.contrast > 0.3
                && f.visual.edge_density > 0.25
        },
        modality: ModalityId::ChestXray,
        weight: 0.85,
    },
    ModalityRule {
        name: "brain_mri_signature",
        predicate: |f| {
            f.structural.anatomy.brain_like
                && f.visual.contrast > 0.25
                && f.visual.medium_ratio > 0.3
        },
        modality: ModalityId::BrainMri,
        weight: 0.9,
    },
    ModalityRule {
        name: "ct_signature",
        predicate: |f| {
            is_square(f)
                && f.structural.anatomy.centered_mass
                && f.visual.dark_ratio > 0.35
                && f.visual.bright_ratio > 0.05
                && f.texture.uniformity > 0.7
        },
        modality: ModalityId::CtScan,
        weight: 0.8,
    },
    ModalityRule {
        name: "abdominal_ct_signature",
        predicate: |f| {
            is_square(f) && f.visual.medium_ratio > 0.5 && f.texture.texture_complexity > 0.3
        },
        modality: ModalityId::AbdominalCt,
        weight: 0.7,
    },
    ModalityRule {
        name: "ultrasound_speckle",
        predicate: |f| {
            f.visual.dark_ratio > 0.5
                && f.texture.has_tag(TextureTag::Noisy)
                && f.visual.contrast < 0.45
                && f.visual.edge_density < 0.25
        },
        modality: ModalityId::Ultrasound,
        weight: 0.85,
    },
    ModalityRule {
        name: "bone_xray_signature",
        predicate: |f| {
            f.visual.bright_ratio > 0.2
                && f.visual.dark_ratio > 0.4
                && f.visual.edge_density > 0.2
                && !f.structural.anatomy.chest_like
        },
        modality: ModalityId::BoneXray,
        weight: 0.75,
    },
    ModalityRule {
        name: "mammography_signature",
        predicate: |f| f.structural.anatomy.mammography_like && f.visual.medium_ratio > 0.3,
        modality: ModalityId::Mammography,
        weight: 0.8,
    },
    ModalityRule {
        name: "dental_panoramic",
        predicate: |f| f.structural.anatomy.dental_like && f.visual.bright_ratio > 0.1,
        modality: ModalityId::DentalXray,
        weight: 0.8,
    },
    ModalityRule {
        name: "spine_column",
        predicate: |f| f.structural.anatomy.spine_like && f.visual.contrast > 0.2,
        modality: ModalityId::SpineXray,
        weight: 0.75,
    },
];

pub struct AnatomicalBonus {
    pub name: &'static str,
    pub flag: fn(&AnatomicalFlags) -> bool,
    pub modality: ModalityId,
    pub amount: f64,
}

pub static ANATOMICAL_BONUSES: &[AnatomicalBonus] = &[
    AnatomicalBonus {
        name: "chest_like",
        flag: |a| a.chest_like,
        modality: ModalityId::ChestXray,
        amount: 0.06,
    },
    AnatomicalBonus {
        name: "brain_like",
        flag: |a| a.brain_like,
        modality: ModalityId::BrainMri,
        amount: 0.08,
    },
    AnatomicalBonus {
        name: "spine_like",
        flag: |a| a.spine_like,
        modality: ModalityId::SpineXray,
        amount: 0.05,
    },
    AnatomicalBonus {
        name: "dental_like",
        flag: |a| a.dental_like,
        modality: ModalityId::DentalXray,
        amount: 0.06,
    },
    AnatomicalBonus {
        name: "mammography_like",
        flag: |a| a.mammography_like,
        modality: ModalityId::Mammography,
        amount: 0.05,
    },
    AnatomicalBonus {
        name: "centered_mass",
        flag: |a| a.centered_mass,
        modality: ModalityId::CtScan,
        amount: 0.04,
    },
    AnatomicalBonus {
        name: "high_symmetry",
        flag: |a| a.high_symmetry,
        modality: ModalityId::BrainMri,
        amount: 0.04,
    },
];

/// Added to chest X-ray when the top pathology is one that shows on chest films.
pub const CHEST_PATHOLOGY_BONUS: f64 = 0.15;

// ═══════════════════════════════════════════════════════════
// Stages
// ═══════════════════════════════════════════════════════════

/// Credit each matched keyword group to every modality it lists.
pub fn apply_filename_priors(
    scores: &ModalityScores,
    matches: &[FilenameMatch],
    profile: &ThresholdProfile,
) -> ModalityScores {
    scores.with_contributions(matches.iter().flat_map(|m| {
        let amount = m.weight * profile.filename_weight;
        m.modalities.iter().map(move |&modality| ScoreContribution {
            stage: ScoreStage::Filename,
            rule: m.label,
            modality,
            amount,
        })
    }))
}

pub fn apply_feature_rules(scores: &ModalityScores, features: &FeatureView<'_>) -> ModalityScores {
    scores.with_contributions(
        MODALITY_RULES
            .iter()
            .filter(|rule| (rule.predicate)(features))
            .map(|rule| ScoreContribution {
                stage: ScoreStage::FeatureRule,
                rule: rule.name,
                modality: rule.modality,
                amount: rule.weight,
            }),
    )
}

pub fn apply_anatomical_bonuses(
    scores: &ModalityScores,
    anatomy: &AnatomicalFlags,
) -> ModalityScores {
    scores.with_contributions(
        ANATOMICAL_BONUSES
            .iter()
            .filter(|bonus| (bonus.flag)(anatomy))
            .map(|bonus| ScoreContribution {
                stage: ScoreStage::AnatomicalBonus,
                rule: bonus.name,
                modality: bonus.modality,
                amount: bonus.amount,
            }),
    )
}

pub fn apply_pathology_correlation(
    scores: &ModalityScores,
    pathology: &PathologyReport,
) -> ModalityScores {
    let chest_finding = pathology
        .top()
        .filter(|top| top.pathology.is_chest_associated());

    scores.with_contributions(chest_finding.map(|_| ScoreContribution {
        stage: ScoreStage::PathologyCorrelation,
        rule: "chest_pathology",
        modality: ModalityId::ChestXray,
        amount: CHEST_PATHOLOGY_BONUS,
    }))
}

/// Display confidence: the rounded percentage, clamped into the profile band.
pub fn clamp_confidence(raw_score: f64, profile: &ThresholdProfile) -> u8 {
    let percent = (raw_score * 100.0).round();
    percent
        .min(profile.confidence_cap as f64)
        .max(profile.confidence_floor as f64) as u8
}

// ═══════════════════════════════════════════════════════════
// Ensemble
// ═══════════════════════════════════════════════════════════

/// Run every stage and pick the winning modality.
///
/// When neither a filename pattern nor a feature rule fired the result is
/// `unknown` at the profile's floor confidence.
pub fn classify_features(
    features: &FeatureView<'_>,
    filename_matches: &[FilenameMatch],
    pathology: &PathologyReport,
    profile: &ThresholdProfile,
) -> ClassificationResult {
    let scores = ModalityScores::zeroed();
    let scores = apply_filename_priors(&scores, filename_matches, profile);
    let scores = apply_feature_rules(&scores, features);
    let scores = apply_anatomical_bonuses(&scores, &features.structural.anatomy);
    let scores = apply_pathology_correlation(&scores, pathology);

    let (best, raw_score) = scores.best();
    let (modality, confidence) = if scores.has_primary_evidence() {
        (DetectedModality::Known(best), clamp_confidence(raw_score, profile))
    } else {
        (DetectedModality::Unknown, profile.confidence_floor)
    };

    debug!(
        modality = %modality,
        raw_score,
        confidence,
        contributions = scores.contributions().len(),
        "Ensemble decided"
    );

    ClassificationResult {
        modality,
        confidence,
        raw_score,
        top_pathologies: pathology.top_pathologies.clone(),
        has_pathology: pathology.has_pathology,
        profile: profile.name.clone(),
        scores,
    }
}
