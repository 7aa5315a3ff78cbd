//! Rule table mapping visual patterns to pathology scores.
//!
//! Rules run in table order against one `PathologyScores` accumulator.
//! `Set` overwrites an entry, `Add` increments it; both clamp to [0, 1].
//! Every base score is multiplied by the profile's `pathology_weight_scale`.

use tracing::debug;

use super::profile::ThresholdProfile;
use super::types::{PathologyId, PathologyReport, PathologyScores, RankedPathology, VisualFeatures};

/// Scores at or below this never reach `top_pathologies`.
pub const TOP_PATHOLOGY_MIN_SCORE: f64 = 0.3;

/// Maximum length of `top_pathologies`.
pub const TOP_PATHOLOGY_LIMIT: usize = 5;

/// Top score above this sets `has_pathology`.
pub const HAS_PATHOLOGY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleEffect {
    Set(PathologyId, f64),
    Add(PathologyId, f64),
}

pub struct PathologyRule {
    pub name: &'static str,
    pub predicate: fn(&VisualFeatures) -> bool,
    pub effects: &'static [RuleEffect],
}

use RuleEffect::{Add, Set};

pub static PATHOLOGY_RULES: &[PathologyRule] = &[
    PathologyRule {
        name: "pneumonia_pattern",
        predicate: |v| v.indicators.pneumonia,
        effects: &[
            Set(PathologyId::Pneumonia, 0.75),
            Set(PathologyId::Consolidation, 0.45),
            Set(PathologyId::Infiltration, 0.40),
        ],
    },
    PathologyRule {
        name: "effusion_pattern",
        predicate: |v| v.indicators.pleural_effusion,
        effects: &[
            Set(PathologyId::PleuralEffusion, 0.70),
            Set(PathologyId::Atelectasis, 0.40),
        ],
    },
    PathologyRule {
        name: "cardiomegaly_pattern",
        predicate: |v| v.indicators.cardiomegaly,
        effects: &[
            Set(PathologyId::Cardiomegaly, 0.65),
            Set(PathologyId::Edema, 0.35),
        ],
    },
    PathologyRule {
        name: "consolidation_pattern",
        predicate: |v| v.indicators.consolidation,
        effects: &[
            Add(PathologyId::Consolidation, 0.20),
            Add(PathologyId::Infiltration, 0.15),
        ],
    },
    PathologyRule {
        name: "nodule_contrast_edges",
        predicate: |v| v.contrast > 0.5 && v.edge_density > 0.3,
        effects: &[
            Set(PathologyId::Nodule, 0.55),
            Set(PathologyId::Mass, 0.40),
        ],
    },
    PathologyRule {
        name: "mass_high_contrast",
        predicate: |v| v.contrast > 0.6 && v.edge_density > 0.45,
        effects: &[
            Add(PathologyId::Mass, 0.20),
            Set(PathologyId::Tumor, 0.35),
        ],
    },
    PathologyRule {
        name: "emphysema_hyperlucency",
        predicate: |v| v.dark_ratio > 0.7 && v.bright_ratio < 0.05,
        effects: &[Set(PathologyId::Emphysema, 0.60)],
    },
    PathologyRule {
        name: "pneumothorax_split_field",
        predicate: |v| v.dark_ratio > 0.75 && v.bright_ratio > 0.1,
        effects: &[Set(PathologyId::Pneumothorax, 0.55)],
    },
    PathologyRule {
        name: "fibrosis_reticular",
        predicate: |v| v.edge_density > 0.35 && v.medium_ratio > 0.4,
        effects: &[Set(PathologyId::Fibrosis, 0.45)],
    },
    PathologyRule {
        name: "hemorrhage_dense_focus",
        predicate: |v| v.bright_ratio > 0.15 && v.dark_ratio > 0.5 && v.contrast > 0.45,
        effects: &[
            Set(PathologyId::Hemorrhage, 0.40),
            Set(PathologyId::Stroke, 0.35),
        ],
    },
    PathologyRule {
        name: "normal_pattern",
        predicate: |v| v.indicators.normal && v.edge_density < 0.2,
        effects: &[Set(PathologyId::Normal, 0.60)],
    },
];

/// Evaluate every rule against `visual` and rank the result.
pub fn score_pathologies(visual: &VisualFeatures, profile: &ThresholdProfile) -> PathologyReport {
    let scale = profile.pathology_weight_scale;
    let mut scores = PathologyScores::zeroed();
    let mut fired_rules = Vec::new();

    for rule in PATHOLOGY_RULES {
        if !(rule.predicate)(visual) {
            continue;
        }
        for effect in rule.effects {
            match *effect {
                Set(id, base) => scores.set(id, base * scale),
                Add(id, base) => scores.add(id, base * scale),
            }
        }
        fired_rules.push(rule.name);
    }

    let top_pathologies = rank_pathologies(&scores);
    let has_pathology = top_pathologies
        .first()
        .is_some_and(|top| top.score > HAS_PATHOLOGY_THRESHOLD);

    debug!(
        fired = fired_rules.len(),
        top = ?top_pathologies.first().map(|t| t.pathology),
        has_pathology,
        "Pathology rules evaluated"
    );

    PathologyReport {
        scores,
        top_pathologies,
        has_pathology,
        fired_rules,
    }
}

/// Entries above the minimum, descending. Equal scores keep taxonomy order.
pub fn rank_pathologies(scores: &PathologyScores) -> Vec<RankedPathology> {
    let mut ranked: Vec<RankedPathology> = scores
        .iter()
        .filter(|(_, score)| *score > TOP_PATHOLOGY_MIN_SCORE)
        .map(|(pathology, score)| RankedPathology { pathology, score })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(TOP_PATHOLOGY_LIMIT);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::visual::detect_indicators;

    fn visual(dark: f64, bright: f64, contrast: f64, edge_density: f64) -> VisualFeatures {
        let medium = 1.0 - dark - bright;
        VisualFeatures {
            brightness: 100.0,
            contrast,
            edge_density,
            histogram: vec![0; 256],
            dark_ratio: dark,
            bright_ratio: bright,
            medium_ratio: medium,
            indicators: detect_indicators(dark, bright, medium, contrast),
        }
    }

    fn perfect() -> ThresholdProfile {
        ThresholdProfile::perfect()
    }

    #[test]
    fn pneumonia_pattern_sets_base_scores() {
        let report = score_pathologies(&visual(0.5, 0.1, 0.45, 0.1), &perfect());
        assert_eq!(report.scores.get(PathologyId::Pneumonia), 0.75);
        assert_eq!(report.scores.get(PathologyId::Consolidation), 0.45);
        assert_eq!(report.top().unwrap().pathology, PathologyId::Pneumonia);
        assert!(report.has_pathology);
        assert_eq!(report.fired_rules[0], "pneumonia_pattern");
    }

    #[test]
    fn effusion_pattern() {
        let report = score_pathologies(&visual(0.85, 0.0, 0.2, 0.05), &perfect());
        assert_eq!(report.scores.get(PathologyId::PleuralEffusion), 0.70);
        assert_eq!(report.scores.get(PathologyId::Atelectasis), 0.40);
        // dark > 0.7 with no bright pixels also reads as hyperlucent
        assert_eq!(report.scores.get(PathologyId::Emphysema), 0.60);
        assert_eq!(report.top().unwrap().pathology, PathologyId::PleuralEffusion);
    }

    #[test]
    fn add_effects_stack_on_set_effects() {
        // pneumonia (dark < 0.6, contrast > 0.4) + consolidation (bright > 0.3)
        let report = score_pathologies(&visual(0.3, 0.4, 0.5, 0.1), &perfect());
        assert!((report.scores.get(PathologyId::Consolidation) - 0.65).abs() < 1e-12);
        assert!((report.scores.get(PathologyId::Infiltration) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn clinical_profile_scales_scores() {
        let report = score_pathologies(&visual(0.5, 0.1, 0.45, 0.1), &ThresholdProfile::clinical());
        assert!((report.scores.get(PathologyId::Pneumonia) - 0.675).abs() < 1e-12);
    }

    #[test]
    fn nothing_fires_on_flat_midtone() {
        let report = score_pathologies(&visual(0.0, 0.0, 0.0, 0.0), &perfect());
        assert!(report.fired_rules.is_empty());
        assert!(report.top_pathologies.is_empty());
        assert!(!report.has_pathology);
    }

    #[test]
    fn top_list_is_bounded_sorted_and_filtered() {
        // Many rules at once: pneumonia, consolidation, nodule, mass, fibrosis
        let report = score_pathologies(&visual(0.1, 0.45, 0.7, 0.5), &perfect());
        let top = &report.top_pathologies;
        assert!(top.len() <= TOP_PATHOLOGY_LIMIT);
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(top.iter().all(|t| t.score > TOP_PATHOLOGY_MIN_SCORE));
    }

    #[test]
    fn ranking_drops_threshold_scores_and_keeps_order_on_ties() {
        let mut scores = PathologyScores::zeroed();
        scores.set(PathologyId::Edema, 0.3);
        scores.set(PathologyId::Nodule, 0.5);
        scores.set(PathologyId::Atelectasis, 0.5);
        scores.set(PathologyId::Mass, 0.9);
        let ranked = rank_pathologies(&scores);
        let ids: Vec<PathologyId> = ranked.iter().map(|r| r.pathology).collect();
        assert_eq!(
            ids,
            vec![PathologyId::Mass, PathologyId::Atelectasis, PathologyId::Nodule]
        );
    }

    #[test]
    fn ranking_caps_at_five() {
        let mut scores = PathologyScores::zeroed();
        for (i, id) in PathologyId::ALL.iter().enumerate() {
            scores.set(*id, 0.31 + i as f64 * 0.01);
        }
        let ranked = rank_pathologies(&scores);
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].pathology, PathologyId::Normal);
    }

    #[test]
    fn has_pathology_requires_top_above_half() {
        let mut scores = PathologyScores::zeroed();
        scores.set(PathologyId::Fibrosis, 0.45);
        let ranked = rank_pathologies(&scores);
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].score <= HAS_PATHOLOGY_THRESHOLD);
    }
}
