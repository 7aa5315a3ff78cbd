//! Filename keyword priors.
//!
//! Each pattern group carries a fixed prior weight and the modalities it
//! votes for. Groups match independently; a name hitting three groups
//! contributes three full weights. No normalization.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::types::ModalityId;

/// A compiled keyword group with the modalities it supports.
struct FilenamePattern {
    label: &'static str,
    regex: Regex,
    modalities: &'static [ModalityId],
    weight: f64,
}

/// A matched keyword group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilenameMatch {
    pub label: &'static str,
    /// The substring that triggered the group.
    pub matched: String,
    pub modalities: &'static [ModalityId],
    pub weight: f64,
}

// Tokens like "ct" and "us" are too short for substring matching, so they
// must stand alone between non-letters.
static FILENAME_PATTERNS: LazyLock<Vec<FilenamePattern>> = LazyLock::new(|| {
    vec![
        pattern(
            "brain",
            r"(?i)brain|mri|neuro|cerebr|cranial|skull|head",
            &[ModalityId::BrainMri],
            0.9,
        ),
        pattern(
            "chest",
            r"(?i)chest|lung|thora[xc]|cxr|pulmon|pneumo",
            &[ModalityId::ChestXray],
            0.9,
        ),
        pattern(
            "ct",
            r"(?i)(?:^|[^a-z])ct(?:[^a-z]|$)|computed|tomograph|cat[_\- ]?scan",
            &[ModalityId::CtScan, ModalityId::AbdominalCt],
            0.85,
        ),
        pattern(
            "abdomen",
            r"(?i)abdom|liver|kidney|renal|pelvi|bowel|pancrea",
            &[ModalityId::AbdominalCt],
            0.85,
        ),
        pattern(
            "ultrasound",
            r"(?i)ultrasound|sonogra|echo|doppler|(?:^|[^a-z])us(?:[^a-z]|$)",
            &[ModalityId::Ultrasound],
            0.85,
        ),
        pattern(
            "bone",
            r"(?i)bone|fractur|femur|tibia|fibula|humerus|wrist|hand|knee|ankle|elbow|skelet|ortho",
            &[ModalityId::BoneXray],
            0.8,
        ),
        pattern(
            "mammography",
            r"(?i)mammo|breast|tomosynth",
            &[ModalityId::Mammography],
            0.9,
        ),
        pattern(
            "dental",
            r"(?i)dental|teeth|tooth|panoram|jaw|molar|bitewing",
            &[ModalityId::DentalXray],
            0.9,
        ),
        pattern(
            "spine",
            r"(?i)spine|spinal|lumbar|cervical|vertebra|sacr",
            &[ModalityId::SpineXray],
            0.85,
        ),
        pattern(
            "radiograph",
            r"(?i)x[_\- ]?ray|radiograph",
            &[ModalityId::ChestXray, ModalityId::BoneXray, ModalityId::SpineXray],
            0.5,
        ),
    ]
});

fn pattern(
    label: &'static str,
    regex_str: &str,
    modalities: &'static [ModalityId],
    weight: f64,
) -> FilenamePattern {
    FilenamePattern {
        label,
        regex: Regex::new(regex_str).expect("Invalid filename regex pattern"),
        modalities,
        weight,
    }
}

/// Every keyword group the file name hits, in table order.
pub fn score_filename(file_name: &str) -> Vec<FilenameMatch> {
    let matches: Vec<FilenameMatch> = FILENAME_PATTERNS
        .iter()
        .filter_map(|p| {
            p.regex.find(file_name).map(|m| FilenameMatch {
                label: p.label,
                matched: m.as_str().to_string(),
                modalities: p.modalities,
                weight: p.weight,
            })
        })
        .collect();

    debug!(
        file_name,
        groups = matches.len(),
        "Filename keywords scored"
    );

    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(name: &str) -> Vec<&'static str> {
        score_filename(name).into_iter().map(|m| m.label).collect()
    }

    #[test]
    fn all_patterns_compile() {
        assert_eq!(FILENAME_PATTERNS.len(), 10);
    }

    #[test]
    fn brain_mri_matches_brain_group_once() {
        let matches = score_filename("brain_mri_scan.png");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].label, "brain");
        assert_eq!(matches[0].modalities, &[ModalityId::BrainMri]);
        assert!((matches[0].weight - 0.9).abs() < 1e-12);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(labels("CHEST_PA.JPG"), vec!["chest"]);
        assert_eq!(labels("Mammo_LCC.tif"), vec!["mammography"]);
    }

    #[test]
    fn no_keywords_no_matches() {
        assert!(score_filename("image_001.png").is_empty());
        assert!(score_filename("").is_empty());
    }

    #[test]
    fn multiple_groups_each_match() {
        assert_eq!(labels("chest_xray_fracture.png"), vec!["chest", "bone", "radiograph"]);
    }

    #[test]
    fn short_tokens_need_boundaries() {
        assert_eq!(labels("abdomen_ct_axial.png"), vec!["ct", "abdomen"]);
        assert_eq!(labels("ct.png"), vec!["ct"]);
        // "ct" inside a word is not a CT hint
        assert!(labels("project_notes.png").is_empty());
        assert_eq!(labels("thyroid_us_1.jpg"), vec!["ultrasound"]);
        assert!(labels("status_report.png").is_empty());
    }

    #[test]
    fn ct_group_votes_for_both_ct_modalities() {
        let matches = score_filename("scan_ct_01.dcm.png");
        let ct = matches.iter().find(|m| m.label == "ct").unwrap();
        assert_eq!(ct.modalities, &[ModalityId::CtScan, ModalityId::AbdominalCt]);
    }
}
