use std::collections::BTreeSet;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

// ═══════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════

/// Imaging modality the ensemble can assign.
///
/// Declaration order is significant: it is the tie-break order for the
/// final arg-max (first declared wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModalityId {
    ChestXray,
    BrainMri,
    CtScan,
    Ultrasound,
    BoneXray,
    AbdominalCt,
    Mammography,
    DentalXray,
    SpineXray,
}

impl ModalityId {
    pub const COUNT: usize = 9;

    pub const ALL: [ModalityId; Self::COUNT] = [
        Self::ChestXray,
        Self::BrainMri,
        Self::CtScan,
        Self::Ultrasound,
        Self::BoneXray,
        Self::AbdominalCt,
        Self::Mammography,
        Self::DentalXray,
        Self::SpineXray,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChestXray => "chest-xray",
            Self::BrainMri => "brain-mri",
            Self::CtScan => "ct-scan",
            Self::Ultrasound => "ultrasound",
            Self::BoneXray => "bone-xray",
            Self::AbdominalCt => "abdominal-ct",
            Self::Mammography => "mammography",
            Self::DentalXray => "dental-xray",
            Self::SpineXray => "spine-xray",
        }
    }
}

impl std::fmt::Display for ModalityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final modality decision.
///
/// `Unknown` when neither a filename pattern nor a feature rule fired. This is
/// narrower than "no contribution at all": anatomical and pathology bonuses
/// fire on nearly any frame (a flat gray square is centred and symmetric), so
/// a bonus-only score table still resolves to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedModality {
    Known(ModalityId),
    Unknown,
}

impl DetectedModality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Known(id) => id.as_str(),
            Self::Unknown => "unknown",
        }
    }
}

impl Serialize for DetectedModality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for DetectedModality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate finding in the fixed pathology taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathologyId {
    Pneumonia,
    Atelectasis,
    Cardiomegaly,
    PleuralEffusion,
    Pneumothorax,
    Consolidation,
    Edema,
    Emphysema,
    Fibrosis,
    Nodule,
    Mass,
    Infiltration,
    Stroke,
    Tumor,
    Hemorrhage,
    Normal,
}

impl PathologyId {
    pub const COUNT: usize = 16;

    pub const ALL: [PathologyId; Self::COUNT] = [
        Self::Pneumonia,
        Self::Atelectasis,
        Self::Cardiomegaly,
        Self::PleuralEffusion,
        Self::Pneumothorax,
        Self::Consolidation,
        Self::Edema,
        Self::Emphysema,
        Self::Fibrosis,
        Self::Nodule,
        Self::Mass,
        Self::Infiltration,
        Self::Stroke,
        Self::Tumor,
        Self::Hemorrhage,
        Self::Normal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Findings read off a chest radiograph. A top finding in this set
    /// biases the ensemble toward `chest-xray`.
    pub fn is_chest_associated(self) -> bool {
        !matches!(
            self,
            Self::Stroke | Self::Tumor | Self::Hemorrhage | Self::Normal
        )
    }
}

// ═══════════════════════════════════════════════════════════
// Feature records
// ═══════════════════════════════════════════════════════════

/// Boolean pattern flags derived from brightness ratios and contrast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PathologyIndicators {
    /// Mostly non-dark field with strong contrast (patchy opacities).
    pub pneumonia: bool,
    /// Very dark, flat field.
    pub pleural_effusion: bool,
    /// Dominant mid-tones with a bright central band.
    pub cardiomegaly: bool,
    /// Large bright fraction at high contrast.
    pub consolidation: bool,
    /// Balanced lung-field exposure with moderate contrast.
    pub normal: bool,
}

impl PathologyIndicators {
    pub fn any(&self) -> bool {
        self.pneumonia || self.pleural_effusion || self.cardiomegaly || self.consolidation || self.normal
    }
}

/// Whole-image brightness statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualFeatures {
    /// Mean per-pixel brightness (0-255).
    pub brightness: f64,
    /// Brightness standard deviation / 128, clamped to [0, 1].
    pub contrast: f64,
    /// Fraction of pixels whose red channel jumps against the next pixel.
    pub edge_density: f64,
    /// 256-bin brightness histogram (pixel counts).
    pub histogram: Vec<u64>,
    pub dark_ratio: f64,
    pub bright_ratio: f64,
    pub medium_ratio: f64,
    pub indicators: PathologyIndicators,
}

impl Default for VisualFeatures {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            edge_density: 0.0,
            histogram: vec![0; 256],
            dark_ratio: 0.0,
            bright_ratio: 0.0,
            medium_ratio: 0.0,
            indicators: PathologyIndicators::default(),
        }
    }
}

/// Brightness-squared weighted centroid, normalized to [0, 1] per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CenterMass {
    pub x: f64,
    pub y: f64,
}

/// Shape predicates over aspect ratio, symmetry and mass placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnatomicalFlags {
    /// Aspect ratio in (1.2, 1.8).
    pub chest_like: bool,
    /// Near-square and left-right symmetric.
    pub brain_like: bool,
    /// Tall, narrow, roughly symmetric.
    pub spine_like: bool,
    /// Wide panoramic strip.
    pub dental_like: bool,
    /// Portrait frame with mass pushed to one side.
    pub mammography_like: bool,
    /// Centroid close to the frame centre.
    pub centered_mass: bool,
    /// Bilateral symmetry above 0.85.
    pub high_symmetry: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralFeatures {
    pub aspect_ratio: f64,
    pub center_mass: CenterMass,
    pub bilateral_symmetry: f64,
    pub vertical_symmetry: f64,
    pub anatomy: AnatomicalFlags,
}

impl Default for StructuralFeatures {
    fn default() -> Self {
        Self {
            aspect_ratio: 0.0,
            center_mass: CenterMass::default(),
            bilateral_symmetry: 0.0,
            vertical_symmetry: 0.0,
            anatomy: AnatomicalFlags::default(),
        }
    }
}

/// Categorical texture labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextureTag {
    HighDetail,
    ComplexTexture,
    Noisy,
    ArtifactPresent,
    Smooth,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextureFeatures {
    /// Mean absolute neighbour difference over sampled centres.
    pub roughness: f64,
    pub uniformity: f64,
    /// Mean variance of the 8 neighbour differences.
    pub local_variance: f64,
    pub texture_complexity: f64,
    pub tags: BTreeSet<TextureTag>,
}

impl TextureFeatures {
    pub fn has_tag(&self, tag: TextureTag) -> bool {
        self.tags.contains(&tag)
    }
}

// ═══════════════════════════════════════════════════════════
// Score tables
// ═══════════════════════════════════════════════════════════

/// Serializes parallel key/value slices as a map in slice order.
struct OrderedTable<'a, K>(&'a [K], &'a [f64]);

impl<K: Serialize> Serialize for OrderedTable<'_, K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0.iter().zip(self.1) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Ensemble stage a contribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStage {
    Filename,
    FeatureRule,
    AnatomicalBonus,
    PathologyCorrelation,
}

/// One rule's addition to one modality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreContribution {
    pub stage: ScoreStage,
    pub rule: &'static str,
    pub modality: ModalityId,
    pub amount: f64,
}

/// Immutable per-modality score snapshot plus the trace that produced it.
///
/// Stages never mutate a snapshot in place; `with_contributions` returns the
/// next one.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalityScores {
    scores: [f64; ModalityId::COUNT],
    contributions: Vec<ScoreContribution>,
}

impl ModalityScores {
    pub fn zeroed() -> Self {
        Self {
            scores: [0.0; ModalityId::COUNT],
            contributions: Vec::new(),
        }
    }

    pub fn with_contributions<I>(&self, added: I) -> Self
    where
        I: IntoIterator<Item = ScoreContribution>,
    {
        let mut next = self.clone();
        for contribution in added {
            next.scores[contribution.modality.index()] += contribution.amount;
            next.contributions.push(contribution);
        }
        next
    }

    pub fn get(&self, modality: ModalityId) -> f64 {
        self.scores[modality.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModalityId, f64)> + '_ {
        ModalityId::ALL.iter().map(|&m| (m, self.scores[m.index()]))
    }

    pub fn contributions(&self) -> &[ScoreContribution] {
        &self.contributions
    }

    /// True if a filename pattern or feature rule contributed. Anatomical and
    /// pathology bonuses alone are not evidence for any modality, so a table
    /// holding only those still classifies as `Unknown`.
    pub fn has_primary_evidence(&self) -> bool {
        self.contributions
            .iter()
            .any(|c| matches!(c.stage, ScoreStage::Filename | ScoreStage::FeatureRule))
    }

    /// Highest-scoring modality. Ties resolve to the first declared id.
    pub fn best(&self) -> (ModalityId, f64) {
        let mut best = (ModalityId::ALL[0], self.scores[0]);
        for (modality, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (modality, score);
            }
        }
        best
    }
}

impl Default for ModalityScores {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Serialize for ModalityScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ModalityScores", 2)?;
        state.serialize_field("scores", &OrderedTable(&ModalityId::ALL, &self.scores))?;
        state.serialize_field("contributions", &self.contributions)?;
        state.end()
    }
}

/// Probability-like score in [0, 1] per pathology.
#[derive(Debug, Clone, PartialEq)]
pub struct PathologyScores {
    scores: [f64; PathologyId::COUNT],
}

impl PathologyScores {
    pub fn zeroed() -> Self {
        Self {
            scores: [0.0; PathologyId::COUNT],
        }
    }

    pub fn get(&self, pathology: PathologyId) -> f64 {
        self.scores[pathology.index()]
    }

    /// Overwrite a score, clamped to [0, 1].
    pub fn set(&mut self, pathology: PathologyId, value: f64) {
        self.scores[pathology.index()] = value.clamp(0.0, 1.0);
    }

    /// Increment a score, clamped to [0, 1].
    pub fn add(&mut self, pathology: PathologyId, value: f64) {
        let current = self.scores[pathology.index()];
        self.set(pathology, current + value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (PathologyId, f64)> + '_ {
        PathologyId::ALL.iter().map(|&p| (p, self.scores[p.index()]))
    }
}

impl Default for PathologyScores {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Serialize for PathologyScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OrderedTable(&PathologyId::ALL, &self.scores).serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedPathology {
    pub pathology: PathologyId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathologyReport {
    pub scores: PathologyScores,
    /// Scores above 0.3, descending, at most 5.
    pub top_pathologies: Vec<RankedPathology>,
    /// Top score above 0.5.
    pub has_pathology: bool,
    /// Names of the rules that fired, in evaluation order.
    pub fired_rules: Vec<&'static str>,
}

impl PathologyReport {
    pub fn top(&self) -> Option<&RankedPathology> {
        self.top_pathologies.first()
    }
}

// ═══════════════════════════════════════════════════════════
// Results
// ═══════════════════════════════════════════════════════════

/// Final per-image decision handed to the content resolver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub modality: DetectedModality,
    /// Clamped display confidence (profile floor..=cap), not a probability.
    pub confidence: u8,
    /// Unclamped winning ensemble score.
    pub raw_score: f64,
    pub top_pathologies: Vec<RankedPathology>,
    pub has_pathology: bool,
    pub profile: String,
    pub scores: ModalityScores,
}

/// Every intermediate record of one classification call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub visual: VisualFeatures,
    pub structural: StructuralFeatures,
    pub texture: TextureFeatures,
    pub filename_matches: Vec<super::filename::FilenameMatch>,
    pub pathology: PathologyReport,
    pub classification: ClassificationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(modality: ModalityId, amount: f64) -> ScoreContribution {
        ScoreContribution {
            stage: ScoreStage::FeatureRule,
            rule: "test",
            modality,
            amount,
        }
    }

    #[test]
    fn modality_ids_serialize_kebab_case() {
        let json = serde_json::to_string(&ModalityId::AbdominalCt).unwrap();
        assert_eq!(json, "\"abdominal-ct\"");
        for id in ModalityId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    #[test]
    fn pathology_ids_serialize_snake_case() {
        let json = serde_json::to_string(&PathologyId::PleuralEffusion).unwrap();
        assert_eq!(json, "\"pleural_effusion\"");
    }

    #[test]
    fn unknown_modality_serializes_as_string() {
        let json = serde_json::to_string(&DetectedModality::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");
        assert_eq!(DetectedModality::Unknown.to_string(), "unknown");
    }

    #[test]
    fn index_matches_declaration_order() {
        for (i, id) in ModalityId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
        for (i, id) in PathologyId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn with_contributions_leaves_original_untouched() {
        let base = ModalityScores::zeroed();
        let next = base.with_contributions([contribution(ModalityId::BrainMri, 0.4)]);
        assert_eq!(base.get(ModalityId::BrainMri), 0.0);
        assert!(!base.has_primary_evidence());
        assert!(next.has_primary_evidence());
        assert!((next.get(ModalityId::BrainMri) - 0.4).abs() < 1e-12);
        assert_eq!(next.contributions().len(), 1);
    }

    #[test]
    fn bonuses_alone_are_not_primary_evidence() {
        let scores = ModalityScores::zeroed().with_contributions([ScoreContribution {
            stage: ScoreStage::AnatomicalBonus,
            rule: "centered_mass",
            modality: ModalityId::CtScan,
            amount: 0.04,
        }]);
        assert!(!scores.has_primary_evidence());
        assert_eq!(scores.best().0, ModalityId::CtScan);
    }

    #[test]
    fn best_breaks_ties_by_declaration_order() {
        let scores = ModalityScores::zeroed().with_contributions([
            contribution(ModalityId::SpineXray, 0.5),
            contribution(ModalityId::BrainMri, 0.5),
        ]);
        assert_eq!(scores.best().0, ModalityId::BrainMri);
    }

    #[test]
    fn pathology_scores_clamp_to_unit_range() {
        let mut scores = PathologyScores::zeroed();
        scores.set(PathologyId::Mass, 0.8);
        scores.add(PathologyId::Mass, 0.5);
        assert_eq!(scores.get(PathologyId::Mass), 1.0);
        scores.set(PathologyId::Nodule, -0.2);
        assert_eq!(scores.get(PathologyId::Nodule), 0.0);
    }

    #[test]
    fn score_tables_serialize_in_declaration_order() {
        let json = serde_json::to_string(&PathologyScores::zeroed()).unwrap();
        assert!(json.starts_with("{\"pneumonia\":0.0,\"atelectasis\":0.0"));
        assert!(json.ends_with("\"normal\":0.0}"));
    }

    #[test]
    fn chest_association_excludes_neuro_findings() {
        assert!(PathologyId::Pneumonia.is_chest_associated());
        assert!(PathologyId::Infiltration.is_chest_associated());
        assert!(!PathologyId::Stroke.is_chest_associated());
        assert!(!PathologyId::Normal.is_chest_associated());
    }
}
