//! Layout configuration
//!
//! Field names deserialize from the camelCase keys the authoring UI stores
//! (`nodeSize`, `rankSeparation`, ...). Missing keys fall back to defaults.

use serde::{Deserialize, Deserializer, Serialize};

/// Which layout pipeline `GraphStore::layout` runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMethod {
    /// Whole-graph layered layout
    #[default]
    #[serde(alias = "default")]
    Flat,
    /// Concepts laid out per module, modules laid out as a graph
    ModuleWise,
}

/// Direction ranks flow in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankDirection {
    /// Top to bottom
    TB,
    /// Bottom to top (prerequisites below the concepts that need them)
    #[default]
    BT,
    /// Left to right
    LR,
    /// Right to left
    RL,
}

impl RankDirection {
    /// Ranks advance along the x axis
    pub fn is_horizontal(&self) -> bool {
        matches!(self, RankDirection::LR | RankDirection::RL)
    }
}

/// Anchor for nodes within a rank; `None` centers every rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    UL,
    UR,
    DL,
    DR,
}

impl Alignment {
    fn anchors_left(&self) -> bool {
        matches!(self, Alignment::UL | Alignment::DL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ranker {
    /// Longest path, then each node pulled toward its successors
    #[default]
    TightTree,
    /// Every node on the earliest rank its predecessors allow
    LongestPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acyclicer {
    /// Eades-Lin-Smyth greedy feedback arc set
    #[default]
    Greedy,
    /// Reverse DFS back edges
    Dfs,
}

/// Treat `""` as "no alignment", as stored by the authoring UI
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Alignment>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("UL") => Ok(Some(Alignment::UL)),
        Some("UR") => Ok(Some(Alignment::UR)),
        Some("DL") => Ok(Some(Alignment::DL)),
        Some("DR") => Ok(Some(Alignment::DR)),
        Some(other) => Err(serde::de::Error::unknown_variant(
            other,
            &["", "UL", "UR", "DL", "DR"],
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub method: LayoutMethod,
    /// Width and height of a concept box
    pub node_size: f64,
    /// In-rank gap, as a multiple of `node_size`
    pub node_separation: f64,
    /// Gap between ranks, as a multiple of `node_size`
    pub rank_separation: f64,
    /// Module box width multiplier in module-aware layout
    pub group_scaling_x: f64,
    /// Module box height multiplier in module-aware layout
    pub group_scaling_y: f64,
    pub direction: RankDirection,
    #[serde(deserialize_with = "empty_as_none")]
    pub alignment: Option<Alignment>,
    pub ranker: Ranker,
    pub acyclicer: Acyclicer,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            method: LayoutMethod::Flat,
            node_size: 30.0,
            node_separation: 2.0,
            rank_separation: 2.0,
            group_scaling_x: 1.25,
            group_scaling_y: 2.0,
            direction: RankDirection::BT,
            alignment: None,
            ranker: Ranker::TightTree,
            acyclicer: Acyclicer::Greedy,
        }
    }
}

impl LayoutConfig {
    pub fn with_method(mut self, method: LayoutMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_direction(mut self, direction: RankDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_ranker(mut self, ranker: Ranker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_acyclicer(mut self, acyclicer: Acyclicer) -> Self {
        self.acyclicer = acyclicer;
        self
    }

    pub fn with_alignment(mut self, alignment: Option<Alignment>) -> Self {
        self.alignment = alignment;
        self
    }

    /// Gap between neighbours in a rank
    pub fn node_gap(&self) -> f64 {
        self.node_size * self.node_separation
    }

    /// Gap between consecutive ranks
    pub fn rank_gap(&self) -> f64 {
        self.node_size * self.rank_separation
    }

    pub(crate) fn anchors_left(&self) -> Option<bool> {
        self.alignment.map(|a| a.anchors_left())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.method, LayoutMethod::Flat);
        assert_eq!(config.direction, RankDirection::BT);
        assert_eq!(config.node_gap(), 60.0);
        assert_eq!(config.rank_gap(), 60.0);
        assert_eq!(config.alignment, None);
    }

    #[test]
    fn test_deserialize_ui_keys() {
        let config: LayoutConfig = serde_json::from_str(
            r#"{
                "method": "module-wise",
                "nodeSize": 40,
                "groupScalingX": 1.5,
                "direction": "LR",
                "alignment": "",
                "ranker": "longest-path",
                "acyclicer": "dfs"
            }"#,
        )
        .unwrap();

        assert_eq!(config.method, LayoutMethod::ModuleWise);
        assert_eq!(config.node_size, 40.0);
        assert_eq!(config.group_scaling_x, 1.5);
        assert_eq!(config.group_scaling_y, 2.0);
        assert_eq!(config.direction, RankDirection::LR);
        assert_eq!(config.alignment, None);
        assert_eq!(config.ranker, Ranker::LongestPath);
        assert_eq!(config.acyclicer, Acyclicer::Dfs);
    }

    #[test]
    fn test_default_method_alias() {
        let config: LayoutConfig = serde_json::from_str(r#"{"method":"default","alignment":"UL"}"#).unwrap();
        assert_eq!(config.method, LayoutMethod::Flat);
        assert_eq!(config.alignment, Some(Alignment::UL));
    }

    #[test]
    fn test_unknown_alignment_rejected() {
        assert!(serde_json::from_str::<LayoutConfig>(r#"{"alignment":"XX"}"#).is_err());
    }
}
