//! Style values consumed by the renderer and by highlight params

use std::collections::BTreeMap;

/// Style key of the focus highlight colour
pub const FOCUS_COLOR: &str = "focusColor";
/// Style key of the highlight given to freshly added nodes
pub const NEW_NODE_COLOR: &str = "newNodeColor";

/// Node param the renderer reads every highlight from, whichever style
/// supplied the colour. The renderer shares the focus style key for it.
pub const FOCUS_PARAM: &str = FOCUS_COLOR;

const DEFAULT_FOCUS_COLOR: &str = "#f55d42";
const DEFAULT_NEW_NODE_COLOR: &str = "#4cff30";

/// Named style values; overrides merge over the defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTable {
    values: BTreeMap<String, String>,
}

impl Default for StyleTable {
    fn default() -> Self {
        let values = [
            (FOCUS_COLOR, DEFAULT_FOCUS_COLOR),
            (NEW_NODE_COLOR, DEFAULT_NEW_NODE_COLOR),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { values }
    }
}

impl StyleTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn focus_color(&self) -> &str {
        self.get(FOCUS_COLOR).unwrap_or(DEFAULT_FOCUS_COLOR)
    }

    pub fn new_node_color(&self) -> &str {
        self.get(NEW_NODE_COLOR).unwrap_or(DEFAULT_NEW_NODE_COLOR)
    }

    /// Add or replace entries
    pub fn merge(&mut self, overrides: impl IntoIterator<Item = (String, String)>) {
        self.values.extend(overrides);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
