use serde::{Deserialize, Serialize};
use std::fmt;

/// Override priority of a layer. Ordering follows priority: builtin < custom < app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerLevel {
    /// Defaults shipped with the binary
    Builtin,
    /// Optional deployment-wide customization
    Custom,
    /// Per-tenant overlay, the only editable level
    App,
}

impl LayerLevel {
    /// Levels in ascending priority.
    pub const ASCENDING: [LayerLevel; 3] = [LayerLevel::Builtin, LayerLevel::Custom, LayerLevel::App];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerLevel::Builtin => "builtin",
            LayerLevel::Custom => "custom",
            LayerLevel::App => "app",
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, LayerLevel::App)
    }
}

impl fmt::Display for LayerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
