//! Formatting configuration for rendered change sets.

use serde::{Deserialize, Serialize};

/// Tokens used when rendering a change set as a single line.
///
/// Each field renders as `<field><colon><old><arrow><new>` and fields are
/// joined with `separator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeFormat {
    /// Placed between the field name and the values (default: `": "`).
    pub colon: String,
    /// Placed between the old and the new value (default: `" → "`).
    pub arrow: String,
    /// Placed between fields (default: `"; "`).
    pub separator: String,
}

impl Default for ChangeFormat {
    fn default() -> Self {
        Self {
            colon: ": ".into(),
            arrow: " \u{2192} ".into(),
            separator: "; ".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let format: ChangeFormat = serde_json::from_str(r#"{"arrow": " -> "}"#).unwrap();
        assert_eq!(format.colon, ": ");
        assert_eq!(format.arrow, " -> ");
        assert_eq!(format.separator, "; ");
    }
}
