//! # Render Configuration
//!
//! Per-tracker presentation settings. The host loads these once at
//! startup (typically from the tracker's TOML config) and shares the
//! value read-only across requests.

use serde::{Deserialize, Serialize};

// =============================================================================
// HTML FLAVOR
// =============================================================================

/// Which markup dialect form fragments are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlFlavor {
    /// `<input ...>` — void elements unclosed.
    #[default]
    Html4,
    /// `<input .../>` — void elements self-closed.
    Xhtml,
}

// =============================================================================
// RENDER CONFIG
// =============================================================================

/// Presentation settings consumed by the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Tracker display name, used in page titles.
    pub tracker_name: String,
    /// Markup dialect for emitted form fragments.
    pub html_flavor: HtmlFlavor,
    /// Timezone for date display, whole hours east of UTC.
    pub timezone_offset: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tracker_name: "Warren".to_string(),
            html_flavor: HtmlFlavor::Html4,
            timezone_offset: 0,
        }
    }
}

impl RenderConfig {
    /// Parse from a TOML document. Unknown keys are rejected so a typo in
    /// the tracker config surfaces at startup, not as a silent default.
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.html_flavor, HtmlFlavor::Html4);
        assert_eq!(cfg.timezone_offset, 0);
    }

    #[test]
    fn from_toml_partial() {
        let cfg = RenderConfig::from_toml(
            "tracker_name = \"Burrow\"\nhtml_flavor = \"xhtml\"\ntimezone_offset = 10\n",
        )
        .expect("parse");
        assert_eq!(cfg.tracker_name, "Burrow");
        assert_eq!(cfg.html_flavor, HtmlFlavor::Xhtml);
        assert_eq!(cfg.timezone_offset, 10);
    }

    #[test]
    fn from_toml_rejects_unknown_keys() {
        assert!(RenderConfig::from_toml("tracker_nam = \"x\"\n").is_err());
    }
}
