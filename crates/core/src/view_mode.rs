//! View modes select which 2D overlay is drawn over the raymarched field.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// All view mode names, in display order.
const VIEW_NAMES: &[&str] = &["clifford", "zx", "consciousness", "sheaf", "echo"];

/// The unknown-view warning is logged on the first fallback, then once per
/// this many.
pub const FALLBACK_LOG_INTERVAL: u64 = 1000;

static FALLBACKS: AtomicU64 = AtomicU64::new(0);

/// Whether the fallback numbered `count` (from zero) is logged.
fn logs_fallback(count: u64) -> bool {
    count % FALLBACK_LOG_INTERVAL == 0
}

/// Rendering strategy selector.
///
/// Every mode draws the raymarched field; all but `Clifford` add an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Raymarched field only.
    #[default]
    Clifford,
    /// Field plus the graph overlay.
    Zx,
    /// Field plus the metric bars overlay.
    Consciousness,
    /// Field plus the sheaf caption.
    Sheaf,
    /// Field plus the echo caption.
    Echo,
}

impl ViewMode {
    /// Every view mode.
    pub const ALL: [ViewMode; 5] = [
        ViewMode::Clifford,
        ViewMode::Zx,
        ViewMode::Consciousness,
        ViewMode::Sheaf,
        ViewMode::Echo,
    ];

    /// Lowercase name used in JSON and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            ViewMode::Clifford => "clifford",
            ViewMode::Zx => "zx",
            ViewMode::Consciousness => "consciousness",
            ViewMode::Sheaf => "sheaf",
            ViewMode::Echo => "echo",
        }
    }

    /// Parses a name, falling back to `Clifford` when unknown.
    ///
    /// The provider repeats the same view every frame, so the warning is
    /// rate-limited by [`FALLBACK_LOG_INTERVAL`].
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            let count = FALLBACKS.fetch_add(1, Ordering::Relaxed);
            if logs_fallback(count) {
                log::warn!(
                    "unknown view mode '{name}', falling back to clifford ({} fallbacks)",
                    count + 1
                );
            }
            ViewMode::Clifford
        })
    }

    /// Unknown-view fallbacks since process start.
    pub fn fallback_count() -> u64 {
        FALLBACKS.load(Ordering::Relaxed)
    }

    /// Returns a slice of all recognized view mode names.
    pub fn list_names() -> &'static [&'static str] {
        VIEW_NAMES
    }
}

impl FromStr for ViewMode {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| RenderError::Configuration(format!("unknown view mode '{s}'")))
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for mode in ViewMode::ALL {
            assert_eq!(mode.name().parse::<ViewMode>().unwrap(), mode);
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!("hologram".parse::<ViewMode>().is_err());
    }

    #[test]
    fn unknown_name_falls_back_to_clifford() {
        assert_eq!(ViewMode::from_name_or_default("hologram"), ViewMode::Clifford);
        assert_eq!(ViewMode::from_name_or_default("echo"), ViewMode::Echo);
    }

    #[test]
    fn fallback_warning_is_rate_limited() {
        assert!(logs_fallback(0));
        assert!(!logs_fallback(1));
        assert!(!logs_fallback(FALLBACK_LOG_INTERVAL - 1));
        assert!(logs_fallback(FALLBACK_LOG_INTERVAL));
        let logged = (0..5 * FALLBACK_LOG_INTERVAL)
            .filter(|&n| logs_fallback(n))
            .count();
        assert_eq!(logged, 5);
    }

    #[test]
    fn fallbacks_are_counted() {
        let before = ViewMode::fallback_count();
        for _ in 0..3 {
            assert_eq!(ViewMode::from_name_or_default("hologram"), ViewMode::Clifford);
        }
        assert_eq!(ViewMode::from_name_or_default("zx"), ViewMode::Zx);
        // Other tests may fall back concurrently.
        assert!(ViewMode::fallback_count() >= before + 3);
    }

    #[test]
    fn list_names_matches_all() {
        let names: Vec<&str> = ViewMode::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(names, ViewMode::list_names());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ViewMode::Consciousness).unwrap();
        assert_eq!(json, "\"consciousness\"");
        let mode: ViewMode = serde_json::from_str("\"zx\"").unwrap();
        assert_eq!(mode, ViewMode::Zx);
    }

    #[test]
    fn default_is_clifford() {
        assert_eq!(ViewMode::default(), ViewMode::Clifford);
    }
}
