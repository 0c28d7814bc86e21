//! License values and lookup status reporting
//!
//! A [`License`] is what a finder produces for a module. "No license" is
//! `None` at the call site, distinct from a failed lookup (an error).
//!
//! Status events let finders and translators report progress while they
//! run. Listeners are passed explicitly as `Option<&dyn StatusListener>`;
//! a `None` listener makes every update a no-op.

pub mod classifier;
pub mod spdx;

pub use classifier::{Classification, LicenseClassifier, DETECTION_THRESHOLD};

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── License ───────────────────────────────────────────────────────

/// A software license as reported by a finder. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Human-friendly name like "MIT License"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// SPDX identifier, absent if unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spdx_id: Option<String>,
    /// Where the license text can be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Full license text when the source provided it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl License {
    pub fn new(name: impl Into<String>, spdx_id: impl Into<String>) -> Self {
        Self {
            name: non_empty(name.into()),
            spdx_id: non_empty(spdx_id.into()),
            url: None,
            text: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = non_empty(url.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = non_empty(text.into());
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn spdx_id(&self) -> &str {
        self.spdx_id.as_deref().unwrap_or("")
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.spdx_id) {
            (Some(name), Some(id)) => write!(f, "{} ({})", name, id),
            (Some(name), None) => write!(f, "{}", name),
            (None, Some(id)) => write!(f, "{}", id),
            (None, None) => f.write_str(NOT_FOUND),
        }
    }
}

const NOT_FOUND: &str = "<license not found or detected>";

/// Display text for an optional license.
pub fn describe(license: Option<&License>) -> String {
    license
        .map(|l| l.to_string())
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

// ─── Status ────────────────────────────────────────────────────────

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Normal,
    Warning,
    Error,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Receives progress messages from a lookup.
///
/// `update` must not block: it runs inline on the lookup task. A listener
/// that needs to do slow work should hand the event off (e.g. over a
/// channel) and return. Messages are short (around 50 characters) so they
/// fit on one terminal line.
pub trait StatusListener: Send + Sync {
    fn update(&self, kind: StatusKind, message: &str);
}

/// Send a status message to `listener`, if there is one.
pub fn update_status(listener: Option<&dyn StatusListener>, kind: StatusKind, message: &str) {
    if let Some(listener) = listener {
        listener.update(kind, message);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingListener;
    use super::*;

    #[test]
    fn test_update_status_without_listener() {
        // Must be a silent no-op
        update_status(None, StatusKind::Normal, "hello");
    }

    #[test]
    fn test_update_status_forwards() {
        let listener = RecordingListener::default();
        update_status(Some(&listener), StatusKind::Normal, "hello");
        update_status(Some(&listener), StatusKind::Warning, "warning");

        assert_eq!(
            listener.events(),
            vec![
                (StatusKind::Normal, "hello".to_string()),
                (StatusKind::Warning, "warning".to_string()),
            ]
        );
    }

    #[test]
    fn test_license_display() {
        assert_eq!(License::new("MIT License", "MIT").to_string(), "MIT License (MIT)");
        assert_eq!(License::new("", "MIT").to_string(), "MIT");
        assert_eq!(License::new("Custom", "").to_string(), "Custom");
        assert_eq!(describe(None), "<license not found or detected>");
    }

    #[test]
    fn test_license_empty_fields_are_absent() {
        let lic = License::new("", "").with_url("").with_text("");
        assert_eq!(lic, License::default());
    }
}
