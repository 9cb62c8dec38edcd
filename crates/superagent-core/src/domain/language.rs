//! Target language normalisation.

use serde::{Deserialize, Serialize};

/// Languages the pipeline knows how to plan, install and test for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Html,
    Python,
    JavaScript,
    TypeScript,
    Other,
}

impl Language {
    /// Parse a user-supplied language hint. Returns `None` for empty or `auto`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim().to_ascii_lowercase();
        let lang = match hint.as_str() {
            "" | "auto" => return None,
            "html" | "web" | "html5" => Self::Html,
            "python" | "py" | "python3" => Self::Python,
            "javascript" | "js" | "node" | "nodejs" | "node.js" => Self::JavaScript,
            "typescript" | "ts" => Self::TypeScript,
            _ => Self::Other,
        };
        Some(lang)
    }

    /// Classify an already-normalised language string.
    pub fn of(language: &str) -> Self {
        Self::from_hint(language).unwrap_or(Self::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Other => "other",
        }
    }

    /// Whether dependencies are managed through npm.
    pub fn is_node(&self) -> bool {
        matches!(self, Self::JavaScript | Self::TypeScript)
    }
}

/// Normalise a language hint, keeping unknown names verbatim (lower-cased).
pub fn normalize(hint: &str) -> Option<String> {
    match Language::from_hint(hint)? {
        Language::Other => Some(hint.trim().to_ascii_lowercase()),
        known => Some(known.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hint_aliases() {
        assert_eq!(Language::from_hint("JS"), Some(Language::JavaScript));
        assert_eq!(Language::from_hint("node"), Some(Language::JavaScript));
        assert_eq!(Language::from_hint("py"), Some(Language::Python));
        assert_eq!(Language::from_hint("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_hint(" html "), Some(Language::Html));
    }

    #[test]
    fn test_auto_and_empty_are_unset() {
        assert_eq!(Language::from_hint("auto"), None);
        assert_eq!(Language::from_hint("   "), None);
    }

    #[test]
    fn test_normalize_keeps_unknown() {
        assert_eq!(normalize("Go").as_deref(), Some("go"));
        assert_eq!(normalize("nodejs").as_deref(), Some("javascript"));
        assert_eq!(normalize("auto"), None);
    }
}
