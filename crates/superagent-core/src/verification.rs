//! Post-generation code verification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Language;

/// Verifier verdict for one file. `score` is 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub score: f64,
    pub issues: Vec<String>,
}

/// Code verification collaborator.
#[async_trait]
pub trait CodeVerifier: Send + Sync {
    async fn verify_code(&self, code: &str, language: &str, instruction: &str) -> Verification;
}

const PLACEHOLDERS: &[&str] = &[
    "todo",
    "fixme",
    "your code here",
    "implement this",
    "not implemented",
    "lorem ipsum",
    "placeholder implementation",
];

/// Deduction-based heuristics for hallucinated or truncated output.
#[derive(Debug, Clone, Default)]
pub struct HeuristicCodeVerifier;

impl HeuristicCodeVerifier {
    pub fn verify(&self, code: &str, language: &str, instruction: &str) -> Verification {
        if code.trim().is_empty() {
            return Verification {
                score: 0.0,
                issues: vec!["file is empty".to_string()],
            };
        }

        let mut score = 100.0_f64;
        let mut issues = Vec::new();

        if code.contains("```") {
            score -= 20.0;
            issues.push("markdown fence left in code".to_string());
        }

        let lower = code.to_lowercase();
        let placeholders: Vec<&str> = PLACEHOLDERS
            .iter()
            .copied()
            .filter(|p| lower.contains(p))
            .collect();
        if !placeholders.is_empty() {
            score -= (placeholders.len() as f64 * 10.0).min(30.0);
            issues.push(format!("placeholder text: {}", placeholders.join(", ")));
        }

        for (open, close) in [('{', '}'), ('(', ')'), ('[', ']')] {
            let opened = code.matches(open).count();
            let closed = code.matches(close).count();
            if opened != closed {
                score -= 15.0;
                issues.push(format!(
                    "unbalanced '{}{}': {} open, {} close",
                    open, close, opened, closed
                ));
            }
        }

        if Language::of(language) == Language::Html {
            if !lower.contains("<html") || !lower.contains("</html>") {
                score -= 10.0;
                issues.push("missing <html> element".to_string());
            }
            if !lower.contains("<body") {
                score -= 5.0;
                issues.push("missing <body> element".to_string());
            }
        }

        let request_words: Vec<String> = instruction
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 5)
            .map(str::to_string)
            .collect();
        if !request_words.is_empty() && !request_words.iter().any(|w| lower.contains(w.as_str())) {
            score -= 10.0;
            issues.push("code never mentions the requested app".to_string());
        }

        Verification {
            score: score.clamp(0.0, 100.0),
            issues,
        }
    }
}

#[async_trait]
impl CodeVerifier for HeuristicCodeVerifier {
    async fn verify_code(&self, code: &str, language: &str, instruction: &str) -> Verification {
        self.verify(code, language, instruction)
    }
}
