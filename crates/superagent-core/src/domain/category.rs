//! App categories used to pick E2E check routines and fallback checklists.

use serde::{Deserialize, Serialize};

/// Known web-app categories.
///
/// `Unknown` is explicit: it maps to the generic interaction routine rather
/// than silently borrowing another category's checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppCategory {
    Calculator,
    Todo,
    Dashboard,
    Game,
    Unknown,
}

const CALCULATOR_WORDS: &[&str] = &["calculator", "calc "];
const TODO_WORDS: &[&str] = &["todo", "to-do", "to do list", "task", "checklist"];
const DASHBOARD_WORDS: &[&str] = &["dashboard", "analytics", "admin panel", "metrics"];
const GAME_WORDS: &[&str] = &[
    "game",
    "snake",
    "tetris",
    "tic-tac-toe",
    "tic tac toe",
    "pong",
    "puzzle",
    "chess",
    "breakout",
];

impl AppCategory {
    /// Classify free text (an instruction or an app-type label).
    pub fn classify(text: &str) -> Self {
        let text = format!("{} ", text.to_lowercase());
        let hit = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if hit(CALCULATOR_WORDS) {
            AppCategory::Calculator
        } else if hit(TODO_WORDS) {
            AppCategory::Todo
        } else if hit(DASHBOARD_WORDS) {
            AppCategory::Dashboard
        } else if hit(GAME_WORDS) {
            AppCategory::Game
        } else {
            AppCategory::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppCategory::Calculator => "calculator",
            AppCategory::Todo => "todo",
            AppCategory::Dashboard => "dashboard",
            AppCategory::Game => "game",
            AppCategory::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_categories() {
        assert_eq!(
            AppCategory::classify("build an advanced scientific calculator"),
            AppCategory::Calculator
        );
        assert_eq!(AppCategory::classify("a To-Do list"), AppCategory::Todo);
        assert_eq!(AppCategory::classify("task tracker"), AppCategory::Todo);
        assert_eq!(
            AppCategory::classify("sales analytics dashboard"),
            AppCategory::Dashboard
        );
        assert_eq!(AppCategory::classify("classic snake"), AppCategory::Game);
    }

    #[test]
    fn test_unknown_is_explicit() {
        assert_eq!(
            AppCategory::classify("simple landing page"),
            AppCategory::Unknown
        );
    }

    #[test]
    fn test_calculator_wins_over_game() {
        assert_eq!(
            AppCategory::classify("calculator game for kids"),
            AppCategory::Calculator
        );
    }
}
