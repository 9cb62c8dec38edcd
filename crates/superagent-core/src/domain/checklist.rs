//! Structured feature checklist requested from the model before single-file
//! advanced generation.
//!
//! Decoding is strict: the model's reply must parse into [`FeatureChecklist`]
//! and carry at least one feature. Anything else fails closed to the
//! per-category default.

use serde::{Deserialize, Serialize};

use super::category::AppCategory;
use super::text::clean_code_fences;

/// Why a checklist reply was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    #[error("checklist is not valid JSON for the schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("checklist lists no features")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureChecklist {
    pub app_type: String,
    pub features: Vec<String>,
    #[serde(default)]
    pub ui_elements: Vec<String>,
    #[serde(default)]
    pub interactions: Vec<String>,
}

impl FeatureChecklist {
    /// Strictly decode a model reply.
    pub fn decode(raw: &str) -> Result<Self, ChecklistError> {
        let body = clean_code_fences(raw);
        let mut checklist: FeatureChecklist = serde_json::from_str(&body)?;
        checklist.features.retain(|f| !f.trim().is_empty());
        if checklist.features.is_empty() {
            return Err(ChecklistError::Empty);
        }
        Ok(checklist)
    }

    /// Decode, falling back to the category default on any error.
    ///
    /// The boolean reports whether the fallback was used.
    pub fn decode_or_fallback(raw: &str, category: AppCategory) -> (Self, bool) {
        match Self::decode(raw) {
            Ok(checklist) => (checklist, false),
            Err(err) => {
                tracing::warn!(error = %err, category = category.as_str(), "using fallback feature checklist");
                (Self::fallback(category), true)
            }
        }
    }

    /// Hand-written checklist for a category.
    pub fn fallback(category: AppCategory) -> Self {
        match category {
            AppCategory::Calculator => Self::from_lists(
                category,
                &[
                    "Digit buttons 0-9 and a decimal point",
                    "Addition, subtraction, multiplication and division",
                    "Correct operator precedence",
                    "Clear and backspace controls",
                    "Display showing the current input and result",
                    "Graceful division by zero",
                    "Keyboard input support",
                    "Calculation history",
                ],
                &["display", "digit buttons", "operator buttons", "equals button", "clear button"],
                &["click buttons", "type on keyboard", "press Enter to evaluate"],
            ),
            AppCategory::Todo => Self::from_lists(
                category,
                &[
                    "Add a task from a text input",
                    "Mark a task as completed",
                    "Delete a task",
                    "Edit a task in place",
                    "Filter all, active and completed tasks",
                    "Show the count of remaining tasks",
                    "Persist tasks in localStorage",
                ],
                &["task input", "add button", "task list", "filter buttons", "counter"],
                &["type and press Enter", "click checkbox", "click delete"],
            ),
            AppCategory::Dashboard => Self::from_lists(
                category,
                &[
                    "Metric summary cards",
                    "At least one chart",
                    "Sortable data table",
                    "Date range or category filter",
                    "Refresh control",
                    "Responsive grid layout",
                ],
                &["metric cards", "chart", "table", "filter controls"],
                &["change filter", "sort table", "refresh data"],
            ),
            AppCategory::Game => Self::from_lists(
                category,
                &[
                    "Visible game board or canvas",
                    "Start and restart controls",
                    "Score display",
                    "Game over detection",
                    "Keyboard controls",
                    "High score persisted in localStorage",
                ],
                &["game board", "score", "start button"],
                &["press arrow keys", "click start", "click restart"],
            ),
            AppCategory::Unknown => Self::from_lists(
                category,
                &[
                    "Responsive layout",
                    "Interactive controls with visual feedback",
                    "Input validation with clear messages",
                    "Accessible labels for every control",
                    "State persisted in localStorage",
                ],
                &["header", "main content", "buttons", "inputs"],
                &["click buttons", "fill inputs"],
            ),
        }
    }

    fn from_lists(
        category: AppCategory,
        features: &[&str],
        ui_elements: &[&str],
        interactions: &[&str],
    ) -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            app_type: category.as_str().to_string(),
            features: owned(features),
            ui_elements: owned(ui_elements),
            interactions: owned(interactions),
        }
    }

    /// Render as a bullet list for embedding in prompts.
    pub fn render(&self) -> String {
        let mut out = format!("App type: {}\nRequired features:\n", self.app_type);
        for feature in &self.features {
            out.push_str(&format!("- {}\n", feature));
        }
        if !self.ui_elements.is_empty() {
            out.push_str(&format!("UI elements: {}\n", self.ui_elements.join(", ")));
        }
        if !self.interactions.is_empty() {
            out.push_str(&format!("Interactions: {}\n", self.interactions.join(", ")));
        }
        out
    }
}
