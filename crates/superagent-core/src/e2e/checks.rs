//! Per-category interaction routines and feature coverage.

use tracing::debug;

use super::{E2eError, E2eReport, PageDriver};
use crate::domain::AppCategory;

const BUTTONS: &str = "button, input[type=button], input[type=submit], [role=button]";
const INTERACTIVE: &str =
    "button, input, select, textarea, a[href], [onclick], [role=button], canvas";
const DISPLAYS: &[&str] = &[
    "#display",
    ".display",
    "#result",
    ".result",
    "#screen",
    ".screen",
    "#output",
    "output",
    "input[readonly]",
    "[class*=display]",
];

const CLEAR: &[&str] = &["C", "AC", "CE", "Clear", "CLR"];
const PLUS: &[&str] = &["+"];
const MINUS: &[&str] = &["−", "-", "–"];
const TIMES: &[&str] = &["×", "*", "x", "X", "✕"];
const DIVIDE: &[&str] = &["÷", "/"];
const EQUALS: &[&str] = &["=", "Enter"];

const TODO_TEXT: &str = "Buy milk e2e";

/// Pass/fail ledger for one run.
#[derive(Debug, Default)]
pub struct CheckLog {
    passed: Vec<String>,
    failed: Vec<String>,
    critical: Vec<String>,
}

impl CheckLog {
    pub fn pass(&mut self, name: impl Into<String>) {
        self.passed.push(name.into());
    }

    pub fn fail(&mut self, name: impl Into<String>) {
        self.failed.push(name.into());
    }

    /// Record a failure that blocks delivery.
    pub fn critical(&mut self, name: impl Into<String>, issue: impl Into<String>) {
        self.failed.push(name.into());
        self.critical.push(issue.into());
    }

    pub fn record(&mut self, name: impl Into<String>, ok: bool) {
        if ok {
            self.pass(name);
        } else {
            self.fail(name);
        }
    }

    pub fn into_report(self, category: AppCategory) -> E2eReport {
        let passed = self.passed.len();
        let failed = self.failed.len();
        let total = passed + failed;
        let coverage_percent = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };
        E2eReport {
            app_category: Some(category),
            success: self.critical.is_empty(),
            passed,
            failed,
            total,
            coverage_percent,
            passed_tests: self.passed,
            failed_tests: self.failed,
            critical_issues: self.critical,
        }
    }
}

/// Run the routine for `category`, then the feature coverage checks.
///
/// `sources` is the concatenated project source, searched alongside the
/// rendered page text when checking features.
pub async fn run_checks(
    page: &mut dyn PageDriver,
    category: AppCategory,
    required_features: &[String],
    sources: &str,
) -> Result<E2eReport, E2eError> {
    let mut log = CheckLog::default();
    match category {
        AppCategory::Calculator => calculator(page, &mut log).await?,
        AppCategory::Todo => todo(page, &mut log).await?,
        AppCategory::Dashboard => dashboard(page, &mut log).await?,
        AppCategory::Game => game(page, &mut log).await?,
        AppCategory::Unknown => generic(page, &mut log).await?,
    }

    if !required_features.is_empty() {
        let haystack = format!("{}\n{}", page.body_text().await?, sources).to_lowercase();
        for feature in required_features {
            log.record(format!("feature: {}", feature), feature_present(feature, &haystack));
        }
    }

    let report = log.into_report(category);
    debug!(
        category = category.as_str(),
        passed = report.passed,
        failed = report.failed,
        critical = report.critical_issues.len(),
        "e2e checks finished"
    );
    Ok(report)
}

const STOPWORDS: &[&str] = &[
    "with", "that", "this", "from", "into", "when", "each", "every", "should", "must", "have",
    "support", "supports", "using", "user", "users", "able", "allow", "allows", "their", "them",
    "then", "than", "there", "will", "also", "which", "while", "button", "buttons",
];

fn keywords(feature: &str) -> Vec<String> {
    feature
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// A feature counts as present when at least half its keywords appear.
fn feature_present(feature: &str, haystack: &str) -> bool {
    let words = keywords(feature);
    if words.is_empty() {
        return haystack.contains(feature.trim().to_lowercase().as_str());
    }
    let hits = words.iter().filter(|w| haystack.contains(w.as_str())).count();
    hits * 2 >= words.len()
}

/// Parse the number a calculator display ends with.
fn display_number(display: &str) -> Option<f64> {
    let token = display
        .trim()
        .rsplit(|c: char| c.is_whitespace() || c == '=')
        .find(|t| !t.is_empty())?;
    token.replace(',', "").parse().ok()
}

fn shows(display: &Option<String>, expected: f64) -> bool {
    display
        .as_deref()
        .and_then(display_number)
        .is_some_and(|v| (v - expected).abs() < 1e-9)
}

async fn read_display(page: &mut dyn PageDriver) -> Result<Option<String>, E2eError> {
    for selector in DISPLAYS {
        if let Some(text) = page.text(selector).await? {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// Click each key in order. Returns false as soon as one is missing.
async fn press_sequence(page: &mut dyn PageDriver, keys: &[&[&str]]) -> Result<bool, E2eError> {
    for labels in keys {
        if !page.click_text(labels).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn evaluate(
    page: &mut dyn PageDriver,
    keys: &[&[&str]],
) -> Result<Option<String>, E2eError> {
    page.click_text(CLEAR).await?;
    if !press_sequence(page, keys).await? {
        return Ok(None);
    }
    if !page.click_text(EQUALS).await? {
        page.press_key("Enter").await?;
    }
    read_display(page).await
}

async fn calculator(page: &mut dyn PageDriver, log: &mut CheckLog) -> Result<(), E2eError> {
    if page.count(BUTTONS).await? == 0 {
        log.critical("calculator buttons", "no interactive elements found");
        return Ok(());
    }
    log.pass("calculator buttons");

    let sum = evaluate(page, &[&["7"], PLUS, &["3"]]).await?;
    if shows(&sum, 10.0) {
        log.pass("addition 7+3");
    } else {
        log.critical(
            "addition 7+3",
            format!("basic arithmetic broken: 7+3 displayed {:?}", sum),
        );
    }

    let precedence = evaluate(page, &[&["2"], PLUS, &["3"], TIMES, &["4"]]).await?;
    if shows(&precedence, 14.0) {
        log.pass("operator precedence 2+3×4");
    } else {
        log.critical(
            "operator precedence 2+3×4",
            format!("operator precedence wrong: 2+3×4 displayed {:?}, expected 14", precedence),
        );
    }

    let difference = evaluate(page, &[&["9"], MINUS, &["4"]]).await?;
    log.record("subtraction 9-4", shows(&difference, 5.0));

    let quotient = evaluate(page, &[&["8"], DIVIDE, &["0"]]).await?;
    let handled = quotient.as_deref().is_some_and(|d| {
        let d = d.to_lowercase();
        ["error", "infinity", "∞", "undefined", "nan", "cannot", "divide"]
            .iter()
            .any(|marker| d.contains(marker))
    });
    log.record("division by zero handled", handled);

    let cleared = if page.click_text(CLEAR).await? {
        read_display(page)
            .await?
            .is_some_and(|d| matches!(d.trim(), "" | "0"))
    } else {
        false
    };
    log.record("clear resets display", cleared);
    Ok(())
}

async fn todo(page: &mut dyn PageDriver, log: &mut CheckLog) -> Result<(), E2eError> {
    let hints = ["todo", "task", "add", "new", "item", "what"];
    let filled = page.fill(&hints, TODO_TEXT).await? || page.fill(&[], TODO_TEXT).await?;
    if !filled {
        log.critical("task input", "no input field for new tasks");
        return Ok(());
    }
    log.pass("task input");

    let labels = ["Add", "Add Task", "Add Todo", "Add Item", "+", "Submit", "Save", "Create"];
    if !page.click_text(&labels).await? {
        page.press_key("Enter").await?;
    }
    if page.body_text().await?.contains(TODO_TEXT) {
        log.pass("add task");
    } else {
        log.critical("add task", "adding a task failed");
        return Ok(());
    }

    let completed = page.click_selector("input[type=checkbox]").await?
        || page.click_text(&["Complete", "Done", "✓", "✔"]).await?;
    log.record("complete task", completed);

    let deleted = if page
        .click_text(&["Delete", "Remove", "×", "✕", "🗑", "Del", "X"])
        .await?
    {
        !page.body_text().await?.contains(TODO_TEXT)
    } else {
        false
    };
    log.record("delete task", deleted);
    Ok(())
}

async fn dashboard(page: &mut dyn PageDriver, log: &mut CheckLog) -> Result<(), E2eError> {
    let widgets = page
        .count("canvas, svg, table, .card, [class*=card], [class*=chart], [class*=metric], [class*=widget]")
        .await?;
    log.record("data widgets rendered", widgets > 0);

    if page.count(INTERACTIVE).await? == 0 {
        log.critical("dashboard controls", "no interactive elements found");
        return Ok(());
    }
    log.pass("dashboard controls");

    if page.click_selector("button, select").await? {
        log.record("controls respond", !page.body_text().await?.trim().is_empty());
    } else {
        log.fail("controls respond");
    }
    Ok(())
}

async fn game(page: &mut dyn PageDriver, log: &mut CheckLog) -> Result<(), E2eError> {
    let board = page
        .count("canvas, [id*=board], [class*=board], [class*=grid], [id*=game], [class*=game]")
        .await?;
    log.record("game area rendered", board > 0);

    if page.count(INTERACTIVE).await? == 0 {
        log.critical("game controls", "no interactive elements found");
        return Ok(());
    }
    log.pass("game controls");

    let started = page
        .click_text(&["Start", "Play", "New Game", "Start Game", "Restart", "Reset"])
        .await?;
    log.record("start control", started);

    page.press_key("ArrowUp").await?;
    page.press_key(" ").await?;
    log.record("page survives keyboard input", !page.body_text().await?.trim().is_empty());
    Ok(())
}

async fn generic(page: &mut dyn PageDriver, log: &mut CheckLog) -> Result<(), E2eError> {
    if page.body_text().await?.trim().is_empty() {
        log.critical("page renders content", "page rendered no visible content");
    } else {
        log.pass("page renders content");
    }

    if page.count(INTERACTIVE).await? == 0 {
        log.critical("interactive elements", "no interactive elements found");
        return Ok(());
    }
    log.pass("interactive elements");

    if page.count(BUTTONS).await? > 0 {
        log.record("button click", page.click_selector(BUTTONS).await?);
    }
    if page.count("input:not([type=hidden]), textarea").await? > 0 {
        log.record("input accepts text", page.fill(&[], "e2e check").await?);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;

    /// In-memory page with a tiny calculator model.
    #[derive(Default)]
    pub(crate) struct FakePage {
        pub buttons: Vec<String>,
        pub inputs: usize,
        pub body: String,
        pub display: Option<String>,
        pub precedence_bug: bool,
        entry: String,
    }

    impl FakePage {
        pub(crate) fn calculator(precedence_bug: bool) -> Self {
            let mut buttons: Vec<String> = (0..10).map(|d| d.to_string()).collect();
            buttons.extend(["+", "-", "×", "÷", "=", "C"].iter().map(|s| s.to_string()));
            Self {
                buttons,
                display: Some("0".into()),
                body: "Calculator".into(),
                precedence_bug,
                ..Self::default()
            }
        }

        fn evaluate(&self) -> String {
            let expr = self.entry.replace('×', "*").replace('÷', "/");
            let tokens: Vec<&str> = expr.split_inclusive(|c: char| "+-*/".contains(c)).collect();
            let mut nums = Vec::new();
            let mut ops = Vec::new();
            for t in tokens {
                let (n, op) = match t.chars().last() {
                    Some(c) if "+-*/".contains(c) => (&t[..t.len() - 1], Some(c)),
                    _ => (t, None),
                };
                nums.push(n.parse::<f64>().unwrap_or(0.0));
                if let Some(op) = op {
                    ops.push(op);
                }
            }
            // left-to-right when buggy, otherwise * and / first
            let mut acc_nums = vec![nums[0]];
            let mut acc_ops = Vec::new();
            for (i, op) in ops.iter().enumerate() {
                let rhs = nums[i + 1];
                if !self.precedence_bug && (*op == '*' || *op == '/') {
                    let lhs = acc_nums.pop().unwrap();
                    acc_nums.push(if *op == '*' { lhs * rhs } else { lhs / rhs });
                } else if self.precedence_bug {
                    let lhs = acc_nums.pop().unwrap();
                    acc_nums.push(match op {
                        '+' => lhs + rhs,
                        '-' => lhs - rhs,
                        '*' => lhs * rhs,
                        _ => lhs / rhs,
                    });
                } else {
                    acc_nums.push(rhs);
                    acc_ops.push(*op);
                }
            }
            let mut result = acc_nums[0];
            for (i, op) in acc_ops.iter().enumerate() {
                result = if *op == '+' {
                    result + acc_nums[i + 1]
                } else {
                    result - acc_nums[i + 1]
                };
            }
            if result.is_infinite() {
                "Error".into()
            } else {
                format!("{}", result)
            }
        }
    }

    #[async_trait]
    impl PageDriver for FakePage {
        async fn count(&mut self, selector: &str) -> Result<usize, E2eError> {
            Ok(if selector.starts_with("input:not") {
                self.inputs
            } else {
                self.buttons.len() + self.inputs
            })
        }

        async fn click_text(&mut self, labels: &[&str]) -> Result<bool, E2eError> {
            let Some(label) = labels
                .iter()
                .find(|l| self.buttons.iter().any(|b| b == *l))
            else {
                return Ok(false);
            };
            match *label {
                "C" => {
                    self.entry.clear();
                    self.display = Some("0".into());
                }
                "=" => {
                    let value = self.evaluate();
                    self.entry.clear();
                    self.display = Some(value);
                }
                other => {
                    self.entry.push_str(other);
                    self.display = Some(self.entry.clone());
                }
            }
            Ok(true)
        }

        async fn click_selector(&mut self, _selector: &str) -> Result<bool, E2eError> {
            Ok(!self.buttons.is_empty())
        }

        async fn fill(&mut self, _hints: &[&str], value: &str) -> Result<bool, E2eError> {
            if self.inputs == 0 {
                return Ok(false);
            }
            self.body.push_str(value);
            Ok(true)
        }

        async fn press_key(&mut self, _key: &str) -> Result<(), E2eError> {
            Ok(())
        }

        async fn text(&mut self, selector: &str) -> Result<Option<String>, E2eError> {
            Ok(if selector == "#display" {
                self.display.clone()
            } else {
                None
            })
        }

        async fn body_text(&mut self) -> Result<String, E2eError> {
            Ok(self.body.clone())
        }

        async fn close(self: Box<Self>) -> Result<(), E2eError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_correct_calculator_passes() {
        let mut page = FakePage::calculator(false);
        let report = run_checks(&mut page, AppCategory::Calculator, &[], "").await.unwrap();
        assert!(report.success, "{:?}", report);
        assert_eq!(report.failed, 0, "{:?}", report.failed_tests);
        assert_eq!(report.total, 6);
        assert_eq!(report.coverage_percent, 100.0);
    }

    #[tokio::test]
    async fn test_precedence_bug_is_critical() {
        let mut page = FakePage::calculator(true);
        let report = run_checks(&mut page, AppCategory::Calculator, &[], "").await.unwrap();
        assert!(!report.success);
        assert_eq!(report.critical_issues.len(), 1);
        assert!(report.critical_issues[0].contains("precedence"));
    }

    #[tokio::test]
    async fn test_empty_page_has_no_interactive_elements() {
        let mut page = FakePage {
            body: "Hello".into(),
            ..FakePage::default()
        };
        let report = run_checks(&mut page, AppCategory::Unknown, &[], "").await.unwrap();
        assert!(!report.success);
        assert!(report
            .critical_issues
            .iter()
            .any(|i| i == "no interactive elements found"));
    }

    #[tokio::test]
    async fn test_todo_without_input_is_critical() {
        let mut page = FakePage {
            buttons: vec!["Add".into()],
            body: "My tasks".into(),
            ..FakePage::default()
        };
        let report = run_checks(&mut page, AppCategory::Todo, &[], "").await.unwrap();
        assert_eq!(report.critical_issues, vec!["no input field for new tasks"]);
    }

    #[tokio::test]
    async fn test_feature_coverage_uses_sources() {
        let mut page = FakePage {
            buttons: vec!["Go".into()],
            inputs: 1,
            body: "Weather".into(),
            ..FakePage::default()
        };
        let features = vec![
            "Persist settings in localStorage".to_string(),
            "Export data to PDF".to_string(),
        ];
        let sources = "localStorage.setItem('settings', json)";
        let report = run_checks(&mut page, AppCategory::Unknown, &features, sources)
            .await
            .unwrap();
        assert!(report
            .passed_tests
            .contains(&"feature: Persist settings in localStorage".to_string()));
        assert!(report
            .failed_tests
            .contains(&"feature: Export data to PDF".to_string()));
        assert!(report.success);
        assert!(report.coverage_percent < 100.0);
    }

    #[test]
    fn test_display_parsing() {
        assert_eq!(display_number("14"), Some(14.0));
        assert_eq!(display_number("2+3×4 = 14"), Some(14.0));
        assert_eq!(display_number("1,024"), Some(1024.0));
        assert_eq!(display_number("Error"), None);
        assert_eq!(display_number(""), None);
    }
}
