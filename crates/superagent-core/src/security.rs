//! Static security scanning of generated code.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::Language;

/// Threat severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One finding from a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    /// 1-based line of the first match.
    pub line: Option<usize>,
}

/// Security scanning collaborator.
#[async_trait]
pub trait SecurityScanner: Send + Sync {
    async fn scan_code(&self, code: &str, language: &str) -> Vec<Threat>;
}

/// Which languages a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Any,
    Web,
    Python,
}

impl Scope {
    fn covers(self, language: Language) -> bool {
        match self {
            Scope::Any => true,
            Scope::Web => matches!(
                language,
                Language::Html | Language::JavaScript | Language::TypeScript
            ),
            Scope::Python => language == Language::Python,
        }
    }
}

struct Rule {
    name: &'static str,
    scope: Scope,
    severity: Severity,
    message: &'static str,
    pattern: Regex,
}

/// Regex rule set covering common injection and secret-handling mistakes.
pub struct PatternSecurityScanner {
    rules: Vec<Rule>,
}

impl Default for PatternSecurityScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternSecurityScanner {
    pub fn new() -> Self {
        let specs: &[(&'static str, Scope, Severity, &'static str, &'static str)] = &[
            ("eval", Scope::Web, Severity::High, "eval() executes arbitrary code", r"\beval\s*\("),
            (
                "function_constructor",
                Scope::Web,
                Severity::High,
                "new Function() executes arbitrary code",
                r"\bnew\s+Function\s*\(",
            ),
            (
                "inner_html",
                Scope::Web,
                Severity::Medium,
                "innerHTML assignment can inject markup; prefer textContent",
                r"\.innerHTML\s*[+]?=",
            ),
            (
                "document_write",
                Scope::Web,
                Severity::Medium,
                "document.write can inject markup",
                r"\bdocument\.write(ln)?\s*\(",
            ),
            (
                "hardcoded_secret",
                Scope::Any,
                Severity::Critical,
                "credential literal in source",
                r#"(?i)\b(api[_-]?key|secret|password|passwd|token)\b\s*[:=]\s*["'][^"'\s]{8,}["']"#,
            ),
            (
                "shell_true",
                Scope::Python,
                Severity::High,
                "subprocess with shell=True enables command injection",
                r"shell\s*=\s*True",
            ),
            (
                "os_system",
                Scope::Python,
                Severity::High,
                "os.system runs a shell command",
                r"\bos\.system\s*\(",
            ),
            (
                "pickle_loads",
                Scope::Python,
                Severity::High,
                "unpickling untrusted data executes code",
                r"\bpickle\.loads?\s*\(",
            ),
            (
                "sql_fstring",
                Scope::Python,
                Severity::High,
                "SQL assembled with an f-string; use parameters",
                r#"(?i)\.execute\s*\(\s*f["'](select|insert|update|delete)\b"#,
            ),
            (
                "python_eval",
                Scope::Python,
                Severity::High,
                "eval()/exec() executes arbitrary code",
                r"\b(eval|exec)\s*\(",
            ),
        ];

        let rules = specs
            .iter()
            .filter_map(|(name, scope, severity, message, pattern)| {
                Regex::new(pattern).ok().map(|pattern| Rule {
                    name: *name,
                    scope: *scope,
                    severity: *severity,
                    message: *message,
                    pattern,
                })
            })
            .collect();
        Self { rules }
    }

    /// Synchronous scan used by the async trait impl.
    pub fn scan(&self, code: &str, language: &str) -> Vec<Threat> {
        let language = Language::of(language);
        self.rules
            .iter()
            .filter(|rule| rule.scope.covers(language))
            .filter_map(|rule| {
                let found = rule.pattern.find(code)?;
                let line = code[..found.start()].matches('\n').count() + 1;
                Some(Threat {
                    rule: rule.name.to_string(),
                    severity: rule.severity,
                    message: rule.message.to_string(),
                    line: Some(line),
                })
            })
            .collect()
    }
}

#[async_trait]
impl SecurityScanner for PatternSecurityScanner {
    async fn scan_code(&self, code: &str, language: &str) -> Vec<Threat> {
        self.scan(code, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_eval_in_javascript() {
        let scanner = PatternSecurityScanner::new();
        let threats = scanner.scan("const x = 1;\nresult = eval(expr);", "javascript");
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].rule, "eval");
        assert_eq!(threats[0].line, Some(2));
    }

    #[test]
    fn test_inner_html_and_secret() {
        let scanner = PatternSecurityScanner::new();
        let code = "el.innerHTML = userInput;\nconst API_KEY = \"sk-live-abcdef123456\";";
        let rules: Vec<String> = scanner.scan(code, "html").into_iter().map(|t| t.rule).collect();
        assert!(rules.contains(&"inner_html".to_string()));
        assert!(rules.contains(&"hardcoded_secret".to_string()));
    }

    #[test]
    fn test_python_rules_do_not_fire_on_javascript() {
        let scanner = PatternSecurityScanner::new();
        assert!(scanner.scan("spawn(cmd, { shell: true })", "javascript").is_empty());
        let threats = scanner.scan("subprocess.run(cmd, shell=True)", "python");
        assert_eq!(threats[0].rule, "shell_true");
    }

    #[test]
    fn test_sql_fstring() {
        let scanner = PatternSecurityScanner::new();
        let threats = scanner.scan("cur.execute(f\"SELECT * FROM t WHERE id={id}\")", "python");
        assert!(threats.iter().any(|t| t.rule == "sql_fstring"));
    }

    #[test]
    fn test_clean_code_has_no_threats() {
        let scanner = PatternSecurityScanner::new();
        let code = "document.getElementById('out').textContent = total;";
        assert!(scanner.scan(code, "javascript").is_empty());
    }

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(PatternSecurityScanner::new().rules.len(), 10);
    }

    #[test]
    fn test_severity_orders() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low < Severity::Medium);
    }
}
