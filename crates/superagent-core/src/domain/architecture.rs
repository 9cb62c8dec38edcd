//! The planner's classification of a build request.

use serde::{Deserialize, Serialize};

use super::language::Language;

/// Coarse project type derived from the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Webapp,
    Api,
    Cli,
    Bot,
    /// Produced only when planning degrades.
    General,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Webapp => "webapp",
            ProjectType::Api => "api",
            ProjectType::Cli => "cli",
            ProjectType::Bot => "bot",
            ProjectType::General => "general",
        }
    }
}

/// Role of a planned file inside the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Html,
    Css,
    Script,
    Main,
    Entry,
    Routes,
    Models,
    Handlers,
    Config,
    Test,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Html => "html",
            FileKind::Css => "css",
            FileKind::Script => "script",
            FileKind::Main => "main",
            FileKind::Entry => "entry",
            FileKind::Routes => "routes",
            FileKind::Models => "models",
            FileKind::Handlers => "handlers",
            FileKind::Config => "config",
            FileKind::Test => "test",
        }
    }

    /// Filesystem extension for this kind of file in `language`.
    ///
    /// Front-end kinds have a fixed extension; everything else follows the
    /// project language.
    pub fn extension(&self, language: &str) -> &'static str {
        match self {
            FileKind::Html => "html",
            FileKind::Css => "css",
            FileKind::Script => match Language::of(language) {
                Language::TypeScript => "ts",
                _ => "js",
            },
            _ => match Language::of(language) {
                Language::Html => "html",
                Language::Python => "py",
                Language::JavaScript => "js",
                Language::TypeScript => "ts",
                Language::Other => match language.trim().to_ascii_lowercase().as_str() {
                    "go" | "golang" => "go",
                    "rust" => "rs",
                    "java" => "java",
                    "ruby" => "rb",
                    "php" => "php",
                    "css" => "css",
                    _ => "txt",
                },
            },
        }
    }

    /// Language a file of this kind is written in, given the project language.
    pub fn file_language(&self, project_language: &str) -> String {
        match self {
            FileKind::Html => "html".to_string(),
            FileKind::Css => "css".to_string(),
            FileKind::Script => match Language::of(project_language) {
                Language::TypeScript => "typescript".to_string(),
                _ => "javascript".to_string(),
            },
            _ => project_language.to_string(),
        }
    }
}

/// One file the planner wants generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFile {
    /// File stem, without extension.
    pub name: String,

    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl PlannedFile {
    pub fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// File name with extension for a project written in `language`.
    pub fn file_name(&self, language: &str) -> String {
        format!("{}.{}", self.name, self.kind.extension(language))
    }
}

/// Derived build plan. Read-only once the planner returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub language: String,
    pub multi_file: bool,
    pub wants_advanced: bool,
    pub needs_database: bool,
    pub needs_api: bool,
    pub needs_frontend: bool,
    pub files_to_create: Vec<PlannedFile>,
}

impl Architecture {
    /// Minimal plan returned when classification cannot proceed.
    ///
    /// Carries no files; the code generation gate rejects it.
    pub fn degraded(language: impl Into<String>) -> Self {
        Self {
            project_type: ProjectType::General,
            language: language.into(),
            multi_file: false,
            wants_advanced: false,
            needs_database: false,
            needs_api: false,
            needs_frontend: false,
            files_to_create: Vec::new(),
        }
    }

    pub fn is_web(&self) -> bool {
        self.project_type == ProjectType::Webapp
    }

    /// Advanced multi-file web builds use the three-pass generation protocol.
    pub fn is_advanced_web(&self) -> bool {
        self.is_web() && self.wants_advanced && self.multi_file
    }

    /// File names (with extensions) in plan order.
    pub fn file_names(&self) -> Vec<String> {
        self.files_to_create
            .iter()
            .map(|f| f.file_name(&self.language))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_end_extensions_are_fixed() {
        assert_eq!(FileKind::Html.extension("python"), "html");
        assert_eq!(FileKind::Css.extension("python"), "css");
        assert_eq!(FileKind::Script.extension("html"), "js");
        assert_eq!(FileKind::Script.extension("typescript"), "ts");
    }

    #[test]
    fn test_language_extensions() {
        assert_eq!(FileKind::Main.extension("python"), "py");
        assert_eq!(FileKind::Routes.extension("javascript"), "js");
        assert_eq!(FileKind::Entry.extension("typescript"), "ts");
        assert_eq!(FileKind::Main.extension("html"), "html");
        assert_eq!(FileKind::Main.extension("go"), "go");
        assert_eq!(FileKind::Config.extension("cobol"), "txt");
    }

    #[test]
    fn test_planned_file_name() {
        let file = PlannedFile::new("test_main", FileKind::Test);
        assert_eq!(file.file_name("python"), "test_main.py");
    }

    #[test]
    fn test_degraded_plan_is_empty() {
        let arch = Architecture::degraded("html");
        assert_eq!(arch.project_type, ProjectType::General);
        assert!(arch.files_to_create.is_empty());
        assert!(!arch.is_web());
    }

    #[test]
    fn test_architecture_serializes_type_key() {
        let arch = Architecture::degraded("python");
        let value = serde_json::to_value(&arch).unwrap();
        assert_eq!(value["type"], "general");
        assert!(value["files_to_create"].as_array().unwrap().is_empty());
    }
}
