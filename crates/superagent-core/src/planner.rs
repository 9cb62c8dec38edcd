//! Architecture planner.
//!
//! Classification is keyword matching over the lower-cased instruction. The
//! planner never fails: a blank instruction degrades to an empty `general`
//! plan, which the code generation gate rejects.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::domain::language::normalize;
use crate::domain::{Architecture, FileKind, Language, PlannedFile, ProjectType};

const ADVANCED_WORDS: &[&str] = &[
    "advanced",
    "enterprise",
    "comprehensive",
    "professional",
    "sophisticated",
    "complex",
    "full-featured",
    "feature-rich",
    "production-ready",
    "production-grade",
    "powerful",
];

const API_WORDS: &[&str] = &[
    "api",
    "backend",
    "rest",
    "restful",
    "endpoint",
    "endpoints",
    "microservice",
    "server",
    "graphql",
];

const BOT_WORDS: &[&str] = &["bot", "chatbot", "discord", "telegram", "slack"];

const CLI_WORDS: &[&str] = &["cli", "command line", "command-line", "terminal"];

const DATABASE_WORDS: &[&str] = &[
    "database", "db", "sql", "sqlite", "postgres", "mysql", "mongodb", "persist", "crud",
    "storage",
];

struct Keywords {
    advanced: Regex,
    api: Regex,
    bot: Regex,
    cli: Regex,
    database: Regex,
}

fn word_set(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{})\b", alternation)).expect("keyword list is a valid pattern")
}

fn keywords() -> &'static Keywords {
    static KEYWORDS: OnceLock<Keywords> = OnceLock::new();
    KEYWORDS.get_or_init(|| Keywords {
        advanced: word_set(ADVANCED_WORDS),
        api: word_set(API_WORDS),
        bot: word_set(BOT_WORDS),
        cli: word_set(CLI_WORDS),
        database: word_set(DATABASE_WORDS),
    })
}

/// Whether the instruction asks for an advanced build.
pub fn wants_advanced(instruction: &str) -> bool {
    keywords().advanced.is_match(&instruction.to_lowercase())
}

/// Classify the project type. Precedence: api, bot, cli, then webapp.
pub fn classify(instruction: &str) -> ProjectType {
    let text = instruction.to_lowercase();
    let kw = keywords();
    if kw.api.is_match(&text) {
        ProjectType::Api
    } else if kw.bot.is_match(&text) {
        ProjectType::Bot
    } else if kw.cli.is_match(&text) {
        ProjectType::Cli
    } else {
        ProjectType::Webapp
    }
}

/// Derive the build plan for an instruction.
pub fn plan(instruction: &str, language: &str, multi_file_hint: bool) -> Architecture {
    let text = instruction.trim().to_lowercase();
    if text.is_empty() {
        let language = normalize(language).unwrap_or_else(|| "html".to_string());
        warn!("blank instruction; returning degraded plan");
        return Architecture::degraded(language);
    }

    let kw = keywords();
    let project_type = classify(&text);
    let wants_advanced = kw.advanced.is_match(&text);
    let needs_database = kw.database.is_match(&text);
    let needs_api = project_type == ProjectType::Api;
    let needs_frontend = project_type == ProjectType::Webapp;

    let language = normalize(language).unwrap_or_else(|| match project_type {
        ProjectType::Webapp => Language::Html.as_str().to_string(),
        _ => Language::Python.as_str().to_string(),
    });

    let multi_file = multi_file_hint
        || (wants_advanced && project_type == ProjectType::Webapp)
        || matches!(
            project_type,
            ProjectType::Api | ProjectType::Cli | ProjectType::Bot
        );

    let files_to_create = if multi_file {
        multi_file_plan(project_type, &language, needs_database)
    } else {
        single_file_plan(project_type, &language)
    };

    let architecture = Architecture {
        project_type,
        language,
        multi_file,
        wants_advanced,
        needs_database,
        needs_api,
        needs_frontend,
        files_to_create,
    };

    debug!(
        project_type = architecture.project_type.as_str(),
        language = %architecture.language,
        multi_file,
        wants_advanced,
        files = architecture.files_to_create.len(),
        "architecture planned"
    );
    architecture
}

fn single_file_plan(project_type: ProjectType, language: &str) -> Vec<PlannedFile> {
    let name = if project_type == ProjectType::Webapp && Language::of(language) == Language::Html
    {
        "index"
    } else {
        "main"
    };
    vec![PlannedFile::new(name, FileKind::Main)]
}

fn multi_file_plan(
    project_type: ProjectType,
    language: &str,
    needs_database: bool,
) -> Vec<PlannedFile> {
    let test_file = || {
        let name = if Language::of(language) == Language::Python {
            "test_main"
        } else {
            "main.test"
        };
        PlannedFile::new(name, FileKind::Test)
    };

    match project_type {
        ProjectType::Webapp | ProjectType::General => vec![
            PlannedFile::new("index", FileKind::Html),
            PlannedFile::new("style", FileKind::Css),
            PlannedFile::new("script", FileKind::Script),
        ],
        ProjectType::Api => {
            let mut files = vec![
                PlannedFile::new("main", FileKind::Entry),
                PlannedFile::new("routes", FileKind::Routes),
            ];
            if needs_database {
                files.push(PlannedFile::new("models", FileKind::Models));
            }
            files.push(PlannedFile::new("config", FileKind::Config));
            files.push(test_file());
            files
        }
        ProjectType::Cli => vec![
            PlannedFile::new("main", FileKind::Main),
            PlannedFile::new("config", FileKind::Config),
            test_file(),
        ],
        ProjectType::Bot => vec![
            PlannedFile::new("main", FileKind::Main),
            PlannedFile::new("handlers", FileKind::Handlers),
            PlannedFile::new("config", FileKind::Config),
            test_file(),
        ],
    }
}
