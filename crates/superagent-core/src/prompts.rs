//! Prompt builders for the code generator.
//!
//! Every prompt is assembled in-process from the instruction and the plan.

use crate::domain::{AppCategory, Architecture, FeatureChecklist, FileKind, PlannedFile};

/// System prompt shared by all generation calls.
pub const SYSTEM_PROMPT: &str = "You are a senior software engineer. Reply with complete, \
working source code only. Do not explain the code and do not leave placeholders or TODOs.";

/// Ask for a bullet-list feature specification (advanced web, pass 1).
pub fn feature_spec(instruction: &str) -> String {
    format!(
        "Write a feature specification for this web application:\n\n{instruction}\n\n\
         List every feature a polished, production-quality version must have as a \
         bullet list, one feature per line starting with \"- \". Cover core \
         functionality, edge cases, keyboard support, accessibility and persistence. \
         Output only the bullet list."
    )
}

/// Per-file prompt for the advanced web pass (pass 2).
pub fn web_file(instruction: &str, spec: &str, kind: FileKind) -> String {
    let role = match kind {
        FileKind::Html => {
            "Write index.html. Link style.css in the head and load script.js at the end \
             of the body. Give every interactive element a visible text label, an id and, \
             for inputs, a descriptive placeholder. Do not inline CSS or JavaScript."
        }
        FileKind::Css => {
            "Write style.css for the page. Use a responsive layout, clear focus states \
             and consistent spacing. Output CSS only."
        }
        _ => {
            "Write script.js implementing every feature. Select elements by the ids used \
             in index.html, wait for DOMContentLoaded, validate input and never use eval \
             or new Function. Output JavaScript only."
        }
    };
    format!(
        "Application: {instruction}\n\nFeature specification:\n{spec}\n\n{role}\n\
         Every feature in the specification must be implemented."
    )
}

/// Enhancement pass over the drafted script (pass 3).
pub fn enhancement(instruction: &str, spec: &str, draft_js: &str) -> String {
    format!(
        "Application: {instruction}\n\nFeature specification:\n{spec}\n\n\
         Current script.js:\n```javascript\n{draft_js}\n```\n\n\
         Compare the script against the specification. Add every missing feature, fix \
         bugs and keep the existing element ids. Reply with the complete improved \
         script.js only."
    )
}

/// Ask for a JSON feature checklist (single-file advanced, step 1).
pub fn checklist(instruction: &str, category: AppCategory) -> String {
    format!(
        "Analyse this request and reply with JSON only, no prose:\n\n{instruction}\n\n\
         Schema:\n\
         {{\"app_type\": string, \"features\": [string], \"ui_elements\": [string], \
         \"interactions\": [string]}}\n\n\
         The app looks like a {category} app. List at least eight concrete features.",
        category = category.as_str()
    )
}

/// Single exhaustive prompt embedding the checklist (single-file advanced, step 2).
pub fn exhaustive(instruction: &str, architecture: &Architecture, checklist: &FeatureChecklist) -> String {
    format!(
        "Build this as ONE self-contained {language} file:\n\n{instruction}\n\n\
         {checklist}\n\
         All CSS and JavaScript must be inline. Implement every feature, UI element and \
         interaction listed above. Label every button with visible text and give every \
         input a placeholder.",
        language = architecture.language,
        checklist = checklist.render(),
    )
}

/// Standard per-file prompt.
pub fn standard(instruction: &str, architecture: &Architecture, planned: &PlannedFile) -> String {
    let file_name = planned.file_name(&architecture.language);
    let mut prompt = format!(
        "Project type: {project_type}\nLanguage: {language}\nRequest: {instruction}\n\n",
        project_type = architecture.project_type.as_str(),
        language = architecture.language,
    );

    if architecture.files_to_create.len() > 1 {
        let others: Vec<String> = architecture
            .files_to_create
            .iter()
            .filter(|f| f.name != planned.name)
            .map(|f| f.file_name(&architecture.language))
            .collect();
        prompt.push_str(&format!(
            "The project also contains: {}. Keep imports consistent with those files.\n",
            others.join(", ")
        ));
    }
    if architecture.needs_database {
        prompt.push_str("Persist data in a database.\n");
    }
    if architecture.needs_api {
        prompt.push_str("Expose the functionality as an HTTP API.\n");
    }

    let role = match planned.kind {
        FileKind::Html | FileKind::Main if architecture.is_web() => {
            "a complete single-page application with inline CSS and JavaScript"
        }
        FileKind::Css => "the stylesheet",
        FileKind::Script => "the client-side script",
        FileKind::Main | FileKind::Entry => "the entry point",
        FileKind::Routes => "the HTTP route handlers",
        FileKind::Models => "the data models",
        FileKind::Handlers => "the event and command handlers",
        FileKind::Config => "configuration loading with sensible defaults",
        FileKind::Test => "unit tests for the other files",
        FileKind::Html => "the HTML page",
    };
    prompt.push_str(&format!("Write {file_name}: {role}."));
    prompt
}

/// Extract bullet items from a free-text specification.
pub fn bullet_items(spec: &str) -> Vec<String> {
    spec.lines()
        .map(str::trim)
        .filter_map(|line| {
            let item = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("• "))
                .or_else(|| {
                    let digits = line.find(|c: char| !c.is_ascii_digit())?;
                    if digits == 0 {
                        return None;
                    }
                    line[digits..].strip_prefix(". ")
                })?;
            let item = item.trim().trim_matches('*').trim();
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}
