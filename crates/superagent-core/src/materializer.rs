//! Writes generated files into a fresh project directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{GeneratedFile, Result, SuperAgentError};

const SLUG_CHARS: usize = 30;
const MAX_SUFFIX: u32 = 1000;

/// Slug of the first thirty characters of an instruction.
pub fn slugify(instruction: &str) -> String {
    let mut slug = String::with_capacity(SLUG_CHARS);
    for c in instruction.trim().chars().take(SLUG_CHARS) {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "app".to_string()
    } else {
        slug.to_string()
    }
}

/// Reduce a generated file name to a single safe path component.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file.txt".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Where a build's files landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedProject {
    pub project_dir: PathBuf,

    /// Directory name relative to the output root.
    pub dir_name: String,

    pub files_created: Vec<String>,

    /// `/apps/<dir>/<entry>.html` when any HTML file was written.
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectMaterializer {
    output_dir: PathBuf,
}

impl ProjectMaterializer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `files` into a new `enterprise_<slug>_<unix_ts>` directory.
    ///
    /// The directory is created exclusively; a name already taken in the same
    /// second gets a numeric suffix, so two calls never share a directory.
    pub async fn materialize(
        &self,
        files: &[GeneratedFile],
        instruction: &str,
    ) -> Result<MaterializedProject> {
        if files.is_empty() {
            return Err(SuperAgentError::Materialization(
                "no files to write".to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let (dir_name, project_dir) = self.create_project_dir(instruction).await?;

        let mut files_created = Vec::with_capacity(files.len());
        for file in files {
            let name = sanitize_file_name(&file.file_name());
            tokio::fs::write(project_dir.join(&name), file.code.as_bytes()).await?;
            debug!(file = %name, bytes = file.code.len(), "file written");
            files_created.push(name);
        }

        let preview_url = preview_entry(&files_created)
            .map(|entry| format!("/apps/{}/{}", dir_name, entry));

        info!(
            project_dir = %project_dir.display(),
            files = files_created.len(),
            preview = preview_url.as_deref().unwrap_or("-"),
            "project materialized"
        );

        Ok(MaterializedProject {
            project_dir,
            dir_name,
            files_created,
            preview_url,
        })
    }

    async fn create_project_dir(&self, instruction: &str) -> Result<(String, PathBuf)> {
        let base = format!(
            "enterprise_{}_{}",
            slugify(instruction),
            chrono::Utc::now().timestamp()
        );

        for attempt in 1..=MAX_SUFFIX {
            let name = if attempt == 1 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };
            let path = self.output_dir.join(&name);
            match tokio::fs::create_dir(&path).await {
                Ok(()) => return Ok((name, path)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(SuperAgentError::Materialization(format!(
            "could not allocate a project directory for '{}'",
            base
        )))
    }
}

fn preview_entry(files: &[String]) -> Option<&str> {
    let mut html = files.iter().filter(|f| f.ends_with(".html"));
    let first = html.clone().next()?;
    Some(
        html.find(|f| f.as_str() == "index.html")
            .unwrap_or(first)
            .as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FileKind, PlannedFile};

    fn file(name: &str, kind: FileKind, language: &str, code: &str) -> GeneratedFile {
        GeneratedFile::for_plan(&PlannedFile::new(name, kind), language, code.to_string())
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Build an Advanced Calculator!"), "build_an_advanced_calculator");
        assert_eq!(slugify("   "), "app");
        assert_eq!(slugify("!!!"), "app");
        assert!(slugify(&"x".repeat(100)).len() <= SLUG_CHARS);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("main.test.js"), "main.test.js");
        assert_eq!(sanitize_file_name(""), "file.txt");
    }

    #[test]
    fn test_preview_prefers_index() {
        let files = vec!["about.html".to_string(), "index.html".to_string()];
        assert_eq!(preview_entry(&files), Some("index.html"));
        let files = vec!["app.py".to_string(), "page.html".to_string()];
        assert_eq!(preview_entry(&files), Some("page.html"));
        assert_eq!(preview_entry(&["main.py".to_string()]), None);
    }

    #[tokio::test]
    async fn test_materialize_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = ProjectMaterializer::new(dir.path());
        let files = vec![
            file("index", FileKind::Html, "html", "<html></html>"),
            file("style", FileKind::Css, "html", "body{}"),
            file("script", FileKind::Script, "html", "let a;"),
        ];

        let project = materializer.materialize(&files, "todo app").await.unwrap();

        assert!(project.dir_name.starts_with("enterprise_todo_app_"));
        assert_eq!(project.files_created, vec!["index.html", "style.css", "script.js"]);
        assert_eq!(
            std::fs::read_to_string(project.project_dir.join("style.css")).unwrap(),
            "body{}"
        );
        assert_eq!(
            project.preview_url,
            Some(format!("/apps/{}/index.html", project.dir_name))
        );
    }

    #[tokio::test]
    async fn test_no_preview_without_html() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = ProjectMaterializer::new(dir.path());
        let files = vec![file("main", FileKind::Main, "python", "print(1)")];
        let project = materializer.materialize(&files, "cli tool").await.unwrap();
        assert_eq!(project.files_created, vec!["main.py"]);
        assert!(project.preview_url.is_none());
    }

    #[tokio::test]
    async fn test_repeated_calls_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = ProjectMaterializer::new(dir.path());
        let files = vec![file("index", FileKind::Main, "html", "<p>x</p>")];

        let a = materializer.materialize(&files, "same").await.unwrap();
        let b = materializer.materialize(&files, "same").await.unwrap();
        let c = materializer.materialize(&files, "different").await.unwrap();

        assert_ne!(a.project_dir, b.project_dir);
        assert_ne!(b.project_dir, c.project_dir);
        assert!(a.project_dir.join("index.html").exists());
        assert!(b.project_dir.join("index.html").exists());
    }

    #[tokio::test]
    async fn test_empty_file_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = ProjectMaterializer::new(dir.path());
        let err = materializer.materialize(&[], "x").await.unwrap_err();
        assert!(matches!(err, SuperAgentError::Materialization(_)));
    }
}
