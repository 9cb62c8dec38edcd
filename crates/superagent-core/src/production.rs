//! Deployment boilerplate written next to the generated sources.

use std::path::Path;

use tracing::debug;

use crate::domain::{Architecture, Language, Result};

const DOCKERIGNORE: &str = "node_modules\n__pycache__\n*.pyc\n.venv\nvenv\n.git\n.superagent\n";

/// Writes `Dockerfile`, `.dockerignore`, a CI workflow and `README.md`.
#[derive(Debug, Clone, Default)]
pub struct ProductionOutputs;

impl ProductionOutputs {
    /// Write every output into `project_dir`, returning relative paths.
    pub async fn write(
        &self,
        project_dir: &Path,
        architecture: &Architecture,
        instruction: &str,
    ) -> Result<Vec<String>> {
        let outputs = [
            ("Dockerfile", dockerfile(architecture)),
            (".dockerignore", DOCKERIGNORE.to_string()),
            (".github/workflows/ci.yml", ci_workflow(architecture)),
            ("README.md", readme(architecture, instruction)),
        ];

        let mut written = Vec::with_capacity(outputs.len());
        for (rel, body) in outputs {
            let path = project_dir.join(rel);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, body).await?;
            debug!(file = rel, "production output written");
            written.push(rel.to_string());
        }
        Ok(written)
    }
}

fn entry_file(architecture: &Architecture) -> String {
    architecture
        .files_to_create
        .first()
        .map(|f| f.file_name(&architecture.language))
        .unwrap_or_else(|| "main".to_string())
}

fn dockerfile(architecture: &Architecture) -> String {
    match Language::of(&architecture.language) {
        Language::Python => {
            let module = entry_file(architecture)
                .trim_end_matches(".py")
                .to_string();
            let cmd = if architecture.needs_api {
                format!(
                    "CMD [\"uvicorn\", \"{}:app\", \"--host\", \"0.0.0.0\", \"--port\", \"8000\"]",
                    module
                )
            } else {
                format!("CMD [\"python\", \"{}.py\"]", module)
            };
            format!(
                "FROM python:3.12-slim\n\
                 WORKDIR /app\n\
                 COPY requirements.txt* ./\n\
                 RUN if [ -f requirements.txt ]; then pip install --no-cache-dir -r requirements.txt; fi\n\
                 COPY . .\n\
                 EXPOSE 8000\n\
                 {}\n",
                cmd
            )
        }
        lang if lang.is_node() => format!(
            "FROM node:20-alpine\n\
             WORKDIR /app\n\
             COPY package*.json ./\n\
             RUN npm install --omit=dev\n\
             COPY . .\n\
             EXPOSE 3000\n\
             CMD [\"node\", \"{}\"]\n",
            entry_file(architecture)
        ),
        Language::Html if architecture.needs_frontend || architecture.is_web() => {
            "FROM nginx:alpine\n\
             COPY . /usr/share/nginx/html\n\
             EXPOSE 80\n"
                .to_string()
        }
        _ => "FROM alpine:3.20\n\
              WORKDIR /app\n\
              COPY . .\n"
            .to_string(),
    }
}

fn ci_workflow(architecture: &Architecture) -> String {
    let steps = match Language::of(&architecture.language) {
        Language::Python => {
            "      - uses: actions/setup-python@v5\n\
             \x20       with:\n\
             \x20         python-version: '3.12'\n\
             \x20     - run: pip install -r requirements.txt\n\
             \x20     - run: python -m pytest -q\n"
        }
        lang if lang.is_node() => {
            "      - uses: actions/setup-node@v4\n\
             \x20       with:\n\
             \x20         node-version: '20'\n\
             \x20     - run: npm install\n\
             \x20     - run: npm test --if-present\n"
        }
        _ => "      - run: docker build -t app .\n",
    };
    format!(
        "name: CI\n\
         on:\n\
         \x20 push:\n\
         \x20 pull_request:\n\
         jobs:\n\
         \x20 build:\n\
         \x20   runs-on: ubuntu-latest\n\
         \x20   steps:\n\
         \x20     - uses: actions/checkout@v4\n\
         {}",
        steps
    )
}

fn readme(architecture: &Architecture, instruction: &str) -> String {
    let files = architecture
        .file_names()
        .iter()
        .map(|f| format!("- `{}`", f))
        .collect::<Vec<_>>()
        .join("\n");
    let run = match Language::of(&architecture.language) {
        Language::Python => "pip install -r requirements.txt\npython -m pytest -q",
        lang if lang.is_node() => "npm install\nnpm test",
        _ => "open index.html",
    };
    format!(
        "# {title}\n\n\
         {instruction}\n\n\
         Project type: {project_type} ({language})\n\n\
         ## Files\n\n{files}\n\n\
         ## Run\n\n```sh\n{run}\n```\n\n\
         ## Docker\n\n```sh\ndocker build -t app .\ndocker run --rm -p 8080:80 app\n```\n",
        title = title(instruction),
        project_type = architecture.project_type.as_str(),
        language = architecture.language,
    )
}

fn title(instruction: &str) -> String {
    let mut chars = instruction.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Generated App".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan;

    #[tokio::test]
    async fn test_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let arch = plan("todo app", "html", false);
        let written = ProductionOutputs
            .write(dir.path(), &arch, "todo app")
            .await
            .unwrap();
        assert_eq!(
            written,
            vec!["Dockerfile", ".dockerignore", ".github/workflows/ci.yml", "README.md"]
        );
        for rel in &written {
            assert!(dir.path().join(rel).exists(), "{rel} missing");
        }
        let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(readme.starts_with("# Todo app"));
        assert!(readme.contains("- `index.html`"));
    }

    #[test]
    fn test_python_api_dockerfile_uses_uvicorn() {
        let arch = plan("REST api for notes", "python", false);
        let df = dockerfile(&arch);
        assert!(df.starts_with("FROM python:3.12-slim"));
        assert!(df.contains("\"main:app\""));
    }

    #[test]
    fn test_static_site_uses_nginx() {
        let arch = plan("landing page", "html", false);
        assert!(dockerfile(&arch).starts_with("FROM nginx:alpine"));
    }

    #[test]
    fn test_node_ci_runs_tests() {
        let arch = plan("backend for a blog", "javascript", false);
        let ci = ci_workflow(&arch);
        assert!(ci.contains("actions/setup-node@v4"));
        assert!(ci.contains("npm test"));
        assert!(ci.contains("  build:\n"));
    }
}
