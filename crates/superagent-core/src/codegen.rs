//! Code generation over a [`CompletionClient`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{
    clean_code_fences, AppCategory, Architecture, FeatureChecklist, FileKind, GeneratedFile,
    PlannedFile, Result, SuperAgentError,
};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::prompts;

/// Output of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub files: Vec<GeneratedFile>,

    /// Features the generated app is expected to expose; feeds E2E coverage.
    pub features: Vec<String>,
}

/// Turns an [`Architecture`] into source files.
#[derive(Clone)]
pub struct CodeGenerator {
    client: Arc<dyn CompletionClient>,
}

impl CodeGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn CompletionClient> {
        &self.client
    }

    /// Generate every planned file.
    ///
    /// An empty plan yields an empty generation without calling the model.
    pub async fn generate(&self, architecture: &Architecture, instruction: &str) -> Result<Generation> {
        if architecture.files_to_create.is_empty() {
            debug!("empty plan; nothing to generate");
            return Ok(Generation::default());
        }

        let generation = if architecture.is_advanced_web() {
            self.generate_advanced_web(architecture, instruction).await?
        } else if architecture.wants_advanced && !architecture.multi_file {
            self.generate_single_advanced(architecture, instruction).await?
        } else {
            self.generate_standard(architecture, instruction).await?
        };

        info!(
            provider = self.client.provider(),
            files = generation.files.len(),
            features = generation.features.len(),
            "code generated"
        );
        Ok(generation)
    }

    async fn ask(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest::new(prompt).with_system(prompts::SYSTEM_PROMPT);
        let raw = self.client.complete(request).await?;
        Ok(clean_code_fences(&raw))
    }

    /// Spec pass, one call per front-end file, then an enhancement pass over
    /// the script.
    async fn generate_advanced_web(
        &self,
        architecture: &Architecture,
        instruction: &str,
    ) -> Result<Generation> {
        let spec = self.ask(prompts::feature_spec(instruction)).await?;
        let features = prompts::bullet_items(&spec);
        debug!(features = features.len(), "feature specification received");

        let mut files = Vec::with_capacity(architecture.files_to_create.len());
        for planned in &architecture.files_to_create {
            let code = self
                .ask(prompts::web_file(instruction, &spec, planned.kind))
                .await?;
            files.push(GeneratedFile::for_plan(planned, &architecture.language, code));
        }

        if let Some(script) = files.iter_mut().find(|f| f.kind == FileKind::Script) {
            let improved = self
                .ask(prompts::enhancement(instruction, &spec, &script.code))
                .await?;
            if !improved.trim().is_empty() {
                script.code = improved;
            }
        }

        Ok(Generation { files, features })
    }

    /// Checklist request with a fail-closed decode, then one exhaustive prompt.
    async fn generate_single_advanced(
        &self,
        architecture: &Architecture,
        instruction: &str,
    ) -> Result<Generation> {
        let category = AppCategory::classify(instruction);
        let request = CompletionRequest::new(prompts::checklist(instruction, category))
            .with_system(prompts::SYSTEM_PROMPT);
        let raw = self.client.complete(request).await?;
        let (checklist, fell_back) = FeatureChecklist::decode_or_fallback(&raw, category);
        debug!(fell_back, features = checklist.features.len(), "feature checklist ready");

        let planned: &PlannedFile = architecture.files_to_create.first().ok_or_else(|| {
            SuperAgentError::Generation("single-file plan has no file".to_string())
        })?;
        let code = self
            .ask(prompts::exhaustive(instruction, architecture, &checklist))
            .await?;

        Ok(Generation {
            files: vec![GeneratedFile::for_plan(planned, &architecture.language, code)],
            features: checklist.features,
        })
    }

    async fn generate_standard(
        &self,
        architecture: &Architecture,
        instruction: &str,
    ) -> Result<Generation> {
        let mut files = Vec::with_capacity(architecture.files_to_create.len());
        for planned in &architecture.files_to_create {
            let code = self
                .ask(prompts::standard(instruction, architecture, planned))
                .await?;
            files.push(GeneratedFile::for_plan(planned, &architecture.language, code));
        }
        Ok(Generation {
            files,
            features: Vec::new(),
        })
    }
}
