use serde::{Deserialize, Serialize};

use super::architecture::{FileKind, PlannedFile};

/// A file produced by the code generator, written verbatim by the materializer.
///
/// `code` never retains markdown fences; the generator strips them before
/// constructing the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: FileKind,

    pub code: String,

    pub language: String,
}

impl GeneratedFile {
    /// Build a generated file for a planned slot.
    pub fn for_plan(planned: &PlannedFile, project_language: &str, code: String) -> Self {
        Self {
            name: planned.name.clone(),
            kind: planned.kind,
            code,
            language: planned.kind.file_language(project_language),
        }
    }

    /// File name with extension.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension(&self.language))
    }
}
