//! Domain types shared by every build stage.

pub mod architecture;
pub mod category;
pub mod checklist;
pub mod error;
pub mod generated;
pub mod language;
pub mod request;
pub mod text;

pub use architecture::{Architecture, FileKind, PlannedFile, ProjectType};
pub use category::AppCategory;
pub use checklist::FeatureChecklist;
pub use error::{Result, SuperAgentError};
pub use generated::GeneratedFile;
pub use language::Language;
pub use request::{BuildFlags, BuildRequest};
pub use text::clean_code_fences;
