// Résumé screening pipeline.
// extract_resume_data → generate_summary → extract_insights → generate_questions.
// All model calls go through llm_client::CompletionClient; stages never build a client.

use thiserror::Error;

pub mod handlers;
pub mod prompts;
pub mod runner;
pub mod stages;
pub mod state;
pub mod steps;
pub mod store;
pub mod validation;

pub use runner::{PipelineRunner, StageErrorPolicy};
pub use store::{InMemoryStateStore, StateStore};

use state::StageName;

/// Fatal precondition failures. Raised before any model call for the affected stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Missing 'resume_text': the pipeline needs non-empty résumé text")]
    MissingResumeText,

    #[error("Missing required input '{key}' for stage {stage}")]
    MissingInput { stage: StageName, key: &'static str },

    #[error(
        "Cannot resume at stage {0}: only extract_insights and generate_questions accept a caller-supplied summary"
    )]
    InvalidResumePoint(StageName),
}
