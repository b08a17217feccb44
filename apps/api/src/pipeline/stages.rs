//! Stage adapters — read a stage's inputs out of `PipelineState`, run the step
//! function, and return the partial update.
//!
//! Each stage matches its inputs explicitly: a successful value is used, an
//! error sentinel short-circuits into this stage's own sentinel without a model
//! call, and an absent input is either defaulted or a precondition error.

use async_trait::async_trait;

use crate::llm_client::CompletionClient;
use crate::pipeline::state::{PipelineState, StageName, StageOutcome, StageUpdate};
use crate::pipeline::steps::{
    extract_insights, extract_resume_data, generate_questions, generate_summary, QuestionSource,
};
use crate::pipeline::PipelineError;

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    async fn execute(
        &self,
        client: &dyn CompletionClient,
        state: &PipelineState,
    ) -> Result<StageUpdate, PipelineError>;
}

/// The fixed chain: extract → summarize → insights → questions.
pub fn default_chain() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(ExtractResumeDataStage),
        Box::new(GenerateSummaryStage),
        Box::new(ExtractInsightsStage),
        Box::new(GenerateQuestionsStage),
    ]
}

fn upstream_failed<T>(stage: StageName, key: &str, error: &str) -> StageOutcome<T> {
    StageOutcome::failed(format!("{stage} skipped: upstream '{key}' failed: {error}"))
}

pub struct ExtractResumeDataStage;

#[async_trait]
impl Stage for ExtractResumeDataStage {
    fn name(&self) -> StageName {
        StageName::ExtractResumeData
    }

    async fn execute(
        &self,
        client: &dyn CompletionClient,
        state: &PipelineState,
    ) -> Result<StageUpdate, PipelineError> {
        let resume_text = state
            .resume_text
            .as_deref()
            .ok_or(PipelineError::MissingResumeText)?;
        let extraction = extract_resume_data(client, resume_text).await?;
        Ok(StageUpdate {
            work: Some(extraction.work),
            education: Some(extraction.education),
            ..StageUpdate::default()
        })
    }
}

pub struct GenerateSummaryStage;

#[async_trait]
impl Stage for GenerateSummaryStage {
    fn name(&self) -> StageName {
        StageName::GenerateSummary
    }

    async fn execute(
        &self,
        client: &dyn CompletionClient,
        state: &PipelineState,
    ) -> Result<StageUpdate, PipelineError> {
        let skipped = |key: &str, error: &str| StageUpdate {
            summary: Some(upstream_failed(self.name(), key, error)),
            ..StageUpdate::default()
        };

        let work = match &state.work {
            None => &[][..],
            Some(StageOutcome::Ok(list)) => list.work_experiences.as_slice(),
            Some(StageOutcome::Failed(sentinel)) => return Ok(skipped("work", &sentinel.error)),
        };
        let education = match &state.education {
            None => &[][..],
            Some(StageOutcome::Ok(list)) => list.education.as_slice(),
            Some(StageOutcome::Failed(sentinel)) => {
                return Ok(skipped("education", &sentinel.error))
            }
        };

        Ok(StageUpdate {
            summary: Some(generate_summary(client, work, education).await),
            ..StageUpdate::default()
        })
    }
}

pub struct ExtractInsightsStage;

#[async_trait]
impl Stage for ExtractInsightsStage {
    fn name(&self) -> StageName {
        StageName::ExtractInsights
    }

    async fn execute(
        &self,
        client: &dyn CompletionClient,
        state: &PipelineState,
    ) -> Result<StageUpdate, PipelineError> {
        let insights = match &state.summary {
            None => {
                return Err(PipelineError::MissingInput {
                    stage: self.name(),
                    key: "summary",
                })
            }
            Some(StageOutcome::Failed(sentinel)) => {
                upstream_failed(self.name(), "summary", &sentinel.error)
            }
            Some(StageOutcome::Ok(summary)) => extract_insights(client, summary).await,
        };
        Ok(StageUpdate {
            insights: Some(insights),
            ..StageUpdate::default()
        })
    }
}

/// Works from `insights` when present; otherwise from a caller-supplied summary.
pub struct GenerateQuestionsStage;

#[async_trait]
impl Stage for GenerateQuestionsStage {
    fn name(&self) -> StageName {
        StageName::GenerateQuestions
    }

    async fn execute(
        &self,
        client: &dyn CompletionClient,
        state: &PipelineState,
    ) -> Result<StageUpdate, PipelineError> {
        let questions = match (&state.insights, &state.summary) {
            (Some(StageOutcome::Ok(insights)), _) => {
                generate_questions(client, QuestionSource::Insights(insights)).await
            }
            (Some(StageOutcome::Failed(sentinel)), _) => {
                upstream_failed(self.name(), "insights", &sentinel.error)
            }
            (None, Some(StageOutcome::Ok(summary))) => {
                generate_questions(client, QuestionSource::Summary(summary)).await
            }
            (None, Some(StageOutcome::Failed(sentinel))) => {
                upstream_failed(self.name(), "summary", &sentinel.error)
            }
            (None, None) => {
                return Err(PipelineError::MissingInput {
                    stage: self.name(),
                    key: "insights",
                })
            }
        };
        Ok(StageUpdate {
            questions: Some(questions),
            ..StageUpdate::default()
        })
    }
}
