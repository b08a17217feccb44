//! Step functions — prompt → completion → validation for each stage.
//!
//! A step never returns an error for model, parse or schema failures; those are
//! folded into a `StageOutcome::Failed` sentinel. The only hard error is the
//! résumé-text precondition, checked before any model call.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::llm_client::prompts::{quoted_block, JSON_ONLY_INSTRUCTION};
use crate::llm_client::CompletionClient;
use crate::models::resume::{
    Education, EducationList, InterviewQuestions, ResumeInsights, WorkExperience,
    WorkExperienceList,
};
use crate::pipeline::prompts::{
    EDUCATION_EXTRACTION_PROMPT, INSIGHTS_PROMPT, QUESTIONS_PROMPT, SUMMARY_PROMPT,
    WORK_EXTRACTION_PROMPT,
};
use crate::pipeline::state::StageOutcome;
use crate::pipeline::validation::{
    education_date_warnings, parse_stage_response, work_date_warnings, StageError,
};
use crate::pipeline::PipelineError;

/// Deterministic decoding for extraction stages.
pub const EXTRACTION_TEMPERATURE: f32 = 0.0;
/// Generative stages (summary, questions).
pub const GENERATION_TEMPERATURE: f32 = 0.3;

const EXPECTED_QUESTION_COUNT: usize = 5;

/// Output of the first stage: two independent extractions from the same text.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeExtraction {
    pub work: StageOutcome<WorkExperienceList>,
    pub education: StageOutcome<EducationList>,
}

/// What the question generator works from.
#[derive(Debug, Clone, Copy)]
pub enum QuestionSource<'a> {
    Insights(&'a [String]),
    /// Caller-supplied summary, used when the chain is resumed at question generation.
    Summary(&'a str),
}

#[derive(Serialize)]
struct StructuredResume<'a> {
    work_experiences: &'a [WorkExperience],
    education: &'a [Education],
}

pub async fn extract_resume_data(
    client: &dyn CompletionClient,
    resume_text: &str,
) -> Result<ResumeExtraction, PipelineError> {
    if resume_text.trim().is_empty() {
        return Err(PipelineError::MissingResumeText);
    }

    let work = extract_work_experience(client, resume_text).await;
    let education = extract_education(client, resume_text).await;

    Ok(ResumeExtraction { work, education })
}

pub async fn extract_work_experience(
    client: &dyn CompletionClient,
    resume_text: &str,
) -> StageOutcome<WorkExperienceList> {
    let prompt = render_work_prompt(resume_text);
    match request_json::<WorkExperienceList>(client, &prompt, EXTRACTION_TEMPERATURE).await {
        Ok(list) => {
            for warning in work_date_warnings(&list) {
                warn!("Work experience date format: {warning}");
            }
            info!(
                "Extracted {} work experience entries",
                list.work_experiences.len()
            );
            StageOutcome::Ok(list)
        }
        Err(e) => failed("Work experience extraction", e),
    }
}

pub async fn extract_education(
    client: &dyn CompletionClient,
    resume_text: &str,
) -> StageOutcome<EducationList> {
    let prompt = render_education_prompt(resume_text);
    match request_json::<EducationList>(client, &prompt, EXTRACTION_TEMPERATURE).await {
        Ok(list) => {
            for warning in education_date_warnings(&list) {
                warn!("Education date format: {warning}");
            }
            info!("Extracted {} education entries", list.education.len());
            StageOutcome::Ok(list)
        }
        Err(e) => failed("Education extraction", e),
    }
}

/// Produces the plain-text summary. Empty inputs are allowed; the prompt asks
/// the model to state that no data was provided.
pub async fn generate_summary(
    client: &dyn CompletionClient,
    work_experiences: &[WorkExperience],
    education: &[Education],
) -> StageOutcome<String> {
    let prompt = match render_summary_prompt(work_experiences, education) {
        Ok(prompt) => prompt,
        Err(e) => return StageOutcome::failed(format!("Summary generation failed: {e}")),
    };

    let raw = match client.complete(&prompt, GENERATION_TEMPERATURE).await {
        Ok(raw) => raw,
        Err(e) => return failed("Summary generation", StageError::Model(e)),
    };

    let summary = raw.trim();
    if summary.is_empty() {
        return failed("Summary generation", StageError::EmptyResponse);
    }
    StageOutcome::Ok(summary.to_string())
}

/// Extracts insight strings from a summary. A blank summary yields no insights
/// and no model call.
pub async fn extract_insights(
    client: &dyn CompletionClient,
    summary: &str,
) -> StageOutcome<Vec<String>> {
    if summary.trim().is_empty() {
        debug!("Empty summary, skipping insight extraction");
        return StageOutcome::Ok(Vec::new());
    }

    let prompt = render_insights_prompt(summary);
    match request_json::<ResumeInsights>(client, &prompt, EXTRACTION_TEMPERATURE).await {
        Ok(parsed) => StageOutcome::Ok(parsed.insights),
        Err(e) => failed("Insight extraction", e),
    }
}

pub async fn generate_questions(
    client: &dyn CompletionClient,
    source: QuestionSource<'_>,
) -> StageOutcome<Vec<String>> {
    let prompt = render_questions_prompt(source);
    match request_json::<InterviewQuestions>(client, &prompt, GENERATION_TEMPERATURE).await {
        Ok(parsed) => {
            if parsed.questions.len() != EXPECTED_QUESTION_COUNT {
                warn!(
                    "Expected {} interview questions, model returned {}",
                    EXPECTED_QUESTION_COUNT,
                    parsed.questions.len()
                );
            }
            StageOutcome::Ok(parsed.questions)
        }
        Err(e) => failed("Interview question generation", e),
    }
}

async fn request_json<T: serde::de::DeserializeOwned>(
    client: &dyn CompletionClient,
    prompt: &str,
    temperature: f32,
) -> Result<T, StageError> {
    let raw = client.complete(prompt, temperature).await?;
    parse_stage_response(&raw)
}

fn failed<T>(label: &str, err: StageError) -> StageOutcome<T> {
    let message = format!("{label} failed: {err}");
    warn!("{message}");
    StageOutcome::failed(message)
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt rendering
// ────────────────────────────────────────────────────────────────────────────

fn render_work_prompt(resume_text: &str) -> String {
    WORK_EXTRACTION_PROMPT
        .replace("{resume_text}", &quoted_block(resume_text))
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
}

fn render_education_prompt(resume_text: &str) -> String {
    EDUCATION_EXTRACTION_PROMPT
        .replace("{resume_text}", &quoted_block(resume_text))
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
}

fn render_summary_prompt(
    work_experiences: &[WorkExperience],
    education: &[Education],
) -> Result<String, serde_json::Error> {
    let structured_json = serde_json::to_string_pretty(&StructuredResume {
        work_experiences,
        education,
    })?;
    Ok(SUMMARY_PROMPT.replace("{structured_json}", &structured_json))
}

fn render_insights_prompt(summary: &str) -> String {
    INSIGHTS_PROMPT
        .replace("{summary}", &quoted_block(summary))
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
}

fn render_questions_prompt(source: QuestionSource<'_>) -> String {
    let (label, heading, body) = match source {
        QuestionSource::Insights(insights) => (
            "insights",
            "Insights",
            insights
                .iter()
                .map(|insight| format!("- {insight}"))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        QuestionSource::Summary(summary) => ("summary", "Summary", quoted_block(summary)),
    };
    QUESTIONS_PROMPT
        .replace("{source_label}", label)
        .replace("{source_heading}", heading)
        .replace("{source}", &body)
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
}
