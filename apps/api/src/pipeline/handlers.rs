//! Axum route handlers for the screening pipeline.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::state::{PipelineState, StageName, StageOutcome};
use crate::pipeline::store::SessionRecord;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeResumeRequest {
    pub resume_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResumeResponse {
    pub session_id: Uuid,
    pub summary: Option<String>,
    /// First generated interview question, if question generation succeeded.
    pub question: Option<String>,
}

/// `session_id` is an opaque caller token; only a UUID issued by
/// analyze-resume can match a stored session.
#[derive(Debug, Deserialize)]
pub struct ResumeQuestionRequest {
    #[serde(default, alias = "thread_id")]
    pub session_id: String,
    #[serde(default)]
    pub resume_summary: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyze-resume
///
/// Runs the full chain and stores the final state under a fresh session id.
/// `summary` and `question` are null when their stage failed or was skipped.
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeResumeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResumeResponse>, AppError> {
    let Json(request) = payload?;
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation(
            "resume_text cannot be empty".to_string(),
        ));
    }

    let report = state
        .runner
        .run(PipelineState::from_resume_text(request.resume_text))
        .await?;

    let mut summary = None;
    let mut question = None;
    for snapshot in &report.snapshots {
        match snapshot.stage {
            StageName::GenerateSummary => {
                summary = snapshot.state.summary_text().map(str::to_owned);
            }
            StageName::GenerateQuestions => {
                question = snapshot.state.first_question().map(str::to_owned);
            }
            _ => {}
        }
    }

    if summary.is_none() {
        warn!("Session {} produced no summary", report.session_id);
    }

    state.store.put(report.session_id, report.state).await;

    Ok(Json(AnalyzeResumeResponse {
        session_id: report.session_id,
        summary,
        question,
    }))
}

/// POST /api/v1/resume-question
///
/// Generates interview questions straight from a summary, skipping extraction.
/// Without `resume_summary`, falls back to the summary stored for the session.
pub async fn handle_resume_question(
    State(state): State<AppState>,
    payload: Result<Json<ResumeQuestionRequest>, JsonRejection>,
) -> Result<Json<QuestionsResponse>, AppError> {
    let Json(request) = payload?;

    let summary = match request
        .resume_summary
        .filter(|s| !s.trim().is_empty())
    {
        Some(summary) => Some(summary),
        None => stored_summary(&state, &request.session_id).await,
    };

    let Some(summary) = summary else {
        return Err(AppError::MissingInput(format!(
            "resume_summary is required: session '{}' has no stored summary",
            request.session_id
        )));
    };

    info!(
        "Resuming session {} at {}",
        request.session_id,
        StageName::GenerateQuestions
    );

    let report = state
        .runner
        .resume_from(
            StageName::GenerateQuestions,
            PipelineState::from_summary(summary),
        )
        .await?;

    match report.state.questions {
        Some(StageOutcome::Ok(questions)) => Ok(Json(QuestionsResponse { questions })),
        Some(StageOutcome::Failed(sentinel)) => Err(AppError::StageFailed(sentinel.error)),
        None => Err(AppError::StageFailed(
            "Interview question generation did not run".to_string(),
        )),
    }
}

async fn stored_summary(state: &AppState, session_id: &str) -> Option<String> {
    let Ok(session_id) = Uuid::parse_str(session_id.trim()) else {
        debug!("Session id '{session_id}' is not a UUID, no stored summary");
        return None;
    };
    state
        .store
        .get(session_id)
        .await
        .and_then(|record| record.state.summary_text().map(str::to_owned))
}

/// GET /api/v1/sessions/:session_id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionRecord>, AppError> {
    state
        .store
        .get(session_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
}
