//! Pipeline state — the typed accumulator threaded through the stage chain.
//!
//! Every stage key holds a `StageOutcome`: either the validated value or an
//! `{"error": "..."}` sentinel. Readers must match on the variant; there is no
//! way to read structured fields out of a failed stage.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::models::resume::{EducationList, WorkExperienceList};

/// The four stages of the chain, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    ExtractResumeData,
    GenerateSummary,
    ExtractInsights,
    GenerateQuestions,
}

impl StageName {
    pub const CHAIN: [StageName; 4] = [
        StageName::ExtractResumeData,
        StageName::GenerateSummary,
        StageName::ExtractInsights,
        StageName::GenerateQuestions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::ExtractResumeData => "extract_resume_data",
            StageName::GenerateSummary => "generate_summary",
            StageName::ExtractInsights => "extract_insights",
            StageName::GenerateQuestions => "generate_questions",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageName::CHAIN
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// Data value standing in for a failed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSentinel {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageOutcome<T> {
    Ok(T),
    Failed(ErrorSentinel),
}

impl<T> StageOutcome<T> {
    pub fn failed(error: impl Into<String>) -> Self {
        StageOutcome::Failed(ErrorSentinel {
            error: error.into(),
        })
    }

    pub fn as_ok(&self) -> Option<&T> {
        match self {
            StageOutcome::Ok(value) => Some(value),
            StageOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StageOutcome::Ok(_) => None,
            StageOutcome::Failed(sentinel) => Some(&sentinel.error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

/// Accumulated state of one run. Keys are only ever added, never replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<StageOutcome<WorkExperienceList>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<StageOutcome<EducationList>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<StageOutcome<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<StageOutcome<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<StageOutcome<Vec<String>>>,
}

impl PipelineState {
    pub fn from_resume_text(resume_text: impl Into<String>) -> Self {
        Self {
            resume_text: Some(resume_text.into()),
            ..Self::default()
        }
    }

    /// State for re-entering the chain with a caller-supplied summary.
    pub fn from_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(StageOutcome::Ok(summary.into())),
            ..Self::default()
        }
    }

    pub fn merge(&mut self, update: StageUpdate) {
        merge_key(&mut self.work, update.work, "work");
        merge_key(&mut self.education, update.education, "education");
        merge_key(&mut self.summary, update.summary, "summary");
        merge_key(&mut self.insights, update.insights, "insights");
        merge_key(&mut self.questions, update.questions, "questions");
    }

    /// The summary, if the summary stage succeeded (or one was supplied).
    pub fn summary_text(&self) -> Option<&str> {
        self.summary
            .as_ref()
            .and_then(StageOutcome::as_ok)
            .map(String::as_str)
    }

    pub fn first_question(&self) -> Option<&str> {
        self.questions
            .as_ref()
            .and_then(StageOutcome::as_ok)
            .and_then(|questions| questions.first())
            .map(String::as_str)
    }
}

fn merge_key<T>(slot: &mut Option<T>, value: Option<T>, key: &str) {
    let Some(value) = value else {
        return;
    };
    if slot.is_some() {
        warn!("State key '{key}' is already set, keeping the first value");
        return;
    }
    *slot = Some(value);
}

/// Partial state produced by one stage, merged into the running `PipelineState`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageUpdate {
    pub work: Option<StageOutcome<WorkExperienceList>>,
    pub education: Option<StageOutcome<EducationList>>,
    pub summary: Option<StageOutcome<String>>,
    pub insights: Option<StageOutcome<Vec<String>>>,
    pub questions: Option<StageOutcome<Vec<String>>>,
}

impl StageUpdate {
    /// `(key, error)` for every sentinel carried by this update.
    pub fn failures(&self) -> Vec<(&'static str, &str)> {
        let mut failures = Vec::new();
        if let Some(e) = self.work.as_ref().and_then(StageOutcome::error) {
            failures.push(("work", e));
        }
        if let Some(e) = self.education.as_ref().and_then(StageOutcome::error) {
            failures.push(("education", e));
        }
        if let Some(e) = self.summary.as_ref().and_then(StageOutcome::error) {
            failures.push(("summary", e));
        }
        if let Some(e) = self.insights.as_ref().and_then(StageOutcome::error) {
            failures.push(("insights", e));
        }
        if let Some(e) = self.questions.as_ref().and_then(StageOutcome::error) {
            failures.push(("questions", e));
        }
        failures
    }

    pub fn has_failure(&self) -> bool {
        !self.failures().is_empty()
    }
}

/// The state as it stood right after `stage` finished.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSnapshot {
    pub stage: StageName,
    pub state: PipelineState,
}
