//! Pipeline Runner — threads one owned `PipelineState` through the stage chain.
//!
//! The runner is immutable and shared across requests behind an `Arc`; every
//! run owns its state and its snapshots. Session ids are correlation tokens
//! only, nothing here is keyed by them.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm_client::CompletionClient;
use crate::pipeline::stages::{default_chain, Stage};
use crate::pipeline::state::{PipelineState, StageName, StageOutcome, StageSnapshot};
use crate::pipeline::PipelineError;

/// What the runner does after a stage writes an error sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorPolicy {
    /// Keep going; downstream stages see the sentinel and record their own
    /// "skipped" sentinel without calling the model.
    #[default]
    Continue,
    /// Stop the chain at the failing stage; later keys stay absent.
    Halt,
}

impl FromStr for StageErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(StageErrorPolicy::Continue),
            "halt" => Ok(StageErrorPolicy::Halt),
            other => Err(format!(
                "unknown stage error policy '{other}' (expected 'continue' or 'halt')"
            )),
        }
    }
}

/// Result of one pass through (part of) the chain.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub session_id: Uuid,
    /// One entry per executed stage, in order.
    pub snapshots: Vec<StageSnapshot>,
    pub state: PipelineState,
    pub halted_at: Option<StageName>,
}

pub struct PipelineRunner {
    client: Arc<dyn CompletionClient>,
    stages: Vec<Box<dyn Stage>>,
    policy: StageErrorPolicy,
}

impl PipelineRunner {
    pub fn new(client: Arc<dyn CompletionClient>, policy: StageErrorPolicy) -> Self {
        Self {
            client,
            stages: default_chain(),
            policy,
        }
    }

    pub fn policy(&self) -> StageErrorPolicy {
        self.policy
    }

    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs the whole chain from résumé text. Fails fast, before any model
    /// call, when `resume_text` is missing or blank.
    pub async fn run(&self, initial: PipelineState) -> Result<RunReport, PipelineError> {
        match initial.resume_text.as_deref() {
            Some(text) if !text.trim().is_empty() => {}
            _ => return Err(PipelineError::MissingResumeText),
        }

        let session_id = Uuid::new_v4();
        info!("Pipeline run {session_id} started");
        self.run_chain(session_id, 0, initial).await
    }

    /// Re-enters the chain at `extract_insights` or `generate_questions` with a
    /// caller-supplied state. Skipped stages are not reconstructed.
    pub async fn resume_from(
        &self,
        stage: StageName,
        partial: PipelineState,
    ) -> Result<RunReport, PipelineError> {
        let has_summary = partial
            .summary
            .as_ref()
            .and_then(StageOutcome::as_ok)
            .is_some();
        let has_insights = partial
            .insights
            .as_ref()
            .and_then(StageOutcome::as_ok)
            .is_some();

        match stage {
            StageName::ExtractInsights if !has_summary => {
                return Err(PipelineError::MissingInput {
                    stage,
                    key: "summary",
                })
            }
            StageName::GenerateQuestions if !has_summary && !has_insights => {
                return Err(PipelineError::MissingInput {
                    stage,
                    key: "summary",
                })
            }
            StageName::ExtractInsights | StageName::GenerateQuestions => {}
            other => return Err(PipelineError::InvalidResumePoint(other)),
        }

        let start = self
            .stages
            .iter()
            .position(|s| s.name() == stage)
            .ok_or(PipelineError::InvalidResumePoint(stage))?;

        let session_id = Uuid::new_v4();
        info!("Pipeline run {session_id} resumed at {stage}");
        self.run_chain(session_id, start, partial).await
    }

    async fn run_chain(
        &self,
        session_id: Uuid,
        start: usize,
        mut state: PipelineState,
    ) -> Result<RunReport, PipelineError> {
        let mut snapshots = Vec::with_capacity(self.stages.len() - start);
        let mut halted_at = None;

        for stage in &self.stages[start..] {
            let name = stage.name();
            debug!("[{session_id}] running stage {name}");

            let update = stage.execute(self.client.as_ref(), &state).await?;
            let failed = update.has_failure();
            for (key, error) in update.failures() {
                warn!("[{session_id}] stage {name} wrote error sentinel for '{key}': {error}");
            }

            state.merge(update);
            snapshots.push(StageSnapshot {
                stage: name,
                state: state.clone(),
            });

            if failed && self.policy == StageErrorPolicy::Halt {
                warn!("[{session_id}] halting after failed stage {name}");
                halted_at = Some(name);
                break;
            }
        }

        info!(
            "Pipeline run {session_id} finished: {} stage(s) executed{}",
            snapshots.len(),
            halted_at
                .map(|s| format!(", halted at {s}"))
                .unwrap_or_default()
        );

        Ok(RunReport {
            session_id,
            snapshots,
            state,
            halted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::scripted::ScriptedClient;

    const WORK: &str = r#"{"work_experiences": [{"company": "Acme Corp", "role": "Software Engineer",
        "start_date": "2019-01", "end_date": "Present", "description": "Backend services"}]}"#;
    const EDUCATION: &str = r#"{"education": [{"institution": "State University",
        "degree": "BS Computer Science", "start_date": "2015-09", "end_date": "2019-05"}]}"#;
    const SUMMARY: &str = "Software engineer at Acme Corp since 2019 with a BS in Computer Science.";
    const INSIGHTS: &str = r#"{"insights": ["5+ years of experience", "CS degree"]}"#;
    const QUESTIONS: &str =
        r#"{"questions": ["Q1?", "Q2?", "Q3?", "Q4?", "Q5?"]}"#;

    fn happy_client() -> ScriptedClient {
        ScriptedClient::new()
            .on("Extract all work experience", WORK)
            .on("Extract all education", EDUCATION)
            .on("Generate a professional, concise summary", SUMMARY)
            .on("extract a JSON list of insights", INSIGHTS)
            .on("generate a JSON list of 5 interview questions", QUESTIONS)
    }

    fn build_runner(
        client: ScriptedClient,
        policy: StageErrorPolicy,
    ) -> (Arc<ScriptedClient>, PipelineRunner) {
        let client = Arc::new(client);
        let runner = PipelineRunner::new(client.clone(), policy);
        (client, runner)
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("halt".parse::<StageErrorPolicy>().unwrap(), StageErrorPolicy::Halt);
        assert_eq!(
            " Continue ".parse::<StageErrorPolicy>().unwrap(),
            StageErrorPolicy::Continue
        );
        assert!("retry".parse::<StageErrorPolicy>().is_err());
        assert_eq!(StageErrorPolicy::default(), StageErrorPolicy::Continue);
    }

    #[tokio::test]
    async fn test_full_run_fills_every_key() {
        let (client, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let report = runner
            .run(PipelineState::from_resume_text("Jane Doe, Software Engineer at Acme Corp"))
            .await
            .unwrap();

        assert_eq!(report.snapshots.len(), 4);
        assert!(report.halted_at.is_none());
        assert_eq!(report.state.summary_text(), Some(SUMMARY));
        assert_eq!(report.state.first_question(), Some("Q1?"));
        assert_eq!(
            report.state.insights,
            Some(StageOutcome::Ok(vec![
                "5+ years of experience".to_string(),
                "CS degree".to_string()
            ]))
        );
        // work, education, summary, insights, questions
        assert_eq!(client.call_count(), 5);
    }

    #[tokio::test]
    async fn test_snapshots_accumulate_monotonically() {
        let (_, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let report = runner
            .run(PipelineState::from_resume_text("Jane Doe"))
            .await
            .unwrap();

        let stages: Vec<StageName> = report.snapshots.iter().map(|s| s.stage).collect();
        assert_eq!(stages, StageName::CHAIN.to_vec());

        let first = &report.snapshots[0].state;
        assert!(first.work.is_some() && first.education.is_some());
        assert!(first.summary.is_none());

        let second = &report.snapshots[1].state;
        assert_eq!(second.work, first.work);
        assert!(second.summary.is_some() && second.insights.is_none());

        assert_eq!(report.snapshots[3].state, report.state);
    }

    #[tokio::test]
    async fn test_run_without_resume_text_makes_no_calls() {
        let (client, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let err = runner.run(PipelineState::default()).await.unwrap_err();
        assert_eq!(err, PipelineError::MissingResumeText);

        let err = runner
            .run(PipelineState::from_resume_text(""))
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::MissingResumeText);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_continue_policy_propagates_sentinels_without_model_calls() {
        let client = ScriptedClient::new()
            .on("Extract all work experience", "not json at all")
            .on("Extract all education", EDUCATION);
        let (client, runner) = build_runner(client, StageErrorPolicy::Continue);

        let report = runner
            .run(PipelineState::from_resume_text("Jane Doe"))
            .await
            .unwrap();

        assert_eq!(report.snapshots.len(), 4);
        assert!(report.state.work.as_ref().unwrap().is_failed());
        assert!(report.state.summary.as_ref().unwrap().is_failed());
        assert!(report.state.insights.as_ref().unwrap().is_failed());
        let questions_error = report.state.questions.as_ref().unwrap().error().unwrap();
        assert!(questions_error.starts_with("generate_questions skipped: upstream 'insights'"));
        // Only the two extraction calls reached the model.
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_halt_policy_stops_at_failing_stage() {
        let client = ScriptedClient::new()
            .on("Extract all work experience", WORK)
            .on("Extract all education", EDUCATION)
            .fail_on("Generate a professional, concise summary", 500, "upstream down");
        let (client, runner) = build_runner(client, StageErrorPolicy::Halt);

        let report = runner
            .run(PipelineState::from_resume_text("Jane Doe"))
            .await
            .unwrap();

        assert_eq!(report.halted_at, Some(StageName::GenerateSummary));
        assert_eq!(report.snapshots.len(), 2);
        assert!(report.state.summary.as_ref().unwrap().is_failed());
        assert!(report.state.insights.is_none());
        assert!(report.state.questions.is_none());
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_resume_at_questions_from_summary_only() {
        let (client, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let report = runner
            .resume_from(
                StageName::GenerateQuestions,
                PipelineState::from_summary("Staff engineer, 10 years in payments."),
            )
            .await
            .unwrap();

        assert_eq!(report.snapshots.len(), 1);
        assert_eq!(report.state.first_question(), Some("Q1?"));
        assert!(report.state.work.is_none());
        assert!(report.state.resume_text.is_none());
        assert!(client.calls()[0]
            .prompt
            .contains("Staff engineer, 10 years in payments."));
    }

    #[tokio::test]
    async fn test_resume_at_insights_runs_remaining_chain() {
        let (client, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let report = runner
            .resume_from(StageName::ExtractInsights, PipelineState::from_summary(SUMMARY))
            .await
            .unwrap();

        let stages: Vec<StageName> = report.snapshots.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![StageName::ExtractInsights, StageName::GenerateQuestions]
        );
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_resume_at_insights_with_empty_summary_does_not_fail() {
        let (client, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let report = runner
            .resume_from(StageName::ExtractInsights, PipelineState::from_summary(""))
            .await
            .unwrap();
        assert_eq!(report.state.insights, Some(StageOutcome::Ok(vec![])));
        // Only question generation called the model.
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resume_rejects_early_stages() {
        let (_, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let err = runner
            .resume_from(
                StageName::GenerateSummary,
                PipelineState::from_summary(SUMMARY),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidResumePoint(StageName::GenerateSummary)
        );
    }

    #[tokio::test]
    async fn test_resume_without_summary_is_precondition_error() {
        let (client, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let err = runner
            .resume_from(StageName::GenerateQuestions, PipelineState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { key: "summary", .. }));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_each_run_gets_a_fresh_session_id() {
        let (_, runner) = build_runner(happy_client(), StageErrorPolicy::Continue);
        let a = runner
            .run(PipelineState::from_resume_text("Jane"))
            .await
            .unwrap();
        let b = runner
            .run(PipelineState::from_resume_text("Jane"))
            .await
            .unwrap();
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.state, b.state);
    }
}
