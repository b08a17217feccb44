//! Response validation — turns raw completion text into a schema-checked value.
//!
//! Two distinct failure points: the text is not JSON (`Parse`), or it is JSON
//! that does not match the stage schema (`Schema`). Neither ever panics.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::llm_client::{strip_json_fences, LlmError};
use crate::models::resume::{EducationList, WorkExperienceList};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("model returned empty content")]
    EmptyResponse,

    #[error("response is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("response does not match the expected schema: {0}")]
    Schema(#[source] serde_json::Error),
}

/// Parses a stage reply into `T`.
pub fn parse_stage_response<T: DeserializeOwned>(raw: &str) -> Result<T, StageError> {
    let text = strip_json_fences(raw);
    if text.is_empty() {
        return Err(StageError::EmptyResponse);
    }
    let value: Value = serde_json::from_str(text).map_err(StageError::Parse)?;
    serde_json::from_value(value).map_err(StageError::Schema)
}

/// `true` for a well-formed `YYYY-MM` month.
pub fn is_year_month(s: &str) -> bool {
    s.len() == 7 && NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").is_ok()
}

fn check_date(field: &str, owner: &str, value: Option<&str>, allow_present: bool) -> Option<String> {
    let value = value?;
    if is_year_month(value) || (allow_present && value == "Present") {
        return None;
    }
    Some(format!("{owner}: {field} '{value}' is not YYYY-MM"))
}

/// Date fields that do not follow the requested format. Informational only.
pub fn work_date_warnings(list: &WorkExperienceList) -> Vec<String> {
    list.work_experiences
        .iter()
        .flat_map(|w| {
            [
                check_date("start_date", &w.company, w.start_date.as_deref(), false),
                check_date("end_date", &w.company, w.end_date.as_deref(), true),
            ]
        })
        .flatten()
        .collect()
}

pub fn education_date_warnings(list: &EducationList) -> Vec<String> {
    list.education
        .iter()
        .flat_map(|e| {
            [
                check_date("start_date", &e.institution, e.start_date.as_deref(), false),
                check_date("end_date", &e.institution, e.end_date.as_deref(), true),
            ]
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Education, InterviewQuestions, ResumeInsights, WorkExperience};

    #[test]
    fn test_parse_valid_insights() {
        let parsed: ResumeInsights =
            parse_stage_response("  {\"insights\": [\"5 years of Rust\"]}\n").unwrap();
        assert_eq!(parsed.insights, vec!["5 years of Rust".to_string()]);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let parsed: InterviewQuestions =
            parse_stage_response("```json\n{\"questions\": [\"Why?\"]}\n```").unwrap();
        assert_eq!(parsed.questions.len(), 1);
    }

    #[test]
    fn test_non_json_is_parse_error() {
        let err = parse_stage_response::<ResumeInsights>("Sure! Here are the insights:")
            .unwrap_err();
        assert!(matches!(err, StageError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn test_missing_field_is_schema_error() {
        let err = parse_stage_response::<InterviewQuestions>("{\"items\": []}").unwrap_err();
        assert!(matches!(err, StageError::Schema(_)), "got {err:?}");
    }

    #[test]
    fn test_wrong_element_type_is_schema_error() {
        let err = parse_stage_response::<ResumeInsights>("{\"insights\": \"one\"}").unwrap_err();
        assert!(matches!(err, StageError::Schema(_)));
    }

    #[test]
    fn test_blank_reply_is_empty_response() {
        let err = parse_stage_response::<ResumeInsights>(" \n ").unwrap_err();
        assert!(matches!(err, StageError::EmptyResponse));
    }

    #[test]
    fn test_is_year_month() {
        assert!(is_year_month("2019-01"));
        assert!(!is_year_month("2019-13"));
        assert!(!is_year_month("2019-1"));
        assert!(!is_year_month("Jan 2019"));
    }

    #[test]
    fn test_work_date_warnings_allow_present_end_date() {
        let list = WorkExperienceList {
            work_experiences: vec![WorkExperience {
                company: "Acme Corp".to_string(),
                role: "Software Engineer".to_string(),
                start_date: Some("2019-01".to_string()),
                end_date: Some("Present".to_string()),
                description: String::new(),
            }],
        };
        assert!(work_date_warnings(&list).is_empty());
    }

    #[test]
    fn test_education_date_warnings_flag_bad_format() {
        let list = EducationList {
            education: vec![Education {
                institution: "State University".to_string(),
                degree: "BS Computer Science".to_string(),
                field: None,
                start_date: Some("Fall 2015".to_string()),
                end_date: Some("Present".to_string()),
            }],
        };
        let warnings = education_date_warnings(&list);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Fall 2015"));
    }
}
