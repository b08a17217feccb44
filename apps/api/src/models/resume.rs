use serde::{Deserialize, Serialize};

/// A single position extracted from résumé text.
///
/// Dates are kept as the model wrote them; `YYYY-MM` is requested in the prompt
/// and checked (warn-only) by `pipeline::validation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkExperience {
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub start_date: Option<String>,
    /// `YYYY-MM` or `Present`.
    #[serde(default)]
    pub end_date: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkExperienceList {
    pub work_experiences: Vec<WorkExperience>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EducationList {
    pub education: Vec<Education>,
}

/// Wire shape of the insight extraction reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResumeInsights {
    pub insights: Vec<String>,
}

/// Wire shape of the question generation reply. Five questions are requested;
/// the count is not part of the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterviewQuestions {
    pub questions: Vec<String>,
}
