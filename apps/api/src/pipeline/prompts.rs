// Pipeline prompt templates.
// Placeholders are filled with `str::replace`; `{json_only}` is always JSON_ONLY_INSTRUCTION.

/// Work experience extraction. Replace: {resume_text}, {json_only}
pub const WORK_EXTRACTION_PROMPT: &str = r#"Extract all work experience details from the following resume in this JSON format:
{
  "work_experiences": [
    {
      "company": "...",
      "role": "...",
      "start_date": "YYYY-MM",
      "end_date": "YYYY-MM or Present",
      "description": "..."
    }
  ]
}

Resume:
{resume_text}

{json_only}"#;

/// Education extraction. Replace: {resume_text}, {json_only}
pub const EDUCATION_EXTRACTION_PROMPT: &str = r#"Extract all education details from the following resume in this JSON format:
{
  "education": [
    {
      "institution": "...",
      "degree": "...",
      "field": "...",
      "start_date": "YYYY-MM",
      "end_date": "YYYY-MM or Present"
    }
  ]
}

Resume:
{resume_text}

{json_only}"#;

/// Summary generation — the only plain-text stage. Replace: {structured_json}
pub const SUMMARY_PROMPT: &str = r#"Generate a professional, concise summary of this candidate's work experience and education.
If no work experience or education is listed, say so plainly instead of inventing any.

Structured Resume Data:
{structured_json}

Return only the summary text."#;

/// Insight extraction. Replace: {summary}, {json_only}
pub const INSIGHTS_PROMPT: &str = r#"From the resume below, extract a JSON list of insights such as:
- Total years of experience
- Key technical skills or achievements
- Leadership roles
- Education level and relevance
Do not use these points as keys of the object. Extract as many distinct insights as the resume supports.
Return the result in this format:
{
  "insights": [
    "...",
    "..."
  ]
}

Resume:
{summary}

{json_only}"#;

/// Interview question generation. Replace: {source_label}, {source_heading}, {source}, {json_only}
pub const QUESTIONS_PROMPT: &str = r#"Given the candidate {source_label} below, generate a JSON list of 5 interview questions tailored to their profile.

Return:
{
  "questions": [
    "...",
    "..."
  ]
}

{source_heading}:
{source}

{json_only}"#;
