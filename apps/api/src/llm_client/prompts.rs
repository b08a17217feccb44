// Shared prompt fragments.
// Each stage template lives in pipeline::prompts; this file only holds cross-cutting pieces.

/// Closing instruction appended to every prompt that expects a JSON reply.
pub const JSON_ONLY_INSTRUCTION: &str =
    "Only return valid JSON. No explanations or formatting. No markdown or triple backticks.";

/// Wraps free text in triple quotes so the model treats it as data, not instructions.
pub fn quoted_block(text: &str) -> String {
    format!("\"\"\"\n{text}\n\"\"\"")
}
