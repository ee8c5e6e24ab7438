use crate::scenario::Scenario;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON array found in response")]
    NoArray,
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Parse the span between the first `[` and the last `]` of a model reply.
///
/// Tolerates prose and code fences around the array; does not attempt to
/// repair the array itself.
pub fn extract_json_array(text: &str) -> Result<Vec<Scenario>, ParseError> {
    let start = text.find('[').ok_or(ParseError::NoArray)?;
    let end = text.rfind(']').ok_or(ParseError::NoArray)?;
    if end < start {
        return Err(ParseError::NoArray);
    }
    Ok(serde_json::from_str(&text[start..=end])?)
}
