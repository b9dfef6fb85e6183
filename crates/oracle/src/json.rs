use serde::de::DeserializeOwned;

use crate::backend::OracleError;

/// Strips markdown fencing and chatter around a model's JSON answer.
pub fn strip_json_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unfenced = match trimmed.strip_prefix("```") {
        Some(rest) => {
            // Drop the info string (`json`) on the opening fence line.
            let body = rest.split_once('\n').map_or("", |(_, body)| body);
            body.trim_end().strip_suffix("```").unwrap_or(body).trim()
        }
        None => trimmed,
    };

    match (unfenced.find(['{', '[']), unfenced.rfind(['}', ']'])) {
        (Some(start), Some(end)) if start <= end => &unfenced[start..=end],
        _ => unfenced,
    }
}

pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, OracleError> {
    Ok(serde_json::from_str(strip_json_fences(raw))?)
}
