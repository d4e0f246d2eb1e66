use super::error::{ModelError, ModelResult};

pub const DEFAULT_TAG: &str = "latest";

const SHORT_ID_LEN: usize = 12;

/// Splits `repo[:tag][@digest]` into `(repo, tag)`.
///
/// A colon followed by a `/` is a registry port (`localhost:5000/app`), not a
/// tag separator. Missing tags fall back to `latest`.
pub fn parse_reference(reference: &str) -> ModelResult<(String, String)> {
    let invalid = || ModelError::InvalidReference {
        reference: reference.to_string(),
    };

    let reference = reference.trim();
    let name_part = match reference.split_once('@') {
        Some((name, _digest)) => name,
        None => reference,
    };

    let (name, tag) = match name_part.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (name_part, DEFAULT_TAG),
    };

    if name.is_empty() || tag.is_empty() {
        return Err(invalid());
    }

    Ok((name.to_string(), tag.to_string()))
}

pub fn short_id(id: &str) -> String {
    let digest = id.strip_prefix("sha256:").unwrap_or(id);
    digest.chars().take(SHORT_ID_LEN).collect()
}
