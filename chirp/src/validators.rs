use email_address::EmailAddress;
use url::Url;

use crate::{
    config::Limits,
    errors::{ValidationError, ValidationResult},
    model::PhotoFile,
};

/// Alert shown when an attachment exceeds the size limit.
pub const PHOTO_TOO_LARGE_MESSAGE: &str = "Only photos of 1 MB or less can be uploaded.";

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Length as the browser counts it, in UTF-16 code units.
pub fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Longest prefix of `text` that fits in `max` UTF-16 code units without
/// splitting a surrogate pair.
pub fn truncate_units(text: &str, max: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|ch| {
            used += ch.len_utf16();
            used <= max
        })
        .collect()
}

/// Post text must be non-empty and at most `max_tweet_chars` UTF-16 code units.
pub fn validate_tweet(text: &str, limits: &Limits) -> ValidationResult<()> {
    if text.is_empty() {
        return Err(ValidationError::single("tweet", "required", "Write something first."));
    }
    let len = text_len(text);
    if len > limits.max_tweet_chars {
        return Err(ValidationError::single(
            "tweet",
            "too_long",
            format!("Posts are limited to {} characters ({len} given).", limits.max_tweet_chars),
        ));
    }
    Ok(())
}

pub fn validate_photo(file: &PhotoFile, limits: &Limits) -> ValidationResult<()> {
    if file.size() > limits.max_photo_bytes {
        return Err(ValidationError::single("photo", "too_large", PHOTO_TOO_LARGE_MESSAGE));
    }
    Ok(())
}

pub fn validate_display_name(name: &str, limits: &Limits) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::single("displayName", "required", "Name cannot be empty."));
    }
    if text_len(name) > limits.max_display_name_chars {
        return Err(ValidationError::single(
            "displayName",
            "too_long",
            format!("Names are limited to {} characters.", limits.max_display_name_chars),
        ));
    }
    Ok(())
}

/// Required-field check shared by the authentication forms.
pub fn require_filled(fields: &[(&str, &str)]) -> ValidationResult<()> {
    let issues: Vec<_> = fields
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| crate::errors::ValidationIssue::new(*field, "required", format!("{field} is required")))
        .collect();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues))
    }
}
