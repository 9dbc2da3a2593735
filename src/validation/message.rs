use super::{
    MAX_MESSAGE_LEN, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS, UrlPolicy, ValidationError,
    ValidationResult, validate_conversation_url,
};

/// Fields shared by every message-carrying request.
pub struct MessageFields<'a> {
    pub message: &'a str,
    pub platform: &'a str,
    pub conversation_url: Option<&'a str>,
    pub timeout_seconds: u64,
}

/// Check a request against the configured platform and the accepted ranges.
pub fn validate_message_fields(fields: &MessageFields<'_>, platform: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if fields.message.trim().is_empty() {
        errors.push(ValidationError::new("message", "Cannot be empty"));
    } else if fields.message.chars().count() > MAX_MESSAGE_LEN {
        errors.push(ValidationError::new(
            "message",
            format!("Must be at most {} characters", MAX_MESSAGE_LEN),
        ));
    }

    if !fields.platform.eq_ignore_ascii_case(platform) {
        errors.push(ValidationError::new(
            "platform",
            format!(
                "Unsupported platform '{}', only '{}' is available",
                fields.platform, platform
            ),
        ));
    }

    if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&fields.timeout_seconds) {
        errors.push(ValidationError::new(
            "timeout_seconds",
            format!(
                "Must be between {} and {}",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS
            ),
        ));
    }

    if let Some(url) = fields.conversation_url
        && let Err(e) = validate_conversation_url(url, &UrlPolicy::permissive())
    {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
