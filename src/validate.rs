use crate::error::{ConfError, Result};

/// Validate a Postfix configuration key.
///
/// Keys are passed to the external tool as command arguments, so this is the
/// injection defense: nothing outside `[A-Za-z][A-Za-z0-9_]*` gets through.
pub fn validate_key(key: &str) -> Result<()> {
    let mut chars = key.chars();

    let valid_first = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_first || !valid_rest {
        return Err(ConfError::InvalidFormat(format!(
            "invalid postconf key: {:?}",
            key
        )));
    }

    Ok(())
}

/// Validate a Postfix configuration value.
///
/// Values are free-form but must not contain control characters, which would
/// break the line-oriented store and the tool's argument handling.
pub fn validate_value(value: &str) -> Result<()> {
    if value.chars().any(|c| (c as u32) < 32) {
        return Err(ConfError::InvalidFormat(
            "value contains control characters".to_string(),
        ));
    }

    Ok(())
}
