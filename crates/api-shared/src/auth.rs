/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the identity (staff NIK/username) of the caller.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the shared secret of the messaging relay.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credentials")]
    Missing,
    #[error("invalid credentials")]
    Invalid,
}

/// Validates the provided API key against the key resolved at startup.
///
/// Returns `Ok(())` if the key is valid, or an error if invalid or missing.
pub fn validate_api_key(provided_key: Option<&str>, expected_key: &str) -> Result<(), AuthError> {
    validate_shared_secret(provided_key, expected_key)
}

/// Validates the relay secret when one is configured; anything passes when none is.
pub fn validate_webhook_secret(
    provided: Option<&str>,
    expected: Option<&str>,
) -> Result<(), AuthError> {
    match expected {
        None => Ok(()),
        Some(expected) => validate_shared_secret(provided, expected),
    }
}

fn validate_shared_secret(provided: Option<&str>, expected: &str) -> Result<(), AuthError> {
    let provided = provided.map(str::trim).filter(|k| !k.is_empty());
    match provided {
        None => Err(AuthError::Missing),
        Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => Ok(()),
        Some(_) => Err(AuthError::Invalid),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_validation() {
        assert_eq!(validate_api_key(Some("secret"), "secret"), Ok(()));
        assert_eq!(validate_api_key(Some("nope"), "secret"), Err(AuthError::Invalid));
        assert_eq!(validate_api_key(None, "secret"), Err(AuthError::Missing));
        assert_eq!(validate_api_key(Some("  "), "secret"), Err(AuthError::Missing));
    }

    #[test]
    fn webhook_secret_is_optional() {
        assert_eq!(validate_webhook_secret(None, None), Ok(()));
        assert_eq!(validate_webhook_secret(Some("x"), Some("x")), Ok(()));
        assert_eq!(
            validate_webhook_secret(None, Some("x")),
            Err(AuthError::Missing)
        );
    }
}
