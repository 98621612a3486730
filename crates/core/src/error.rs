#[derive(Debug, thiserror::Error)]
pub enum SimrsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("unauthorised: {0}")]
    Unauthorised(String),

    #[error("verification code is unknown or has expired")]
    UnknownShortCode,
    #[error("failed to allocate a unique short code after {0} attempts")]
    ShortCodeExhausted(usize),

    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to send message: {0}")]
    Messaging(String),
}

impl SimrsError {
    /// HTTP status code the REST layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            SimrsError::InvalidInput(_) | SimrsError::Duplicate(_) => 422,
            SimrsError::NotFound(_) | SimrsError::UnknownShortCode => 404,
            SimrsError::Forbidden(_) => 403,
            SimrsError::Unauthorised(_) => 401,
            SimrsError::ShortCodeExhausted(_)
            | SimrsError::Config(_)
            | SimrsError::Database(_)
            | SimrsError::Messaging(_) => 500,
        }
    }
}

impl From<simrs_types::TextError> for SimrsError {
    fn from(e: simrs_types::TextError) -> Self {
        SimrsError::InvalidInput(e.to_string())
    }
}

pub type SimrsResult<T> = std::result::Result<T, SimrsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_envelope_convention() {
        assert_eq!(SimrsError::InvalidInput("x".into()).status_code(), 422);
        assert_eq!(SimrsError::Duplicate("x".into()).status_code(), 422);
        assert_eq!(SimrsError::NotFound("x".into()).status_code(), 404);
        assert_eq!(SimrsError::UnknownShortCode.status_code(), 404);
        assert_eq!(SimrsError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(SimrsError::Messaging("x".into()).status_code(), 500);
    }
}
