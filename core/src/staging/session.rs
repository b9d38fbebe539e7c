use std::fmt;

use crate::{
    helpers::{generate_random_id, quote_literal},
    staging::ColumnType,
    strategy::BulkIdError,
};

/// Width of the session discriminator column.
pub const SESSION_TOKEN_LENGTH: usize = 36;

pub const SESSION_COLUMN_TYPE: ColumnType = ColumnType::Varchar(SESSION_TOKEN_LENGTH as u32);

/// Opaque identifier of the calling session, stamped on persistent staging rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Result<Self, BulkIdError> {
        let token = token.into();
        if token.is_empty() {
            return Err(BulkIdError::InvalidSessionToken("session token is empty".to_string()));
        }
        if token.len() > SESSION_TOKEN_LENGTH {
            return Err(BulkIdError::InvalidSessionToken(format!(
                "session token `{}` is longer than {} characters",
                token, SESSION_TOKEN_LENGTH
            )));
        }
        Ok(SessionToken(token))
    }

    pub fn generate() -> Self {
        SessionToken(generate_random_id(SESSION_TOKEN_LENGTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn sql_literal(&self) -> String {
        quote_literal(&self.0)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_validation() {
        assert!(SessionToken::new("").is_err());
        assert!(SessionToken::new("x".repeat(37)).is_err());
        assert_eq!(SessionToken::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_generated_tokens_fit_column() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_eq!(a.as_str().len(), SESSION_TOKEN_LENGTH);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sql_literal_escapes() {
        let token = SessionToken::new("it's").unwrap();
        assert_eq!(token.sql_literal(), "'it''s'");
    }
}
