// Admin check for the log endpoint

use crate::error::{BoardlogError, Result};
use axum::http::{header, HeaderMap};
use std::collections::HashSet;

/// Bearer tokens that identify administrative callers
#[derive(Debug, Clone, Default)]
pub struct AdminTokens {
    tokens: HashSet<String>,
}

impl AdminTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = tokens
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.trim().is_empty())
            .collect();
        Self { tokens }
    }

    /// Check the `Authorization: Bearer <token>` header of a request
    pub fn authorize(&self, headers: &HeaderMap) -> Result<()> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| BoardlogError::Unauthorized("missing credentials".to_string()))?
            .to_str()
            .map_err(|_| BoardlogError::Unauthorized("malformed credentials".to_string()))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| BoardlogError::Unauthorized("expected a bearer token".to_string()))?;

        if self.tokens.contains(token) {
            Ok(())
        } else {
            Err(BoardlogError::Unauthorized(
                "admin privileges required".to_string(),
            ))
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
