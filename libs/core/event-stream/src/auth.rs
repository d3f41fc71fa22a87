//! Connection credentials
//!
//! A [`RequestHeaderBuilder`] is asked for headers once per connection
//! attempt, so builders may refresh short-lived tokens.

use async_trait::async_trait;
use http::header::{AUTHORIZATION, COOKIE};
use http::{HeaderMap, HeaderValue};

use crate::error::StreamError;

/// Cookie carrying the access token, as the backend auth middleware expects
pub const DEFAULT_TOKEN_COOKIE: &str = "access_token";

/// Produces the headers sent with the websocket handshake
#[async_trait]
pub trait RequestHeaderBuilder: Send + Sync {
    async fn build_request_headers(&self) -> Result<HeaderMap, StreamError>;
}

/// `Authorization: Bearer <token>`
#[derive(Clone)]
pub struct BearerTokenHeaders {
    token: String,
}

impl BearerTokenHeaders {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl RequestHeaderBuilder for BearerTokenHeaders {
    async fn build_request_headers(&self) -> Result<HeaderMap, StreamError> {
        if self.token.is_empty() {
            return Err(StreamError::Auth("bearer token is empty".to_string()));
        }

        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| StreamError::Auth(format!("invalid bearer token: {}", e)))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

/// Session cookie (`<name>=<value>`)
#[derive(Clone)]
pub struct CookieHeaders {
    name: String,
    value: String,
}

impl CookieHeaders {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Access token in the default cookie
    pub fn access_token(token: impl Into<String>) -> Self {
        Self::new(DEFAULT_TOKEN_COOKIE, token)
    }
}

#[async_trait]
impl RequestHeaderBuilder for CookieHeaders {
    async fn build_request_headers(&self) -> Result<HeaderMap, StreamError> {
        if self.name.is_empty() || self.value.is_empty() {
            return Err(StreamError::Auth("cookie name and value are required".to_string()));
        }

        let mut value = HeaderValue::from_str(&format!("{}={}", self.name, self.value))
            .map_err(|e| StreamError::Auth(format!("invalid cookie: {}", e)))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, value);
        Ok(headers)
    }
}
