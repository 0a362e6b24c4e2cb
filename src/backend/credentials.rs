use std::env;

pub const TOKEN_ENV: &str = "VOLUNTEER_MATCH_TOKEN";

/// Supplies the bearer token for the posts API. Expiry and refresh are
/// handled upstream; `None` means the request goes out unauthenticated.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticCredential {
    fn bearer_token(&self) -> Option<String> {
        non_empty(&self.0)
    }
}

/// Reads the token from the environment on every request.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    key: String,
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self {
            key: TOKEN_ENV.to_string(),
        }
    }
}

impl EnvCredential {
    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl CredentialProvider for EnvCredential {
    fn bearer_token(&self) -> Option<String> {
        env::var(&self.key).ok().and_then(|value| non_empty(&value))
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
