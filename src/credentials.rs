use std::fs;

use camino::Utf8PathBuf;

pub const TOKEN_ENV: &str = "TOKO_TOKEN";

pub trait CredentialProvider {
    fn token(&self) -> Option<String>;
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for &P {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

#[derive(Debug, Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(non_empty(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the token from a file on every call so a refreshed file is picked
/// up mid-run.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: Utf8PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for TokenFile {
    fn token(&self) -> Option<String> {
        match fs::read_to_string(self.path.as_std_path()) {
            Ok(content) => non_empty(content),
            Err(err) => {
                tracing::debug!(path = %self.path, error = %err, "token file unreadable");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvOrFile {
    env_token: Option<String>,
    file: TokenFile,
}

impl EnvOrFile {
    pub fn new(file: TokenFile) -> Self {
        Self {
            env_token: std::env::var(TOKEN_ENV).ok().and_then(non_empty),
            file,
        }
    }
}

impl CredentialProvider for EnvOrFile {
    fn token(&self) -> Option<String> {
        self.env_token.clone().or_else(|| self.file.token())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix("Bearer ").unwrap_or(trimmed).trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
