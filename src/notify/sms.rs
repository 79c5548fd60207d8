//! Free Mobile SMS channel
//!
//! The gateway only delivers to the account owner's own phone, so every
//! recipient brings its own `user:password` pair. Credentials live in a
//! plain text file, one pair per line.

use super::{ChannelError, NotifyChannel};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// API credentials for one SMS recipient.
#[derive(Clone, PartialEq, Eq)]
pub struct SmsCredentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for SmsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Errors while reading the credentials file.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("cannot read credentials file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credentials line {line} is not of the form user:password")]
    Malformed { line: usize },
}

/// Parse `user:password` lines. Blank lines and `#` comments are skipped.
pub fn parse_credentials(text: &str) -> Result<Vec<SmsCredentials>, CredentialsError> {
    let mut credentials = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(':') {
            Some((user, password)) if !user.is_empty() && !password.is_empty() => {
                credentials.push(SmsCredentials {
                    user: user.trim().to_string(),
                    password: password.trim().to_string(),
                });
            }
            _ => return Err(CredentialsError::Malformed { line: idx + 1 }),
        }
    }
    Ok(credentials)
}

pub fn load_credentials(path: &Path) -> Result<Vec<SmsCredentials>, CredentialsError> {
    let text = std::fs::read_to_string(path).map_err(|source| CredentialsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_credentials(&text)
}

/// One SMS recipient on the Free Mobile notification API.
pub struct FreeMobileChannel {
    http: reqwest::Client,
    endpoint: String,
    credentials: SmsCredentials,
}

impl FreeMobileChannel {
    /// One channel per recipient, sharing a single HTTP client.
    pub fn for_recipients(
        endpoint: &str,
        recipients: Vec<SmsCredentials>,
        timeout: Duration,
    ) -> Result<Vec<Self>, ChannelError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(recipients
            .into_iter()
            .map(|credentials| Self {
                http: http.clone(),
                endpoint: endpoint.to_string(),
                credentials,
            })
            .collect())
    }
}

#[async_trait]
impl NotifyChannel for FreeMobileChannel {
    fn name(&self) -> &'static str {
        "free-mobile"
    }

    fn recipient(&self) -> &str {
        &self.credentials.user
    }

    async fn send(&self, message: &str) -> Result<(), ChannelError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("user", self.credentials.user.as_str()),
                ("pass", self.credentials.password.as_str()),
                ("msg", message),
            ])
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::OK => Ok(()),
            reqwest::StatusCode::PAYMENT_REQUIRED => Err(ChannelError::RateLimited),
            reqwest::StatusCode::FORBIDDEN => Err(ChannelError::NotConfigured(format!(
                "SMS notifications not enabled or wrong credentials for {}",
                self.credentials.user
            ))),
            status => Err(ChannelError::ServerError(status)),
        }
    }
}
