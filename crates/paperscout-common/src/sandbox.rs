use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{PaperscoutError, Result};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("paperscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A reusable HTTP session capped to an allowlist of hosts.
///
/// The underlying `reqwest::Client` is built on first use. `close()` drops it
/// and may be called any number of times; the next request simply builds a
/// new one.
#[derive(Debug)]
pub struct HttpSession {
    config: SessionConfig,
    retry: RetryPolicy,
    allowlist: HashSet<String>,
    client: Mutex<Option<Client>>,
}

impl HttpSession {
    pub fn new(config: SessionConfig, retry: RetryPolicy) -> Self {
        Self {
            config,
            retry,
            allowlist: HashSet::new(),
            client: Mutex::new(None),
        }
    }

    /// Build a session that may only talk to the host of `base_url`.
    pub fn for_base_url(base_url: &str, config: SessionConfig, retry: RetryPolicy) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| PaperscoutError::Config(format!("invalid base url {base_url:?}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| PaperscoutError::Config(format!("base url {base_url:?} has no host")))?;
        let mut session = Self::new(config, retry);
        session.allow_domain(host);
        Ok(session)
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Check exact match or if it's a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn is_open(&self) -> bool {
        self.slot().is_some()
    }

    /// Release the underlying client. Closing an already closed session is a
    /// no-op.
    pub fn close(&self) {
        if self.slot().take().is_some() {
            debug!("HTTP session closed");
        }
    }

    /// GET `url` with `params`, retrying transient failures, and return the
    /// body as text.
    pub async fn get_text(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        if !self.is_allowed(url) {
            return Err(PaperscoutError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }
        self.retry.run(url, || self.try_get_text(url, params)).await
    }

    async fn try_get_text(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        let client = self.client()?;

        let resp = match client.get(url).query(params).send().await {
            Ok(resp) => resp,
            Err(e) => {
                // Drop the pool so the next attempt starts from fresh connections.
                self.close();
                return Err(e.into());
            }
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(PaperscoutError::Status { status: status.as_u16(), url: url.to_string() });
        }

        resp.text().await.map_err(|e| {
            self.close();
            PaperscoutError::from(e)
        })
    }

    fn client(&self) -> Result<Client> {
        let mut slot = self.slot();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = ClientBuilder::new()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()?;
        debug!(timeout_secs = self.config.timeout.as_secs(), "HTTP session opened");
        *slot = Some(client.clone());
        Ok(client)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Client>> {
        self.client.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
