use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

/// Every way a page fetch can go wrong. The operator only ever sees
/// "cannot reach page", with the cause appended.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot reach page {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot reach page {url}: HTTP {status}")]
    Status { url: String, status: StatusCode },
}

/// Single-request HTTP client. No retries, no timeout beyond reqwest's defaults.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(HttpFetcher { client })
    }

    #[cfg(test)]
    pub fn with_client(client: reqwest::Client) -> Self {
        HttpFetcher { client }
    }

    /// GET `url` and return the body text.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} answered {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
