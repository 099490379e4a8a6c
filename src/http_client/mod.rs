//! HTTP client with basic-auth credentials and request logging.

mod response;
mod user_agent;

pub use response::HttpResponse;
pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use tracing::debug;

use crate::credentials::Credentials;

fn extract_response_headers(response: &Response) -> HashMap<String, String> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}

/// Builder for constructing `HttpClient` with optional configuration.
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    credentials: Option<Credentials>,
}

impl HttpClientBuilder {
    /// Set the user agent string. Not called: default tagfetch user agent.
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    /// Authenticate every request with these credentials.
    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let user_agent = resolve_user_agent(self.user_agent.as_deref());
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(HttpClient {
            client,
            credentials: self.credentials,
        })
    }
}

/// HTTP client shared by catalog requests and payload downloads.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpClient {
    pub fn builder(timeout: Duration) -> HttpClientBuilder {
        HttpClientBuilder {
            timeout,
            user_agent: None,
            credentials: None,
        }
    }

    /// Whether requests carry credentials.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Make a GET request with optional query parameters.
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<HttpResponse, reqwest::Error> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(ref creds) = self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.api_key));
        }

        let start = Instant::now();
        let response = request.send().await?;
        debug!(
            "GET {} -> {} in {:?}",
            response.url(),
            response.status().as_u16(),
            start.elapsed()
        );

        Ok(HttpResponse {
            status: response.status(),
            headers: extract_response_headers(&response),
            response,
        })
    }
}
