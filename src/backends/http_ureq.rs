//! [`HttpTransport`] over a blocking `ureq` agent.

use std::io::{self, Read};

use url::Url;

use super::http::{HttpError, HttpHead, HttpTransport};
use crate::HttpConfig;

/// Blocking HTTP client. Credentials embedded in the URL are sent as basic
/// authentication.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Agent with the configured timeout and user agent.
    pub fn new(config: &HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Self { agent }
    }
}

fn translate(error: ureq::Error) -> HttpError {
    match error {
        ureq::Error::Status(status, _) => HttpError::Status { status },
        ureq::Error::Transport(transport) => HttpError::Transport(io::Error::other(transport.to_string())),
    }
}

impl HttpTransport for UreqTransport {
    fn head(&self, url: &Url) -> Result<HttpHead, HttpError> {
        let response = self.agent.head(url.as_str()).call().map_err(translate)?;
        Ok(HttpHead {
            status: response.status(),
            content_type: response.header("Content-Type").map(str::to_string),
            content_length: response
                .header("Content-Length")
                .and_then(|value| value.trim().parse().ok()),
            last_modified: response.header("Last-Modified").map(str::to_string),
        })
    }

    fn get(&self, url: &Url) -> Result<Box<dyn Read + Send>, HttpError> {
        let response = self.agent.get(url.as_str()).call().map_err(translate)?;
        Ok(Box::new(response.into_reader()))
    }
}
