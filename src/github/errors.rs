//! Error types for the GitHub API client.

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("GitHub returned {status} for {url}")]
    BadStatus { status: u16, url: String },
    #[error("invalid URL for {endpoint}")]
    InvalidUrl {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to parse response from {url}")]
    ParseFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error(transparent)]
    RequestFailed(#[from] reqwest::Error),
}
