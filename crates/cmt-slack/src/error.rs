use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack answered with anything other than `200 ok`.
    #[error("webhook rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}
