use cmt_core::PortError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("fetching overview results failed: {0}")]
    Results(#[source] PortError),

    #[error("fetching source pages failed: {0}")]
    Sources(#[source] PortError),
}
