use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] innbox_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Remote error: {0}")]
    Remote(#[from] innbox_core::RemoteError),
    #[error(
        "No backend configured. Pass --api-url or set INNBOX_API_URL to the tenant API base URL."
    )]
    RemoteNotConfigured,
}
