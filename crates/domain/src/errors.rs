use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{message}")]
    Configuration { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("Invalid image data: {0}")]
    Image(#[from] image::ImageError),

    #[error("Model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Model returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether the caller sent something unusable, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Image(_))
    }
}
