pub type StippleResult<T> = Result<T, StippleError>;

#[derive(thiserror::Error, Debug)]
pub enum StippleError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("image load error: {0}")]
    ImageLoad(String),

    #[error("render error: {0}")]
    Render(String),

    /// The render was cancelled at a tick boundary (typically superseded by a
    /// newer render).
    #[error("render cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StippleError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StippleError::invalid_parameter("x")
                .to_string()
                .contains("invalid parameter:")
        );
        assert!(
            StippleError::image_load("x")
                .to_string()
                .contains("image load error:")
        );
        assert!(
            StippleError::render("x")
                .to_string()
                .contains("render error:")
        );
        assert_eq!(StippleError::Cancelled.to_string(), "render cancelled");
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StippleError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
