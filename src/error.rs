pub type AfficheResult<T> = Result<T, AfficheError>;

#[derive(thiserror::Error, Debug)]
pub enum AfficheError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("capability error: {0}")]
    Capability(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("analysis error: {0}")]
    Analysis(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AfficheError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }
}
