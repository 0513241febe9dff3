#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefsError {
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Unknown image source: {0}")]
    UnknownImageSource(String),

    #[error("Unknown likelihood: {0}")]
    UnknownLikelihood(String),
}
