#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed markup: {0}")]
    Malformed(#[from] roxmltree::Error),

    #[error("root element is <{0}>, expected <speak>")]
    UnexpectedRoot(String),

    #[error("unsupported element <{0}>")]
    UnsupportedElement(String),

    #[error("<voice> sections must not nest")]
    NestedVoice,

    #[error("<voice> element is missing its name attribute")]
    MissingVoiceName,
}
