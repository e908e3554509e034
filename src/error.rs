use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("Unable to import asset. Related product with ID \"{target_entity_id}\" is not published yet.")]
    NotYetPublished { target_entity_id: String },

    #[error("unsupported asset type: {0}")]
    UnsupportedType(String),

    #[error("unsupported video format '{0}': only youtube and vimeo are supported")]
    UnsupportedFormat(String),

    #[error("malformed type metadata: {0}")]
    Format(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("invalid state: {0}")]
    State(String),

    #[error("{0}")]
    Localized(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Failures surfaced by the catalog repository boundary.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product with PIM id {0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Input(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
