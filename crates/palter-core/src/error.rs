use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Resource with identity '{id}' already exists as a {existing}")]
    DuplicateIdentity { id: String, existing: &'static str },

    #[error("Config error: {0}")]
    Config(String),
}
