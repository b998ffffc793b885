//! Error types for glossa-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown mode: {0} (expected NORMAL, HEADLESS or RELATIONS)")]
    UnknownMode(String),

    #[error("Annotation {0} does not link two annotations")]
    NotARelation(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
