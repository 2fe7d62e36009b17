#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Input directory not found: {0}")]
    InputNotFound(String),

    #[error("Feature schema {path} does not match the model: {reason}")]
    SchemaDrift { path: String, reason: String },

    #[error("Not a file name: {0}")]
    NoFileStem(String),
}
