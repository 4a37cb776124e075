use thiserror::Error;

#[derive(Error, Debug)]
pub enum OneDriveError {
    #[error("OneDrive folder not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, OneDriveError>;
