// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScatterError {
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

pub type ScatterResult<T> = Result<T, ScatterError>;
