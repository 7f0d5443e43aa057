//! REST Server Errors

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestServerError {
    #[error("Failed to bind REST listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, RestServerError>;
