use std::result;

use thiserror::Error;

use crate::store;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error("no cache store is registered as `{0}`")]
    MissingStore(String),

    #[error(transparent)]
    Store(#[from] store::Error),

    #[error(transparent)]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    #[error(transparent)]
    DateFormat(#[from] time::error::Format),

    #[error("a date {0} seconds from now is out of range")]
    DateOutOfRange(i64),
}

pub type Result<T> = result::Result<T, Error>;
