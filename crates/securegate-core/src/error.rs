use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid card UID: {0}")]
    InvalidCardUid(String),

    #[error("Invalid status word: expected 2 bytes, got {0}")]
    InvalidStatusWord(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
