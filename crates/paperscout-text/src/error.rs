use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TextError {
    #[error("sentence {index} scored a non-finite value")]
    NonFiniteScore { index: usize },
}
