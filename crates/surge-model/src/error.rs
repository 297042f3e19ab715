use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid unit name: {0:?}")]
    InvalidUnitName(String),
}
