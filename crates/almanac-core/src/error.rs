use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// A setting parsed but holds a value the expansion engine cannot use.
    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: &'static str },
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
