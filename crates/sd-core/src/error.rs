use thiserror::Error;

pub type SdResult<T> = Result<T, SdError>;

#[derive(Error, Debug)]
pub enum SdError {
    #[error("Invalid search pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid simulation id: {value} (ids start at 1)")]
    InvalidSimId { value: usize },
}
