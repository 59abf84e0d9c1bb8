use thiserror::Error;

/// Failure while loading the client config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// The file is not valid JSON5.
    #[error("config is not valid JSON5: {0}")]
    ParseFailed(#[from] json5::Error),
    /// The JSON does not match the config schema.
    #[error("config does not match schema: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    #[error("invalid config at {path}: {message}")]
    Invalid { path: String, message: String },
}
