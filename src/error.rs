use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("No handler registered for datasource: {0}")]
    UnknownDatasource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scan results differ from {expected}:\n{diff}")]
    GoldenMismatch { expected: String, diff: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::GoldenMismatch { .. } => 1,
            _ => 2,
        }
    }

    pub(crate) fn parse(file: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            file: file.to_string(),
            message: message.to_string(),
        }
    }
}
