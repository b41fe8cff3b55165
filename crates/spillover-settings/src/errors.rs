use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A key parsed but holds a value the service cannot run with.
    #[error("{key}: {detail}")]
    InvalidValue { key: &'static str, detail: String },
}

pub type Result<T> = std::result::Result<T, SettingsError>;
