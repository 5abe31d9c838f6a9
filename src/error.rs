use std::path::PathBuf;
use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("failed to load settings from {}: {reason}", path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("Invalid {field}: {value}. Choose from {}", choices.join(", "))]
    InvalidField {
        field: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("cannot derive a tag from git: {0}")]
    TagResolution(String),

    #[error("no deployment target for tag '{0}'")]
    MissingDeploymentTarget(String),

    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("cannot update settings: {0}")]
    SettingsPatch(String),

    #[error("{0} cancelled")]
    Cancelled(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    /// Operator aborts are not failures of the tool itself.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
