//! Typed view of the `totoro.yaml` settings document and the
//! handle used to persist new deployment targets back to it.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DeployError, DeployResult};
use crate::patch::{LinePatcher, SettingsWriter};

/// Settings file name, resolved against the working directory.
pub const SETTINGS_FILE: &str = "totoro.yaml";

/// Context name that is always valid, whether or not a host
/// with that name is configured.
pub const DEFAULT_CONTEXT: &str = "default";

/// Root of the settings document.
///
/// # Example
///
/// ```
/// use totoro::settings::Settings;
///
/// let settings = Settings::from_yaml(
///     "repository: acr.example.io/portal\n\
///      hosts:\n  production: deploy@10.0.0.5\n\
///      services: [web, worker]\n",
/// )
/// .unwrap();
///
/// assert_eq!(settings.context_names(), vec!["production", "default"]);
/// assert!(settings.deployment_targets.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub repository: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hosts: IndexMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub services: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profiles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dbs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spaces: Option<Spaces>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deployment_targets: IndexMap<String, DeploymentTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins_dir_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_setup_script: Option<SetupScript>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineRepo>,
}

/// A tag's deployment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub host: String,
    #[serde(default = "default_engine_branch")]
    pub engine: String,
    pub env_file: String,
}

/// Object storage holding backups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spaces {
    pub region_name: String,
    pub endpoint_url: String,
    pub bucket: String,
    pub prefix: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<String>,
    pub downloads_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_after: Option<String>,
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupScript {
    pub dir: String,
    pub filename: String,
}

/// Companion repository checked out inside the build context of
/// one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineRepo {
    pub service: String,
    pub path: String,
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_engine_branch() -> String {
    "master".to_string()
}

const fn default_list_limit() -> usize {
    10
}

fn default_remote() -> String {
    "origin".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Settings {
    /// Parse a settings document held in memory.
    pub fn from_yaml(content: &str) -> DeployResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load the settings document at `path`.
    pub fn load(path: &Path) -> DeployResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeployError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let settings = Self::from_yaml(&content).map_err(|e| DeployError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Configured host names followed by the implicit `default`
    /// context unless a host already carries that name.
    #[must_use]
    pub fn context_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hosts.keys().map(String::as_str).collect();
        if !self.hosts.contains_key(DEFAULT_CONTEXT) {
            names.push(DEFAULT_CONTEXT);
        }
        names
    }

    #[must_use]
    pub fn host_address(&self, context: &str) -> Option<&str> {
        self.hosts.get(context).map(String::as_str)
    }

    #[must_use]
    pub fn deployment_target(&self, tag: &str) -> Option<&DeploymentTarget> {
        self.deployment_targets.get(tag)
    }

    /// Whether builds of `service` depend on the engine repository.
    #[must_use]
    pub fn uses_engine(&self, service: &str) -> bool {
        self.engine.as_ref().is_some_and(|e| e.service == service)
    }

    pub fn spaces(&self) -> DeployResult<&Spaces> {
        self.spaces
            .as_ref()
            .ok_or_else(|| DeployError::Other("settings have no `spaces` section".into()))
    }

    pub fn setup_script(&self) -> DeployResult<&SetupScript> {
        self.server_setup_script.as_ref().ok_or_else(|| {
            DeployError::Other("settings have no `server_setup_script` section".into())
        })
    }
}

/// The on-disk settings file, with the writer used to persist
/// new deployment targets.
pub struct SettingsFile {
    path: PathBuf,
    writer: Box<dyn SettingsWriter>,
}

impl SettingsFile {
    /// Settings file at `path`, patched line by line.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: Box::new(LinePatcher),
        }
    }

    #[must_use]
    pub fn with_writer(mut self, writer: impl SettingsWriter + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> DeployResult<Settings> {
        Settings::load(&self.path)
    }

    /// Append one deployment target to the file. The patched text
    /// is re-parsed before it replaces the original, so a patch
    /// that would leave the file unreadable is never written. A
    /// section the writer cannot extend is reported, and the file
    /// is left as it was.
    pub fn write_deployment_target(&self, tag: &str, target: &DeploymentTarget) -> DeployResult<()> {
        let original = std::fs::read_to_string(&self.path)?;
        let patched = self.writer.append_target(&original, tag, target)?;

        let reparsed = Settings::from_yaml(&patched)
            .map_err(|e| DeployError::SettingsPatch(format!("patched document is invalid: {e}")))?;
        if reparsed.deployment_target(tag) != Some(target) {
            return Err(DeployError::SettingsPatch(format!(
                "target '{tag}' missing after patch"
            )));
        }

        std::fs::write(&self.path, patched)?;
        tracing::info!(%tag, path = %self.path.display(), "deployment target persisted");
        Ok(())
    }

    /// Rewrite the whole document from `settings`. Comments and
    /// formatting are lost.
    pub fn write_full(&self, settings: &Settings) -> DeployResult<()> {
        std::fs::write(&self.path, serde_yaml::to_string(settings)?)?;
        Ok(())
    }
}
