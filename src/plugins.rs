//! Project-local subcommands.
//!
//! Every executable in the configured plugins directory becomes a
//! subcommand named after its file stem, with `_` turned into
//! `-`. Files starting with `_` or `.` are skipped.

use std::path::{Path, PathBuf};

use crate::cmd;
use crate::error::{DeployError, DeployResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub name: String,
    pub path: PathBuf,
}

/// Subcommand name for a plugin file, if it is one.
///
/// ```
/// use totoro::plugins::plugin_name;
///
/// assert_eq!(plugin_name("sync_db.sh").as_deref(), Some("sync-db"));
/// assert_eq!(plugin_name("_helpers.sh"), None);
/// ```
#[must_use]
pub fn plugin_name(file_name: &str) -> Option<String> {
    if file_name.starts_with(['_', '.']) {
        return None;
    }
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    Some(stem.replace('_', "-"))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Plugins found in `dir`, sorted by name. A missing directory
/// holds no plugins.
pub fn discover(dir: &Path) -> DeployResult<Vec<Plugin>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut plugins: Vec<Plugin> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_executable(path))
        .filter_map(|path| {
            let name = plugin_name(path.file_name()?.to_str()?)?;
            Some(Plugin { name, path })
        })
        .collect();
    plugins.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(plugins)
}

/// Run the plugin called `name` with `args`, terminal attached.
pub fn run(plugins: &[Plugin], name: &str, args: &[String]) -> DeployResult<()> {
    let plugin = plugins.iter().find(|p| p.name == name).ok_or_else(|| {
        let known: Vec<&str> = plugins.iter().map(|p| p.name.as_str()).collect();
        DeployError::Other(if known.is_empty() {
            format!("unknown command `{name}`")
        } else {
            format!("unknown command `{name}`. Plugins: {}", known.join(", "))
        })
    })?;
    let program = plugin.path.to_string_lossy();
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    tracing::debug!(plugin = %plugin.name, path = %program, "running plugin");
    cmd::run_interactive(&program, &refs)
}
