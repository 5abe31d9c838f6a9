//! Tag, context, and environment file resolution.
//!
//! A tag comes from `--tag` or the current git branch. Contexts
//! resolve through `deployment_targets` first and fall back to
//! the tag itself, so an ad hoc branch maps onto a docker
//! context of the same name. Environment files have no fallback.

use crate::error::{DeployError, DeployResult};
use crate::git::VersionControl;
use crate::settings::Settings;
use crate::validate::{Field, validate};

/// Lookup key used in place of the tag when targeting the local
/// machine.
pub const LOCAL_TAG: &str = "local";

/// Turn a branch name into an image-tag-safe token.
///
/// ```
/// assert_eq!(totoro::resolve::normalize_branch("Feature/ABC"), "feature-abc");
/// ```
#[must_use]
pub fn normalize_branch(branch: &str) -> String {
    branch.trim().to_lowercase().replace('/', "-")
}

/// The explicit tag if given, otherwise the normalized current
/// branch.
pub fn resolve_tag(explicit: Option<&str>, vcs: &dyn VersionControl) -> DeployResult<String> {
    if let Some(tag) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(tag.to_string());
    }
    let tag = normalize_branch(&vcs.current_branch()?);
    if tag.is_empty() {
        return Err(DeployError::TagResolution("current branch has no name".into()));
    }
    tracing::debug!(%tag, "tag derived from git branch");
    Ok(tag)
}

const fn lookup_key(tag: &str, local: bool) -> &str {
    if local { LOCAL_TAG } else { tag }
}

/// Docker context for `tag`.
///
/// A configured target's host must be a known context. A tag
/// without a target is used verbatim, even when no such context
/// exists yet.
pub fn resolve_context(settings: &Settings, tag: &str, local: bool) -> DeployResult<String> {
    let key = lookup_key(tag, local);
    match settings.deployment_target(key) {
        Some(target) => {
            validate(settings, Field::Context, &target.host)?;
            tracing::debug!(tag = key, context = %target.host, "context from deployment target");
            Ok(target.host.clone())
        }
        None => {
            tracing::debug!(tag = key, "no deployment target, using tag as context");
            Ok(key.to_string())
        }
    }
}

/// Environment file configured for `tag`.
pub fn resolve_env_file(settings: &Settings, tag: &str, local: bool) -> DeployResult<String> {
    let key = lookup_key(tag, local);
    settings
        .deployment_target(key)
        .map(|target| target.env_file.clone())
        .ok_or_else(|| DeployError::MissingDeploymentTarget(key.to_string()))
}

/// Where an operation runs and with which variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tag: String,
    pub context: String,
    pub env_file: String,
}

/// Resolve everything a compose operation needs. An explicit
/// context is validated and wins over the tag's target.
pub fn resolve_deployment(
    settings: &Settings,
    vcs: &dyn VersionControl,
    explicit_tag: Option<&str>,
    explicit_context: Option<&str>,
    local: bool,
) -> DeployResult<Resolution> {
    if let Some(context) = explicit_context {
        validate(settings, Field::Context, context)?;
    }
    let tag = resolve_tag(explicit_tag, vcs)?;
    let context = match explicit_context {
        Some(context) => context.to_string(),
        None => resolve_context(settings, &tag, local)?,
    };
    let env_file = resolve_env_file(settings, &tag, local)?;
    Ok(Resolution {
        tag,
        context,
        env_file,
    })
}
