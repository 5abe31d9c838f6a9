use crate::cmd::CommandLine;
use crate::error::DeployResult;
use crate::git::VersionControl;
use crate::resolve::{Resolution, resolve_deployment};
use crate::settings::Settings;
use crate::validate::{Field, validate};

/// Where a compose command runs: the tag and context to target.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub tag: Option<String>,
    pub context: Option<String>,
    pub local: bool,
}

/// `NGINX_TAG=<tag> ENV_FILE=<env> docker --context <ctx> compose`
#[must_use]
pub fn base_command(resolution: &Resolution) -> CommandLine {
    CommandLine::new("docker")
        .env("NGINX_TAG", &resolution.tag)
        .env("ENV_FILE", &resolution.env_file)
        .args(["--context", resolution.context.as_str(), "compose"])
}

#[must_use]
pub fn up_command(resolution: &Resolution, profile: &str, detach: bool) -> CommandLine {
    base_command(resolution)
        .args(["--profile", profile, "up"])
        .arg_if(detach, "-d")
}

#[must_use]
pub fn down_command(resolution: &Resolution, profile: &str) -> CommandLine {
    base_command(resolution).args(["--profile", profile, "down"])
}

/// `command` is passed to the shell as written.
#[must_use]
pub fn exec_command(resolution: &Resolution, service: &str, command: &str) -> CommandLine {
    base_command(resolution).args(["exec", service]).arg(command)
}

fn prepare(
    settings: &Settings,
    vcs: &dyn VersionControl,
    profile: &str,
    target: &Target,
) -> DeployResult<Resolution> {
    validate(settings, Field::Profile, profile)?;
    resolve_deployment(
        settings,
        vcs,
        target.tag.as_deref(),
        target.context.as_deref(),
        target.local,
    )
}

pub fn up(
    settings: &Settings,
    vcs: &dyn VersionControl,
    profile: &str,
    target: &Target,
    detach: bool,
    echo: bool,
) -> DeployResult<()> {
    let resolution = prepare(settings, vcs, profile, target)?;
    up_command(&resolution, profile, detach).run(echo)
}

pub fn down(
    settings: &Settings,
    vcs: &dyn VersionControl,
    profile: &str,
    target: &Target,
    echo: bool,
) -> DeployResult<()> {
    let resolution = prepare(settings, vcs, profile, target)?;
    down_command(&resolution, profile).run(echo)
}

/// Run `command` in the service named like `profile`.
pub fn exec(
    settings: &Settings,
    vcs: &dyn VersionControl,
    profile: &str,
    command: &str,
    target: &Target,
    echo: bool,
) -> DeployResult<()> {
    let resolution = prepare(settings, vcs, profile, target)?;
    exec_command(&resolution, profile, command).run(echo)
}
