use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::cmd::{self, CommandLine};
use crate::error::{DeployError, DeployResult};
use crate::git::{Git, VersionControl};
use crate::onboarding::{Console, Onboarding, TargetStore};
use crate::resolve::{resolve_context, resolve_tag};
use crate::settings::Settings;
use crate::validate::{Field, validate};

/// `<repository>/<service>:<tag>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCoordinate {
    pub repository: String,
    pub service: String,
    pub tag: String,
}

impl ImageCoordinate {
    #[must_use]
    pub fn new(repository: &str, service: &str, tag: &str) -> Self {
        Self {
            repository: repository.to_string(),
            service: service.to_string(),
            tag: tag.to_string(),
        }
    }
}

impl fmt::Display for ImageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.repository, self.service, self.tag)
    }
}

/// Inputs of `image build` that come from the command line.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub service: String,
    pub tag: Option<String>,
    pub use_cache: bool,
    pub yes: bool,
    pub echo: bool,
}

/// Build metadata recorded as image labels.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub author: String,
    pub commit: String,
}

/// The `docker buildx build ... --push .` line for an image.
#[must_use]
pub fn build_command(image: &ImageCoordinate, provenance: &Provenance, use_cache: bool) -> CommandLine {
    let service = &image.service;
    CommandLine::new("docker")
        .args(["buildx", "build", "--provenance", "false", "--sbom", "false"])
        .arg("--label")
        .quoted(&format!("AUTHOR={}", provenance.author))
        .arg("--label")
        .quoted(&format!("COMMIT={}", provenance.commit))
        .arg("--file")
        .arg(format!("dockerfiles/{service}/{service}.Dockerfile"))
        .arg("--tag")
        .arg(image.to_string())
        .arg_if(!use_cache, "--no-cache")
        .args(["--push", "."])
}

/// Build and push an image, confirming or creating the tag's
/// deployment target first. Nothing is executed if onboarding is
/// cancelled.
pub fn build(
    settings: &mut Settings,
    store: &dyn TargetStore,
    vcs: &dyn VersionControl,
    console: &mut dyn Console,
    request: &BuildRequest,
) -> DeployResult<()> {
    validate(settings, Field::Service, &request.service)?;
    let tag = resolve_tag(request.tag.as_deref(), vcs)?;

    let target = Onboarding::new(settings, store, vcs, console)
        .auto_confirm(request.yes)
        .run(&tag, &request.service)?;

    if let Some(engine) = settings.engine.as_ref().filter(|e| e.service == request.service) {
        eprintln!(
            "Fetching latest changes from `{}` for the engine repository",
            target.engine
        );
        Git::switch_and_pull(Path::new(&engine.path), &target.engine)?;
    }

    let provenance = Provenance {
        author: Git::author()?,
        commit: Git::commit_sha()?,
    };
    let image = ImageCoordinate::new(&settings.repository, &request.service, &tag);

    let span = tracing::info_span!("image_build", image = %image);
    let _guard = span.enter();

    let command = build_command(&image, &provenance, request.use_cache);
    command.run(request.echo)?;

    let digest = image_digest(&image)?;
    tracing::info!(
        %tag,
        %digest,
        service = %request.service,
        author = %provenance.author,
        commit = %provenance.commit,
        command = %command.render(),
        "built and pushed image"
    );
    eprintln!("Pushed {image}@{digest}");
    Ok(())
}

pub fn push(
    settings: &Settings,
    vcs: &dyn VersionControl,
    service: &str,
    tag: Option<&str>,
    echo: bool,
) -> DeployResult<()> {
    validate(settings, Field::Service, service)?;
    let tag = resolve_tag(tag, vcs)?;
    let image = ImageCoordinate::new(&settings.repository, service, &tag);
    CommandLine::new("docker")
        .arg("push")
        .arg(image.to_string())
        .run(echo)
}

/// Pull an image onto the context of its tag, or onto `context`
/// when given.
pub fn pull(
    settings: &Settings,
    vcs: &dyn VersionControl,
    service: &str,
    tag: Option<&str>,
    context: Option<&str>,
    local: bool,
    echo: bool,
) -> DeployResult<()> {
    validate(settings, Field::Service, service)?;
    if let Some(context) = context {
        validate(settings, Field::Context, context)?;
    }
    let tag = resolve_tag(tag, vcs)?;
    let context = match context {
        Some(context) => context.to_string(),
        None => resolve_context(settings, &tag, local)?,
    };
    let image = ImageCoordinate::new(&settings.repository, service, &tag);
    CommandLine::new("docker")
        .args(["--context", context.as_str(), "pull"])
        .arg(image.to_string())
        .run(echo)
}

#[derive(Deserialize)]
struct Manifest {
    digest: String,
}

/// Digest of the image as stored in the registry.
pub fn image_digest(image: &ImageCoordinate) -> DeployResult<String> {
    let reference = image.to_string();
    let output = cmd::run(
        "docker",
        &[
            "buildx",
            "imagetools",
            "inspect",
            &reference,
            "--format",
            "{{json .Manifest}}",
        ],
    )?;
    parse_manifest_digest(&output)
}

/// Extract the digest from `imagetools inspect` manifest JSON.
pub fn parse_manifest_digest(json: &str) -> DeployResult<String> {
    let manifest: Manifest = serde_json::from_str(json)?;
    if manifest.digest.is_empty() {
        return Err(DeployError::Other("registry returned an empty digest".into()));
    }
    Ok(manifest.digest)
}
