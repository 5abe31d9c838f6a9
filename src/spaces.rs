//! Backups in S3-compatible object storage, reached through the
//! `aws` CLI.

use colored::Colorize;
use serde::Deserialize;

use crate::cmd::{self, CommandLine};
use crate::error::{DeployError, DeployResult};
use crate::settings::{Settings, Spaces};
use crate::validate::{Field, validate};

const CREDENTIAL_VARS: [&str; 2] = ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"];

/// One stored object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredObject {
    pub key: String,
    pub last_modified: String,
    #[serde(default)]
    pub size: u64,
}

impl StoredObject {
    /// Last path segment of the key.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Listing {
    #[serde(default)]
    contents: Vec<StoredObject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Head {
    content_length: u64,
}

/// Fail before any network call unless credentials are exported.
pub fn check_credentials() -> DeployResult<()> {
    let missing: Vec<&str> = CREDENTIAL_VARS
        .into_iter()
        .filter(|var| !std::env::var(var).is_ok_and(|v| !v.trim().is_empty()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DeployError::EnvMissing(format!(
            "{}. Ensure that AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are set",
            missing.join(", ")
        )))
    }
}

fn require_cli() -> DeployResult<()> {
    if cmd::command_exists("aws") {
        Ok(())
    } else {
        Err(DeployError::PrerequisiteMissing("AWS CLI (aws)".into()))
    }
}

/// `<prefix>/<resource>`
#[must_use]
pub fn resource_prefix(spaces: &Spaces, resource: &str) -> String {
    format!("{}/{resource}", spaces.prefix.trim_end_matches('/'))
}

/// Parse `s3api list-objects-v2` output, newest first.
pub fn parse_listing(json: &str) -> DeployResult<Vec<StoredObject>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let listing: Listing = serde_json::from_str(json)?;
    let mut objects = listing.contents;
    // ISO-8601 timestamps in one format order lexically.
    objects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    Ok(objects)
}

fn s3_args<'a>(spaces: &'a Spaces, args: &[&'a str]) -> Vec<&'a str> {
    let mut all = args.to_vec();
    all.extend([
        "--region",
        spaces.region_name.as_str(),
        "--endpoint-url",
        spaces.endpoint_url.as_str(),
        "--output",
        "json",
    ]);
    all
}

/// Newest backups of `resource`, at most `limit`.
pub fn backups(spaces: &Spaces, resource: &str, limit: usize) -> DeployResult<Vec<StoredObject>> {
    check_credentials()?;
    require_cli()?;
    let prefix = resource_prefix(spaces, resource);
    let mut args = vec![
        "s3api",
        "list-objects-v2",
        "--bucket",
        spaces.bucket.as_str(),
        "--prefix",
        prefix.as_str(),
    ];
    if let Some(start_after) = spaces.start_after.as_deref() {
        args.extend(["--start-after", start_after]);
    }
    let output = cmd::run("aws", &s3_args(spaces, &args))?;
    let mut objects = parse_listing(&output)?;
    objects.truncate(limit);
    Ok(objects)
}

pub fn list(settings: &Settings, resource: &str) -> DeployResult<()> {
    validate(settings, Field::Resource, resource)?;
    let spaces = settings.spaces()?;
    let objects = backups(spaces, resource, spaces.list_limit)?;
    for (index, object) in objects.iter().enumerate() {
        println!(
            "{}",
            format!("[{}]\t{}", index + 1, object.file_name())
                .dimmed()
                .yellow()
        );
    }
    Ok(())
}

/// Size in megabytes, two decimals.
#[must_use]
pub fn megabytes(bytes: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let mb = bytes as f64 / (1024.0 * 1024.0);
    format!("{mb:.2}")
}

/// Download `<prefix>/<resource>/<filename>` into the configured
/// downloads directory. Progress is drawn by the `aws` CLI.
pub fn download(settings: &Settings, resource: &str, filename: &str, echo: bool) -> DeployResult<()> {
    validate(settings, Field::Resource, resource)?;
    let spaces = settings.spaces()?;
    check_credentials()?;
    require_cli()?;

    let key = format!("{}/{filename}", resource_prefix(spaces, resource));
    let head = cmd::run(
        "aws",
        &s3_args(
            spaces,
            &["s3api", "head-object", "--bucket", &spaces.bucket, "--key", &key],
        ),
    )?;
    let head: Head = serde_json::from_str(&head)?;

    eprintln!(
        "{}",
        format!(
            "Downloading resource: {resource}/{filename} ({}MB)",
            megabytes(head.content_length)
        )
        .dimmed()
        .green()
    );

    let destination = format!("{}/{filename}", spaces.downloads_dir.trim_end_matches('/'));
    CommandLine::new("aws")
        .args(["s3", "cp"])
        .quoted(&format!("s3://{}/{key}", spaces.bucket))
        .quoted(&destination)
        .args(["--region", spaces.region_name.as_str()])
        .args(["--endpoint-url", spaces.endpoint_url.as_str()])
        .run(echo)?;

    tracing::info!(%resource, %filename, bytes = head.content_length, "backup downloaded");
    Ok(())
}
