//! Azure and container registry authentication.
//!
//! All checks shell out to `az` and `docker`; only their exit
//! status is consulted.

use colored::Colorize;

use crate::cmd::{self, CommandLine};
use crate::error::{DeployError, DeployResult};
use crate::settings::Settings;

/// Registry host: everything before the first `/` of the
/// repository.
///
/// ```
/// use totoro::login::{acr_name, registry_url};
///
/// assert_eq!(registry_url("portalacr.azurecr.io/portal"), "portalacr.azurecr.io");
/// assert_eq!(acr_name("portalacr.azurecr.io/portal"), Some("portalacr"));
/// assert_eq!(acr_name("localhost"), None);
/// ```
#[must_use]
pub fn registry_url(repository: &str) -> &str {
    repository.split('/').next().unwrap_or(repository)
}

/// Registry name as known to `az acr`: the first label of the
/// registry host.
#[must_use]
pub fn acr_name(repository: &str) -> Option<&str> {
    if repository.contains('.') {
        repository.split('.').next().filter(|s| !s.is_empty())
    } else {
        None
    }
}

/// Fail unless both `az` and `docker` are installed and working.
pub fn check_prerequisites() -> DeployResult<()> {
    let missing: Vec<&str> = [
        ("az", "Azure CLI (az)"),
        ("docker", "Docker"),
    ]
    .into_iter()
    .filter(|(program, _)| !cmd::succeeds(program, &["--version"]))
    .map(|(_, label)| label)
    .collect();

    if missing.is_empty() {
        return Ok(());
    }
    eprintln!("{}", "Missing prerequisites:".red().bold());
    for label in &missing {
        eprintln!("{}", format!("  • {label} is not installed or not working").red());
    }
    Err(DeployError::PrerequisiteMissing(missing.join(", ")))
}

#[must_use]
pub fn is_azure_logged_in() -> bool {
    cmd::succeeds("az", &["account", "show"])
}

fn require_acr_name(settings: &Settings) -> DeployResult<&str> {
    acr_name(&settings.repository).ok_or_else(|| {
        DeployError::Other(format!(
            "cannot extract a registry name from repository `{}`",
            settings.repository
        ))
    })
}

fn heading(title: &str) {
    eprintln!();
    eprintln!("{}", title.cyan().bold());
    eprintln!("{}", "=".repeat(60).cyan());
    eprintln!();
}

/// Interactive Azure login if needed, then registry login.
pub fn login(settings: &Settings, echo: bool) -> DeployResult<()> {
    check_prerequisites()?;
    let acr = require_acr_name(settings)?;

    heading("Azure Container Registry Login");

    eprintln!("{}", "Step 1: Azure Login".blue().bold());
    if is_azure_logged_in() {
        eprintln!("{}", "✓ Already logged in to Azure".green());
    } else {
        eprintln!("Opening browser for authentication...");
        eprintln!("Follow the prompts in your terminal to select subscription.");
        CommandLine::new("az").arg("login").run(false)?;
        eprintln!("{}", "✓ Azure login successful".green());
    }
    eprintln!();

    // az acr login is idempotent, so it always runs.
    eprintln!("{}", format!("Step 2: ACR Login ({acr})").blue().bold());
    CommandLine::new("az")
        .args(["acr", "login", "--name", acr])
        .run(echo)?;

    eprintln!();
    eprintln!("{}", format!("✓ Successfully logged in to {acr}").green().bold());
    eprintln!("{}", "You can now build and push images!".green());
    tracing::info!(registry = %acr, "registry login complete");
    Ok(())
}

/// Azure logout followed by docker logout from the registry.
/// Both steps are attempted; the first failure is returned.
pub fn logout(settings: &Settings, echo: bool) -> DeployResult<()> {
    let registry = registry_url(&settings.repository);

    heading("Logging out...");

    eprintln!("{}", "Step 1: Azure Logout".blue().bold());
    let azure = if is_azure_logged_in() {
        let result = CommandLine::new("az").arg("logout").run(echo);
        match &result {
            Ok(()) => eprintln!("{}", "✓ Logged out from Azure".green()),
            Err(_) => eprintln!("{}", "✗ Azure logout failed".red()),
        }
        result
    } else {
        eprintln!("{}", "Not logged in to Azure".yellow());
        Ok(())
    };
    eprintln!();

    eprintln!(
        "{}",
        format!("Step 2: Docker Logout from {registry}").blue().bold()
    );
    let docker = CommandLine::new("docker").args(["logout", registry]).run(echo);
    match &docker {
        Ok(()) => eprintln!("{}", format!("✓ Logged out from {registry}").green()),
        Err(_) => eprintln!("{}", format!("✗ Docker logout failed for {registry}").red()),
    }
    eprintln!();

    azure.and(docker)?;
    eprintln!("{}", "Logout complete!".green());
    Ok(())
}

/// Report Azure account and registry credential state.
pub fn status(settings: &Settings) -> DeployResult<()> {
    check_prerequisites()?;
    let acr = require_acr_name(settings)?;

    heading("Login Status");

    eprintln!("{}", "Azure CLI:".blue().bold());
    if is_azure_logged_in() {
        eprintln!("{}", "  ✓ Logged in".green());
        if let Ok(account) = cmd::run(
            "az",
            &[
                "account",
                "show",
                "--query",
                "{Name: name, SubscriptionId: id, TenantId: tenantId}",
                "-o",
                "table",
            ],
        ) {
            println!("{account}");
        }
    } else {
        eprintln!("{}", "  ✗ Not logged in".red());
    }
    eprintln!();

    eprintln!(
        "{}",
        format!("Azure Container Registry ({acr}):").blue().bold()
    );
    if cmd::succeeds("az", &["acr", "login", "--name", acr, "--only-show-errors"]) {
        eprintln!("{}", "  ✓ Logged in and credentials valid".green());
    } else {
        eprintln!("{}", "  ✗ Not logged in or credentials expired".red());
    }
    Ok(())
}
