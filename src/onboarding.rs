//! Interactive creation and confirmation of deployment targets.
//!
//! Builds for a tag go through [`Onboarding::run`]. A known tag
//! must point at a configured context and is shown and
//! confirmed; an unknown one can be turned into a new target by
//! picking a host, an engine branch, and an environment file.
//! Every prompt re-asks on bad input, and a cancellation at any
//! step aborts the whole flow with
//! [`DeployError::Cancelled`] before anything is written.

use std::path::Path;

use crate::error::{DeployError, DeployResult};
use crate::git::VersionControl;
use crate::settings::{DeploymentTarget, Settings, SettingsFile};
use crate::validate::{Field, validate};

/// Environment files offered for new targets.
pub const ENV_FILE_CHOICES: [&str; 3] = [
    ".envs/.env-dev",
    ".envs/.env-staging",
    ".envs/.env-production",
];

/// Engine branch used when none can be listed or chosen.
pub const DEFAULT_ENGINE_BRANCH: &str = "master";

const CANCEL_WORDS: [&str; 4] = ["q", "quit", "cancel", "abort"];

/// Operator input and output.
pub trait Console {
    fn say(&mut self, line: &str);

    /// Read one line. `None` means the operator cancelled.
    fn ask(&mut self, prompt: &str) -> DeployResult<Option<String>>;
}

/// Where a confirmed new target is saved.
pub trait TargetStore {
    fn persist(&self, tag: &str, target: &DeploymentTarget) -> DeployResult<()>;
}

impl TargetStore for SettingsFile {
    fn persist(&self, tag: &str, target: &DeploymentTarget) -> DeployResult<()> {
        self.write_deployment_target(tag, target)
    }
}

/// Console on the invoking terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn say(&mut self, line: &str) {
        eprintln!("{line}");
    }

    fn ask(&mut self, prompt: &str) -> DeployResult<Option<String>> {
        let answer = dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text();
        match answer {
            Ok(line) => Ok(Some(line)),
            Err(dialoguer::Error::IO(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::Interrupted | std::io::ErrorKind::UnexpectedEof
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(DeployError::Other(format!("prompt failed: {e}"))),
        }
    }
}

#[derive(Debug)]
enum State {
    Confirm(DeploymentTarget),
    OfferCreate,
    SelectHost,
    SelectEngineBranch { host: String },
    SelectEnvFile { host: String, engine: String },
    Summarize(DeploymentTarget),
    Persist(DeploymentTarget),
}

/// One run of the onboarding flow for a tag and service.
pub struct Onboarding<'a> {
    settings: &'a mut Settings,
    store: &'a dyn TargetStore,
    vcs: &'a dyn VersionControl,
    console: &'a mut dyn Console,
    auto_confirm: bool,
}

impl<'a> Onboarding<'a> {
    #[must_use]
    pub const fn new(
        settings: &'a mut Settings,
        store: &'a dyn TargetStore,
        vcs: &'a dyn VersionControl,
        console: &'a mut dyn Console,
    ) -> Self {
        Self {
            settings,
            store,
            vcs,
            console,
            auto_confirm: false,
        }
    }

    /// Accept an existing target without asking.
    #[must_use]
    pub const fn auto_confirm(mut self, yes: bool) -> Self {
        self.auto_confirm = yes;
        self
    }

    /// Return the target for `tag`, creating it if the operator
    /// agrees. A created target is persisted and added to the
    /// in-memory settings.
    pub fn run(mut self, tag: &str, service: &str) -> DeployResult<DeploymentTarget> {
        let mut state = match self.settings.deployment_target(tag) {
            Some(target) => State::Confirm(target.clone()),
            None => State::OfferCreate,
        };

        loop {
            tracing::trace!(?state, %tag, "onboarding step");
            state = match state {
                State::Confirm(target) => {
                    validate(self.settings, Field::Context, &target.host)?;
                    self.show_target(tag, &target);
                    if self.auto_confirm || self.confirm("Proceed with this deployment target?")? {
                        return Ok(target);
                    }
                    return Err(cancelled());
                }
                State::OfferCreate => {
                    self.console
                        .say(&format!("No deployment target found for tag `{tag}`."));
                    if !self.confirm("Create one now?")? {
                        return Err(cancelled());
                    }
                    State::SelectHost
                }
                State::SelectHost => State::SelectEngineBranch {
                    host: self.select_host()?,
                },
                State::SelectEngineBranch { host } => {
                    let engine = if self.settings.uses_engine(service) {
                        self.select_engine_branch()?
                    } else {
                        DEFAULT_ENGINE_BRANCH.to_string()
                    };
                    State::SelectEnvFile { host, engine }
                }
                State::SelectEnvFile { host, engine } => State::Summarize(DeploymentTarget {
                    host,
                    engine,
                    env_file: self.select_env_file()?,
                }),
                State::Summarize(target) => {
                    self.show_target(tag, &target);
                    if !self.confirm("Save this deployment target?")? {
                        return Err(cancelled());
                    }
                    State::Persist(target)
                }
                State::Persist(target) => {
                    self.store.persist(tag, &target)?;
                    self.settings
                        .deployment_targets
                        .insert(tag.to_string(), target.clone());
                    self.console
                        .say(&format!("Deployment target `{tag}` saved."));
                    return Ok(target);
                }
            };
        }
    }

    fn show_target(&mut self, tag: &str, target: &DeploymentTarget) {
        self.console.say(&format!("Deployment target `{tag}`:"));
        self.console.say(&format!("  host:     {}", target.host));
        self.console.say(&format!("  engine:   {}", target.engine));
        self.console.say(&format!("  env_file: {}", target.env_file));
    }

    fn select_host(&mut self) -> DeployResult<String> {
        let hosts: Vec<String> = self
            .settings
            .context_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        self.choose("Select host:", &hosts, false)
    }

    fn select_engine_branch(&mut self) -> DeployResult<String> {
        let branches = match &self.settings.engine {
            Some(engine) => {
                match self
                    .vcs
                    .remote_branches(Path::new(&engine.path), &engine.remote)
                {
                    Ok(branches) if !branches.is_empty() => branches,
                    Ok(_) => vec![DEFAULT_ENGINE_BRANCH.to_string()],
                    Err(e) => {
                        tracing::warn!(error = %e, "could not list engine branches");
                        vec![DEFAULT_ENGINE_BRANCH.to_string()]
                    }
                }
            }
            None => vec![DEFAULT_ENGINE_BRANCH.to_string()],
        };
        self.choose("Select engine branch:", &pin_default_branch(branches), true)
    }

    fn select_env_file(&mut self) -> DeployResult<String> {
        let files: Vec<String> = ENV_FILE_CHOICES.iter().map(ToString::to_string).collect();
        self.choose("Select environment file:", &files, true)
    }

    /// Numbered menu. With `custom`, one extra entry asks for a
    /// free value, and any non-numeric answer is taken as one.
    fn choose(&mut self, title: &str, options: &[String], custom: bool) -> DeployResult<String> {
        self.console.say(title);
        for (i, option) in options.iter().enumerate() {
            self.console.say(&format!("  [{}] {option}", i + 1));
        }
        let custom_index = options.len() + 1;
        if custom {
            self.console
                .say(&format!("  [{custom_index}] Enter a custom value"));
        }

        loop {
            let answer = self.read("Choice")?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(options[n - 1].clone()),
                Ok(n) if custom && n == custom_index => return self.read_custom(),
                Ok(_) => self.console.say("Invalid choice, try again."),
                Err(_) if custom && !answer.is_empty() => return Ok(answer),
                Err(_) => self.console.say("Please enter a number."),
            }
        }
    }

    fn read_custom(&mut self) -> DeployResult<String> {
        loop {
            let value = self.read("Value")?;
            if !value.is_empty() {
                return Ok(value);
            }
        }
    }

    fn confirm(&mut self, question: &str) -> DeployResult<bool> {
        loop {
            match self.read(&format!("{question} [y/N]"))?.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => self.console.say("Please answer y or n."),
            }
        }
    }

    /// Trimmed answer, or the cancellation error.
    fn read(&mut self, prompt: &str) -> DeployResult<String> {
        let answer = self.console.ask(prompt)?.ok_or_else(cancelled)?;
        let answer = answer.trim();
        if CANCEL_WORDS.iter().any(|w| answer.eq_ignore_ascii_case(w)) {
            return Err(cancelled());
        }
        Ok(answer.to_string())
    }
}

/// Move the default branch to the front when present.
#[must_use]
pub fn pin_default_branch(mut branches: Vec<String>) -> Vec<String> {
    if let Some(pos) = branches.iter().position(|b| b == DEFAULT_ENGINE_BRANCH) {
        let default = branches.remove(pos);
        branches.insert(0, default);
    }
    branches
}

fn cancelled() -> DeployError {
    DeployError::Cancelled("build".into())
}
