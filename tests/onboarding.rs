use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use totoro::error::{DeployError, DeployResult};
use totoro::git::VersionControl;
use totoro::image::{self, BuildRequest};
use totoro::onboarding::{Console, Onboarding, TargetStore, pin_default_branch};
use totoro::settings::{DeploymentTarget, Settings, SettingsFile};

const SETTINGS: &str = "\
repository: portalacr.azurecr.io/portal
hosts:
  default: 1.2.3.4
  production: deploy@10.0.0.5
services: [web, worker]
profiles: [all]
deployment_targets:
  main:
    host: production
    engine: master
    env_file: .envs/.env-production
engine:
  service: web
  path: portal/api/calculator
";

/// Answers queued up front; `None` is a cancel (EOF / Ctrl-C).
struct Scripted {
    answers: VecDeque<Option<String>>,
    transcript: Vec<String>,
}

impl Scripted {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| Some((*a).to_string())).collect(),
            transcript: Vec::new(),
        }
    }

    fn then_cancel(mut self) -> Self {
        self.answers.push_back(None);
        self
    }

    fn said(&self, line: &str) -> usize {
        self.transcript.iter().filter(|l| *l == line).count()
    }
}

impl Console for Scripted {
    fn say(&mut self, line: &str) {
        self.transcript.push(line.to_string());
    }

    fn ask(&mut self, prompt: &str) -> DeployResult<Option<String>> {
        self.transcript.push(format!("? {prompt}"));
        Ok(self
            .answers
            .pop_front()
            .expect("console asked more questions than scripted"))
    }
}

#[derive(Default)]
struct Recorder {
    saved: RefCell<Vec<(String, DeploymentTarget)>>,
}

impl TargetStore for Recorder {
    fn persist(&self, tag: &str, target: &DeploymentTarget) -> DeployResult<()> {
        self.saved
            .borrow_mut()
            .push((tag.to_string(), target.clone()));
        Ok(())
    }
}

struct Remote {
    branches: Option<Vec<&'static str>>,
}

impl Remote {
    fn with(branches: &[&'static str]) -> Self {
        Self {
            branches: Some(branches.to_vec()),
        }
    }

    const fn unreachable() -> Self {
        Self { branches: None }
    }
}

impl VersionControl for Remote {
    fn current_branch(&self) -> DeployResult<String> {
        Ok("release-1".into())
    }

    fn remote_branches(&self, _repo: &Path, remote: &str) -> DeployResult<Vec<String>> {
        assert_eq!(remote, "origin");
        self.branches
            .as_ref()
            .map(|b| b.iter().map(ToString::to_string).collect())
            .ok_or_else(|| DeployError::Other("fetch failed".into()))
    }
}

fn settings() -> Settings {
    Settings::from_yaml(SETTINGS).unwrap()
}

fn release_target() -> DeploymentTarget {
    DeploymentTarget {
        host: "default".into(),
        engine: "master".into(),
        env_file: ".envs/.env-production".into(),
    }
}

#[test]
fn new_tag_is_created_from_menu_choices() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::with(&["develop", "master"]);
    let mut console = Scripted::new(&["y", "1", "1", "3", "y"]);

    let target = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .run("release-1", "web")
        .unwrap();

    assert_eq!(target, release_target());
    assert_eq!(
        *store.saved.borrow(),
        vec![("release-1".to_string(), release_target())]
    );
    assert_eq!(settings.deployment_target("release-1"), Some(&release_target()));
    assert_eq!(console.said("No deployment target found for tag `release-1`."), 1);
    assert_eq!(console.said("  [1] master"), 1);
    assert_eq!(console.said("  [2] develop"), 1);
    assert_eq!(console.said("Deployment target `release-1` saved."), 1);
}

#[test]
fn created_target_lands_in_the_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("totoro.yaml");
    fs::write(&path, SETTINGS).unwrap();
    let file = SettingsFile::new(&path);
    let mut settings = file.load().unwrap();
    let vcs = Remote::with(&["master"]);
    let mut console = Scripted::new(&["y", "1", "1", "3", "y"]);

    Onboarding::new(&mut settings, &file, &vcs, &mut console)
        .run("release-1", "web")
        .unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with(SETTINGS.split("engine:\n  service").next().unwrap()));
    let reloaded = file.load().unwrap();
    assert_eq!(reloaded.deployment_target("release-1"), Some(&release_target()));
    assert_eq!(reloaded.deployment_targets.len(), 2);
}

#[test]
fn cancelling_host_selection_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("totoro.yaml");
    fs::write(&path, SETTINGS).unwrap();
    let file = SettingsFile::new(&path);
    let mut settings = file.load().unwrap();
    let vcs = Remote::with(&["master"]);
    let mut console = Scripted::new(&["y"]).then_cancel();

    let err = Onboarding::new(&mut settings, &file, &vcs, &mut console)
        .run("release-1", "web")
        .unwrap_err();

    assert!(matches!(err, DeployError::Cancelled(_)));
    assert!(err.is_cancellation());
    assert_eq!(fs::read_to_string(&path).unwrap(), SETTINGS);
    assert!(settings.deployment_target("release-1").is_none());
}

#[test]
fn cancel_words_abort_like_eof() {
    for word in ["q", "quit", "Cancel", "ABORT"] {
        let mut settings = settings();
        let store = Recorder::default();
        let vcs = Remote::with(&["master"]);
        let mut console = Scripted::new(&["y", "2", word]);

        let err = Onboarding::new(&mut settings, &store, &vcs, &mut console)
            .run("release-1", "web")
            .unwrap_err();

        assert!(err.is_cancellation(), "{word}");
        assert!(store.saved.borrow().is_empty());
    }
}

#[test]
fn declining_creation_is_a_cancellation() {
    for answer in ["", "n", "No"] {
        let mut settings = settings();
        let store = Recorder::default();
        let vcs = Remote::with(&["master"]);
        let mut console = Scripted::new(&[answer]);

        let err = Onboarding::new(&mut settings, &store, &vcs, &mut console)
            .run("release-1", "web")
            .unwrap_err();

        assert!(err.is_cancellation());
        assert!(store.saved.borrow().is_empty());
    }
}

#[test]
fn bad_answers_are_asked_again() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::with(&["master"]);
    let mut console = Scripted::new(&["maybe", "y", "abc", "9", "0", "2", "1", "1", "y"]);

    let target = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .run("release-1", "web")
        .unwrap();

    assert_eq!(target.host, "production");
    assert_eq!(target.env_file, ".envs/.env-dev");
    assert_eq!(console.said("Please answer y or n."), 1);
    assert_eq!(console.said("Please enter a number."), 1);
    assert_eq!(console.said("Invalid choice, try again."), 2);
}

#[test]
fn custom_values_are_accepted() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::with(&["master", "develop"]);
    // Branch typed directly; env file through the custom entry.
    let mut console = Scripted::new(&["y", "1", "feature-x", "4", "", ".envs/.env-qa", "y"]);

    let target = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .run("release-1", "web")
        .unwrap();

    assert_eq!(target.engine, "feature-x");
    assert_eq!(target.env_file, ".envs/.env-qa");
    assert_eq!(console.said("  [4] Enter a custom value"), 1);
}

#[test]
fn services_without_engine_skip_branch_selection() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::unreachable();
    let mut console = Scripted::new(&["y", "1", "2", "y"]);

    let target = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .run("release-1", "worker")
        .unwrap();

    assert_eq!(target.engine, "master");
    assert_eq!(target.env_file, ".envs/.env-staging");
    assert_eq!(console.said("Select engine branch:"), 0);
}

#[test]
fn unreachable_remote_offers_the_default_branch() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::unreachable();
    let mut console = Scripted::new(&["y", "1", "1", "1", "y"]);

    let target = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .run("release-1", "web")
        .unwrap();

    assert_eq!(target.engine, "master");
    assert_eq!(console.said("  [1] master"), 1);
    assert_eq!(console.said("  [2] Enter a custom value"), 1);
}

#[test]
fn existing_target_is_confirmed() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::unreachable();
    let mut console = Scripted::new(&["yes"]);

    let target = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .run("main", "web")
        .unwrap();

    assert_eq!(target.host, "production");
    assert!(store.saved.borrow().is_empty());
}

#[test]
fn refusing_an_existing_target_cancels() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::unreachable();
    let mut console = Scripted::new(&["n"]);

    let err = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .run("main", "web")
        .unwrap_err();

    assert!(err.is_cancellation());
}

#[test]
fn stale_host_fails_before_confirmation() {
    let mut settings = settings();
    settings.deployment_targets.insert(
        "qa".into(),
        DeploymentTarget {
            host: "retired".into(),
            engine: "master".into(),
            env_file: ".envs/.env-staging".into(),
        },
    );
    let store = Recorder::default();
    let vcs = Remote::unreachable();
    let mut console = Scripted::new(&[]);

    let err = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .auto_confirm(true)
        .run("qa", "web")
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Invalid context: retired. Choose from default, production"
    );
    assert!(console.transcript.is_empty());
}

#[test]
fn auto_confirm_skips_the_question() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::unreachable();
    let mut console = Scripted::new(&[]);

    let target = Onboarding::new(&mut settings, &store, &vcs, &mut console)
        .auto_confirm(true)
        .run("main", "web")
        .unwrap();

    assert_eq!(target.env_file, ".envs/.env-production");
    assert!(!console.transcript.iter().any(|l| l.starts_with("? ")));
}

#[test]
fn default_branch_is_pinned_first() {
    let branches = vec!["develop".into(), "feature".into(), "master".into()];
    assert_eq!(
        pin_default_branch(branches),
        vec!["master", "develop", "feature"]
    );
    assert_eq!(pin_default_branch(vec!["develop".into()]), vec!["develop"]);
}

#[test]
fn cancelled_build_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("totoro.yaml");
    fs::write(&path, SETTINGS).unwrap();
    let file = SettingsFile::new(&path);
    let mut settings = file.load().unwrap();
    let vcs = Remote::with(&["master"]);
    let mut console = Scripted::new(&["y"]).then_cancel();
    let request = BuildRequest {
        service: "web".into(),
        tag: Some("release-1".into()),
        use_cache: true,
        ..BuildRequest::default()
    };

    let err = image::build(&mut settings, &file, &vcs, &mut console, &request).unwrap_err();

    assert!(err.is_cancellation());
    assert_eq!(err.to_string(), "build cancelled");
    assert_eq!(fs::read_to_string(&path).unwrap(), SETTINGS);
}

#[test]
fn unknown_service_fails_before_prompting() {
    let mut settings = settings();
    let store = Recorder::default();
    let vcs = Remote::unreachable();
    let mut console = Scripted::new(&[]);
    let request = BuildRequest {
        service: "cron".into(),
        ..BuildRequest::default()
    };

    let err = image::build(&mut settings, &store, &vcs, &mut console, &request).unwrap_err();

    assert!(matches!(err, DeployError::InvalidField { .. }));
    assert!(console.transcript.is_empty());
}
