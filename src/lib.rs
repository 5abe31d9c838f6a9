//! Deployment operations for a multi-service application.
//!
//! `totoro` wraps docker compose, image build/push/pull, Azure
//! Container Registry authentication, server provisioning, and
//! backup retrieval behind one command hierarchy. Everything is
//! driven by a `totoro.yaml` settings file in the project root.
//!
//! # Deployment targets
//!
//! Images are tagged after the current git branch
//! (`Feature/ABC` becomes `feature-abc`). A tag maps to a
//! [`DeploymentTarget`] naming the docker context, the engine
//! branch, and the environment file used for compose:
//!
//! ```yaml
//! repository: portalacr.azurecr.io/portal
//! hosts:
//!   production: deploy@10.0.0.5
//! services: [web, worker]
//! profiles: [all, web]
//! deployment_targets:
//!   main:
//!     host: production
//!     engine: master
//!     env_file: .envs/.env-production
//! ```
//!
//! Resolution is handled by [`resolve`]: a tag with a target uses
//! the target's host, any other tag is used as the context name
//! itself. Building an image for a tag with no target starts the
//! [`onboarding`] flow, which adds the target to `totoro.yaml`
//! without touching the rest of the file.
//!
//! ```sh
//! totoro image build web
//! totoro compose up all --tag main
//! totoro spaces list db
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod cmd;
pub mod compose;
pub mod error;
pub mod git;
pub mod image;
pub mod logging;
pub mod login;
pub mod onboarding;
pub mod patch;
pub mod plugins;
pub mod resolve;
pub mod server;
pub mod settings;
pub mod spaces;
pub mod ssh;
pub mod validate;

pub use error::{DeployError, DeployResult};
pub use image::ImageCoordinate;
pub use onboarding::Onboarding;
pub use settings::{DeploymentTarget, Settings, SettingsFile};
