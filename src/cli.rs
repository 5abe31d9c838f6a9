use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::compose;
use crate::error::{DeployError, DeployResult};
use crate::git::Git;
use crate::image::{self, BuildRequest};
use crate::login;
use crate::onboarding::TerminalConsole;
use crate::plugins;
use crate::server;
use crate::settings::{SETTINGS_FILE, Settings, SettingsFile};
use crate::spaces;

/// Totoro, your dependable DevOps buddy
#[derive(Parser)]
#[command(name = "totoro", version)]
pub struct Cli {
    /// Settings file
    #[arg(long, global = true, env = "TOTORO_SETTINGS", default_value = SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Print debug diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not echo external commands before running them
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Set up Docker contexts
    Init,

    /// Docker image management
    Image {
        #[command(subcommand)]
        command: ImageCommand,
    },

    /// Container orchestration
    Compose {
        #[command(subcommand)]
        command: ComposeCommand,
    },

    /// Server configuration management
    Server {
        #[command(subcommand)]
        command: ServerCommand,
    },

    /// Download database, translations & files backups from object storage
    Spaces {
        #[command(subcommand)]
        command: SpacesCommand,
    },

    /// Login to Azure Container Registry (ACR)
    Login,

    /// Logout from Azure and Azure Container Registry
    Logout,

    /// Check Azure and ACR login status
    Status,

    /// List project plugins
    Plugins,

    #[command(external_subcommand)]
    External(Vec<String>),
}

#[derive(Subcommand)]
pub enum ImageCommand {
    /// Build docker image and push it
    Build {
        /// Service to build
        service: String,

        /// Image tag. Derived from the current git branch when omitted
        #[arg(long)]
        tag: Option<String>,

        /// Build without cache
        #[arg(long)]
        no_cache: bool,

        /// Accept an existing deployment target without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Push image to container registry
    Push {
        /// Service to push
        service: String,

        /// Image tag. Derived from the current git branch when omitted
        #[arg(long)]
        tag: Option<String>,
    },

    /// Pull image from container registry
    Pull {
        /// Service to pull
        service: String,

        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Subcommand)]
pub enum ComposeCommand {
    /// Docker compose up
    Up {
        /// Compose profile
        profile: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Stay attached instead of running detached
        #[arg(long)]
        no_daemon: bool,
    },

    /// Docker compose down
    Down {
        /// Compose profile
        profile: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Docker compose exec
    Exec {
        /// Compose profile
        profile: String,

        /// Command to execute
        command: String,

        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Subcommand)]
pub enum ServerCommand {
    /// Create a new sudo user
    AddSudoUser {
        /// User name
        user: String,

        /// Group name
        group: String,

        #[command(flatten)]
        host: HostArgs,
    },

    /// Secure copy the setup script to the host
    ScpSetupScript {
        #[command(flatten)]
        host: HostArgs,
    },
}

#[derive(Subcommand)]
pub enum SpacesCommand {
    /// List backed up resources
    List {
        /// Resource type
        resource: String,
    },

    /// Download resource
    Download {
        /// Resource type
        resource: String,

        /// File name
        filename: String,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Image tag. Derived from the current git branch when omitted
    #[arg(long)]
    pub tag: Option<String>,

    /// Docker context. Resolved from the tag when omitted
    #[arg(long)]
    pub context: Option<String>,

    /// Resolve as the `local` deployment target
    #[arg(long)]
    pub local: bool,
}

impl From<&TargetArgs> for compose::Target {
    fn from(args: &TargetArgs) -> Self {
        Self {
            tag: args.tag.clone(),
            context: args.context.clone(),
            local: args.local,
        }
    }
}

#[derive(Args)]
pub struct HostArgs {
    /// Docker context naming the host
    #[arg(long, default_value = "default")]
    pub context: String,

    /// SSH private key
    #[arg(long)]
    pub identity: Option<String>,
}

/// Load settings and dispatch `cli.command`.
pub fn run(cli: &Cli) -> DeployResult<()> {
    let file = SettingsFile::new(&cli.settings);
    let mut settings = file.load()?;
    let echo = !cli.quiet;
    let vcs = Git;

    match &cli.command {
        Command::Init => server::init_contexts(&settings, echo),
        Command::Image { command } => match command {
            ImageCommand::Build {
                service,
                tag,
                no_cache,
                yes,
            } => {
                let request = BuildRequest {
                    service: service.clone(),
                    tag: tag.clone(),
                    use_cache: !no_cache,
                    yes: *yes,
                    echo,
                };
                image::build(&mut settings, &file, &vcs, &mut TerminalConsole, &request)
            }
            ImageCommand::Push { service, tag } => {
                image::push(&settings, &vcs, service, tag.as_deref(), echo)
            }
            ImageCommand::Pull { service, target } => image::pull(
                &settings,
                &vcs,
                service,
                target.tag.as_deref(),
                target.context.as_deref(),
                target.local,
                echo,
            ),
        },
        Command::Compose { command } => match command {
            ComposeCommand::Up {
                profile,
                target,
                no_daemon,
            } => compose::up(&settings, &vcs, profile, &target.into(), !no_daemon, echo),
            ComposeCommand::Down { profile, target } => {
                compose::down(&settings, &vcs, profile, &target.into(), echo)
            }
            ComposeCommand::Exec {
                profile,
                command,
                target,
            } => compose::exec(&settings, &vcs, profile, command, &target.into(), echo),
        },
        Command::Server { command } => match command {
            ServerCommand::AddSudoUser { user, group, host } => server::add_sudo_user(
                &settings,
                &host.context,
                user,
                group,
                host.identity.as_deref(),
            ),
            ServerCommand::ScpSetupScript { host } => {
                server::scp_setup_script(&settings, &host.context, host.identity.as_deref())
            }
        },
        Command::Spaces { command } => match command {
            SpacesCommand::List { resource } => spaces::list(&settings, resource),
            SpacesCommand::Download { resource, filename } => {
                spaces::download(&settings, resource, filename, echo)
            }
        },
        Command::Login => login::login(&settings, echo),
        Command::Logout => login::logout(&settings, echo),
        Command::Status => login::status(&settings),
        Command::Plugins => {
            for plugin in plugins::discover(&plugins_dir(cli, &settings))? {
                println!("{}\t{}", plugin.name, plugin.path.display());
            }
            Ok(())
        }
        Command::External(args) => {
            let Some((name, rest)) = args.split_first() else {
                return Err(DeployError::Other("missing command".into()));
            };
            let found = plugins::discover(&plugins_dir(cli, &settings))?;
            plugins::run(&found, name, rest)
        }
    }
}

/// Plugins live next to the settings file.
fn plugins_dir(cli: &Cli, settings: &Settings) -> PathBuf {
    let base = cli.settings.parent().unwrap_or_else(|| Path::new("."));
    base.join(settings.plugins_dir_name.as_deref().unwrap_or("plugins"))
}
