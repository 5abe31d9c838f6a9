use colored::Colorize;

use crate::cmd::{CommandLine, shell_quote};
use crate::error::{DeployError, DeployResult};
use crate::settings::Settings;
use crate::ssh::SshSession;
use crate::validate::{Field, validate};

/// `docker context create` lines, one per configured host.
#[must_use]
pub fn context_commands(settings: &Settings) -> Vec<CommandLine> {
    settings
        .hosts
        .iter()
        .map(|(context, address)| {
            CommandLine::new("docker")
                .args(["context", "create", context.as_str()])
                .arg(format!("--docker=host=ssh://{address}"))
        })
        .collect()
}

/// Create a docker context for every configured host.
pub fn init_contexts(settings: &Settings, echo: bool) -> DeployResult<()> {
    for command in context_commands(settings) {
        command.run(echo)?;
    }
    Ok(())
}

fn session(settings: &Settings, context: &str, identity: Option<&str>) -> DeployResult<SshSession> {
    validate(settings, Field::Context, context)?;
    let address = settings.host_address(context).ok_or_else(|| {
        DeployError::Other(format!("context `{context}` has no host address"))
    })?;
    let session = SshSession::new(address);
    Ok(match identity {
        Some(key) => session.with_key(key),
        None => session,
    })
}

/// Creates `$1` in group `$2` with sudo rights, sets its password
/// from the `user:password` line on stdin, and copies the keys in
/// `$3/.ssh`. Stops at the first failing step.
const SUDO_USER_SCRIPT: &str = "set -e; \
    groupadd -f \"$2\"; \
    adduser --disabled-password --gecos \"\" --ingroup \"$2\" \"$1\"; \
    chpasswd; \
    usermod -aG sudo \"$1\"; \
    rsync --archive --chown=\"$1:$2\" \"$3/.ssh\" \"/home/$1\"";

/// `sudo` that reads the password from the first stdin line,
/// ignoring any cached credentials so that line is always consumed.
const SUDO_READING_PASSWORD: &str = "sudo -k -S -p ''";

const SUDO_WITHOUT_PASSWORD: &str = "sudo -n";

const fn sudo(needs_password: bool) -> &'static str {
    if needs_password {
        SUDO_READING_PASSWORD
    } else {
        SUDO_WITHOUT_PASSWORD
    }
}

/// Remote command creating `user` in `group`, run as one root
/// shell so every step shares a single sudo authentication.
/// The login user's `$HOME` is expanded before sudo.
#[must_use]
pub fn sudo_user_command(user: &str, group: &str, needs_password: bool) -> String {
    format!(
        "{} sh -c {} sh {} {} \"$HOME\"",
        sudo(needs_password),
        shell_quote(SUDO_USER_SCRIPT),
        shell_quote(user),
        shell_quote(group)
    )
}

/// Stdin for [`sudo_user_command`]: the sudo password line when
/// one is needed, then the `chpasswd` line.
#[must_use]
pub fn sudo_user_input(sudo_password: Option<&str>, user: &str, password: &str) -> String {
    let mut input = String::new();
    if let Some(sudo_password) = sudo_password {
        input.push_str(sudo_password);
        input.push('\n');
    }
    input.push_str(&format!("{user}:{password}\n"));
    input
}

fn prompt_password(prompt: &str, confirm: bool) -> DeployResult<String> {
    let mut input = dialoguer::Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Confirm password", "Passwords do not match");
    }
    input
        .interact()
        .map_err(|e| DeployError::Other(format!("password prompt failed: {e}")))
}

/// Create a sudo user on the host of `context`.
///
/// Reachability and sudo access are checked before anything is
/// changed. When sudo needs a password it is asked for here and
/// verified; the new user's password is read without echo. Both
/// travel on stdin, never on a command line.
pub fn add_sudo_user(
    settings: &Settings,
    context: &str,
    user: &str,
    group: &str,
    identity: Option<&str>,
) -> DeployResult<()> {
    let ssh = session(settings, context, identity)?;

    if !ssh.succeeds("true") {
        return Err(DeployError::Other(format!(
            "cannot reach `{}` over ssh",
            ssh.address()
        )));
    }

    let sudo_password = if ssh.succeeds(&format!("{SUDO_WITHOUT_PASSWORD} true")) {
        None
    } else {
        let password = prompt_password(&format!("sudo password on {}", ssh.address()), false)?;
        ssh.exec_with_stdin(
            &format!("{SUDO_READING_PASSWORD} true"),
            format!("{password}\n").as_bytes(),
        )
        .map_err(|_| {
            DeployError::Other(format!("sudo is not available on `{}`", ssh.address()))
        })?;
        Some(password)
    };
    tracing::debug!(%context, needs_password = sudo_password.is_some(), "sudo access checked");

    let password = prompt_password("Enter password for new user", true)?;
    let input = sudo_user_input(sudo_password.as_deref(), user, &password);
    ssh.exec_with_stdin(
        &sudo_user_command(user, group, sudo_password.is_some()),
        input.as_bytes(),
    )?;

    eprintln!("{}", format!("{user}:{group} added!").dimmed().green().italic());
    tracing::info!(%context, %user, %group, "sudo user created");
    Ok(())
}

/// Copy the configured setup script to the home directory on the
/// host of `context`.
pub fn scp_setup_script(
    settings: &Settings,
    context: &str,
    identity: Option<&str>,
) -> DeployResult<()> {
    let ssh = session(settings, context, identity)?;
    let script = settings.setup_script()?;
    let local = format!("{}/{}", script.dir.trim_end_matches('/'), script.filename);
    if !std::path::Path::new(&local).is_file() {
        return Err(DeployError::FileNotFound(local));
    }

    ssh.scp_to(&local, ".")?;

    eprintln!(
        "{}",
        format!(
            "\nStart a SSH session to run the following command:\nsudo ./{}\n",
            script.filename
        )
        .dimmed()
        .green()
        .italic()
    );
    Ok(())
}
