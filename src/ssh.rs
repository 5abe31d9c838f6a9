use crate::cmd;
use crate::error::DeployResult;

const HOST_KEY_POLICY: &str = "StrictHostKeyChecking=accept-new";
const CONNECT_TIMEOUT: &str = "ConnectTimeout=10";

/// ssh/scp access to one configured host.
///
/// The address is taken as written in the `hosts` settings, so
/// it may carry a user (`deploy@10.0.0.5`) or name an alias from
/// `~/.ssh/config`.
pub struct SshSession {
    address: String,
    key: Option<String>,
}

impl SshSession {
    #[must_use]
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &str) -> Self {
        self.key = Some(key_path.to_string());
        self
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Run `command` quietly and report whether it exited zero.
    #[must_use]
    pub fn succeeds(&self, command: &str) -> bool {
        cmd::succeeds("ssh", &as_refs(&self.ssh_args(command)))
    }

    /// Run `command` with `input` on its stdin. No terminal is
    /// allocated, so nothing on the remote side can prompt.
    pub fn exec_with_stdin(&self, command: &str, input: &[u8]) -> DeployResult<()> {
        cmd::run_with_stdin("ssh", &as_refs(&self.ssh_args(command)), input).map(drop)
    }

    pub fn scp_to(&self, local_path: &str, remote_path: &str) -> DeployResult<()> {
        cmd::run_interactive("scp", &as_refs(&self.scp_args(local_path, remote_path)))
    }

    #[must_use]
    pub fn scp_args(&self, local_path: &str, remote_path: &str) -> Vec<String> {
        let mut args = self.options(false);
        args.extend([
            local_path.to_string(),
            format!("{}:{remote_path}", self.address),
        ]);
        args
    }

    #[must_use]
    pub fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.options(true);
        args.extend([self.address.clone(), command.to_string()]);
        args
    }

    /// `-o` options and identity shared by ssh and scp. scp has no
    /// use for the connect timeout on long copies.
    fn options(&self, timeout: bool) -> Vec<String> {
        let mut options = vec![HOST_KEY_POLICY];
        if timeout {
            options.push(CONNECT_TIMEOUT);
        }
        let mut args: Vec<String> = options
            .into_iter()
            .flat_map(|o| ["-o".to_string(), o.to_string()])
            .collect();
        if let Some(key) = &self.key {
            args.extend(["-i".to_string(), key.clone()]);
        }
        args
    }
}

fn as_refs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}
