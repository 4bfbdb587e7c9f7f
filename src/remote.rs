// Copyright 2020 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An SSH endpoint, rendered as an `ssh` command line.
//!
//! When syncing with a remote host, rsync is told to reach it through the
//! endpoint's [connection options](RemoteEndpoint::connection_options)
//! passed as `--rsh`, and the remote path is prefixed by
//! [`user@host`](RemoteEndpoint::host_connection).
//!
//! If no identity file is given, ssh falls back to its own defaults, which
//! may mean prompting for a password.

use std::convert::TryFrom;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use regex::Regex;

use crate::access;
use crate::command::CommandLine;
use crate::config::RemoteConfig;
use crate::error::ValidationError;
use crate::Result;

/// SSH command name, to start it as a subprocess.
const DEFAULT_SSH_COMMAND: &str = "ssh";
/// Port ssh uses when none is given; not rendered.
const DEFAULT_SSH_PORT: u16 = 22;


/// A host reachable over SSH.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEndpoint {
    executable: String,
    host: Option<String>,
    port: u16,
    username: Option<String>,
    /// Key passed with `-i`; checked readable when set.
    identity_file: Option<PathBuf>,
    strict_host_key_checking: Option<bool>,
    user_known_hosts_file: Option<PathBuf>,
}

impl Default for RemoteEndpoint {
    fn default() -> RemoteEndpoint {
        RemoteEndpoint {
            executable: DEFAULT_SSH_COMMAND.to_owned(),
            host: None,
            port: DEFAULT_SSH_PORT,
            username: None,
            identity_file: None,
            strict_host_key_checking: None,
            user_known_hosts_file: None,
        }
    }
}

impl RemoteEndpoint {
    pub fn new() -> RemoteEndpoint {
        RemoteEndpoint::default()
    }

    /// Build an endpoint from its configuration.
    ///
    /// Options are applied in a fixed order: executable, host, port,
    /// username, public key, private key, host key checking and known hosts
    /// file. The last key file given wins.
    pub fn from_config(config: &RemoteConfig) -> Result<RemoteEndpoint> {
        let mut endpoint = RemoteEndpoint::new();
        if let Some(executable) = &config.executable {
            endpoint.set_executable(executable.as_str());
        }
        if let Some(host) = &config.host {
            endpoint.set_host(host.as_str());
        }
        if let Some(port) = config.port {
            endpoint.set_port(port_number(port)?);
        }
        if let Some(username) = &config.username {
            endpoint.set_username(username.as_str());
        }
        if let Some(path) = &config.public_key {
            endpoint.set_identity_file(path)?;
        }
        if let Some(path) = &config.private_key {
            endpoint.set_identity_file(path)?;
        }
        if let Some(checking) = &config.strict_host_key_checking {
            let strict = checking
                .as_bool()
                .ok_or(ValidationError::InvalidOption {
                    key: "strict_host_key_checking".to_owned(),
                    expected: "a boolean, \"yes\" or \"no\"",
                })?;
            endpoint.set_strict_host_key_checking(strict);
        }
        if let Some(path) = &config.user_known_hosts_file {
            endpoint.set_user_known_hosts_file(path);
        }
        Ok(endpoint)
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Set the ssh program to run. This is not checked.
    pub fn set_executable<S: Into<String>>(&mut self, executable: S) -> &mut Self {
        self.executable = executable.into();
        self
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_host<S: Into<String>>(&mut self, host: S) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = port;
        self
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username<S: Into<String>>(&mut self, username: S) -> &mut Self {
        self.username = Some(username.into());
        self
    }

    pub fn identity_file(&self) -> Option<&Path> {
        self.identity_file.as_deref()
    }

    /// Set the key file passed to `ssh -i`.
    ///
    /// Fails, leaving the previous value, if the file can't be read now.
    pub fn set_identity_file<P: Into<PathBuf>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.into();
        if !access::is_readable(&path) {
            return Err(ValidationError::UnreadableFile(path).into());
        }
        self.identity_file = Some(path);
        Ok(self)
    }

    pub fn strict_host_key_checking(&self) -> Option<bool> {
        self.strict_host_key_checking
    }

    pub fn set_strict_host_key_checking(&mut self, strict: bool) -> &mut Self {
        self.strict_host_key_checking = Some(strict);
        self
    }

    pub fn user_known_hosts_file(&self) -> Option<&Path> {
        self.user_known_hosts_file.as_deref()
    }

    pub fn set_user_known_hosts_file<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.user_known_hosts_file = Some(path.into());
        self
    }

    /// Build the ssh command line, optionally ending in `user@host`.
    pub fn build_command(&self, include_host: bool) -> Result<CommandLine> {
        if self.username.is_none() {
            return Err(ValidationError::MissingUsername.into());
        }
        if self.host.is_none() {
            return Err(ValidationError::MissingHost.into());
        }

        let mut command = CommandLine::new(self.executable.as_str());
        if self.port != DEFAULT_SSH_PORT {
            command.add_argument("p", self.port);
        }
        if let Some(identity_file) = &self.identity_file {
            command.add_argument("i", identity_file.as_path());
        }
        if let Some(strict) = self.strict_host_key_checking {
            let answer = if strict { "yes" } else { "no" };
            command.add_argument("o", format!("StrictHostKeyChecking={}", answer));
        }
        if let Some(known_hosts) = &self.user_known_hosts_file {
            command.add_argument(
                "o",
                format!("UserKnownHostsFile={}", known_hosts.display()),
            );
        }
        if include_host {
            command.add_parameter(self.host_connection());
        }
        Ok(command)
    }

    /// The ssh command line without the host, for use as rsync's `--rsh`.
    pub fn connection_options(&self) -> Result<String> {
        Ok(self.build_command(false)?.render().to_owned())
    }

    /// `user@host`, as currently set; nothing is checked.
    pub fn host_connection(&self) -> String {
        format!(
            "{}@{}",
            self.username.as_deref().unwrap_or_default(),
            self.host.as_deref().unwrap_or_default()
        )
    }
}

fn port_number(port: i64) -> std::result::Result<u16, ValidationError> {
    u16::try_from(port).map_err(|_| ValidationError::InvalidPort(port.to_string()))
}

/// Parse an SFTP-style `user@host` or `user@host:port` into a
/// configuration for [`RemoteEndpoint::from_config`].
///
/// ```
/// let config = rsync_wrapper::remote::parse_target("mbp@bilbo:2222").unwrap();
/// let endpoint = rsync_wrapper::RemoteEndpoint::from_config(&config).unwrap();
/// assert_eq!(endpoint.host_connection(), "mbp@bilbo");
/// assert_eq!(endpoint.port(), 2222);
/// ```
pub fn parse_target(s: &str) -> std::result::Result<RemoteConfig, ValidationError> {
    lazy_static! {
        static ref TARGET_RE: Regex = Regex::new(
            r"^(?x)
                (?P<user>[^@:]+)@
                (?P<host>[^:@]+)
                (:(?P<port>\d+))?
                $",
        )
        .unwrap();
    }
    let caps = TARGET_RE
        .captures(s)
        .ok_or_else(|| ValidationError::InvalidTarget(s.to_owned()))?;
    let port = match caps.name("port") {
        Some(port) => {
            let port: u16 = port
                .as_str()
                .parse()
                .map_err(|_| ValidationError::InvalidPort(port.as_str().to_owned()))?;
            Some(port.into())
        }
        None => None,
    };
    Ok(RemoteConfig {
        username: Some(caps["user"].to_owned()),
        host: Some(caps["host"].to_owned()),
        port,
        ..RemoteConfig::default()
    })
}
