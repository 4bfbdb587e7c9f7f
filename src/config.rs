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

//! Configuration for [`SyncJob`](crate::SyncJob) and
//! [`RemoteEndpoint`](crate::RemoteEndpoint).
//!
//! Every key is optional; a job starts from its defaults and applies
//! whatever is present. Unrecognized keys are ignored.
//!
//! ```
//! use rsync_wrapper::SyncConfig;
//!
//! let config = SyncConfig::from_toml(
//!     r#"
//!     verbose = true
//!     exclude = ["*.tmp", ".git"]
//!
//!     [ssh]
//!     host = "example.com"
//!     username = "mbp"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.verbose, Some(true));
//! assert_eq!(config.ssh.unwrap().host.as_deref(), Some("example.com"));
//! ```

use std::path::PathBuf;

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::error::ValidationError;

/// Options for an rsync transfer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Path to the rsync binary; must be executable.
    pub executable: Option<PathBuf>,
    pub archive: Option<bool>,
    /// Skip files that are newer on the receiver.
    pub update: Option<bool>,
    pub follow_symlinks: Option<bool>,
    pub dry_run: Option<bool>,
    pub option_parameters: Option<OptionalParameters>,
    pub verbose: Option<bool>,
    pub delete_from_target: Option<bool>,
    pub delete_excluded: Option<bool>,
    pub exclude: Option<Patterns>,
    #[serde(rename = "excludeFrom", alias = "exclude_from")]
    pub exclude_from: Option<PathBuf>,
    pub recursive: Option<bool>,
    pub times: Option<bool>,
    pub show_output: Option<bool>,
    /// The remote host, if any.
    pub ssh: Option<RemoteConfig>,
    pub compression: Option<bool>,
    pub remote_origin: Option<bool>,
    pub remove_source: Option<bool>,
    pub info: Option<String>,
    pub compare_dest: Option<PathBuf>,
    pub prune_empty_dirs: Option<bool>,
}

impl SyncConfig {
    /// Parse a TOML document. Nested `[ssh]` tables describe the remote.
    pub fn from_toml(text: &str) -> Result<SyncConfig, ValidationError> {
        Ok(toml::from_str(text)?)
    }
}

/// Options for an SSH endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub executable: Option<String>,
    pub host: Option<String>,
    /// Checked to fit in a port number when applied.
    pub port: Option<i64>,
    pub username: Option<String>,
    pub public_key: Option<PathBuf>,
    pub private_key: Option<PathBuf>,
    pub strict_host_key_checking: Option<HostKeyChecking>,
    pub user_known_hosts_file: Option<PathBuf>,
}

/// `StrictHostKeyChecking`, as a boolean or as ssh's own `yes`/`no`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HostKeyChecking {
    Flag(bool),
    Answer(String),
}

impl HostKeyChecking {
    /// None if this is a word other than `yes` or `no`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostKeyChecking::Flag(b) => Some(*b),
            HostKeyChecking::Answer(s) if s == "yes" => Some(true),
            HostKeyChecking::Answer(s) if s == "no" => Some(false),
            HostKeyChecking::Answer(_) => None,
        }
    }
}

/// Exclude patterns: one, or a list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Patterns::One(s) => vec![s],
            Patterns::Many(l) => l,
        }
    }
}

impl<'a> From<Vec<&'a str>> for Patterns {
    fn from(l: Vec<&'a str>) -> Patterns {
        Patterns::Many(l.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for Patterns {
    fn from(l: Vec<String>) -> Patterns {
        Patterns::Many(l)
    }
}

/// Extra single-letter rsync options, given either as one string where
/// each character is a flag (`"pog"`), or as a list of flags.
///
/// Values of any other shape are accepted and ignored.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionalParameters {
    Chars(String),
    List(Vec<String>),
    Ignored(IgnoredAny),
}

impl OptionalParameters {
    /// The flags, one character each, in order; None for an ignored value.
    pub fn into_flags(self) -> Option<Vec<char>> {
        match self {
            OptionalParameters::Chars(s) => Some(s.chars().collect()),
            OptionalParameters::List(l) => Some(l.iter().flat_map(|s| s.chars()).collect()),
            OptionalParameters::Ignored(_) => None,
        }
    }
}

impl From<&str> for OptionalParameters {
    fn from(s: &str) -> OptionalParameters {
        OptionalParameters::Chars(s.to_owned())
    }
}

impl From<String> for OptionalParameters {
    fn from(s: String) -> OptionalParameters {
        OptionalParameters::Chars(s)
    }
}

impl<'a> From<Vec<&'a str>> for OptionalParameters {
    fn from(l: Vec<&'a str>) -> OptionalParameters {
        OptionalParameters::List(l.into_iter().map(String::from).collect())
    }
}
