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

//! Errors from configuring and running commands.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A configuration value was rejected.
///
/// These are raised by setters and builders, before anything is run.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("executable location '{}' is invalid", .0.display())]
    NotExecutable(PathBuf),

    #[error("file '{}' is not readable", .0.display())]
    UnreadableFile(PathBuf),

    #[error("SSH port must be an integer between 0 and 65535, not {0}")]
    InvalidPort(String),

    #[error("you must specify an SSH username")]
    MissingUsername,

    #[error("you must specify an SSH host to connect")]
    MissingHost,

    #[error("option '{key}' expects {expected}")]
    InvalidOption { key: String, expected: &'static str },

    #[error("can't parse configuration: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    #[error("can't parse SSH target '{0}', expected user@host[:port]")]
    InvalidTarget(String),
}

/// Any error from this library.
///
/// A child process that runs and exits non-zero is not an error: its
/// exit code is recorded on the [`CommandLine`](crate::CommandLine).
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("cannot execute command '{command}'")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or waiting for a child that did start.
    #[error("I/O error while running command")]
    Io(#[from] io::Error),
}

impl Error {
    /// True if this is a configuration problem rather than a launch failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// General Result type from this crate.
pub type Result<T> = std::result::Result<T, Error>;
