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

//! Build and run rsync command lines, locally or through SSH.
//!
//! A [`SyncJob`] holds rsync's flags and, optionally, a [`RemoteEndpoint`]
//! describing an SSH host. It renders them into a [`CommandLine`], which can
//! be inspected as a string or executed through the shell.
//!
//! ```
//! let mut job = rsync_wrapper::SyncJob::new();
//! job.set_dry_run(true).set_exclude(vec!["target/"]);
//! let command = job.build_command("./src/", "/tmp/backup").unwrap();
//! assert_eq!(
//!     command.render(),
//!     "/usr/bin/rsync -Lna --exclude 'target/' ./src/ /tmp/backup"
//! );
//! ```

mod access;
pub mod command;
pub mod config;
mod error;
pub mod logging;
pub mod remote;
mod sync;

pub use command::{ArgValue, CommandLine, ExecMode};
pub use config::{HostKeyChecking, OptionalParameters, Patterns, RemoteConfig, SyncConfig};
pub use error::{Error, Result, ValidationError};
pub use remote::RemoteEndpoint;
pub use sync::{SyncJob, DEFAULT_RSYNC_PATH};
