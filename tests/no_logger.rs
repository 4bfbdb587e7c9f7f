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

use rsync_wrapper::{CommandLine, ExecMode, SyncJob};

/// Check that we're not counting on the side effects of any logging.
///
/// This must be in a different target from other tests, so that it
/// runs in a different process, and doesn't accidentally inherit a global
/// logger.
#[test]
fn build_without_logger() {
    let mut job = SyncJob::new();
    job.set_verbose(true);
    let command = job.build_command("/origin", "/target").unwrap();
    assert_eq!(command.render(), "/usr/bin/rsync -Lva /origin /target");
}

#[cfg(unix)]
#[test]
fn execute_without_logger() {
    let mut command = CommandLine::new("echo");
    command.add_parameter("quiet");
    command
        .execute(ExecMode::Buffered)
        .expect("Failed to run echo");
    assert_eq!(command.stdout(), Some("quiet"));
}
