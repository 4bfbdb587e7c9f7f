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

//! Configure and run an rsync transfer.

use std::path::{Path, PathBuf};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::access;
use crate::command::{CommandLine, ExecMode};
use crate::config::{OptionalParameters, RemoteConfig, SyncConfig};
use crate::error::ValidationError;
use crate::remote::RemoteEndpoint;
use crate::Result;

/// Where rsync is expected to be installed.
pub const DEFAULT_RSYNC_PATH: &str = "/usr/bin/rsync";

/// An rsync transfer: its flags, and optionally a remote endpoint.
///
/// ```
/// use rsync_wrapper::{SyncConfig, SyncJob};
///
/// let config = SyncConfig::from_toml(
///     r#"
///     exclude = ["*.log"]
///     ssh = { username = "mbp", host = "bilbo" }
///     "#,
/// )
/// .unwrap();
/// let job = SyncJob::from_config(&config).unwrap();
/// let command = job.build_command("./site/", "/var/www").unwrap();
/// assert_eq!(
///     command.render(),
///     "/usr/bin/rsync -La --exclude '*.log' --rsh 'ssh' ./site/ mbp@bilbo:/var/www"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncJob {
    executable: String,
    archive: bool,
    follow_symlinks: bool,
    dry_run: bool,
    verbose: bool,
    compression: bool,
    /// Skip files that are newer on the receiver (`-u`).
    skip_newer_files: bool,
    times: bool,
    recursive: bool,
    delete_from_target: bool,
    delete_excluded: bool,
    remove_source: bool,
    prune_empty_dirs: bool,
    exclude: Vec<String>,
    exclude_from: Option<PathBuf>,
    info: Option<String>,
    compare_dest: Option<PathBuf>,
    /// Extra single-letter flags, appended after the built-in ones.
    optional_parameters: Vec<char>,
    /// With a remote attached: true if the origin is on the remote host,
    /// false if the destination is.
    remote_origin: bool,
    remote: Option<RemoteEndpoint>,
    show_output: bool,
}

impl Default for SyncJob {
    fn default() -> SyncJob {
        SyncJob {
            executable: DEFAULT_RSYNC_PATH.to_owned(),
            archive: true,
            follow_symlinks: true,
            dry_run: false,
            verbose: false,
            compression: false,
            skip_newer_files: false,
            times: false,
            recursive: true,
            delete_from_target: false,
            delete_excluded: false,
            remove_source: false,
            prune_empty_dirs: false,
            exclude: Vec::new(),
            exclude_from: None,
            info: None,
            compare_dest: None,
            optional_parameters: Vec::new(),
            remote_origin: false,
            remote: None,
            show_output: true,
        }
    }
}

impl SyncJob {
    pub fn new() -> SyncJob {
        SyncJob::default()
    }

    /// Build a job from its configuration.
    ///
    /// Each option that's present is applied through its setter, in a
    /// fixed order. `update` controls skipping newer files, and `ssh`
    /// attaches a [`RemoteEndpoint`].
    pub fn from_config(config: &SyncConfig) -> Result<SyncJob> {
        let mut job = SyncJob::new();
        if let Some(executable) = &config.executable {
            job.set_executable(executable)?;
        }
        if let Some(archive) = config.archive {
            job.set_archive(archive);
        }
        if let Some(update) = config.update {
            job.set_skip_newer_files(update);
        }
        if let Some(follow_symlinks) = config.follow_symlinks {
            job.set_follow_symlinks(follow_symlinks);
        }
        if let Some(dry_run) = config.dry_run {
            job.set_dry_run(dry_run);
        }
        if let Some(parameters) = &config.option_parameters {
            job.set_optional_parameters(parameters.clone());
        }
        if let Some(verbose) = config.verbose {
            job.set_verbose(verbose);
        }
        if let Some(delete_from_target) = config.delete_from_target {
            job.set_delete_from_target(delete_from_target);
        }
        if let Some(delete_excluded) = config.delete_excluded {
            job.set_delete_excluded(delete_excluded);
        }
        if let Some(exclude) = &config.exclude {
            job.set_exclude(exclude.clone().into_vec());
        }
        if let Some(path) = &config.exclude_from {
            job.set_exclude_from(path);
        }
        if let Some(recursive) = config.recursive {
            job.set_recursive(recursive);
        }
        if let Some(times) = config.times {
            job.set_times(times);
        }
        if let Some(show_output) = config.show_output {
            job.set_show_output(show_output);
        }
        if let Some(ssh) = &config.ssh {
            job.attach_remote(ssh)?;
        }
        if let Some(compression) = config.compression {
            job.set_compression(compression);
        }
        if let Some(remote_origin) = config.remote_origin {
            job.set_remote_origin(remote_origin);
        }
        if let Some(remove_source) = config.remove_source {
            job.set_remove_source(remove_source);
        }
        if let Some(info) = &config.info {
            job.set_info(info.as_str());
        }
        if let Some(path) = &config.compare_dest {
            job.set_compare_dest(path);
        }
        if let Some(prune_empty_dirs) = config.prune_empty_dirs {
            job.set_prune_empty_dirs(prune_empty_dirs);
        }
        Ok(job)
    }

    /// Attach an SSH endpoint built from `config`.
    ///
    /// Only the first call has any effect: once an endpoint is attached,
    /// later calls leave it as it is.
    pub fn attach_remote(&mut self, config: &RemoteConfig) -> Result<&mut Self> {
        if self.remote.is_some() {
            debug!("Remote endpoint already attached; ignoring new ssh options");
            return Ok(self);
        }
        self.remote = Some(RemoteEndpoint::from_config(config)?);
        Ok(self)
    }

    pub fn remote(&self) -> Option<&RemoteEndpoint> {
        self.remote.as_ref()
    }

    /// Mutably borrow the attached endpoint, if any.
    pub fn remote_mut(&mut self) -> Option<&mut RemoteEndpoint> {
        self.remote.as_mut()
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Set the rsync binary, for example `/usr/local/bin/rsync`.
    ///
    /// Fails, keeping the previous value, unless `path` is executable.
    pub fn set_executable<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();
        if !access::is_executable(path) {
            return Err(ValidationError::NotExecutable(path.to_owned()).into());
        }
        self.executable = path.to_string_lossy().into_owned();
        Ok(self)
    }

    pub fn archive(&self) -> bool {
        self.archive
    }

    pub fn set_archive(&mut self, archive: bool) -> &mut Self {
        self.archive = archive;
        self
    }

    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    pub fn set_follow_symlinks(&mut self, follow_symlinks: bool) -> &mut Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_dry_run(&mut self, dry_run: bool) -> &mut Self {
        self.dry_run = dry_run;
        self
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    pub fn compression(&self) -> bool {
        self.compression
    }

    pub fn set_compression(&mut self, compression: bool) -> &mut Self {
        self.compression = compression;
        self
    }

    pub fn skip_newer_files(&self) -> bool {
        self.skip_newer_files
    }

    pub fn set_skip_newer_files(&mut self, skip_newer_files: bool) -> &mut Self {
        self.skip_newer_files = skip_newer_files;
        self
    }

    pub fn times(&self) -> bool {
        self.times
    }

    pub fn set_times(&mut self, times: bool) -> &mut Self {
        self.times = times;
        self
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    /// Recurse into directories. Only rendered when `archive` is off,
    /// since archive mode implies it.
    pub fn set_recursive(&mut self, recursive: bool) -> &mut Self {
        self.recursive = recursive;
        self
    }

    pub fn delete_from_target(&self) -> bool {
        self.delete_from_target
    }

    pub fn set_delete_from_target(&mut self, delete_from_target: bool) -> &mut Self {
        self.delete_from_target = delete_from_target;
        self
    }

    pub fn delete_excluded(&self) -> bool {
        self.delete_excluded
    }

    pub fn set_delete_excluded(&mut self, delete_excluded: bool) -> &mut Self {
        self.delete_excluded = delete_excluded;
        self
    }

    pub fn remove_source(&self) -> bool {
        self.remove_source
    }

    pub fn set_remove_source(&mut self, remove_source: bool) -> &mut Self {
        self.remove_source = remove_source;
        self
    }

    pub fn prune_empty_dirs(&self) -> bool {
        self.prune_empty_dirs
    }

    pub fn set_prune_empty_dirs(&mut self, prune_empty_dirs: bool) -> &mut Self {
        self.prune_empty_dirs = prune_empty_dirs;
        self
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Replace the exclude patterns.
    pub fn set_exclude<I, S>(&mut self, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_from(&self) -> Option<&Path> {
        self.exclude_from.as_deref()
    }

    pub fn set_exclude_from<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.exclude_from = Some(path.into());
        self
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// Value for rsync's `--info`, like `progress2`.
    pub fn set_info<S: Into<String>>(&mut self, info: S) -> &mut Self {
        self.info = Some(info.into());
        self
    }

    pub fn compare_dest(&self) -> Option<&Path> {
        self.compare_dest.as_deref()
    }

    pub fn set_compare_dest<P: Into<PathBuf>>(&mut self, path: P) -> &mut Self {
        self.compare_dest = Some(path.into());
        self
    }

    pub fn optional_parameters(&self) -> &[char] {
        &self.optional_parameters
    }

    /// Set extra single-letter flags, as a string like `"pog"` or a list.
    ///
    /// [`OptionalParameters::Ignored`] leaves the current flags alone.
    pub fn set_optional_parameters<P: Into<OptionalParameters>>(
        &mut self,
        parameters: P,
    ) -> &mut Self {
        match parameters.into().into_flags() {
            Some(flags) => self.optional_parameters = flags,
            None => debug!("Ignoring optional parameters of unusable shape"),
        }
        self
    }

    pub fn remote_origin(&self) -> bool {
        self.remote_origin
    }

    pub fn set_remote_origin(&mut self, remote_origin: bool) -> &mut Self {
        self.remote_origin = remote_origin;
        self
    }

    pub fn show_output(&self) -> bool {
        self.show_output
    }

    /// Stream rsync's output as it runs (true), or capture it (false).
    pub fn set_show_output(&mut self, show_output: bool) -> &mut Self {
        self.show_output = show_output;
        self
    }

    /// The mode [`sync`](#method.sync) runs in.
    pub fn exec_mode(&self) -> ExecMode {
        if self.show_output {
            ExecMode::Streamed
        } else {
            ExecMode::Buffered
        }
    }

    /// Build the rsync command line to copy `origin` to `destination`.
    ///
    /// Fails if a remote endpoint is attached without a username or host.
    pub fn build_command(&self, origin: &str, destination: &str) -> Result<CommandLine> {
        let mut command = CommandLine::new(self.executable.as_str());

        if self.skip_newer_files {
            command.add_option('u');
        }
        if self.follow_symlinks {
            command.add_option('L');
        }
        if self.dry_run {
            command.add_option('n');
        }
        if self.verbose {
            command.add_option('v');
        }
        if self.compression {
            command.add_option('z');
        }
        for &option in &self.optional_parameters {
            command.add_option(option);
        }
        if self.times {
            command.add_flag("times");
        }
        if self.delete_from_target {
            command.add_flag("delete");
        }
        if self.remove_source {
            command.add_flag("remove-source-files");
        }
        if self.delete_excluded {
            command.add_flag("delete-excluded");
        }
        if let Some(info) = &self.info {
            command.add_argument("info", info.as_str());
        }
        if let Some(compare_dest) = &self.compare_dest {
            command.add_argument("compare-dest", compare_dest.as_path());
        }
        for pattern in &self.exclude {
            command.add_argument("exclude", pattern.as_str());
        }
        if let Some(exclude_from) = &self.exclude_from {
            command.add_argument("exclude-from", exclude_from.as_path());
        }
        if self.archive {
            command.add_option('a');
        } else if self.recursive {
            command.add_option('r');
        }
        if self.prune_empty_dirs {
            command.add_flag("prune-empty-dirs");
        }

        match &self.remote {
            None => {
                command.add_parameter(origin).add_parameter(destination);
            }
            Some(remote) => {
                command.add_argument("rsh", remote.connection_options()?);
                let host = remote.host_connection();
                if self.remote_origin {
                    command
                        .add_parameter(format!("{}:{}", host, origin))
                        .add_parameter(destination);
                } else {
                    command
                        .add_parameter(origin)
                        .add_parameter(format!("{}:{}", host, destination));
                }
            }
        }
        Ok(command)
    }

    /// Copy `origin` to `destination`.
    ///
    /// The returned command carries the exit code, and, when output isn't
    /// shown, the captured stdout and stderr. rsync failing is not an error
    /// here; failing to start it is.
    pub fn sync(&self, origin: &str, destination: &str) -> Result<CommandLine> {
        let mut command = self.build_command(origin, destination)?;
        command.execute(self.exec_mode())?;
        Ok(command)
    }
}

#[cfg(test)]
mod test {
    use std::fs::File;

    use tempfile::TempDir;

    use super::*;
    use crate::Error;

    fn remote_config() -> RemoteConfig {
        RemoteConfig {
            username: Some("u".into()),
            host: Some("h".into()),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let job = SyncJob::new();
        assert_eq!(job.executable(), DEFAULT_RSYNC_PATH);
        assert!(job.archive());
        assert!(job.follow_symlinks());
        assert!(job.recursive());
        assert!(job.show_output());
        assert!(!job.dry_run());
        assert!(!job.verbose());
        assert!(!job.remote_origin());
        assert!(job.exclude().is_empty());
        assert!(job.remote().is_none());
        assert_eq!(job.exec_mode(), ExecMode::Streamed);
    }

    #[test]
    fn default_command() {
        let command = SyncJob::new().build_command("/origin", "/target").unwrap();
        assert_eq!(command.render(), "/usr/bin/rsync -La /origin /target");
    }

    #[test]
    fn excludes_render_in_order() {
        let mut job = SyncJob::new();
        job.set_exclude(vec!["e1", "e2"]);
        let command = job.build_command("/origin", "/target").unwrap();
        assert_eq!(
            command.render(),
            "/usr/bin/rsync -La --exclude 'e1' --exclude 'e2' /origin /target"
        );
    }

    #[test]
    fn recursive_without_archive() {
        let mut job = SyncJob::new();
        job.set_archive(false).set_follow_symlinks(false);
        assert_eq!(
            job.build_command("a", "b").unwrap().render(),
            "/usr/bin/rsync -r a b"
        );

        job.set_recursive(false);
        assert_eq!(job.build_command("a", "b").unwrap().render(), "/usr/bin/rsync a b");
    }

    #[test]
    fn every_option_in_order() {
        let mut job = SyncJob::new();
        job.set_skip_newer_files(true)
            .set_dry_run(true)
            .set_verbose(true)
            .set_compression(true)
            .set_optional_parameters("pog")
            .set_times(true)
            .set_delete_from_target(true)
            .set_remove_source(true)
            .set_delete_excluded(true)
            .set_info("progress2")
            .set_compare_dest("/base")
            .set_exclude(vec!["*.tmp", ".git"])
            .set_exclude_from("/etc/rsync.exclude")
            .set_prune_empty_dirs(true);
        job.attach_remote(&RemoteConfig {
            port: Some(2222),
            ..remote_config()
        })
        .unwrap();

        let command = job.build_command("/origin", "/target").unwrap();
        assert_eq!(
            command.render(),
            "/usr/bin/rsync -uLnvzpoga --times --delete --remove-source-files \
             --delete-excluded --info 'progress2' --compare-dest '/base' \
             --exclude '*.tmp' --exclude '.git' --exclude-from '/etc/rsync.exclude' \
             --prune-empty-dirs --rsh 'ssh -p '2222'' /origin u@h:/target"
        );
    }

    #[test]
    fn remote_destination() {
        let mut job = SyncJob::new();
        job.attach_remote(&remote_config()).unwrap();
        let command = job.build_command("/origin", "/target").unwrap();
        assert_eq!(
            command.render(),
            "/usr/bin/rsync -La --rsh 'ssh' /origin u@h:/target"
        );
    }

    #[test]
    fn remote_origin() {
        let mut job = SyncJob::new();
        job.attach_remote(&remote_config()).unwrap();
        job.set_remote_origin(true);
        let command = job.build_command("/origin", "/target").unwrap();
        assert_eq!(
            command.render(),
            "/usr/bin/rsync -La --rsh 'ssh' u@h:/origin /target"
        );
    }

    #[test]
    fn incomplete_remote_fails_to_build() {
        let mut job = SyncJob::new();
        job.attach_remote(&RemoteConfig {
            host: Some("h".into()),
            ..RemoteConfig::default()
        })
        .unwrap();
        assert!(matches!(
            job.build_command("/origin", "/target"),
            Err(Error::Validation(ValidationError::MissingUsername))
        ));
    }

    #[test]
    fn first_attached_remote_wins() {
        let mut job = SyncJob::new();
        job.attach_remote(&remote_config()).unwrap();
        job.attach_remote(&RemoteConfig {
            username: Some("other".into()),
            host: Some("elsewhere".into()),
            ..RemoteConfig::default()
        })
        .unwrap();
        assert_eq!(job.remote().unwrap().host_connection(), "u@h");

        job.remote_mut().unwrap().set_port(2200);
        assert_eq!(job.remote().unwrap().port(), 2200);
    }

    #[test]
    fn optional_parameters_accept_a_list() {
        let mut job = SyncJob::new();
        job.set_optional_parameters(vec!["H", "X"]);
        assert_eq!(job.optional_parameters(), ['H', 'X']);
        assert_eq!(
            job.build_command("a", "b").unwrap().render(),
            "/usr/bin/rsync -LHXa a b"
        );
    }

    #[test]
    fn invalid_executable_location() {
        let mut job = SyncJob::new();
        let err = job.set_executable("/usr/not/exists/rsync!!").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::NotExecutable(_))
        ));
        assert_eq!(job.executable(), DEFAULT_RSYNC_PATH);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_keeps_previous_executable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rsync");
        File::create(&path).unwrap();
        let mut job = SyncJob::new();
        assert!(job.set_executable(&path).is_err());
        assert_eq!(job.executable(), DEFAULT_RSYNC_PATH);
    }

    #[cfg(unix)]
    #[test]
    fn valid_executable_location() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rsync");
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        let mut job = SyncJob::new();
        job.set_executable(&path).unwrap();
        assert_eq!(job.executable(), path.to_str().unwrap());
    }

    #[test]
    fn follow_symlinks_option() {
        let config = SyncConfig {
            follow_symlinks: Some(true),
            ..SyncConfig::default()
        };
        assert!(SyncJob::from_config(&config).unwrap().follow_symlinks());
    }

    #[test]
    fn from_config_applies_recognized_keys() {
        let config = SyncConfig::from_toml(
            r#"
            update = true
            dry_run = true
            verbose = true
            compression = true
            archive = false
            times = true
            delete_from_target = true
            delete_excluded = true
            remove_source = true
            prune_empty_dirs = true
            exclude = "*.swp"
            excludeFrom = "/tmp/exclude.txt"
            info = "stats2"
            compare_dest = "/srv/previous"
            option_parameters = ["p", "o"]
            show_output = false
            remote_origin = true
            colour = "blue"

            [ssh]
            username = "u"
            host = "h"
            port = 2222
            "#,
        )
        .unwrap();
        let job = SyncJob::from_config(&config).unwrap();

        assert!(job.skip_newer_files());
        assert!(job.dry_run());
        assert!(!job.archive());
        assert_eq!(job.exclude(), ["*.swp"]);
        assert_eq!(job.exclude_from(), Some(Path::new("/tmp/exclude.txt")));
        assert_eq!(job.info(), Some("stats2"));
        assert_eq!(job.compare_dest(), Some(Path::new("/srv/previous")));
        assert_eq!(job.optional_parameters(), ['p', 'o']);
        assert_eq!(job.exec_mode(), ExecMode::Buffered);
        assert!(job.remote_origin());
        assert_eq!(job.remote().unwrap().port(), 2222);

        let command = job.build_command("/data", "/backup").unwrap();
        assert_eq!(
            command.render(),
            "/usr/bin/rsync -uLnvzpor --times --delete --remove-source-files \
             --delete-excluded --info 'stats2' --compare-dest '/srv/previous' \
             --exclude '*.swp' --exclude-from '/tmp/exclude.txt' --prune-empty-dirs \
             --rsh 'ssh -p '2222'' u@h:/data /backup"
        );
    }

    #[test]
    fn ignored_option_parameters_keep_earlier_flags() {
        let config = SyncConfig::from_toml("option_parameters = 5").unwrap();
        let job = SyncJob::from_config(&config).unwrap();
        assert!(job.optional_parameters().is_empty());

        let mut job = SyncJob::new();
        job.set_optional_parameters("H")
            .set_optional_parameters(config.option_parameters.unwrap());
        assert_eq!(job.optional_parameters(), ['H']);
    }

    #[test]
    fn invalid_executable_in_config() {
        let config = SyncConfig {
            executable: Some("/usr/not/exists/rsync!!".into()),
            ..SyncConfig::default()
        };
        let err = SyncJob::from_config(&config).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn invalid_ssh_port_in_config() {
        let config = SyncConfig {
            ssh: Some(RemoteConfig {
                port: Some(65536),
                ..remote_config()
            }),
            ..SyncConfig::default()
        };
        assert!(matches!(
            SyncJob::from_config(&config),
            Err(Error::Validation(ValidationError::InvalidPort(_)))
        ));
    }
}
