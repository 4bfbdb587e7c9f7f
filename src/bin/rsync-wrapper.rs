//! Command-line program for rsync-wrapper.

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use structopt::StructOpt;

use rsync_wrapper::{remote, HostKeyChecking, SyncConfig, SyncJob};

#[derive(Debug, StructOpt)]
#[structopt()]
/// Run rsync with a consistent set of options, locally or over SSH.
///
/// The rsync command line is assembled from these options and run through
/// the shell, so the origin may contain globs like `dir/*`.
struct Opt {
    /// TOML file of rsync options; command-line flags take precedence.
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Path to the rsync binary.
    #[structopt(long, parse(from_os_str))]
    rsync_path: Option<PathBuf>,

    /// Skip files that are newer on the receiver.
    #[structopt(short, long)]
    update: bool,

    /// Copy symlinks as symlinks instead of following them.
    #[structopt(long)]
    no_links: bool,

    /// Show what would be transferred without changing anything.
    #[structopt(short = "n", long)]
    dry_run: bool,

    #[structopt(short, long)]
    verbose: bool,

    /// Compress data during the transfer.
    #[structopt(short = "z", long)]
    compress: bool,

    /// Extra single-letter rsync flags, like "pog".
    #[structopt(short = "o", long)]
    optional: Option<String>,

    /// Preserve modification times.
    #[structopt(long)]
    times: bool,

    /// Delete extraneous files from the destination.
    #[structopt(long)]
    delete: bool,

    /// Also delete excluded files from the destination.
    #[structopt(long)]
    delete_excluded: bool,

    /// Remove synchronized files from the origin.
    #[structopt(long)]
    remove_source_files: bool,

    #[structopt(long)]
    prune_empty_dirs: bool,

    /// Don't use archive mode.
    #[structopt(long)]
    no_archive: bool,

    /// Don't recurse; only has effect with --no-archive.
    #[structopt(long)]
    no_recursive: bool,

    /// Value for rsync's --info, like "progress2".
    #[structopt(long)]
    info: Option<String>,

    #[structopt(long, parse(from_os_str))]
    compare_dest: Option<PathBuf>,

    /// Exclude files matching a pattern; may be repeated.
    #[structopt(long, number_of_values = 1)]
    exclude: Vec<String>,

    /// Read exclude patterns from a file.
    #[structopt(long, parse(from_os_str))]
    exclude_from: Option<PathBuf>,

    /// Remote host, as user@host or user@host:port.
    #[structopt(long)]
    ssh: Option<String>,

    /// ssh program to run.
    #[structopt(long)]
    ssh_command: Option<String>,

    /// SSH identity file.
    #[structopt(short = "i", long, parse(from_os_str))]
    identity: Option<PathBuf>,

    #[structopt(long, possible_values = &["yes", "no"])]
    strict_host_key_checking: Option<String>,

    #[structopt(long, parse(from_os_str))]
    known_hosts_file: Option<PathBuf>,

    /// The origin, rather than the destination, is on the remote host.
    #[structopt(long)]
    remote_origin: bool,

    /// Capture rsync's output and print it when it finishes.
    #[structopt(long)]
    capture: bool,

    /// Print the rsync command line instead of running it.
    #[structopt(long)]
    print: bool,

    /// Log debug messages to stderr.
    #[structopt(long)]
    debug: bool,

    /// Files to copy from.
    origin: String,

    /// Where to copy to.
    destination: String,
}

impl Opt {
    /// Start from the config file, if any, and override it with whatever
    /// was given on the command line.
    fn to_config(&self) -> anyhow::Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                SyncConfig::from_toml(&text)
                    .with_context(|| format!("Failed to parse config file {:?}", path))?
            }
            None => SyncConfig::default(),
        };

        override_flag(&mut config.update, self.update, true);
        override_flag(&mut config.follow_symlinks, self.no_links, false);
        override_flag(&mut config.dry_run, self.dry_run, true);
        override_flag(&mut config.verbose, self.verbose, true);
        override_flag(&mut config.compression, self.compress, true);
        override_flag(&mut config.times, self.times, true);
        override_flag(&mut config.delete_from_target, self.delete, true);
        override_flag(&mut config.delete_excluded, self.delete_excluded, true);
        override_flag(&mut config.remove_source, self.remove_source_files, true);
        override_flag(&mut config.prune_empty_dirs, self.prune_empty_dirs, true);
        override_flag(&mut config.archive, self.no_archive, false);
        override_flag(&mut config.recursive, self.no_recursive, false);
        override_flag(&mut config.remote_origin, self.remote_origin, true);
        override_flag(&mut config.show_output, self.capture, false);
        if let Some(path) = &self.rsync_path {
            config.executable = Some(path.clone());
        }
        if let Some(optional) = &self.optional {
            config.option_parameters = Some(optional.as_str().into());
        }
        if let Some(info) = &self.info {
            config.info = Some(info.clone());
        }
        if let Some(path) = &self.compare_dest {
            config.compare_dest = Some(path.clone());
        }
        if !self.exclude.is_empty() {
            config.exclude = Some(self.exclude.clone().into());
        }
        if let Some(path) = &self.exclude_from {
            config.exclude_from = Some(path.clone());
        }

        if let Some(target) = &self.ssh {
            config.ssh = Some(remote::parse_target(target)?);
        }
        let ssh_flags_given = self.ssh_command.is_some()
            || self.identity.is_some()
            || self.strict_host_key_checking.is_some()
            || self.known_hosts_file.is_some();
        if ssh_flags_given {
            let ssh = config
                .ssh
                .as_mut()
                .context("SSH options need --ssh or an [ssh] table in the config file")?;
            if let Some(command) = &self.ssh_command {
                ssh.executable = Some(command.clone());
            }
            if let Some(path) = &self.identity {
                ssh.private_key = Some(path.clone());
            }
            if let Some(strict) = &self.strict_host_key_checking {
                ssh.strict_host_key_checking = Some(HostKeyChecking::Answer(strict.clone()));
            }
            if let Some(path) = &self.known_hosts_file {
                ssh.user_known_hosts_file = Some(path.clone());
            }
        }
        Ok(config)
    }
}

fn override_flag(field: &mut Option<bool>, given: bool, value: bool) {
    if given {
        *field = Some(value);
    }
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    let level = if opt.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    rsync_wrapper::logging::default_logging(level).context("Failed to install logger")?;

    let config = opt.to_config().context("Invalid options")?;
    let job = SyncJob::from_config(&config).context("Invalid options")?;
    if opt.print {
        let command = job
            .build_command(&opt.origin, &opt.destination)
            .context("Failed to build rsync command")?;
        println!("{}", command);
        return Ok(());
    }

    let command = job
        .sync(&opt.origin, &opt.destination)
        .context("Failed to run rsync")?;
    if let Some(stdout) = command.stdout().filter(|s| !s.is_empty()) {
        println!("{}", stdout);
    }
    if let Some(stderr) = command.stderr().filter(|s| !s.is_empty()) {
        eprintln!("{}", stderr);
    }
    let exit_code = command.exit_code().unwrap_or(0);
    debug!("rsync exited with {}", exit_code);
    if exit_code != 0 {
        process::exit(exit_code);
    }
    Ok(())
}
