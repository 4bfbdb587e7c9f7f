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

//! Assemble a command line from options, arguments and parameters, and run it.
//!
//! The rendered form is:
//!
//! ```text
//! executable [-abLs] [-p 'value'] [--name] [--name 'value'] [param1 ... paramN]
//! ```
//!
//! ```
//! let mut command = rsync_wrapper::CommandLine::new("rsync");
//! command.add_option('L').add_option('a');
//! command.add_argument("exclude", "*.tmp");
//! command.add_parameter("/origin").add_parameter("/target");
//! assert_eq!(command.render(), "rsync -La --exclude '*.tmp' /origin /target");
//! ```

use std::cell::OnceCell;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::path::Path;
use std::process::{Command, Stdio};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{Error, Result};

/// Shell used to interpret rendered command lines.
const SHELL_COMMAND: &str = "sh";

/// Bytes read from the child per chunk in streamed mode.
const STREAM_CHUNK_SIZE: usize = 1024;

/// The value given to a named argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgValue {
    /// No value: `--name`.
    Flag,
    /// Rendered in single quotes after the name.
    Value(String),
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> ArgValue {
        ArgValue::Value(s.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> ArgValue {
        ArgValue::Value(s)
    }
}

// Non-UTF-8 bytes are replaced with U+FFFD: the rendered line is a String.
impl From<&Path> for ArgValue {
    fn from(p: &Path) -> ArgValue {
        ArgValue::Value(p.to_string_lossy().into_owned())
    }
}

impl From<u16> for ArgValue {
    fn from(i: u16) -> ArgValue {
        ArgValue::Value(i.to_string())
    }
}

/// How to run a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// Copy the child's combined output to our stdout as it arrives.
    Streamed,
    /// Capture stdout and stderr separately and keep them on the
    /// `CommandLine`.
    Buffered,
}

/// A command line under construction, and the results of running it.
///
/// Once [`render`](#method.render) has been called the string is fixed:
/// later changes to options, arguments or parameters don't show up in it,
/// nor in what [`execute`](#method.execute) runs.
#[derive(Clone, Debug)]
pub struct CommandLine {
    executable: String,
    /// Single-letter flags, rendered together as `-abc`.
    options: Vec<char>,
    /// Named arguments in order of first insertion, each with all its values.
    arguments: Vec<(String, Vec<ArgValue>)>,
    parameters: Vec<String>,
    rendered: OnceCell<String>,

    exit_code: Option<i32>,
    stdout: Option<String>,
    stderr: Option<String>,
}

impl CommandLine {
    /// Start a command line that will run `executable`.
    pub fn new<S: Into<String>>(executable: S) -> CommandLine {
        CommandLine {
            executable: executable.into(),
            options: Vec::new(),
            arguments: Vec::new(),
            parameters: Vec::new(),
            rendered: OnceCell::new(),
            exit_code: None,
            stdout: None,
            stderr: None,
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn set_executable<S: Into<String>>(&mut self, executable: S) -> &mut Self {
        self.executable = executable.into();
        self
    }

    /// Add a single-letter flag. Duplicates are kept.
    pub fn add_option(&mut self, option: char) -> &mut Self {
        self.options.push(option);
        self
    }

    /// Add a named argument with a value.
    ///
    /// One-letter names render as `-p 'value'`, longer ones as
    /// `--name 'value'`. The same name may be added repeatedly, and each
    /// value is rendered separately.
    pub fn add_argument<N: Into<String>, V: Into<ArgValue>>(
        &mut self,
        name: N,
        value: V,
    ) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.arguments.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.arguments.push((name, vec![value])),
        }
        self
    }

    /// Add a named argument without a value, like `--delete`.
    pub fn add_flag<N: Into<String>>(&mut self, name: N) -> &mut Self {
        self.add_argument(name, ArgValue::Flag)
    }

    /// Add a positional parameter.
    ///
    /// Parameters are appended verbatim, so they can contain shell globs.
    pub fn add_parameter<S: Into<String>>(&mut self, parameter: S) -> &mut Self {
        self.parameters.push(parameter.into());
        self
    }

    /// The full command line as a string.
    ///
    /// This is computed on the first call and remembered afterwards.
    pub fn render(&self) -> &str {
        self.rendered.get_or_init(|| {
            let line = self.construct();
            debug!("Rendered command line {:?}", line);
            line
        })
    }

    fn construct(&self) -> String {
        let mut tokens = vec![self.executable.clone()];
        if !self.options.is_empty() {
            let mut flags = "-".to_string();
            flags.extend(&self.options);
            tokens.push(flags);
        }
        for (name, values) in &self.arguments {
            let short = name.chars().count() == 1;
            for value in values {
                tokens.push(match (short, value) {
                    (true, ArgValue::Value(v)) => format!("-{} '{}'", name, v),
                    // Not really meaningful; use add_option for bare letters.
                    (true, ArgValue::Flag) => format!("-{}", name),
                    (false, ArgValue::Value(v)) => format!("--{} '{}'", name, v),
                    (false, ArgValue::Flag) => format!("--{}", name),
                });
            }
        }
        if !self.parameters.is_empty() {
            tokens.push(self.parameters.join(" "));
        }
        tokens.join(" ")
    }

    /// Run the command line through the shell.
    ///
    /// A non-zero exit is not an error: check
    /// [`exit_code`](#method.exit_code) afterwards.
    pub fn execute(&mut self, mode: ExecMode) -> Result<()> {
        match mode {
            ExecMode::Streamed => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                self.stream_with_shell(SHELL_COMMAND, &mut out)
            }
            ExecMode::Buffered => self.capture_with_shell(SHELL_COMMAND),
        }
    }

    /// Run the command, copying its stdout and stderr into `out` in chunks
    /// as they arrive.
    ///
    /// Only the exit code is recorded on `self`.
    pub fn stream_into<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.stream_with_shell(SHELL_COMMAND, out)
    }

    fn stream_with_shell<W: Write>(&mut self, shell: &str, out: &mut W) -> Result<()> {
        let line = self.render().to_owned();
        info!("Run command {:?}", line);
        let mut child = Command::new(shell)
            .arg("-c")
            .arg(format!("exec 2>&1\n{}", line))
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| launch_error(&line, source))?;
        let mut pipe = match child.stdout.take() {
            Some(pipe) => pipe,
            None => {
                child.kill().ok();
                child.wait()?;
                let source = io::Error::new(io::ErrorKind::BrokenPipe, "child has no stdout");
                return Err(launch_error(&line, source));
            }
        };

        let copied = copy_in_chunks(&mut pipe, out);
        drop(pipe);
        if let Err(e) = &copied {
            // The child must still be reaped, even though nobody will read
            // the rest of its output.
            warn!("Stopped copying output of {:?}: {}", line, e);
            if let Err(e) = child.kill() {
                debug!("Failed to kill child: {}", e);
            }
        }

        let status = child.wait()?;
        let exit_code = status.code().unwrap_or(-1);
        debug!("Command exited with {}", exit_code);
        self.exit_code = Some(exit_code);
        copied.map_err(Error::from)
    }

    fn capture_with_shell(&mut self, shell: &str) -> Result<()> {
        let line = self.render().to_owned();
        info!("Run command {:?}", line);
        let output = Command::new(shell)
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| launch_error(&line, source))?
            .wait_with_output()?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        if exit_code != 0 {
            warn!("Command {:?} exited with {}: {}", line, exit_code, stderr);
        }
        self.exit_code = Some(exit_code);
        self.stdout = Some(stdout);
        self.stderr = Some(stderr);
        Ok(())
    }

    /// Exit code from the last run, or None if it hasn't run.
    ///
    /// A child killed by a signal reports -1.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Trimmed stdout from the last buffered run.
    pub fn stdout(&self) -> Option<&str> {
        self.stdout.as_deref()
    }

    /// Trimmed stderr from the last buffered run.
    pub fn stderr(&self) -> Option<&str> {
        self.stderr.as_deref()
    }
}

/// Copy `r` to `w` until EOF, flushing after every chunk.
fn copy_in_chunks<R: Read, W: Write>(r: &mut R, w: &mut W) -> io::Result<()> {
    let mut buf = [0u8; STREAM_CHUNK_SIZE];
    loop {
        let len = match r.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        w.write_all(&buf[..len])?;
        w.flush()?;
    }
}

fn launch_error(line: &str, source: io::Error) -> Error {
    error!("Failed to launch {:?}: {}", line, source);
    Error::Launch {
        command: line.to_owned(),
        source,
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render())
    }
}
