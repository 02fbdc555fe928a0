use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::{wrappers::SplitStream, StreamExt};
use tracing::{debug, info, warn};

#[cfg(test)]
pub mod testing;

/// A single external tool invocation: program, arguments, working directory
/// and environment overrides layered on top of the ambient environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

}

#[cfg(test)]
impl Invocation {
    /// Looks up an environment override by key.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external tools to completion.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<()>;
}

#[async_trait]
impl<R: Runner + ?Sized> Runner for &R {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        (**self).run(invocation).await
    }
}

/// Last stderr lines carried in the error of a failed invocation.
const STDERR_TAIL_LINES: usize = 20;

enum Output {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// Spawns real processes and forwards their output to the log: stdout at
/// `info`, stderr at `warn`. Output that is not UTF-8 is logged lossily.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl Runner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        info!("running: {}", invocation);

        let mut command = Command::new(&invocation.program);

        command.args(&invocation.args);

        if let Some(dir) = &invocation.dir {
            debug!("working directory: {}", dir.display());
            command.current_dir(dir);
        }

        for (key, value) in &invocation.envs {
            debug!("environment: {key}={value}");
            command.env(key, value);
        }

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| anyhow!("failed to spawn {}: {}", invocation.program, err))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("failed to capture stdout of {}", invocation.program))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("failed to capture stderr of {}", invocation.program))?;

        let stdout = SplitStream::new(BufReader::new(stdout).split(b'\n'))
            .map(|line| line.map(Output::Stdout));
        let stderr = SplitStream::new(BufReader::new(stderr).split(b'\n'))
            .map(|line| line.map(Output::Stderr));

        let mut stdio_merged = StreamExt::merge(stdout, stderr);

        let mut stderr_tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

        while let Some(output) = stdio_merged.next().await {
            let output = match output {
                Ok(output) => output,
                Err(err) => {
                    let _ = child.kill().await;
                    bail!("failed to read output of {}: {}", invocation.program, err)
                }
            };

            match output {
                Output::Stdout(line) => info!("{}", String::from_utf8_lossy(&line).trim_end()),

                Output::Stderr(line) => {
                    let line = String::from_utf8_lossy(&line).trim_end().to_string();

                    warn!("{}", line);

                    if stderr_tail.len() == STDERR_TAIL_LINES {
                        stderr_tail.pop_front();
                    }

                    stderr_tail.push_back(line);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|err| anyhow!("failed to wait for {}: {}", invocation.program, err))?;

        if !status.success() {
            if stderr_tail.is_empty() {
                bail!("{} exited with {}", invocation.program, status)
            }

            let diagnostics = Vec::from(stderr_tail).join("\n");

            bail!("{} exited with {}:\n{}", invocation.program, status, diagnostics)
        }

        Ok(())
    }
}
