use std::{
    fmt::Display,
    fs::{self, File},
    io,
    path::PathBuf,
    process::{Command, Stdio},
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info, warn};
use regex::Regex;

use crate::{
    filter::selected_configs,
    registry::{App, Config, Dsl},
    run_key::RunKey,
    sample_store::{SampleStore, Step, Stream},
};

/// One shell command together with where it runs and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub working_dir: PathBuf,
    pub envs: Vec<(String, String)>,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// Runs invocations to completion. `Ok(false)` means the command exited unsuccessfully.
pub trait CommandRunner {
    fn execute(&mut self, invocation: &Invocation) -> io::Result<bool>;
}

impl<F> CommandRunner for F
where
    F: FnMut(&Invocation) -> io::Result<bool>,
{
    fn execute(&mut self, invocation: &Invocation) -> io::Result<bool> {
        self(invocation)
    }
}

/// Runs invocations through `sh -c`, blocking until they exit.
#[derive(Debug, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn execute(&mut self, invocation: &Invocation) -> io::Result<bool> {
        let stdout = File::create(&invocation.stdout)?;
        let stderr = File::create(&invocation.stderr)?;
        debug!(
            "execute: {} (in {})",
            invocation.command,
            invocation.working_dir.display()
        );
        let status = Command::new("sh")
            .arg("-c")
            .arg(&invocation.command)
            .current_dir(&invocation.working_dir)
            .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()?;
        debug!("exit status: {}", status);
        Ok(status.success())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub runs: u16,
    pub verbose: bool,
    pub skip_execution: bool,
    pub publish: bool,
    /// Value of the options variable before the timing options are prepended.
    pub base_java_opts: String,
    /// Name of the environment variable the run step reads its JVM options from.
    pub options_env: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    StageFailed,
    RunFailed,
    /// The run succeeded but did not leave a usable timing file.
    NoTimings,
    /// Skip mode found the captured output of an earlier run.
    Reused,
    /// Skip mode found nothing captured for this run.
    NotCaptured,
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RunStatus::Completed => "completed",
            RunStatus::StageFailed => "staging failed",
            RunStatus::RunFailed => "run failed",
            RunStatus::NoTimings => "no timings",
            RunStatus::Reused => "reused",
            RunStatus::NotCaptured => "not captured",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_key: RunKey,
    pub status: RunStatus,
}

impl Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.run_key, self.status)
    }
}

/// Stages and times apps one configuration at a time.
pub struct RunExecutor<'a, R: CommandRunner> {
    store: &'a SampleStore,
    root: PathBuf,
    commit: String,
    options: RunOptions,
    runner: R,
}

impl<'a, R: CommandRunner> RunExecutor<'a, R> {
    pub fn new(
        store: &'a SampleStore,
        root: impl Into<PathBuf>,
        commit: &str,
        options: RunOptions,
        runner: R,
    ) -> RunExecutor<'a, R> {
        RunExecutor {
            store,
            root: root.into(),
            commit: commit.to_owned(),
            options,
            runner,
        }
    }

    fn commit_dir(&self) -> Result<PathBuf> {
        let dir = self.store.commit_dir(&self.commit);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Build the published tree of every DSL that needs one.
    ///
    /// A failing publish is reported but does not stop the batch; its apps will
    /// most likely fail to stage.
    pub fn publish(&mut self, dsls: &[&Dsl]) -> Result<()> {
        if !self.options.publish || self.options.skip_execution {
            debug!("Skipping publish");
            return Ok(());
        }
        let commit_dir = self.commit_dir()?;
        for dsl in dsls.iter().filter(|dsl| dsl.needs_publish) {
            info!("Publishing {}", dsl.name);
            let invocation = Invocation {
                command: dsl.publish_command.clone(),
                working_dir: self.root.clone(),
                envs: Vec::new(),
                stdout: commit_dir.join(format!("{}.publish.out", dsl.name)),
                stderr: commit_dir.join(format!("{}.publish.err", dsl.name)),
            };
            match self.runner.execute(&invocation) {
                Ok(true) => {}
                Ok(false) => warn!(
                    "Publishing {} failed, see {}",
                    dsl.name,
                    invocation.stderr.display()
                ),
                Err(e) => warn!("Failed to publish {}: {}", dsl.name, e),
            }
        }
        Ok(())
    }

    /// Stage and time every selected configuration of `apps`, in order.
    ///
    /// Failures of the external tools are recorded in the outcome of the affected run and
    /// never abort the batch.
    pub fn execute(&mut self, apps: &[&App], filters: &[Regex]) -> Result<Vec<RunOutcome>> {
        if !self.options.skip_execution {
            self.commit_dir()?;
        }
        let mut outcomes = Vec::new();
        for app in apps {
            for config in selected_configs(app, filters) {
                let run_key = RunKey::new(
                    self.commit.as_str(),
                    app.name.as_str(),
                    config.name.as_str(),
                )?;
                let status = if self.options.skip_execution {
                    self.reuse(&run_key)
                } else {
                    self.run(app, config, &run_key)?
                };
                let outcome = RunOutcome { run_key, status };
                match status {
                    RunStatus::Completed | RunStatus::Reused => info!("{}", outcome),
                    _ => warn!("{}", outcome),
                }
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }

    fn reuse(&self, run_key: &RunKey) -> RunStatus {
        let captured = self.store.capture_path(run_key, Step::Run, Stream::Out);
        if captured.is_file() {
            debug!("Reusing {}", captured.display());
            RunStatus::Reused
        } else {
            RunStatus::NotCaptured
        }
    }

    fn invocation(&self, app: &App, run_key: &RunKey, step: Step, command: String) -> Invocation {
        Invocation {
            command,
            working_dir: self.root.join(&app.dsl.run_dir),
            envs: Vec::new(),
            stdout: self.store.capture_path(run_key, step, Stream::Out),
            stderr: self.store.capture_path(run_key, step, Stream::Err),
        }
    }

    /// JVM options that make the run dump its timings into the store.
    pub fn timing_options(&self, run_key: &RunKey) -> String {
        [
            "-Dstats.dump".to_owned(),
            "-Dstats.dump.component=app".to_owned(),
            "-Dstats.dump.overwrite".to_owned(),
            format!(
                "-Dstats.output.dir={}",
                self.store.commit_dir(run_key.commit()).display()
            ),
            format!("-Dstats.output.filename={}", run_key.times_file_name()),
            self.options.base_java_opts.clone(),
        ]
        .iter()
        .filter(|option| !option.is_empty())
        .join(" ")
    }

    fn succeeded(&mut self, invocation: &Invocation) -> bool {
        match self.runner.execute(invocation) {
            Ok(success) => success,
            Err(e) => {
                warn!("Failed to execute '{}': {}", invocation.command, e);
                false
            }
        }
    }

    fn run(&mut self, app: &App, config: &Config, run_key: &RunKey) -> Result<RunStatus> {
        info!("Staging {} for {}", app.name, config.name);
        let stage = self.invocation(app, run_key, Step::Stage, app.stage_command());
        if !self.succeeded(&stage) {
            self.store.remove(run_key)?;
            return Ok(RunStatus::StageFailed);
        }
        // Only a file written by this run may be read back below.
        self.store.remove(run_key)?;

        info!("Running {} under configuration {}", app.name, config.name);
        let mut run = self.invocation(
            app,
            run_key,
            Step::Run,
            app.run_command(config, self.options.runs, self.options.verbose),
        );
        run.envs
            .push((self.options.options_env.clone(), self.timing_options(run_key)));
        if !self.succeeded(&run) {
            self.store.remove(run_key)?;
            return Ok(RunStatus::RunFailed);
        }

        match self.store.read(run_key) {
            Ok(Some(samples)) if !samples.is_empty() => Ok(RunStatus::Completed),
            Ok(_) => Ok(RunStatus::NoTimings),
            Err(e) => {
                warn!("{:#}", e);
                self.store.remove(run_key)?;
                Ok(RunStatus::NoTimings)
            }
        }
    }
}
