use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, trace};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    data::SampleSet,
    defaults::MICROS_EXPONENT,
    run_key::{RunKey, TIMES_EXTENSION},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{}:{line_no}: '{line}' is not a timing value", path.display())]
    Malformed {
        path: PathBuf,
        line_no: usize,
        line: String,
    },
}

/// The two external steps of a run, each with its own captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Compiling the app with `delitec`
    Stage,
    /// The timed execution with `delite`
    Run,
}

impl Step {
    fn suffix(self) -> &'static str {
        match self {
            Step::Stage => "delitec",
            Step::Run => "delite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Out,
    Err,
}

impl Stream {
    fn suffix(self) -> &'static str {
        match self {
            Stream::Out => "out",
            Stream::Err => "err",
        }
    }
}

/// Timing files laid out as `<root>/<commit>/<app>-<config>.times`.
#[derive(Debug, Clone)]
pub struct SampleStore {
    root: PathBuf,
}

impl SampleStore {
    pub fn new(root: impl Into<PathBuf>) -> SampleStore {
        SampleStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn commit_dir(&self, commit: &str) -> PathBuf {
        self.root.join(commit)
    }

    pub fn has_commit(&self, commit: &str) -> bool {
        self.commit_dir(commit).is_dir()
    }

    pub fn times_path(&self, key: &RunKey) -> PathBuf {
        self.commit_dir(key.commit()).join(key.times_file_name())
    }

    pub fn capture_path(&self, key: &RunKey, step: Step, stream: Stream) -> PathBuf {
        self.commit_dir(key.commit()).join(format!(
            "{}.{}.{}",
            key.stem(),
            step.suffix(),
            stream.suffix()
        ))
    }

    pub fn write(&self, key: &RunKey, samples: &SampleSet) -> Result<()> {
        let dir = self.commit_dir(key.commit());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let path = self.times_path(key);
        let mut content = samples
            .iter()
            .map(seconds_to_micros)
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        debug!("Writing {} samples to {}", samples.len(), path.display());
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Returns `None` if the run has never produced a timing file.
    pub fn read(&self, key: &RunKey) -> Result<Option<SampleSet>> {
        let path = self.times_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!("No timing file for {}", key);
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let samples = parse_samples(&path, &content)?;
        debug!("Read {} samples for {}", samples.len(), key);
        Ok(Some(samples))
    }

    /// Delete the timing file of a run. A missing file is not an error.
    pub fn remove(&self, key: &RunKey) -> Result<()> {
        let path = self.times_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed stale timing file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// All runs with a timing file for the given commit, sorted by app and configuration.
    pub fn list_keys(&self, commit: &str) -> Result<Vec<RunKey>> {
        let dir = self.commit_dir(commit);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", dir.display()));
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.ends_with(TIMES_EXTENSION) {
                continue;
            }
            match RunKey::from_file_name(commit, file_name) {
                Ok(key) => keys.push(key),
                Err(e) => debug!("Skipping {}: {}", file_name, e),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn parse_samples(path: &Path, content: &str) -> Result<SampleSet> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            micros_to_seconds(line.trim()).ok_or_else(|| {
                anyhow::Error::from(StoreError::Malformed {
                    path: path.to_owned(),
                    line_no: i + 1,
                    line: line.to_owned(),
                })
            })
        })
        .collect()
}

/// Writes seconds as microseconds by raising the decimal exponent.
fn seconds_to_micros(seconds: f64) -> String {
    if !seconds.is_finite() {
        return seconds.to_string();
    }
    // `{:e}` always prints the shortest mantissa that reads back exactly.
    let text = format!("{:e}", seconds);
    match text.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
        Some((mantissa, Ok(exponent))) => format!("{}e{}", mantissa, exponent + MICROS_EXPONENT),
        _ => text,
    }
}

/// Reads microseconds as seconds by lowering the decimal exponent.
fn micros_to_seconds(text: &str) -> Option<f64> {
    let micros = text.parse::<f64>().ok()?;
    if !micros.is_finite() {
        return Some(micros);
    }
    let shifted = match text.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => {
            let exponent = exponent.parse::<i64>().ok()?;
            format!("{}e{}", mantissa, exponent - i64::from(MICROS_EXPONENT))
        }
        None => format!("{}e-{}", text, MICROS_EXPONENT),
    };
    shifted.parse().ok()
}
