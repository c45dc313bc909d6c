use config::{Config, ConfigError, File, FileFormat};
use log::warn;
use std::{
    env,
    path::{Path, PathBuf},
};

use delite_bench_cli_types::WarmupMode;

/// Name of the per-repository configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".delitebenchconfig";

fn system_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        return Some(
            Path::new(&xdg_config_home)
                .join("delite-bench")
                .join("config.toml"),
        );
    }
    dirs_next::home_dir().map(|home| {
        home.join(".config")
            .join("delite-bench")
            .join("config.toml")
    })
}

/// Read hierarchical configuration (system -> local override)
pub fn read_hierarchical_config() -> Result<Config, ConfigError> {
    let mut builder = Config::builder();

    if let Some(system_path) = system_config_path() {
        builder = builder.add_source(
            File::from(system_path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    if let Some(local_path) = find_config_path() {
        builder = builder.add_source(
            File::from(local_path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    builder.build()
}

/// Search upward from the current directory for the local configuration file.
pub fn find_config_path() -> Option<PathBuf> {
    let mut current_dir = env::current_dir().ok()?;
    loop {
        let candidate = current_dir.join(LOCAL_CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

/// The configuration files that exist, in increasing precedence.
pub fn config_sources() -> Vec<PathBuf> {
    system_config_path()
        .filter(|path| path.is_file())
        .into_iter()
        .chain(find_config_path())
        .collect()
}

fn with_config<T>(f: impl FnOnce(&Config) -> Option<T>) -> Option<T> {
    match read_hierarchical_config() {
        Ok(config) => f(&config),
        Err(e) => {
            warn!("Ignoring unreadable configuration: {}", e);
            None
        }
    }
}

fn get_positive(config: &Config, key: &str) -> Option<i64> {
    let value = config.get_int(key).ok()?;
    if value < 0 {
        warn!("Ignoring negative value {} for '{}'", value, key);
        return None;
    }
    Some(value)
}

/// Returns the configured number of runs per configuration, if set.
pub fn runs() -> Option<u16> {
    with_config(|config| {
        let runs = get_positive(config, "run.runs")?;
        match u16::try_from(runs) {
            Ok(runs) if runs > 0 => Some(runs),
            _ => {
                warn!("Ignoring out of range value {} for 'run.runs'", runs);
                None
            }
        }
    })
}

/// Returns the configured number of commits per version comparison, if set.
pub fn bars() -> Option<usize> {
    with_config(|config| get_positive(config, "report.bars").map(|bars| bars as usize))
}

pub fn output_root() -> Option<PathBuf> {
    with_config(|config| config.get_string("storage.output_root").ok().map(PathBuf::from))
}

/// Returns the configured warm-up policy. Unknown policy names are ignored.
pub fn warmup_policy() -> Option<WarmupMode> {
    with_config(|config| {
        let policy = config.get_string("warmup.policy").ok()?;
        match policy.parse::<WarmupMode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    })
}

pub fn warmup_discard() -> Option<usize> {
    with_config(|config| {
        get_positive(config, "warmup.discard").map(|discard| discard as usize)
    })
}

/// Returns the environment variable the timed run reads its JVM options from, if configured.
pub fn options_env() -> Option<String> {
    with_config(|config| config.get_string("run.options_env").ok())
}
