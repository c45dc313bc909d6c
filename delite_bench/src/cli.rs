use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use itertools::Itertools;
use log::{debug, info, Level};

use crate::aggregator::{Aggregator, WarmupPolicy};
use crate::defaults::{
    default_bars, default_runs, default_warmup_discard, DEFAULT_OPTIONS_ENV, DEFAULT_OUTPUT_ROOT,
};
use crate::executor::{RunExecutor, RunOptions, RunStatus, ShellRunner};
use crate::filter::compile_filters;
use crate::git::git_interop::{get_commit_log, get_repository_root, verify_workspace};
use crate::history::timed_hashes;
use crate::inline::{run_inline, InlineDsl, InlineProgram, NamedInput};
use crate::registry::{App, Registry};
use crate::reporting::{report, ReportRequest};
use crate::sample_store::SampleStore;
use crate::{config, error::BenchError};
use delite_bench_cli_types::{Cli, CliStorage, CliWarmup, Commands, WarmupMode};

pub fn handle_calls() -> Result<()> {
    let cli = Cli::parse();
    let logger_level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(logger_level.as_str())).init();

    let registry = Registry::standard();

    match cli.command {
        Commands::Run {
            force,
            runs,
            apps,
            config_filter,
            skip_execution,
            skip_publish,
            skip_report,
            bars,
            warmup,
            storage,
        } => {
            let apps = if apps.is_empty() {
                registry.default_apps()?
            } else {
                registry.apps(&apps)?
            };
            let filters = compile_filters(&config_filter)?;
            let runs = resolve_runs(runs);
            let options_env = config::options_env().unwrap_or_else(|| DEFAULT_OPTIONS_ENV.into());
            let options = RunOptions {
                runs,
                verbose: cli.verbose > 0,
                skip_execution,
                publish: !skip_publish,
                base_java_opts: env::var(&options_env).unwrap_or_default(),
                options_env,
            };

            let workspace = verify_workspace(None, force)?;
            let store = SampleStore::new(resolve_output_root(&workspace.root, storage));
            run(&registry, &store, &workspace.root, &workspace.commit, options, &apps, &filters)?;

            if skip_report {
                return Ok(());
            }
            let request = ReportRequest {
                version_apps: apps,
                ..ReportRequest::default()
            };
            let hashes = recent_hashes(&store, &workspace.root, resolve_bars(bars))?;
            let aggregator = Aggregator::new(resolve_policy(&warmup, runs));
            report(&store, &hashes, &request, &aggregator, None)?;
            Ok(())
        }
        Commands::Report {
            bars,
            app_comparison,
            app_comparison_default,
            ver_comparison,
            ver_comparison_default,
            xml,
            xml_default,
            hashes,
            output_dir,
            runs,
            warmup,
            storage,
        } => {
            let mut request = ReportRequest::default();

            let groups = if app_comparison_default {
                registry.default_comparisons.clone()
            } else {
                app_comparison.iter().map(|group| split_group(group)).collect()
            };
            for group in &groups {
                request.app_comparisons.push(registry.apps(group)?);
            }

            request.version_apps = if ver_comparison_default {
                registry.default_apps()?
            } else {
                registry.apps(&ver_comparison)?
            };

            request.xml_apps = if xml_default {
                registry.default_apps()?
            } else {
                registry.apps(&xml)?
            };

            if request.app_comparisons.is_empty()
                && request.version_apps.is_empty()
                && request.xml_apps.is_empty()
            {
                debug!("No comparison requested, comparing the default apps across versions");
                request.version_apps = registry.default_apps()?;
            }

            let root = get_repository_root(None)?;
            let store = SampleStore::new(resolve_output_root(&root, storage));
            let hashes = if hashes.is_empty() {
                recent_hashes(&store, &root, resolve_bars(bars))?
            } else {
                hashes
            };
            let aggregator = Aggregator::new(resolve_policy(&warmup, resolve_runs(runs)));
            info!("Aggregating with the {} warm-up policy", aggregator.policy());
            report(&store, &hashes, &request, &aggregator, output_dir)?;
            Ok(())
        }
        Commands::List {} => {
            list(&registry);
            Ok(())
        }
        Commands::Inline { dsl, code, inputs } => {
            let dsl = InlineDsl::new(&registry.dsl(&dsl)?.name);
            let code = fs::read_to_string(&code)
                .with_context(|| format!("Failed to read {}", code.display()))?;
            let inputs = inputs
                .iter()
                .map(NamedInput::try_from)
                .collect::<Result<Vec<_>>>()?;
            let root = get_repository_root(None)?;
            let program = InlineProgram::generate(&dsl, &code, inputs);
            let output = run_inline(&root, &dsl, &program, &mut ShellRunner)?;
            println!("{}", output);
            Ok(())
        }
    }
}

fn run(
    registry: &Registry,
    store: &SampleStore,
    root: &Path,
    commit: &str,
    options: RunOptions,
    apps: &[&App],
    filters: &[regex::Regex],
) -> Result<()> {
    let dsls = apps
        .iter()
        .map(|app| registry.dsl(&app.dsl.name))
        .collect::<Result<Vec<_>, BenchError>>()?
        .into_iter()
        .unique_by(|dsl| dsl.name.clone())
        .collect_vec();

    let mut executor = RunExecutor::new(store, root, commit, options, ShellRunner);
    executor.publish(&dsls)?;
    let outcomes = executor.execute(apps, filters)?;

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o.status, RunStatus::Completed | RunStatus::Reused))
        .count();
    println!(
        "{} of {} runs for commit {} produced results",
        completed,
        outcomes.len(),
        commit
    );
    Ok(())
}

/// The newest `bars` commits of the current history that have timings.
fn recent_hashes(store: &SampleStore, root: &Path, bars: usize) -> Result<Vec<String>> {
    let log = get_commit_log(Some(root))?;
    let hashes = timed_hashes(store, &log, bars);
    if hashes.is_empty() {
        return Err(BenchError::NoTimedCommits(store.root().to_owned()).into());
    }
    Ok(hashes)
}

fn split_group(group: &str) -> Vec<String> {
    group
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_owned)
        .collect()
}

fn resolve_runs(cli_runs: Option<u16>) -> u16 {
    cli_runs.or_else(config::runs).unwrap_or(default_runs())
}

fn resolve_bars(cli_bars: Option<usize>) -> usize {
    cli_bars.or_else(config::bars).unwrap_or(default_bars())
}

fn resolve_output_root(repo_root: &Path, storage: CliStorage) -> PathBuf {
    let output_root = storage
        .output_root
        .or_else(config::output_root)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT));
    // Absolute paths replace the repository root when joined.
    repo_root.join(output_root)
}

/// Determine the warm-up policy with proper precedence:
/// 1. CLI options (`--warmup`, or `--discard` which implies "fixed")
/// 2. Configuration file
/// 3. Default (discard the first half)
fn resolve_policy(warmup: &CliWarmup, runs: u16) -> WarmupPolicy {
    let mode = warmup
        .warmup
        .or_else(|| warmup.discard.map(|_| WarmupMode::FixedCount))
        .or_else(config::warmup_policy)
        .unwrap_or(WarmupMode::HalfDiscard);
    let discard = warmup
        .discard
        .or_else(config::warmup_discard)
        .unwrap_or(default_warmup_discard());
    WarmupPolicy::from_mode(mode, discard, usize::from(runs))
}

fn list(registry: &Registry) {
    println!("DSLs:");
    for dsl in &registry.dsls {
        println!("  {} ({})", dsl.name, dsl.run_dir);
    }
    println!("Apps:");
    for app in &registry.apps {
        let marker = if registry.default_apps.contains(&app.key) {
            "*"
        } else {
            " "
        };
        let configs = app
            .configs
            .iter()
            .map(|c| {
                if c.run_only_once {
                    format!("{} (once)", c.name)
                } else {
                    c.name.clone()
                }
            })
            .join(", ");
        println!("{} {:<28} {:<20} {}", marker, app.key, app.qualified_name(), configs);
    }
    println!("Default comparisons:");
    for group in &registry.default_comparisons {
        println!("  {}", group.join(" vs "));
    }
    println!("Configuration files:");
    let sources = config::config_sources();
    if sources.is_empty() {
        println!("  (none)");
    }
    for source in sources {
        println!("  {}", source.display());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn app_groups_are_comma_separated() {
        assert_eq!(split_group("gda,delite_gda"), vec!["gda", "delite_gda"]);
        assert_eq!(split_group(" gda , logreg,"), vec!["gda", "logreg"]);
        assert!(split_group("").is_empty());
    }

    #[test]
    fn cli_warmup_wins() {
        let warmup = CliWarmup {
            warmup: Some(WarmupMode::HalfDiscard),
            discard: Some(2),
        };
        assert_eq!(resolve_policy(&warmup, 10), WarmupPolicy::HalfDiscard);

        let warmup = CliWarmup {
            warmup: None,
            discard: Some(2),
        };
        assert_eq!(
            resolve_policy(&warmup, 5),
            WarmupPolicy::FixedCount {
                discard: 2,
                expected: 5
            }
        );
    }

    #[test]
    fn explicit_output_root() {
        let storage = CliStorage {
            output_root: Some(PathBuf::from("times")),
        };
        assert_eq!(
            resolve_output_root(Path::new("/repo"), storage),
            PathBuf::from("/repo/times")
        );
        let storage = CliStorage {
            output_root: Some(PathBuf::from("/data/times")),
        };
        assert_eq!(
            resolve_output_root(Path::new("/repo"), storage),
            PathBuf::from("/data/times")
        );
    }
}
