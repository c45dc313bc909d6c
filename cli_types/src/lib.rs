use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum WarmupMode {
    /// Drop the first half of the samples of every run
    #[value(name = "half")]
    HalfDiscard,
    /// Drop a fixed number of samples; runs with an unexpected sample count are ignored
    #[value(name = "fixed")]
    FixedCount,
}

impl FromStr for WarmupMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "half" => Ok(WarmupMode::HalfDiscard),
            "fixed" => Ok(WarmupMode::FixedCount),
            _ => Err(anyhow!(
                "Invalid warm-up policy: {}. Valid values are 'half' or 'fixed'",
                s
            )),
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputKind {
    Int,
    #[value(name = "str")]
    Str,
    Float,
}

impl FromStr for InputKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(InputKind::Int),
            "str" => Ok(InputKind::Str),
            "float" => Ok(InputKind::Float),
            _ => Err(anyhow!(
                "Invalid input kind: {}. Valid values are 'int', 'str' or 'float'",
                s
            )),
        }
    }
}

/// A named, typed input handed to an inline program.
#[derive(Clone, Debug, PartialEq)]
pub struct CliInput {
    pub name: String,
    pub kind: InputKind,
    pub value: String,
}

#[derive(Parser)]
#[command(version, name = "delite-bench")]
pub struct Cli {
    /// Increase verbosity level (can be specified multiple times.) The first level sets level
    /// "info", second sets level "debug", and third sets level "trace" for the logger.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct CliStorage {
    /// Directory holding the per-commit timing data, relative to the repository root
    #[arg(short = 'o', long)]
    pub output_root: Option<PathBuf>,
}

#[derive(Args)]
pub struct CliWarmup {
    /// How warm-up samples are discarded before averaging.
    /// Defaults to the configured policy, or "half" when nothing is configured.
    #[arg(short = 'w', long, value_enum)]
    pub warmup: Option<WarmupMode>,

    /// Number of leading samples to discard. Implies the "fixed" policy.
    #[arg(short = 'd', long)]
    pub discard: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stage and time the selected apps under each of their configurations for the
    /// current commit, then generate a version comparison report.
    ///
    /// Stage and run output is captured next to the timing files in
    /// `<output-root>/<commit>/`. A failing stage or run does not abort the batch;
    /// the affected cell is reported as missing.
    Run {
        /// Run even if the repository contains uncommitted changes
        #[arg(short, long)]
        force: bool,

        /// Number of times each app is run per configuration
        #[arg(short = 'r', long, value_parser=clap::value_parser!(u16).range(1..))]
        runs: Option<u16>,

        /// Apps to run, by registry key. Defaults to the default app set.
        #[arg(short = 'a', long = "app", value_parser=parse_spaceless_string)]
        apps: Vec<String>,

        /// Only run configurations whose name matches one of these regular expressions
        #[arg(short = 'c', long = "config")]
        config_filter: Vec<String>,

        /// Reuse previously captured output instead of invoking the toolchain
        #[arg(short, long)]
        skip_execution: bool,

        /// Do not rebuild the published DSL trees before staging
        #[arg(long)]
        skip_publish: bool,

        /// Do not generate a report after running
        #[arg(long)]
        skip_report: bool,

        /// Number of timed commits shown per version comparison plot
        #[arg(short = 'b', long)]
        bars: Option<usize>,

        #[command(flatten)]
        warmup: CliWarmup,

        #[command(flatten)]
        storage: CliStorage,
    },

    /// Create an HTML (and optionally an XML spreadsheet) performance report from
    /// previously stored timings.
    Report {
        /// Number of timed commits shown per version comparison plot
        #[arg(short = 'b', long)]
        bars: Option<usize>,

        /// Comma-separated list of apps to compare against each other
        #[arg(short = 'a', long = "app-comparison", conflicts_with = "app_comparison_default")]
        app_comparison: Vec<String>,

        /// Use the default app comparisons
        #[arg(short = 'A', long)]
        app_comparison_default: bool,

        /// App to generate a version comparison plot for
        #[arg(short = 'c', long = "ver-comparison", conflicts_with = "ver_comparison_default")]
        ver_comparison: Vec<String>,

        /// Use the default apps for version comparison
        #[arg(short = 'C', long)]
        ver_comparison_default: bool,

        /// App to generate a spreadsheet for
        #[arg(short = 'x', long = "xml", conflicts_with = "xml_default")]
        xml: Vec<String>,

        /// Use the default apps for spreadsheet generation
        #[arg(short = 'X', long)]
        xml_default: bool,

        /// Compare these commits instead of the most recent timed ones
        #[arg(long = "hash", value_parser=parse_spaceless_string)]
        hashes: Vec<String>,

        /// Directory to write the report into.
        /// Defaults to `<output-root>/<newest commit>/report`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Expected number of samples per run for the "fixed" warm-up policy
        #[arg(short = 'r', long, value_parser=clap::value_parser!(u16).range(1..))]
        runs: Option<u16>,

        #[command(flatten)]
        warmup: CliWarmup,

        #[command(flatten)]
        storage: CliStorage,
    },

    /// List the registered DSLs, apps and configurations
    List {},

    /// Compile and run a snippet of DSL code with typed inputs and print its output
    Inline {
        /// Name of the DSL the snippet is written in
        #[arg(long)]
        dsl: String,

        /// File containing the snippet
        #[arg(long)]
        code: PathBuf,

        /// Input of the form `name=kind:value` with kind one of int, str, float
        #[arg(short, long = "input", value_parser=parse_input)]
        inputs: Vec<CliInput>,
    },
}

fn parse_spaceless_string(s: &str) -> Result<String> {
    if s.split_whitespace().count() > 1 {
        Err(anyhow!("invalid string/key/value: found space in '{}'", s))
    } else {
        Ok(String::from(s))
    }
}

fn parse_input(s: &str) -> Result<CliInput> {
    let (name, rest) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid input: no '=' found in '{}'", s))?;
    let (kind, value) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("invalid input: no ':' found after '=' in '{}'", s))?;
    let name = parse_spaceless_string(name)?;
    if name.is_empty() {
        return Err(anyhow!("invalid input: empty name in '{}'", s));
    }
    Ok(CliInput {
        name,
        kind: kind.parse()?,
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn verify_input_parsing() {
        assert_eq!(
            parse_input("n=int:42").unwrap(),
            CliInput {
                name: "n".to_string(),
                kind: InputKind::Int,
                value: "42".to_string(),
            }
        );

        // Only the first ':' separates kind and value
        let input = parse_input("path=str:/data/a:b").unwrap();
        assert_eq!(input.kind, InputKind::Str);
        assert_eq!(input.value, "/data/a:b");

        assert!(parse_input("novalue").is_err());
        assert!(parse_input("n=42").is_err());
        assert!(parse_input("n=double:4.2").is_err());
        assert!(parse_input("=int:4").is_err());
    }

    #[test]
    fn verify_warmup_mode_parsing() {
        assert_eq!(
            "half".parse::<WarmupMode>().unwrap(),
            WarmupMode::HalfDiscard
        );
        assert_eq!(
            "fixed".parse::<WarmupMode>().unwrap(),
            WarmupMode::FixedCount
        );
        assert!("all".parse::<WarmupMode>().is_err());
    }

    #[test]
    fn conflicting_comparison_flags() {
        let res = Cli::try_parse_from(["delite-bench", "report", "-c", "gda", "-C"]);
        assert!(res.is_err());

        let res = Cli::try_parse_from(["delite-bench", "report", "-a", "gda,delite_gda", "-x", "gda"]);
        assert!(res.is_ok());
    }
}
