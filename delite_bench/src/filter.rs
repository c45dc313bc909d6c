//! Selection of configurations by regular expression.

use anyhow::{Context, Result};
use regex::Regex;

use crate::registry::{App, Config};

pub fn compile_filters(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .with_context(|| format!("Invalid configuration pattern: '{}'", pattern))
        })
        .collect()
}

/// A configuration is selected if any filter matches its name. No filters select everything.
pub fn is_selected(config: &Config, filters: &[Regex]) -> bool {
    filters.is_empty() || filters.iter().any(|re| re.is_match(&config.name))
}

pub fn selected_configs<'a>(
    app: &'a App,
    filters: &'a [Regex],
) -> impl Iterator<Item = &'a Config> + 'a {
    app.configs.iter().filter(move |c| is_selected(c, filters))
}
