use anyhow::Result;
use itertools::Itertools;

use crate::{
    aggregator::{AggregatedResult, Aggregator},
    history::CommitSamples,
    registry::App,
};

/// One labelled bar group of a comparison: a commit or an app.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    /// Aligned with [`ComparisonSeries::categories`]. `None` where the series has no
    /// such configuration at all.
    pub cells: Vec<Option<AggregatedResult>>,
}

impl Series {
    /// Mean of the cell at `index`, 0.0 if there is no data for it.
    pub fn value(&self, index: usize) -> f64 {
        self.cells
            .get(index)
            .and_then(Option::as_ref)
            .map(|result| result.mean)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSeries {
    pub title: String,
    /// Configuration names in x-axis order.
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

impl ComparisonSeries {
    pub fn labels(&self) -> Vec<String> {
        self.series.iter().map(|s| s.label.clone()).collect()
    }
}

/// How one app performed on each of the given commits, newest first.
pub fn version_comparison(
    app: &App,
    commits: &[CommitSamples],
    aggregator: &Aggregator,
) -> Result<ComparisonSeries> {
    let categories = app.configs.iter().map(|c| c.name.clone()).collect();
    let series = commits
        .iter()
        .map(|commit| -> Result<Series> {
            let cells = app
                .configs
                .iter()
                .map(|config| commit.aggregate(app, config, aggregator).map(Some))
                .try_collect()?;
            Ok(Series {
                label: commit.commit().to_owned(),
                cells,
            })
        })
        .try_collect()?;

    Ok(ComparisonSeries {
        title: format!("{} Performance Comparison", app.qualified_name()),
        categories,
        series,
    })
}

/// Several apps side by side on one commit.
///
/// The x-axis follows the configurations of the first app; the other apps are matched by
/// configuration name.
pub fn app_comparison(
    apps: &[&App],
    commit: &CommitSamples,
    aggregator: &Aggregator,
) -> Result<ComparisonSeries> {
    let categories: Vec<String> = apps
        .first()
        .map(|app| app.configs.iter().map(|c| c.name.clone()).collect())
        .unwrap_or_default();

    let series = apps
        .iter()
        .map(|app| -> Result<Series> {
            let cells = categories
                .iter()
                .map(|name| {
                    app.config(name)
                        .map(|config| commit.aggregate(app, config, aggregator))
                        .transpose()
                })
                .try_collect()?;
            Ok(Series {
                label: app.name.clone(),
                cells,
            })
        })
        .try_collect()?;

    Ok(ComparisonSeries {
        title: format!(
            "{} Performance Comparison",
            apps.iter().map(|app| &app.name).join(" vs ")
        ),
        categories,
        series,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        aggregator::WarmupPolicy,
        data::SampleSet,
        registry::{Config, Dsl, Registry},
        run_key::RunKey,
        sample_store::SampleStore,
    };
    use tempfile::tempdir;

    #[test]
    fn version_comparison_with_a_missing_commit() {
        let dir = tempdir().unwrap();
        let store = SampleStore::new(dir.path());
        let registry = Registry::standard();
        let logreg = registry.app("logreg").unwrap();
        store
            .write(
                &RunKey::new("aaaaaaa", "LogReg", "smp4").unwrap(),
                &SampleSet::from(vec![10.0, 20.0, 30.0, 40.0]),
            )
            .unwrap();

        let commits = ["aaaaaaa", "bbbbbbb"]
            .iter()
            .map(|hash| CommitSamples::load(&store, hash, &[logreg]).unwrap())
            .collect_vec();
        let aggregator = Aggregator::new(WarmupPolicy::HalfDiscard);

        let comparison = version_comparison(logreg, &commits, &aggregator).unwrap();
        assert_eq!(comparison.title, "OptiML/LogReg Performance Comparison");
        assert_eq!(comparison.labels(), vec!["aaaaaaa", "bbbbbbb"]);
        assert_eq!(comparison.categories.len(), 8);

        let smp4 = comparison
            .categories
            .iter()
            .position(|c| c == "smp4")
            .unwrap();
        assert_eq!(comparison.series[0].value(smp4), 35.0);
        assert_eq!(comparison.series[1].value(smp4), 0.0);
        assert!(!comparison.series[1].cells[smp4].as_ref().unwrap().stored);
    }

    #[test]
    fn app_comparison_matches_configurations_by_name() {
        let dir = tempdir().unwrap();
        let store = SampleStore::new(dir.path());
        let dsl = Dsl::forge("OptiML");
        let full = App::new("a", &dsl, "Full", "", &[Config::smp(1), Config::smp(2)]);
        let partial = App::new("b", &dsl, "Partial", "", &[Config::smp(2)]);
        store
            .write(
                &RunKey::new("ccccccc", "Partial", "smp2").unwrap(),
                &SampleSet::from(vec![4.0, 2.0]),
            )
            .unwrap();

        let commit = CommitSamples::load(&store, "ccccccc", &[&full, &partial]).unwrap();
        let aggregator = Aggregator::new(WarmupPolicy::HalfDiscard);
        let comparison = app_comparison(&[&full, &partial], &commit, &aggregator).unwrap();

        assert_eq!(comparison.title, "Full vs Partial Performance Comparison");
        assert_eq!(comparison.categories, vec!["smp1", "smp2"]);
        assert!(comparison.series[1].cells[0].is_none());
        assert_eq!(comparison.series[1].value(0), 0.0);
        assert_eq!(comparison.series[1].value(1), 2.0);
        assert_eq!(comparison.series[0].value(1), 0.0);
    }
}
