use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use itertools::Itertools;
use log::{debug, info};
use plotly::{common::Title, layout::BarMode, Bar, Layout, Plot};
use serde::Serialize;

use crate::{
    aggregator::Aggregator,
    comparison::{app_comparison, version_comparison, ComparisonSeries},
    defaults::{REPORT_DIR_NAME, REPORT_VALUE_PRECISION},
    error::BenchError,
    history::CommitSamples,
    registry::App,
    sample_store::SampleStore,
    spreadsheet::{AppSheet, SpreadsheetReporter},
};

/// One chart as embedded in the HTML report and consumed by the page's scripts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotData {
    pub title: String,
    pub series: Vec<String>,
    pub data: Vec<PlotRow>,
}

/// The values of all series for one configuration, keyed by series label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRow {
    pub xlabel: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub commit: String,
    pub timestamp: String,
    pub plots: Vec<PlotData>,
    pub sheets: Vec<AppSheet>,
}

impl ReportDocument {
    #[must_use]
    pub fn with_sheets(mut self, sheets: Vec<AppSheet>) -> ReportDocument {
        self.sheets = sheets;
        self
    }

    pub fn plot_data_json(&self) -> Result<String> {
        // A literal "</" would end the surrounding script element early.
        Ok(serde_json::to_string(&self.plots)?.replace("</", "<\\/"))
    }
}

fn round_to_precision(value: f64) -> f64 {
    let factor = 10f64.powi(REPORT_VALUE_PRECISION as i32);
    (value * factor).round() / factor
}

fn plot_data(comparison: &ComparisonSeries) -> PlotData {
    let data = comparison
        .categories
        .iter()
        .enumerate()
        .map(|(index, category)| PlotRow {
            xlabel: category.clone(),
            values: comparison
                .series
                .iter()
                .map(|s| (s.label.clone(), round_to_precision(s.value(index))))
                .collect(),
        })
        .collect();

    PlotData {
        title: comparison.title.clone(),
        series: comparison.labels(),
        data,
    }
}

/// Assemble the report for `commit` from the given comparisons, in order.
pub fn build(comparisons: &[ComparisonSeries], commit: &str) -> ReportDocument {
    ReportDocument {
        commit: commit.to_owned(),
        timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        plots: comparisons.iter().map(plot_data).collect(),
        sheets: Vec::new(),
    }
}

pub trait Reporter {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>>;
}

const DEFAULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>[{{COMMIT}}] Performance Comparison</title>
  <meta charset="utf-8">
  {{PLOTLY_HEAD}}
</head>
<body>
  <h1>Performance Comparison for Commit [{{COMMIT}}]</h1>
  <p>Plots generated at {{TIMESTAMP}}.</p>
{{PLOTLY_BODY}}
  <script>
    document.plotData = {{PLOT_DATA}};
  </script>
</body>
</html>
"#;

pub struct HtmlReporter;

impl HtmlReporter {
    fn bar_chart(plot_data: &PlotData) -> Plot {
        let mut plot = Plot::new();
        let categories = plot_data
            .data
            .iter()
            .map(|row| row.xlabel.clone())
            .collect_vec();

        for label in &plot_data.series {
            let values = plot_data
                .data
                .iter()
                .map(|row| row.values.get(label).copied().unwrap_or(0.0))
                .collect_vec();
            plot.add_trace(Bar::new(categories.clone(), values).name(label));
        }

        let layout = Layout::new()
            .title(Title::from(plot_data.title.as_str()))
            .bar_mode(BarMode::Group);
        plot.set_layout(layout);
        plot
    }
}

impl Reporter for HtmlReporter {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>> {
        let plotly_body = document
            .plots
            .iter()
            .enumerate()
            .map(|(index, plot_data)| {
                Self::bar_chart(plot_data).to_inline_html(Some(format!("plot-{index}").as_str()))
            })
            .join("\n");

        let output = DEFAULT_HTML_TEMPLATE
            .replace("{{COMMIT}}", &document.commit)
            .replace("{{TIMESTAMP}}", &document.timestamp)
            .replace("{{PLOTLY_HEAD}}", &Plot::online_cdn_js())
            .replace("{{PLOTLY_BODY}}", &plotly_body)
            .replace("{{PLOT_DATA}}", &document.plot_data_json()?);

        Ok(output.into_bytes())
    }
}

struct ReporterFactory {}

impl ReporterFactory {
    fn from_file_name(path: &Path) -> Option<Box<dyn Reporter>> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "html" => Some(Box::new(HtmlReporter) as Box<dyn Reporter>),
            "xml" => Some(Box::new(SpreadsheetReporter) as Box<dyn Reporter>),
            _ => None,
        }
    }
}

/// Which comparisons and spreadsheets a report contains.
#[derive(Debug, Default)]
pub struct ReportRequest<'a> {
    /// Groups of apps compared on the newest commit.
    pub app_comparisons: Vec<Vec<&'a App>>,
    /// Apps compared across all commits.
    pub version_apps: Vec<&'a App>,
    pub xml_apps: Vec<&'a App>,
}

impl<'a> ReportRequest<'a> {
    /// Every app referenced by the request, each once, in first-mention order.
    pub fn apps(&self) -> Vec<&'a App> {
        self.app_comparisons
            .iter()
            .flatten()
            .chain(self.version_apps.iter())
            .chain(self.xml_apps.iter())
            .copied()
            .unique_by(|app| app.key.clone())
            .collect()
    }
}

/// Load the stored samples of `hashes` (newest first) and write the report files.
///
/// Returns the paths written. The HTML report is always written, the spreadsheet only
/// when apps were requested for it.
pub fn report(
    store: &SampleStore,
    hashes: &[String],
    request: &ReportRequest<'_>,
    aggregator: &Aggregator,
    output_dir: Option<PathBuf>,
) -> Result<Vec<PathBuf>> {
    let newest = hashes
        .first()
        .ok_or_else(|| BenchError::NoTimedCommits(store.root().to_owned()))?;
    let apps = request.apps();

    let commits = hashes
        .iter()
        .map(|hash| CommitSamples::load(store, hash, &apps))
        .collect::<Result<Vec<_>>>()?;
    let latest = &commits[0];

    let mut comparisons = Vec::new();
    for group in &request.app_comparisons {
        comparisons.push(app_comparison(group, latest, aggregator)?);
    }
    for app in &request.version_apps {
        comparisons.push(version_comparison(app, &commits, aggregator)?);
    }
    debug!("Built {} comparisons", comparisons.len());

    let sheets = request
        .xml_apps
        .iter()
        .unique_by(|app| app.key.clone())
        .map(|app| AppSheet::new(app, latest, aggregator))
        .collect::<Result<Vec<_>>>()?;

    let document = build(&comparisons, newest).with_sheets(sheets);

    let output_dir = output_dir.unwrap_or_else(|| store.commit_dir(newest).join(REPORT_DIR_NAME));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut outputs = vec![output_dir.join("report.html")];
    if !request.xml_apps.is_empty() {
        outputs.push(output_dir.join("report.xml"));
    }

    for output in &outputs {
        let reporter = ReporterFactory::from_file_name(output)
            .ok_or(anyhow!("Could not infer output format"))?;
        let bytes = reporter.render(&document)?;
        fs::write(output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Wrote {}", output.display());
    }

    Ok(outputs)
}
