//! XML Spreadsheet 2003 output.
//!
//! Every app gets its own worksheet laid out as
//!
//! ```text
//! row 1        <Dsl>/<App>              (merged title)
//! row 2        Run | <config> | ...
//! row 3..      1   | sample   | ...     (one row per repetition)
//!              Mean    | =AVERAGE over the samples kept after warm-up
//!              Speedup | mean of the first configuration / mean of this one
//! ```
//!
//! Mean and speedup are spreadsheet formulas so the raw numbers can be edited
//! afterwards. Cells without data stay empty instead of holding a formula that
//! would evaluate to an error.

use anyhow::Result;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::{
    aggregator::{AggregatedResult, Aggregator},
    history::CommitSamples,
    registry::App,
    reporting::{ReportDocument, Reporter},
};

/// Spreadsheet row (1-based) holding the first sample.
const FIRST_SAMPLE_ROW: usize = 3;

const NAMESPACES: &[(&str, &str)] = &[
    ("xmlns", "urn:schemas-microsoft-com:office:spreadsheet"),
    ("xmlns:o", "urn:schemas-microsoft-com:office:office"),
    ("xmlns:x", "urn:schemas-microsoft-com:office:excel"),
    ("xmlns:ss", "urn:schemas-microsoft-com:office:spreadsheet"),
    ("xmlns:html", "http://www.w3.org/TR/REC-html40"),
];

type Attributes = &'static [(&'static str, &'static str)];

const CALIBRI: (&str, &str) = ("ss:FontName", "Calibri");
const SWISS: (&str, &str) = ("x:Family", "Swiss");
const SIZE: (&str, &str) = ("ss:Size", "12");
const BOLD: (&str, &str) = ("ss:Bold", "1");
const THREE_DECIMALS: (&str, &str) = ("ss:Format", "0.000");

/// Sample values
const STYLE_SAMPLE: &str = "s1";
/// Mean row
const STYLE_MEAN: &str = "s2";
/// Column headers
const STYLE_HEADER: &str = "s3";
/// Repetition index column
const STYLE_INDEX: &str = "s4";
/// Speedup row
const STYLE_SPEEDUP: &str = "s5";
/// Worksheet title
const STYLE_TITLE: &str = "s6";

const STYLES: &[(&str, &[(&str, Attributes)])] = &[
    (
        STYLE_SAMPLE,
        &[
            ("Alignment", &[("ss:Vertical", "Bottom")]),
            ("Font", &[CALIBRI, SWISS, SIZE, ("ss:Color", "#000000")]),
            ("NumberFormat", &[THREE_DECIMALS]),
            ("Interior", &[]),
        ],
    ),
    (
        STYLE_MEAN,
        &[
            ("Font", &[CALIBRI, SWISS, SIZE, ("ss:Color", "#000000"), BOLD]),
            ("Interior", &[("ss:Color", "#A2BD90"), ("ss:Pattern", "Solid")]),
            ("NumberFormat", &[THREE_DECIMALS]),
        ],
    ),
    (
        STYLE_HEADER,
        &[
            (
                "Font",
                &[CALIBRI, SIZE, ("ss:Color", "#FFFFFF"), BOLD, ("ss:Italic", "1")],
            ),
            ("Interior", &[("ss:Color", "#000000"), ("ss:Pattern", "Solid")]),
        ],
    ),
    (
        STYLE_INDEX,
        &[
            (
                "Alignment",
                &[("ss:Horizontal", "Left"), ("ss:Vertical", "Bottom")],
            ),
            ("Font", &[CALIBRI, SWISS, SIZE, ("ss:Color", "#000000")]),
            ("Interior", &[("ss:Color", "#969696"), ("ss:Pattern", "Solid")]),
        ],
    ),
    (
        STYLE_SPEEDUP,
        &[
            ("Font", &[CALIBRI, SWISS, SIZE, ("ss:Color", "#000000"), BOLD]),
            ("Interior", &[("ss:Color", "#FFCC00"), ("ss:Pattern", "Solid")]),
            ("NumberFormat", &[THREE_DECIMALS]),
        ],
    ),
    (
        STYLE_TITLE,
        &[
            (
                "Font",
                &[
                    CALIBRI,
                    SIZE,
                    ("ss:Color", "#FFFFFF"),
                    BOLD,
                    ("ss:Underline", "Single"),
                ],
            ),
            ("Interior", &[("ss:Color", "#000000"), ("ss:Pattern", "Solid")]),
        ],
    ),
];

/// The samples of one app on one commit, one column per configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSheet {
    pub name: String,
    pub title: String,
    pub columns: Vec<AggregatedResult>,
}

impl AppSheet {
    pub fn new(app: &App, commit: &CommitSamples, aggregator: &Aggregator) -> Result<AppSheet> {
        let columns = app
            .configs
            .iter()
            .map(|config| commit.aggregate(app, config, aggregator))
            .collect::<Result<Vec<_>>>()?;
        Ok(AppSheet {
            name: app.name.clone(),
            title: app.qualified_name(),
            columns,
        })
    }

    /// Number of sample rows, given by the configuration with the most repetitions.
    pub fn sample_rows(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.raw_samples.len())
            .max()
            .unwrap_or(0)
    }

    fn mean_formula(column: &AggregatedResult) -> Option<String> {
        column.kept_range().map(|range| {
            format!(
                "=AVERAGE(R{}C:R{}C)",
                FIRST_SAMPLE_ROW + range.start,
                FIRST_SAMPLE_ROW + range.end - 1
            )
        })
    }
}

struct Cell<'a> {
    style: &'a str,
    merge_across: Option<usize>,
    formula: Option<String>,
    data: Option<(&'static str, String)>,
}

impl<'a> Cell<'a> {
    fn empty(style: &'a str) -> Cell<'a> {
        Cell {
            style,
            merge_across: None,
            formula: None,
            data: None,
        }
    }

    fn text(style: &'a str, text: &str) -> Cell<'a> {
        Cell {
            data: Some(("String", text.to_owned())),
            ..Cell::empty(style)
        }
    }

    fn number(style: &'a str, value: impl ToString) -> Cell<'a> {
        Cell {
            data: Some(("Number", value.to_string())),
            ..Cell::empty(style)
        }
    }

    fn formula(style: &'a str, formula: Option<String>) -> Cell<'a> {
        Cell {
            formula,
            ..Cell::empty(style)
        }
    }

    fn merge_across(mut self, columns: usize) -> Cell<'a> {
        self.merge_across = Some(columns);
        self
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("Cell");
        if let Some(columns) = self.merge_across {
            start.push_attribute(("ss:MergeAcross", columns.to_string().as_str()));
        }
        start.push_attribute(("ss:StyleID", self.style));
        if let Some(formula) = &self.formula {
            start.push_attribute(("ss:Formula", formula.as_str()));
        }

        match &self.data {
            None => writer.write_event(Event::Empty(start))?,
            Some((kind, value)) => {
                writer.write_event(Event::Start(start))?;
                let mut data = BytesStart::new("Data");
                data.push_attribute(("ss:Type", *kind));
                writer.write_event(Event::Start(data))?;
                writer.write_event(Event::Text(BytesText::new(value)))?;
                writer.write_event(Event::End(BytesEnd::new("Data")))?;
                writer.write_event(Event::End(BytesEnd::new("Cell")))?;
            }
        }
        Ok(())
    }
}

fn write_row<W: std::io::Write>(writer: &mut Writer<W>, cells: &[Cell<'_>]) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Row")))?;
    for cell in cells {
        cell.write(writer)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Row")))?;
    Ok(())
}

fn write_styles<W: std::io::Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Styles")))?;
    for (id, elements) in STYLES {
        let mut style = BytesStart::new("Style");
        style.push_attribute(("ss:ID", *id));
        writer.write_event(Event::Start(style))?;
        for (name, attributes) in *elements {
            let mut element = BytesStart::new(*name);
            for attribute in *attributes {
                element.push_attribute(*attribute);
            }
            writer.write_event(Event::Empty(element))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Style")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Styles")))?;
    Ok(())
}

fn write_worksheet<W: std::io::Write>(writer: &mut Writer<W>, sheet: &AppSheet) -> Result<()> {
    let mut worksheet = BytesStart::new("Worksheet");
    worksheet.push_attribute(("ss:Name", sheet.name.as_str()));
    writer.write_event(Event::Start(worksheet))?;
    writer.write_event(Event::Start(BytesStart::new("Table")))?;

    write_row(
        writer,
        &[Cell::text(STYLE_TITLE, &sheet.title).merge_across(sheet.columns.len())],
    )?;

    let header = std::iter::once(Cell::text(STYLE_HEADER, "Run"))
        .chain(
            sheet
                .columns
                .iter()
                .map(|c| Cell::text(STYLE_HEADER, c.run_key.config())),
        )
        .collect::<Vec<_>>();
    write_row(writer, &header)?;

    for index in 0..sheet.sample_rows() {
        let row = std::iter::once(Cell::number(STYLE_INDEX, index + 1))
            .chain(sheet.columns.iter().map(|c| {
                match c.raw_samples.as_slice().get(index) {
                    Some(value) => Cell::number(STYLE_SAMPLE, value),
                    None => Cell::empty(STYLE_SAMPLE),
                }
            }))
            .collect::<Vec<_>>();
        write_row(writer, &row)?;
    }

    let means = sheet
        .columns
        .iter()
        .map(AppSheet::mean_formula)
        .collect::<Vec<_>>();

    let mean_row = std::iter::once(Cell::text(STYLE_MEAN, "Mean"))
        .chain(
            means
                .iter()
                .map(|formula| Cell::formula(STYLE_MEAN, formula.clone())),
        )
        .collect::<Vec<_>>();
    write_row(writer, &mean_row)?;

    let baseline_present = means.first().is_some_and(Option::is_some);
    let speedup_row = std::iter::once(Cell::text(STYLE_SPEEDUP, "Speedup"))
        .chain(means.iter().map(|formula| {
            let speedup = (baseline_present && formula.is_some())
                .then(|| "=R[-1]C2/R[-1]C".to_owned());
            Cell::formula(STYLE_SPEEDUP, speedup)
        }))
        .collect::<Vec<_>>();
    write_row(writer, &speedup_row)?;

    writer.write_event(Event::End(BytesEnd::new("Table")))?;
    writer.write_event(Event::End(BytesEnd::new("Worksheet")))?;
    Ok(())
}

pub fn write_workbook(sheets: &[AppSheet]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut workbook = BytesStart::new("Workbook");
    for attribute in NAMESPACES {
        workbook.push_attribute(*attribute);
    }
    writer.write_event(Event::Start(workbook))?;
    write_styles(&mut writer)?;
    for sheet in sheets {
        write_worksheet(&mut writer, sheet)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Workbook")))?;

    Ok(writer.into_inner())
}

pub struct SpreadsheetReporter;

impl Reporter for SpreadsheetReporter {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>> {
        write_workbook(&document.sheets)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        aggregator::WarmupPolicy,
        data::SampleSet,
        registry::{Config, Dsl},
        run_key::RunKey,
        sample_store::SampleStore,
    };
    use tempfile::tempdir;

    fn sheet_for(samples: &[(&str, &[f64])], configs: &[Config]) -> AppSheet {
        let dir = tempdir().unwrap();
        let store = SampleStore::new(dir.path());
        let app = App::new("logreg", &Dsl::forge("OptiML"), "LogReg", "", configs);
        for (config, values) in samples {
            let key = RunKey::new("abc1234", "LogReg", *config).unwrap();
            store.write(&key, &SampleSet::from(values.to_vec())).unwrap();
        }
        let commit = CommitSamples::load(&store, "abc1234", &[&app]).unwrap();
        AppSheet::new(&app, &commit, &Aggregator::new(WarmupPolicy::HalfDiscard)).unwrap()
    }

    fn render(sheet: AppSheet) -> String {
        String::from_utf8(write_workbook(&[sheet]).unwrap()).unwrap()
    }

    #[test]
    fn complete_sheet() {
        let sheet = sheet_for(
            &[
                ("smp1", &[10.0, 20.0, 30.0, 40.0]),
                ("smp2", &[5.0, 6.0, 7.0, 8.0]),
            ],
            &[Config::smp(1), Config::smp(2)],
        );
        assert_eq!(sheet.sample_rows(), 4);
        let xml = render(sheet);

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\""));
        assert!(xml.contains("<Worksheet ss:Name=\"LogReg\">"));
        assert!(xml.contains("ss:MergeAcross=\"2\" ss:StyleID=\"s6\""));
        assert!(xml.contains(">OptiML/LogReg</Data>"));
        assert!(xml.contains(">Run</Data>"));
        assert!(xml.contains(">smp2</Data>"));
        assert!(xml.contains(">40</Data>"));
        assert_eq!(xml.matches("ss:Formula=\"=AVERAGE(R5C:R6C)\"").count(), 2);
        assert_eq!(xml.matches("ss:Formula=\"=R[-1]C2/R[-1]C\"").count(), 2);
        assert_eq!(xml.matches("<Style ss:ID=").count(), 6);
    }

    #[test]
    fn missing_and_partial_data_leave_cells_empty() {
        let sheet = sheet_for(
            &[("smp1", &[1.0, 2.0, 3.0]), ("smp4", &[2.0])],
            &[Config::smp(1), Config::smp(2), Config::smp(4)],
        );
        assert_eq!(sheet.sample_rows(), 3);
        assert!(!sheet.columns[1].stored);
        let xml = render(sheet);

        assert!(xml.contains("ss:Formula=\"=AVERAGE(R4C:R5C)\""));
        assert!(xml.contains("ss:Formula=\"=AVERAGE(R3C:R3C)\""));
        assert!(xml.contains("<Cell ss:StyleID=\"s2\"/>"));
        assert!(xml.contains("<Cell ss:StyleID=\"s5\"/>"));
        assert_eq!(xml.matches("ss:Formula=\"=R[-1]C2/R[-1]C\"").count(), 2);
        assert!(!xml.contains("NaN"));
    }

    #[test]
    fn missing_baseline_has_no_speedup() {
        let sheet = sheet_for(
            &[("smp2", &[1.0, 2.0])],
            &[Config::smp(1), Config::smp(2)],
        );
        let xml = render(sheet);
        assert!(xml.contains("ss:Formula=\"=AVERAGE(R4C:R4C)\""));
        assert!(!xml.contains("R[-1]C2"));
    }
}
