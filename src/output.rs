//! Output formatters for tables, map aggregates and account data.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use seismodash::colorize::{
    CityAggregates, Color, MapFill, Popup, RegionStyle, magnitude_color, probability_color,
};
use seismodash::filters::FilterCriteria;
use seismodash::models::{Quake, ReportSummary, UserSession};
use seismodash::transform::TablePage;

// ANSI codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const ICON_QUAKE: &str = "🌍";
const ICON_FORECAST: &str = "🔮";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON document
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

fn fg(color: Color) -> String {
    format!("\x1b[38;5;{}m", color.ansi256())
}

/// Severity label for magnitude.
fn magnitude_label(mag: f64) -> &'static str {
    match mag {
        m if m >= 7.0 => "MAJOR",
        m if m >= 6.0 => "STRONG",
        m if m >= 5.0 => "MODERATE",
        m if m >= 4.0 => "LIGHT",
        _ => "MINOR",
    }
}

fn to_io(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

fn write_pretty<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(to_io)?;
    writeln!(writer, "{json}")
}

fn write_lines<W: Write, T: Serialize>(writer: &mut W, items: &[T]) -> io::Result<()> {
    for item in items {
        let json = serde_json::to_string(item).map_err(to_io)?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// One row of a quake table.
fn write_quake_row<W: Write, Q: Quake>(writer: &mut W, record: &Q) -> io::Result<()> {
    let mag = record.magnitude();
    let color = fg(magnitude_color(Some(mag)));
    let label = magnitude_label(mag);
    let time = record.occurrence_date().format("%Y-%m-%d %H:%M:%S");
    let city = &record.location().city;

    match (record.possibility(), record.prediction_date()) {
        (Some(p), Some(predicted)) => {
            let pcolor = fg(probability_color(p));
            writeln!(
                writer,
                "{ICON_FORECAST} {color}{BOLD}M{mag:.1}{RESET} │ \
                 {pcolor}{pct:>5.1}%{RESET} │ \
                 {DIM}{depth:>5.0}km{RESET} │ \
                 {predicted} │ \
                 {city}",
                pct = p * 100.0,
                depth = record.depth(),
                predicted = predicted.format("%Y-%m-%d %H:%M:%S"),
            )
        }
        _ => writeln!(
            writer,
            "{ICON_QUAKE} {color}{BOLD}M{mag:.1}{RESET} │ \
             {color}{label:8}{RESET} │ \
             {DIM}{depth:>5.0}km{RESET} │ \
             {time} │ \
             {city}",
            depth = record.depth(),
        ),
    }
}

/// Write one table page.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_table<W: Write, Q: Quake + Serialize>(
    writer: &mut W,
    page: &TablePage<Q>,
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            if page.rows.is_empty() {
                return writeln!(writer, "{DIM}No data{RESET}");
            }
            for record in &page.rows {
                write_quake_row(writer, record)?;
            }
            writeln!(
                writer,
                "{DIM}Page {} of {} ({} records){RESET}",
                page.page.get(),
                page.total_pages,
                page.total_elements
            )
        }
        Format::Json => write_pretty(writer, page),
        Format::Ndjson => write_lines(writer, &page.rows),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapRow<'a> {
    city: &'a str,
    value: f64,
    count: usize,
    #[serde(flatten)]
    fill: MapFill,
}

/// Write per-city map aggregates, highest value first.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_map<W: Write>(
    writer: &mut W,
    aggregates: &CityAggregates,
    format: Format,
) -> io::Result<()> {
    let rows: Vec<MapRow<'_>> = aggregates
        .ranked()
        .into_iter()
        .map(|stat| MapRow {
            city: &stat.name,
            value: stat.value,
            count: stat.count,
            fill: aggregates.fill_for(&stat.name),
        })
        .collect();

    match format {
        Format::Human => {
            if rows.is_empty() {
                return writeln!(writer, "{DIM}No data{RESET}");
            }
            for row in &rows {
                writeln!(
                    writer,
                    "{}██{RESET} {:<16} {BOLD}{:>6.2}{RESET} {DIM}{} ({} records){RESET}",
                    fg(row.fill.fill),
                    row.city,
                    row.value,
                    row.fill.fill,
                    row.count
                )?;
            }
            Ok(())
        }
        Format::Json => write_pretty(writer, &rows),
        Format::Ndjson => write_lines(writer, &rows),
    }
}

#[derive(Serialize)]
struct RegionMap<'a> {
    regions: &'a [RegionStyle],
    #[serde(skip_serializing_if = "Option::is_none")]
    popup: Option<&'a Popup>,
}

/// Write one style per boundary, plus the selected city's popup.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_regions<W: Write>(
    writer: &mut W,
    regions: &[RegionStyle],
    popup: Option<&Popup>,
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            for region in regions {
                let value = region
                    .value
                    .map_or_else(|| "no data".to_string(), |v| format!("{v:.2}"));
                let anchor = region
                    .anchor
                    .map_or_else(String::new, |[x, y]| format!(" @ ({x:.0}, {y:.0})"));
                writeln!(
                    writer,
                    "{}██{RESET} {:<16} {BOLD}{value:>7}{RESET} {DIM}{}{anchor}{RESET}",
                    fg(region.fill.fill),
                    region.name,
                    region.fill.fill,
                )?;
            }
            if let Some(popup) = popup {
                let [x, y] = popup.anchor;
                writeln!(writer, "{BOLD}▸ {}{RESET} popup at ({x:.0}, {y:.0})", popup.city)?;
            }
            Ok(())
        }
        Format::Json => write_pretty(writer, &RegionMap { regions, popup }),
        Format::Ndjson => write_lines(writer, regions),
    }
}

/// Write the report list.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_reports<W: Write>(
    writer: &mut W,
    reports: &[ReportSummary],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            if reports.is_empty() {
                return writeln!(writer, "{DIM}No reports{RESET}");
            }
            for report in reports {
                let created = report.created_at.as_deref().unwrap_or("");
                writeln!(
                    writer,
                    "{BOLD}{:>6}{RESET} │ {} {DIM}{created}{RESET}",
                    report.id, report.name
                )?;
            }
            Ok(())
        }
        Format::Json => write_pretty(writer, reports),
        Format::Ndjson => write_lines(writer, reports),
    }
}

/// Write raw statistics as returned by the backend.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_stats<W: Write>(writer: &mut W, stats: &Value, format: Format) -> io::Result<()> {
    match (format, stats) {
        (Format::Ndjson, Value::Array(items)) => write_lines(writer, items),
        (Format::Ndjson, other) => write_lines(writer, std::slice::from_ref(other)),
        _ => write_pretty(writer, stats),
    }
}

/// Write the signed-in user, or a note that nobody is.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_session<W: Write>(
    writer: &mut W,
    user: Option<&UserSession>,
    format: Format,
) -> io::Result<()> {
    match (format, user) {
        (Format::Human, None) => writeln!(writer, "{DIM}Not signed in{RESET}"),
        (Format::Human, Some(u)) => {
            let verified = if u.is_verified { "verified" } else { "unverified" };
            writeln!(
                writer,
                "{BOLD}{}{RESET} <{}> {DIM}{verified}{RESET}",
                u.display_name(),
                u.email
            )
        }
        (_, user) => write_pretty(writer, &user),
    }
}

/// Write the active filter criteria.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_criteria<W: Write>(
    writer: &mut W,
    criteria: &FilterCriteria,
    format: Format,
) -> io::Result<()> {
    if format != Format::Human {
        return write_pretty(writer, criteria);
    }

    let date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
    writeln!(writer, "city:       {}", criteria.city().unwrap_or("-"))?;
    writeln!(
        writer,
        "magnitude:  {} .. {}",
        criteria.min_magnitude, criteria.max_magnitude
    )?;
    writeln!(writer, "start date: {}", date(criteria.start_date))?;
    writeln!(writer, "end date:   {}", date(criteria.end_date))?;
    if criteria.is_inverted() {
        writeln!(writer, "{DIM}minimum exceeds maximum; nothing will match{RESET}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use seismodash::colorize::{MapMetric, region_fill};
    use seismodash::models::{EarthquakeRecord, Location};
    use seismodash::transform::PageNumber;

    fn quake(city: &str, magnitude: f64) -> EarthquakeRecord {
        EarthquakeRecord {
            id: city.to_lowercase(),
            magnitude,
            depth: 12.0,
            location: Location {
                city: city.into(),
                latitude: 38.0,
                longitude: 30.0,
            },
            occurrence_date: NaiveDateTime::default(),
        }
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>(), Ok(Format::Human));
        assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
        assert_eq!("ndjson".parse::<Format>(), Ok(Format::Ndjson));
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_human_table() {
        let page = TablePage {
            rows: vec![quake("Van", 7.2)],
            page: PageNumber::FIRST,
            total_pages: 1,
            total_elements: 1,
        };
        let out = render(|w| write_table(w, &page, Format::Human));
        assert!(out.contains("M7.2"));
        assert!(out.contains("MAJOR"));
        assert!(out.contains("Van"));
        assert!(out.contains("Page 1 of 1 (1 records)"));
    }

    #[test]
    fn test_empty_table_says_no_data() {
        let page: TablePage<EarthquakeRecord> = TablePage {
            rows: Vec::new(),
            page: PageNumber::FIRST,
            total_pages: 0,
            total_elements: 0,
        };
        let out = render(|w| write_table(w, &page, Format::Human));
        assert!(out.contains("No data"));
    }

    #[test]
    fn test_ndjson_table() {
        let page = TablePage {
            rows: vec![quake("Van", 5.0), quake("Bolu", 4.0)],
            page: PageNumber::FIRST,
            total_pages: 1,
            total_elements: 2,
        };
        let out = render(|w| write_table(w, &page, Format::Ndjson));
        assert_eq!(out.lines().count(), 2);
        let first: Value = serde_json::from_str(out.lines().next().expect("line")).expect("json");
        assert_eq!(first["location"]["city"], "Van");
    }

    #[test]
    fn test_map_json_carries_colors() {
        let records = [quake("Van", 7.5), quake("Bolu", 3.0)];
        let agg = CityAggregates::from_records(MapMetric::Magnitude, &records);
        let out = render(|w| write_map(w, &agg, Format::Json));
        let rows: Value = serde_json::from_str(&out).expect("json");
        assert_eq!(rows[0]["city"], "Van");
        assert_eq!(rows[0]["fill"], "#FF0000");
        assert_eq!(rows[1]["fill"], "#90EE90");
    }

    #[test]
    fn test_regions_human_and_popup() {
        let regions = [
            RegionStyle {
                name: "Van".into(),
                value: Some(7.5),
                fill: region_fill(MapMetric::Magnitude, Some(7.5)),
                anchor: Some([812.4, 301.6]),
            },
            RegionStyle {
                name: "Bitlis".into(),
                value: None,
                fill: region_fill(MapMetric::Magnitude, None),
                anchor: None,
            },
        ];
        let popup = Popup {
            city: "Van".into(),
            anchor: [812.4, 301.6],
        };
        let out = render(|w| write_regions(w, &regions, Some(&popup), Format::Human));
        assert!(out.contains("7.50"));
        assert!(out.contains("@ (812, 302)"));
        assert!(out.contains("no data"));
        assert!(out.contains("▸ Van"));

        let json: Value =
            serde_json::from_str(&render(|w| write_regions(w, &regions, None, Format::Json)))
                .expect("json");
        assert_eq!(json["regions"][1]["fill"], "#D3D3D3");
        assert!(json.get("popup").is_none());
    }
}
