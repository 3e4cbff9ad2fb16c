use crate::data::bar::Bar;
use crate::data::series::BarSeries;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

//parses rfc3339 timestamps or plain yyyy-mm-dd dates (taken as utc midnight)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .context(format!("Unrecognized timestamp '{}'", raw))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context(format!("Invalid date '{}'", raw))?;
    Ok(midnight.and_utc())
}

//loads a normalized bar series from a csv file
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<BarSeries> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut bars = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let record: CsvRecord =
            result.context(format!("Failed to parse CSV record at line {}", index + 2))?;

        let timestamp = parse_timestamp(&record.timestamp)
            .context(format!("Bad timestamp at line {}", index + 2))?;

        let bar = Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        )
        .context(format!("Invalid bar at line {}", index + 2))?;

        bars.push(bar);
    }

    //providers don't agree on row order, so rows are sorted here
    //duplicates still fail in the series
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    debug!(path = ?path, bars = bars.len(), "loaded csv");

    BarSeries::new(bars).context(format!("Bar series in {:?} failed validation", path))
}
