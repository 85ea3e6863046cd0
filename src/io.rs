//! # Price CSV
//!
//! Load and save a [`PricePanel`] as `date,<ticker>,<ticker>,...` CSV. Dates use
//! `%Y-%m-%d`; an empty cell is a missing observation.

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use ndarray::Array2;

use crate::panel::PricePanel;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a price panel from any CSV source.
pub fn read_prices<R: Read>(source: R) -> Result<PricePanel> {
  let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);

  let headers = reader.headers().context("reading CSV header")?.clone();
  if headers.is_empty() {
    bail!("CSV header is empty");
  }
  let tickers: Vec<String> = headers.iter().skip(1).map(String::from).collect();
  if tickers.is_empty() {
    bail!("CSV has a date column but no tickers");
  }

  let mut dates = Vec::new();
  let mut values = Vec::new();
  for (line, record) in reader.records().enumerate() {
    let record = record.with_context(|| format!("reading CSV record {}", line + 1))?;
    if record.len() != tickers.len() + 1 {
      bail!(
        "record {} has {} fields, expected {}",
        line + 1,
        record.len(),
        tickers.len() + 1
      );
    }

    let date = NaiveDate::parse_from_str(&record[0], DATE_FORMAT)
      .with_context(|| format!("parsing date {:?} in record {}", &record[0], line + 1))?;
    dates.push(date);

    for (ticker, field) in tickers.iter().zip(record.iter().skip(1)) {
      let price = if field.is_empty() {
        f64::NAN
      } else {
        field
          .parse::<f64>()
          .with_context(|| format!("parsing {ticker} price {field:?} on {date}"))?
      };
      values.push(price);
    }
  }

  let prices = Array2::from_shape_vec((dates.len(), tickers.len()), values)?;
  Ok(PricePanel::new(dates, tickers, prices)?)
}

/// Read a price panel from a CSV file.
pub fn read_price_csv(path: impl AsRef<Path>) -> Result<PricePanel> {
  let path = path.as_ref();
  let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
  read_prices(file).with_context(|| format!("loading prices from {}", path.display()))
}

/// Write a price panel as CSV to any sink.
pub fn write_prices<W: Write>(panel: &PricePanel, sink: W) -> Result<()> {
  let mut writer = csv::Writer::from_writer(sink);

  let mut header = Vec::with_capacity(panel.n_assets() + 1);
  header.push("date".to_string());
  header.extend(panel.tickers().iter().cloned());
  writer.write_record(&header)?;

  for (date, row) in panel.dates().iter().zip(panel.prices().outer_iter()) {
    let mut record = Vec::with_capacity(row.len() + 1);
    record.push(date.format(DATE_FORMAT).to_string());
    record.extend(
      row
        .iter()
        .map(|p| if p.is_nan() { String::new() } else { p.to_string() }),
    );
    writer.write_record(&record)?;
  }

  writer.flush()?;
  Ok(())
}

/// Save a price panel to a CSV file, replacing it if present.
pub fn write_price_csv(panel: &PricePanel, path: impl AsRef<Path>) -> Result<()> {
  let path = path.as_ref();
  let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
  write_prices(panel, file).with_context(|| format!("writing prices to {}", path.display()))
}
