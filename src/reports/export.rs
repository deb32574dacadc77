//! Export files for the tax filing: sale rows in the form-9A column layout,
//! the FIFO audit trail, dividend and interest lists, and the whole result
//! as JSON. Dates and column names follow the Finnish filing conventions;
//! numbers are dot-decimal so spreadsheets import them unambiguously.

use crate::reports::audit::ReportRow;
use crate::tax::calculation::CalculationResult;
use crate::tax::fifo::CostMethod;
use crate::utils::{format_date_fi, format_number_csv, format_quantity, instrument_display};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn deemed_cost_csv(row: &ReportRow) -> String {
    match row.method {
        CostMethod::Deemed => format_number_csv(row.deemed_cost),
        CostMethod::Actual => "-".to_string(),
    }
}

/// Sale rows in the column layout of the capital-transfer form (9A).
pub fn write_sales_csv(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("failed to create {path:?}"))?;

    writer.write_record([
        "Luovutettu arvopaperi/arvo-osuus",
        "Määrä",
        "Hankinta-aika",
        "Luovutusaika",
        "Luovutushinta",
        "Hankintahinta",
        "Hankintakulut",
        "Myyntikulut",
        "Hankintameno-olettama",
        "Voitto tai tappio",
    ])?;

    for row in rows {
        writer.write_record([
            instrument_display(&row.symbol, &row.name),
            format_quantity(row.qty),
            format_date_fi(row.acquired),
            format_date_fi(row.sold),
            format_number_csv(row.proceeds),
            format_number_csv(row.acquisition_price),
            format_number_csv(row.acquisition_fees),
            format_number_csv(row.sell_fees),
            deemed_cost_csv(row),
            format_number_csv(row.gain),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Per-lot audit trail with lot state before and after each sale.
pub fn write_audit_csv(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("failed to create {path:?}"))?;

    writer.write_record([
        "Myynti pvm",
        "Arvopaperi",
        "Myyty määrä",
        "Hankinta pvm",
        "Lotista käytetty määrä",
        "Lotin alkuperäinen määrä",
        "Lotista jäljellä myynnin jälkeen",
        "Hankintahinta osuus",
        "Hankintakulut osuus",
        "Myyntikulut osuus",
        "Hankintameno-olettama osuus",
        "Menetelmä",
        "Voitto/tappio osuus",
    ])?;

    for row in rows {
        writer.write_record([
            format_date_fi(row.sold),
            instrument_display(&row.symbol, &row.name),
            format_quantity(row.qty),
            format_date_fi(row.acquired),
            format_quantity(row.qty),
            format_quantity(row.lot_original_qty),
            format_quantity(row.lot_qty_after),
            format_number_csv(row.acquisition_price),
            format_number_csv(row.acquisition_fees),
            format_number_csv(row.sell_fees),
            deemed_cost_csv(row),
            row.method.to_string(),
            format_number_csv(row.gain),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_dividends_csv(path: &Path, result: &CalculationResult) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("failed to create {path:?}"))?;

    writer.write_record(["Päivä", "Arvopaperi", "Brutto-osinko"])?;
    for row in &result.dividends {
        writer.write_record([
            format_date_fi(row.date),
            instrument_display(&row.symbol, &row.name),
            format_number_csv(row.amount),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_interests_csv(path: &Path, result: &CalculationResult) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("failed to create {path:?}"))?;

    writer.write_record(["Päivä", "Tapahtuma", "Määrä"])?;
    for row in &result.interests {
        writer.write_record([
            format_date_fi(row.date),
            "Interest on cash".to_string(),
            format_number_csv(row.amount),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// The whole calculation result as pretty JSON.
pub fn write_json(path: &Path, result: &CalculationResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json).with_context(|| format!("failed to write {path:?}"))?;
    Ok(())
}

/// Write every export the result has data for into `dir`, returning the
/// paths written. The JSON summary is always written; the CSV files only
/// when they would have rows.
pub fn write_all(
    dir: &Path,
    result: &CalculationResult,
    rows: &[ReportRow],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {dir:?}"))?;

    let year = result.year;
    let mut written = Vec::new();

    let json_path = dir.join(format!("veroilmoitus_{year}.json"));
    write_json(&json_path, result)?;
    written.push(json_path);

    if !rows.is_empty() {
        let sales_path = dir.join(format!("myynnit_{year}.csv"));
        write_sales_csv(&sales_path, rows)?;
        written.push(sales_path);

        let audit_path = dir.join(format!("fifo_audit_{year}.csv"));
        write_audit_csv(&audit_path, rows)?;
        written.push(audit_path);
    }

    if !result.dividends.is_empty() {
        let path = dir.join(format!("osingot_{year}.csv"));
        write_dividends_csv(&path, result)?;
        written.push(path);
    }

    if !result.interests.is_empty() {
        let path = dir.join(format!("korot_{year}.csv"));
        write_interests_csv(&path, result)?;
        written.push(path);
    }

    info!("wrote {} export files to {dir:?}", written.len());
    Ok(written)
}
