mod cli;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use verokarhu::importers::Format;
use verokarhu::reports::{self, export, tables};
use verokarhu::tax::calculation::{calculate, CalculationOptions};
use verokarhu::tax::rules::{known_rule_years, resolve_rules_for_year};
use verokarhu::utils::format_eur;

fn main() -> Result<()> {
    // Initialize logging; logs go to stderr so --json stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Calculate {
            file,
            year,
            format,
            strict_sells,
            json,
            export_dir,
        } => handle_calculate(&file, year, format.as_deref(), strict_sells, json, export_dir),

        Commands::Formats => {
            for format in Format::ALL {
                println!("{}  {}", format.name().bold(), format.description());
                println!("    required columns: {}", format.required_columns().join(", "));
            }
            Ok(())
        }

        Commands::Rules { year } => {
            let (rule_year, rules) = resolve_rules_for_year(year)?;
            if rule_year != year {
                println!("No rule set for {year}, showing {rule_year}.");
            }
            let known: Vec<String> = known_rule_years().iter().map(i32::to_string).collect();
            println!("Known rule years:       {}", known.join(", "));
            println!("Rule year:              {rule_year}");
            println!(
                "Capital tax:            {} / {} (bracket {})",
                rules.capital_tax_low,
                rules.capital_tax_high,
                format_eur(rules.capital_income_bracket_eur)
            );
            println!(
                "Dividend taxable share: {}",
                rules.listed_dividend_taxable_share
            );
            println!(
                "Deemed cost:            {} / {} (10y+)",
                rules.deemed_cost_under_10y, rules.deemed_cost_10y_or_more
            );
            println!(
                "Custody fee excess:     {}",
                format_eur(rules.custody_deductible_excess)
            );
            Ok(())
        }
    }
}

fn handle_calculate(
    file: &str,
    year: Option<i32>,
    format: Option<&str>,
    strict_sells: bool,
    json: bool,
    export_dir: Option<String>,
) -> Result<()> {
    let format = format
        .map(Format::from_str)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;
    let year = year.unwrap_or_else(|| chrono::Local::now().year());

    info!("calculating taxes for {year} from {file}");
    let csv_text =
        std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))?;

    let result = calculate(&csv_text, format, year, CalculationOptions { strict_sells })?;
    let rows = reports::expand_sale_rows(&result.sales);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("\n{}\n", format!("Tax report {year}").bold().underline());
        println!("{}\n", tables::render_rules(&result));
        println!("{}", tables::render_summary(&result));

        if !rows.is_empty() {
            println!("\n{}", "Sales".bold());
            println!("{}", tables::render_sales_table(&rows));
            println!("\n{}", "FIFO audit trail".bold());
            println!("{}", tables::render_audit_table(&rows));
        }
        if !result.dividends.is_empty() {
            println!("\n{}", "Dividends".bold());
            println!("{}", tables::render_dividends_table(&result));
        }
        if !result.interests.is_empty() {
            println!("\n{}", "Interest".bold());
            println!("{}", tables::render_interests_table(&result));
        }
        if !result.warnings.is_empty() {
            println!("\n{}", "Data quality warnings".yellow().bold());
            println!("{}", tables::render_warnings(&result.warnings));
        }
    }

    if let Some(dir) = export_dir {
        let written = export::write_all(Path::new(&dir), &result, &rows)?;
        println!("\n{} Wrote {} export files:", "✓".green().bold(), written.len());
        for path in written {
            println!("  {}", path.display());
        }
    }

    Ok(())
}
