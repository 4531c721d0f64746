//! Exploratory summary report over the harvested store.
//!
//! Renders repository aggregates as a small markdown document. Prices are in
//! 10,000 KRW, matching the stored unit.

use std::fmt::Write as _;

use anyhow::Result;

use crate::infrastructure::trade_repository::SqliteTradeRepository;

/// Builds the full markdown report from the current store contents.
pub async fn summary_report(repo: &SqliteTradeRepository) -> Result<String> {
    let trade_count = repo.trade_count().await?;
    let district_count = repo.district_count().await?;
    let date_range = repo.contract_date_range().await?;
    let district_stats = repo.district_stats().await?;
    let top_py = repo.top_py_districts().await?;
    let monthly = repo.monthly_counts().await?;

    let mut out = String::new();
    writeln!(out, "# Apartment Trade Summary")?;
    writeln!(out)?;
    writeln!(out, "- Transactions: {trade_count}")?;
    writeln!(out, "- Districts in reference table: {district_count}")?;
    match date_range {
        Some((first, last)) => writeln!(out, "- Contract dates: {first} ~ {last}")?,
        None => writeln!(out, "- Contract dates: (no data)")?,
    }

    if !district_stats.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Transactions by district")?;
        writeln!(out)?;
        writeln!(out, "| District | Trades | Avg price (만원) | Max price (만원) |")?;
        writeln!(out, "|---|---:|---:|---:|")?;
        for stat in &district_stats {
            writeln!(
                out,
                "| {} | {} | {:.1} | {} |",
                stat.district_name, stat.trade_count, stat.avg_price, stat.max_price
            )?;
        }
    }

    if !top_py.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Top districts by price per pyeong")?;
        writeln!(out)?;
        writeln!(out, "| District | Avg py (만원) | Trades |")?;
        writeln!(out, "|---|---:|---:|")?;
        for row in &top_py {
            writeln!(
                out,
                "| {} | {:.0} | {} |",
                row.district_name, row.avg_py, row.trade_count
            )?;
        }
    }

    if !monthly.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Transactions by month")?;
        writeln!(out)?;
        writeln!(out, "| Month | Trades |")?;
        writeln!(out, "|---|---:|")?;
        for row in &monthly {
            writeln!(out, "| {} | {} |", row.month, row.trade_count)?;
        }
    }

    Ok(out)
}
