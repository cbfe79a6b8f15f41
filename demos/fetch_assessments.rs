//! Fetch current and historical Platts assessments.
//!
//! Credentials are read from `SPGCI_USERNAME` / `SPGCI_PASSWORD` (a `.env`
//! file in the working directory is loaded first).
//!
//! Run with: cargo run --example fetch_assessments -- PCAAS00 PCAAT00

use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

use spgci_rs::api::{DateFilter, HistoricalQuery, SymbolCurrentQuery};
use spgci_rs::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut symbols: Vec<String> = std::env::args().skip(1).collect();
    if symbols.is_empty() {
        symbols.push("PCAAS00".to_string());
    }

    let client = SpgciClient::from_env()?;
    let market_data = client.market_data();

    let current = market_data
        .assessments_by_symbol_current(&SymbolCurrentQuery::symbols(symbols.iter().cloned()))
        .await?;
    if let Some(table) = current.into_table() {
        println!("Latest assessments ({} rows):", table.len());
        for row in &table {
            println!(
                "  {:<10} {:<3} {:>12} {}",
                row.symbol.as_str(),
                row.bate,
                row.value.map(|v| v.to_string()).unwrap_or_default(),
                row.date().map(|d| d.to_string()).unwrap_or_default(),
            );
        }
    }

    let today = Utc::now().date_naive();
    let mut query = HistoricalQuery::symbols(symbols);
    query.assess_date = DateFilter::between(today - Duration::days(30), today);
    query.paginate = true;

    let history = market_data.assessments_by_symbol_historical(&query).await?;
    for advisory in history.advisories() {
        println!("note: {}", advisory);
    }
    if let Some(table) = history.into_table() {
        println!(
            "History: {} rows across {} page(s)",
            table.len(),
            table.pages_fetched()
        );
    }

    Ok(())
}
