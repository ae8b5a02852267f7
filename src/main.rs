use std::future::Future;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use log::{error, info};

mod export;
mod llama;

use llama::{Chart, DefiLlama, TvlPoint};

/// Protocols to export: (API slug, output filename label).
const PROTOCOLS: &[(&str, &str)] = &[
    ("uniswap", "UNI"),
    ("curve", "CURVE"),
    ("makerdao", "MAKER"),
    ("aave", "AAVE"),
    ("compound", "COMP"),
    ("instadapp", "INSTADAPP"),
    ("sushiswap", "SUSHI"),
    ("balancer", "BALANCER"),
    ("dydx", "dydx"),
    ("bancor", "BANCOR"),
    ("wbtc", "WBTC"),
];

// Case-sensitive, as the API requires.
const CHAIN: &str = "Ethereum";

const MAX_ATTEMPTS: u32 = 3;

async fn with_retries<T, F, Fut>(what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS => {
                error!(
                    "{}: fetch failed, attempt {}/{} ({})",
                    what, attempt, MAX_ATTEMPTS, err
                );
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn format_date(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn row(point: &TvlPoint) -> String {
    format!("{}  {:.2}", format_date(point.date), point.tvl)
}

// Console table of a fetched series, truncated to its edges.
fn preview(name: &str, points: &[TvlPoint]) -> String {
    const EDGE: usize = 5;

    let mut lines = vec![format!("{} ({} rows)", name, points.len())];
    if points.len() <= 2 * EDGE {
        lines.extend(points.iter().map(row));
    } else {
        lines.extend(points[..EDGE].iter().map(row));
        lines.push(format!("... {} rows omitted ...", points.len() - 2 * EDGE));
        lines.extend(points[points.len() - EDGE..].iter().map(row));
    }

    lines.join("\n")
}

async fn export_protocol(client: &DefiLlama, slug: &str, label: &str) -> Result<()> {
    let series = with_retries(slug, || client.get_protocol(slug)).await?;

    println!("{}", preview(slug, &series));

    let path = export::history_path(label);
    export::save_tvl_column(&path, &series)?;
    info!("{}: wrote {} rows to {}", slug, series.len(), path);

    Ok(())
}

fn finish_chart(what: &str, label: &str, chart: &Chart) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&chart.raw)?);

    let path = export::history_path(label);
    export::save_chart(&path, &chart.points)?;
    info!("{}: wrote {} rows to {}", what, chart.points.len(), path);

    Ok(())
}

async fn export_aggregate(client: &DefiLlama) -> Result<()> {
    let chart = with_retries("all chains", || client.get_historical_tvl()).await?;
    finish_chart("all chains", "all", &chart)
}

async fn export_chain(client: &DefiLlama, chain: &str, label: &str) -> Result<()> {
    let chart = with_retries(chain, || client.get_historical_tvl_chain(chain)).await?;
    finish_chart(chain, label, &chart)
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let client = match DefiLlama::new() {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build HTTP client: {}", err);
            std::process::exit(1);
        }
    };

    let mut failed = Vec::new();

    for (slug, label) in PROTOCOLS {
        if let Err(err) = export_protocol(&client, slug, label).await {
            error!("{}: giving up after {} attempts ({})", slug, MAX_ATTEMPTS, err);
            failed.push(*slug);
        }
    }

    if let Err(err) = export_aggregate(&client).await {
        error!("all chains: giving up after {} attempts ({})", MAX_ATTEMPTS, err);
        failed.push("all");
    }

    if let Err(err) = export_chain(&client, CHAIN, "ETH").await {
        error!("{}: giving up after {} attempts ({})", CHAIN, MAX_ATTEMPTS, err);
        failed.push(CHAIN);
    }

    if !failed.is_empty() {
        error!(
            "{}/{} exports failed: {}",
            failed.len(),
            PROTOCOLS.len() + 2,
            failed.join(", ")
        );
        std::process::exit(1);
    }
}
