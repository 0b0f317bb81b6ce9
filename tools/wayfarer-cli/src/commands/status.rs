//! Peer health and connection metrics of a running planner.

use anyhow::{Context, Result};
use console::style;
use serde_json::Value;
use std::time::Duration;

pub async fn run(planner_url: &str) -> Result<()> {
    let url = format!("{}/api/status", planner_url.trim_end_matches('/'));
    let report: Value = reqwest::Client::new()
        .get(&url)
        .timeout(Duration::from_secs(15))
        .send()
        .await
        .with_context(|| format!("Planner not reachable at {}", planner_url))?
        .error_for_status()?
        .json()
        .await
        .context("Planner returned an unreadable status report")?;

    println!(
        "{} {}",
        style("Strategy:").bold(),
        report["strategy"].as_str().unwrap_or("unknown")
    );

    let peers = report["peers"].as_array().cloned().unwrap_or_default();
    if peers.is_empty() {
        println!("No peers configured");
        return Ok(());
    }

    for peer in &peers {
        println!("{}", describe(peer));
    }
    Ok(())
}

/// One line per peer.
fn describe(peer: &Value) -> String {
    let name = peer["name"].as_str().unwrap_or("?");
    let url = peer["url"].as_str().unwrap_or("?");

    if let Some(reason) = peer["excluded"].as_str() {
        return format!("  {} {} {} ({})", style("excluded").red(), name, url, reason);
    }

    let health = match peer["healthy"].as_bool() {
        Some(true) => style("healthy").green(),
        Some(false) => style("unhealthy").yellow(),
        None => style("unknown").dim(),
    };
    let metrics = &peer["metrics"];
    format!(
        "  {} {} {} via {} | calls {} failures {} timeouts {} last {}ms",
        health,
        name,
        url,
        peer["transport"].as_str().unwrap_or("?"),
        metrics["calls"].as_u64().unwrap_or(0),
        metrics["failures"].as_u64().unwrap_or(0),
        metrics["timeouts"].as_u64().unwrap_or(0),
        metrics["last_latency_ms"].as_u64().unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_peers() {
        console::set_colors_enabled(false);
        let line = describe(&json!({
            "name": "Hotel Booking Agent",
            "url": "http://localhost:10002",
            "transport": "envelope",
            "healthy": true,
            "metrics": {"calls": 4, "failures": 1, "timeouts": 0, "last_latency_ms": 120}
        }));
        assert_eq!(
            line,
            "  healthy Hotel Booking Agent http://localhost:10002 via envelope | calls 4 failures 1 timeouts 0 last 120ms"
        );

        let excluded = describe(&json!({
            "name": "Car Rental Agent",
            "url": "http://localhost:10003",
            "excluded": "unreachable"
        }));
        assert!(excluded.contains("excluded Car Rental Agent"));
    }
}
