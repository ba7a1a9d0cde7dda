//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `ip_sentinel` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use sqlx::SqlitePool;
use std::process;
use tokio_util::sync::CancellationToken;

use ip_sentinel::initialization::{init_geo_resolver, init_logger_with, init_store};
use ip_sentinel::policy::{auto_block_repeat_offenders, sweep_resolved};
use ip_sentinel::{
    block_ip, list_blocked_ips, list_suspicious_ips, log_lookup_statistics,
    resolve_suspicious_ip, unblock_ips, Command, Config, DetectionCycle, GeoResult, Opt,
    Scheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the current directory, falling back to the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();
    let config = opt.to_config();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run(opt.command, config).await {
        eprintln!("ip_sentinel error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(command: Command, config: Config) -> Result<()> {
    if let Command::Geolocate { ips } = &command {
        return geolocate(ips, &config).await;
    }

    let pool = init_store(&config.db_path).await?;
    match command {
        Command::Detect => {
            let cycle = DetectionCycle::new(pool, config.detection.clone());
            let report = cycle.run().await.context("Detection cycle failed")?;
            println!(
                "Anomaly detection completed. Found {} suspicious IPs ({} high volume, {} sensitive access)",
                report.total_detected(),
                report.volume.len(),
                report.sensitive.len()
            );
            for finding in &report.combined.findings {
                println!(
                    "  {} {} ({})",
                    finding.ip_address.bold(),
                    finding.reason.label().yellow(),
                    finding.reason
                );
            }
        }
        Command::AutoBlock => {
            let blocked = auto_block_repeat_offenders(&pool, &config.auto_block)
                .await
                .context("Auto-block failed")?;
            println!("Auto-blocked {blocked} IPs");
        }
        Command::Cleanup => {
            let deleted = sweep_resolved(&pool, config.retention.max_age_days)
                .await
                .context("Cleanup failed")?;
            println!("Cleaned up {deleted} old suspicious IP records");
        }
        Command::ListSuspicious { resolved } => print_suspicious(&pool, resolved).await?,
        Command::Resolve { id } => {
            if resolve_suspicious_ip(&pool, id).await? {
                println!("Marked suspicious IP record {id} as resolved");
            } else {
                anyhow::bail!("No suspicious IP record with id {id}");
            }
        }
        Command::ListBlocked => print_blocked(&pool).await?,
        Command::Block { ips, reason } => {
            for ip in &ips {
                if block_ip(&pool, ip, reason.as_deref()).await? {
                    println!("Blocked {}", ip.bold());
                } else {
                    println!("{} is already blocked", ip.bold());
                }
            }
        }
        Command::Unblock { ips } => {
            let summary = unblock_ips(&pool, &ips).await?;
            println!(
                "Unblocked {} IP(s); {} not found in block list",
                summary.unblocked, summary.not_found
            );
        }
        Command::Watch => {
            let cancel = CancellationToken::new();
            let scheduler = tokio::spawn(Scheduler::new(pool, &config).run(cancel.clone()));
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            log::info!("Shutdown requested");
            cancel.cancel();
            scheduler.await.context("Scheduler task failed")?;
        }
        Command::Geolocate { .. } => {}
    }
    Ok(())
}

async fn geolocate(ips: &[String], config: &Config) -> Result<()> {
    let resolver =
        init_geo_resolver(&config.geo).context("Failed to initialize geolocation resolver")?;
    for (ip, result) in resolver.resolve_all(ips).await {
        println!("{}", format_geo(&ip, &result));
    }
    log_lookup_statistics(resolver.stats());
    Ok(())
}

fn format_geo(ip: &str, result: &GeoResult) -> String {
    if !result.is_resolved() {
        let error = result.error.as_deref().unwrap_or("unresolved");
        return format!("{}: {}", ip.bold(), error.red());
    }
    let place = [
        result.city.as_deref(),
        result.region.as_deref(),
        result.country.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");
    format!(
        "{}: {} [{}] isp={} tz={} via {}",
        ip.bold(),
        place.green(),
        result.country_code.as_deref().unwrap_or("-"),
        result.isp.as_deref().unwrap_or("-"),
        result.timezone.as_deref().unwrap_or("-"),
        result.source_provider.as_deref().unwrap_or("-")
    )
}

async fn print_suspicious(pool: &SqlitePool, include_resolved: bool) -> Result<()> {
    let records = list_suspicious_ips(pool, include_resolved).await?;
    if records.is_empty() {
        println!("No suspicious IP records");
        return Ok(());
    }
    for record in records {
        let status = if record.is_resolved {
            "resolved".dimmed()
        } else {
            "open".yellow()
        };
        println!(
            "#{} {} {} [{}] {} requests at {}: {}",
            record.id,
            record.ip_address.bold(),
            record.reason.label(),
            status,
            record.request_count,
            record.detected_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.description
        );
    }
    Ok(())
}

async fn print_blocked(pool: &SqlitePool) -> Result<()> {
    let entries = list_blocked_ips(pool).await?;
    if entries.is_empty() {
        println!("No blocked IPs");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{} since {} ({})",
            entry.ip_address.bold(),
            entry.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.reason.as_deref().unwrap_or("no reason given")
        );
    }
    Ok(())
}
