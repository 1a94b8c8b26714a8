//! Dashlink CLI
//!
//! Command-line client for a running Dashlink hub:
//! - Fetch the current snapshot
//! - Control the media player
//! - Check status
//! - Generate a config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dashlink::snapshot::{decode_text, Snapshot};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dashlink-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the Dashlink dashboard hub")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Hub URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current dashboard snapshot
    Snapshot,

    /// Send a media player command
    Music {
        /// play, pause, toggle, next, previous, stop or seek
        command: String,
        /// Seek target in seconds (seek only)
        seconds: Option<u64>,
    },

    /// Show hub status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Snapshot => {
            let response = client
                .get(format!("{}/api/fullproto", cli.api_url))
                .send()
                .await
                .with_context(|| format!("Cannot connect to Dashlink at {}", cli.api_url))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                bail!("Snapshot unavailable ({}): {}", status, text);
            }

            let text = response.text().await?;
            match cli.format.as_str() {
                "json" => print!("{}", text),
                _ => print_snapshot(&decode_text(&text)?),
            }
        }

        Commands::Music { command, seconds } => {
            let path = match (command.as_str(), seconds) {
                ("seek", Some(s)) => format!("music/seek/{}", s),
                ("seek", None) => bail!("seek needs a position in seconds"),
                (other, _) => format!("music/{}", other),
            };

            let response = client
                .get(format!("{}/api/{}", cli.api_url, path))
                .send()
                .await
                .with_context(|| format!("Cannot connect to Dashlink at {}", cli.api_url))?;

            if response.status().is_success() {
                let result: serde_json::Value = response.json().await?;
                println!("OK: {}", result["command"].as_str().unwrap_or(&command));
            } else {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                bail!("Command failed ({}): {}", status, text);
            }
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: serde_json::Value = resp.json().await?;

                    if cli.format == "json" {
                        println!("{}", serde_json::to_string_pretty(&health)?);
                        return Ok(());
                    }

                    println!(
                        "Dashlink v{}",
                        health["version"].as_str().unwrap_or(env!("CARGO_PKG_VERSION"))
                    );
                    println!();
                    println!(
                        "Status:       {}",
                        health["status"].as_str().unwrap_or("unknown")
                    );
                    println!(
                        "Diagnostics:  {}",
                        health["diagnostics"].as_str().unwrap_or("-")
                    );
                    println!(
                        "Media player: {}",
                        if health["media_connected"].as_bool().unwrap_or(false) {
                            "connected"
                        } else {
                            "not connected"
                        }
                    );
                    println!(
                        "Dashboards:   {}",
                        health["connections"].as_u64().unwrap_or(0)
                    );

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => bail!("Hub returned error: {}", resp.status()),
                Err(e) => {
                    eprintln!("Cannot connect to Dashlink at {}", cli.api_url);
                    eprintln!();
                    eprintln!("Make sure the hub is running:");
                    eprintln!("  cargo run --bin dashlink");
                    return Err(e.into());
                }
            }
        }

        Commands::Config { output } => {
            let config = dashlink::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    let taken = chrono::DateTime::from_timestamp_millis(snapshot.timestamp_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("Snapshot at {}", taken);
    println!();

    match &snapshot.music {
        Some(music) if !music.player_name.is_empty() => {
            println!("Music ({}, {})", music.player_name, music.playback_status);
            println!("  {} - {}", music.artist, music.title);
            println!("  {}", music.album);
            println!(
                "  {} / {}",
                format_track_time(music.position_ms),
                format_track_time(music.length_ms)
            );
        }
        _ => println!("Music: no player"),
    }
    println!();

    match &snapshot.car {
        Some(car) => {
            println!("{:<18} {:>10}", "Vehicle", "");
            println!("{}", "-".repeat(30));
            println!("{:<18} {:>10.0}", "Engine RPM", car.engine_rpm);
            println!("{:<18} {:>7} km/h", "Speed", car.vehicle_speed);
            println!("{:<18} {:>8.1} %", "Fuel level", car.fuel_level);
            println!("{:<18} {:>8.1} %", "Engine load", car.engine_load);
            println!("{:<18} {:>7} °C", "Coolant", car.coolant_temp);
            println!("{:<18} {:>7} °C", "Intake air", car.intake_air_temp);
            println!("{:<18} {:>7} kPa", "Fuel pressure", car.fuel_pressure);
        }
        None => println!("Vehicle: no data"),
    }
}

fn format_track_time(ms: i32) -> String {
    let seconds = ms.max(0) / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
