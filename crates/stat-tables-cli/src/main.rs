// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use stat_tables_core::config::{AppConfig, ConfigManager};
use stat_tables_core::estat::StatsEngine;
use stat_tables_core::report::{OutputFormat, Report};
use stat_tables_core::weather::WeatherEngine;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding config.json
    #[arg(long, global = true, env = "STAT_TABLES_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// text, csv or json
    #[arg(short, long, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an e-Stat table and print it with labels instead of codes
    Stats {
        /// Statistical table ID (statsDataId)
        #[arg(long)]
        id: Option<String>,
        /// Maximum number of records
        #[arg(long)]
        limit: Option<u32>,
        /// e-Stat application ID
        #[arg(long, env = "ESTAT_APP_ID", hide_env_values = true)]
        app_id: Option<String>,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Fetch current weather for each city
    Weather {
        /// City to query; repeat for several. Defaults to the configured list.
        #[arg(long = "city")]
        cities: Vec<String>,
        /// Concurrent requests
        #[arg(long)]
        jobs: Option<usize>,
        /// OpenWeatherMap API key
        #[arg(long, env = "OWM_APP_ID", hide_env_values = true)]
        app_id: Option<String>,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print the effective config, credentials masked
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("stat_tables")
        .build();
    // A second logger can only fail in tests; nothing to do about it.
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn writer(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Failed to create {}", p.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn emit(report: &Report, out: &OutputArgs) -> Result<()> {
    let mut w = writer(out.output.as_ref())?;
    report.write_to(&mut w, out.format)?;
    w.flush()?;
    if let Some(p) = &out.output {
        eprintln!("Wrote {}", p.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let manager = match &cli.config_dir {
        Some(dir) => ConfigManager::in_dir(dir),
        None => ConfigManager::new(),
    };

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Path => println!("{}", manager.path().display()),
            ConfigAction::Show => {
                let mut config = manager.load()?;
                config.apply_env();
                println!("{}", config.redacted().to_pretty_json()?);
            }
            ConfigAction::Init { force } => {
                if manager.path().exists() && !force {
                    bail!(
                        "{} already exists; use --force to overwrite",
                        manager.path().display()
                    );
                }
                manager.save(&AppConfig::default())?;
                println!("Wrote {}", manager.path().display());
            }
        },
        Commands::Stats {
            id,
            limit,
            app_id,
            out,
        } => {
            let mut config = manager.load()?;
            config.apply_env();
            if let Some(key) = app_id {
                config.stats.credential = key;
            }
            let id = id.unwrap_or_else(|| config.stats.stats_data_id.clone());
            let limit = limit.unwrap_or(config.stats.limit);

            let engine = StatsEngine::new(config.stats)?;
            let Some(doc) = engine.fetch_stats_data(&id, limit)? else {
                // Already logged; nothing to print.
                return Ok(());
            };
            let table = doc
                .normalized_table()
                .with_context(|| format!("Could not normalize table {}", id))?;
            emit(&Report::new(format!("e-Stat {}", id), table), &out)?;
        }
        Commands::Weather {
            cities,
            jobs,
            app_id,
            out,
        } => {
            let mut config = manager.load()?;
            config.apply_env();
            if let Some(key) = app_id {
                config.weather.credential = key;
            }
            if let Some(jobs) = jobs {
                config.weather.jobs = jobs.max(1);
            }
            let cities = if cities.is_empty() {
                config.weather.cities.clone()
            } else {
                cities
            };

            let engine = WeatherEngine::new(config.weather)?;
            let table = engine.collect_table(&cities)?;
            emit(&Report::new("OpenWeatherMap current weather", table), &out)?;
        }
    }

    Ok(())
}
