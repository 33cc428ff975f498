mod cli;
mod config;
mod render;
mod runner;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use engine_logging::{engine_info, LogDestination};
use log::LevelFilter;
use migrator_core::{MigrationProgress, ProgressView};

use cli::{Cli, Commands};
use config::{load_config, save_config};

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Terminal logging would interleave with status output unless asked for.
    let (destination, level) = if cli.verbose {
        (LogDestination::Both, LevelFilter::Debug)
    } else {
        (LogDestination::File, LevelFilter::Info)
    };
    engine_logging::initialize(destination, level, Path::new("./migrator.log"));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli.config)?;
    cli.apply_paths(&mut config);

    match &cli.command {
        Commands::Start(args) => {
            args.apply(&mut config);
            let engine = runner::build_engine(&config)?;
            let progress = engine
                .start_migration(config.migration.clone())
                .await
                .context("failed to start migration")?;
            save_config(&cli.config, &config);
            print_progress(Some(&progress));
        }
        Commands::Run(args) => {
            args.apply(&mut config);
            let engine = runner::build_engine(&config)?;
            let progress = runner::run_to_completion(&engine, &config).await?;
            save_config(&cli.config, &config);
            print_progress(Some(&progress));
        }
        Commands::Batch => {
            let engine = runner::build_engine(&config)?;
            let progress = engine
                .process_next_batch()
                .await
                .context("failed to process batch")?;
            print_progress(progress.as_ref());
        }
        Commands::Stop => {
            let engine = runner::build_engine(&config)?;
            let progress = engine.stop().context("failed to stop migration")?;
            print_progress(progress.as_ref());
        }
        Commands::Reset => {
            let engine = runner::build_engine(&config)?;
            engine.reset().context("failed to reset migration")?;
            engine_info!("Progress cleared");
            println!("Migration progress reset.");
        }
        Commands::Status(args) => {
            let engine = runner::build_engine(&config)?;
            let progress = engine.get_progress().context("failed to read progress")?;
            if args.json {
                let json = serde_json::to_string_pretty(&progress)
                    .context("failed to serialize progress")?;
                println!("{json}");
            } else {
                print_progress(progress.as_ref());
            }
        }
    }
    Ok(())
}

fn print_progress(progress: Option<&MigrationProgress>) {
    let view = progress.map(ProgressView::from_progress);
    print!("{}", render::render_status(view.as_ref(), chrono::Local::now()));
}
