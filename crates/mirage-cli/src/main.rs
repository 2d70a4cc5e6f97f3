use anyhow::{Context, Result};
use clap::Parser;
use mirage_analysis::{AnalysisTrigger, LogHandle, PhraseAnalyzer};
use tracing_subscriber::EnvFilter;

mod args;
mod config;
mod console;
mod engine;
mod output;

use args::Args;
use config::Config;
use console::Command;
use engine::{EngineCapture, EngineError};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = Config::from_env();
    Args::parse().apply(&mut config);
    tracing::debug!(?config, "configuration loaded");

    let log = LogHandle::new();
    log.info("System boot...");

    let (engine, mut run) = engine::spawn_engine(&config, log.clone())?;

    let analyzer = match config.seed {
        Some(seed) => PhraseAnalyzer::from_seed(seed),
        None => PhraseAnalyzer::from_entropy(),
    };
    let trigger = AnalysisTrigger::new(
        EngineCapture::new(engine.clone()),
        analyzer,
        log.clone(),
        config.analysis_cooldown,
    );
    let periodic = tokio::spawn(
        trigger
            .clone()
            .run_periodic(config.analysis_interval, run.ready.clone()),
    );

    let mut commands = console::spawn_console();
    let mut theme = config.theme;
    let mut gender = config.gender;
    tracing::info!(theme = %theme, gender = %gender, "mirage running; {}", console::HELP);

    let finished = loop {
        tokio::select! {
            done = &mut run.done => break done.map_err(|_| EngineError::ChannelClosed),
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                tracing::info!("interrupted, stopping engine");
                engine.stop().await.ok();
                break (&mut run.done).await.map_err(|_| EngineError::ChannelClosed);
            }
            Some(command) = commands.recv() => match command {
                Command::Analyze => {
                    let trigger = trigger.clone();
                    tokio::spawn(async move { trigger.trigger().await });
                }
                Command::NextTheme => {
                    theme = console::next_theme(theme);
                    engine.set_theme(theme).await.ok();
                }
                Command::NextGender => {
                    gender = console::next_gender(gender);
                    engine.set_gender(gender).await.ok();
                }
                Command::Quit => {
                    engine.stop().await.ok();
                    break (&mut run.done).await.map_err(|_| EngineError::ChannelClosed);
                }
            },
        }
    };
    periodic.abort();

    let outcome = finished.and_then(|r| r);
    match &outcome {
        Ok(frames) => tracing::info!(frames, "session finished"),
        Err(e) => {
            tracing::error!(error = %e, "engine failed");
            log.error(format!("Engine failure: {e}"));
        }
    }

    let entries = log.snapshot();
    if let Some(dir) = &config.output_dir {
        let path = output::write_log(dir, &entries)?;
        tracing::info!(path = %path.display(), "session log written");
    }
    for entry in &entries {
        println!("{entry}");
    }

    outcome?;
    Ok(())
}
