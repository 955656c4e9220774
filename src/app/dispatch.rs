use crate::app::status::render_profile;
use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use gesture_arm::link::{Connector, SerialConnector, SimulatedArm};
use gesture_arm::pose::{JsonLinesPoseSource, pose_slot};
use gesture_arm::session::{run_session, run_sweep, spawn_capture, spawn_status_writer};
use gesture_arm::{ActuatorLink, CalibrationProfile, Config, ControlLoop, OperatorSignal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            port,
            poses,
            dry_run,
        } => run(config, port, poses, dry_run).await,
        Commands::Check => {
            let profile = build_profile(config.clone(), None)?;
            println!("{}", render_profile(&config, &profile));
            Ok(())
        }
        Commands::Sweep {
            port,
            pause_ms,
            dry_run,
        } => sweep(config, port, Duration::from_millis(pause_ms), dry_run).await,
    }
}

/// Validate before anything touches the port; an invalid profile never
/// actuates.
fn build_profile(mut config: Config, port: Option<String>) -> Result<Arc<CalibrationProfile>> {
    if let Some(port) = port {
        config.link.port = port;
    }
    let profile = CalibrationProfile::from_config(&config).with_context(|| {
        format!(
            "Invalid calibration profile in {}",
            config.config_path.display()
        )
    })?;
    Ok(Arc::new(profile))
}

fn connector_for(profile: &CalibrationProfile, dry_run: bool) -> (Box<dyn Connector>, Option<SimulatedArm>) {
    if dry_run {
        info!("dry run: using simulated controller");
        let arm = SimulatedArm::for_profile(profile);
        (Box::new(arm.connector()), Some(arm))
    } else {
        (Box::new(SerialConnector::new(profile.link.io_timeout)), None)
    }
}

async fn run(
    config: Config,
    port: Option<String>,
    poses: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let status = config.status.clone();
    let profile = build_profile(config, port)?;
    let (connector, simulated) = connector_for(&profile, dry_run);
    let control = ControlLoop::new(Arc::clone(&profile), connector);

    let (publisher, slot) = pose_slot();
    let (signals_tx, signals_rx) = mpsc::channel(16);

    let capture = match poses {
        Some(path) => {
            let source =
                JsonLinesPoseSource::open(&path, Some(profile.session.tick_interval)).await?;
            Some(spawn_capture(Box::new(source), publisher, signals_tx.clone()))
        }
        None => {
            info!("no pose source; joints hold at rest until quit");
            None
        }
    };

    spawn_operator_keys(signals_tx.clone())?;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signals_tx.send(OperatorSignal::Quit).await;
        }
    });

    let status_writer = status
        .file
        .map(|path| spawn_status_writer(path, Duration::from_secs(status.flush_secs)));

    let summary = run_session(control, slot, signals_rx).await?;

    if let Some(handle) = capture {
        handle.abort();
    }
    if let Some(handle) = status_writer {
        handle.abort();
    }
    if let Some(arm) = simulated {
        info!(angles = ?arm.angles(), "simulated servo positions");
    }
    println!(
        "Session ended: {} ticks, {} commands sent, {} ticks held on low confidence",
        summary.ticks, summary.commands_sent, summary.held_ticks
    );
    Ok(())
}

/// Read operator keys from stdin on a plain thread so an idle terminal
/// never holds up runtime shutdown.
fn spawn_operator_keys(signals: mpsc::Sender<OperatorSignal>) -> Result<()> {
    std::thread::Builder::new()
        .name("operator-keys".into())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                for signal in line.chars().filter_map(OperatorSignal::from_key) {
                    if signals.blocking_send(signal).is_err() {
                        return;
                    }
                }
            }
        })
        .context("Failed to start operator key reader")?;
    Ok(())
}

async fn sweep(config: Config, port: Option<String>, pause: Duration, dry_run: bool) -> Result<()> {
    let profile = build_profile(config, port)?;
    let (connector, _simulated) = connector_for(&profile, dry_run);

    let sent = tokio::task::spawn_blocking(move || {
        let mut link = ActuatorLink::new(profile.link.clone(), connector);
        run_sweep(&mut link, &profile, pause)
    })
    .await
    .context("Sweep task panicked")??;

    println!("Sweep complete: {} commands sent", sent.len());
    Ok(())
}
