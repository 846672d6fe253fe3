use clap::Parser;
use co2meter_core::SessionKey;
use co2meter_exporter::{
    Cli, Config, Device, EnvironmentState, PollExit, PollLoop, metrics, poll, run_reporter,
};
use color_eyre::eyre::eyre;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tracing=info,co2meter_exporter=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        info!(path = ?path, "Loading configuration");
    }
    let config = Config::from_cli(&cli)?;
    let device_path = config.device_path()?;
    let http_addr = config.listen_addr()?;

    info!(
        device = %device_path.display(),
        %http_addr,
        skip_decryption = config.skip_decryption,
        on_invalid_frame = ?config.on_invalid_frame,
        "Starting co2meter-exporter"
    );

    let device = Device::open(device_path)?;
    let key = SessionKey::generate();
    device.arm(&key)?;

    let state = EnvironmentState::new();
    let cancel = CancellationToken::new();

    let mut poll_rx = poll::spawn(PollLoop::new(
        device,
        key,
        state.clone(),
        config.poll_config(),
    ))?;

    let reporter_handle = if config.quiet {
        None
    } else {
        let state = state.clone();
        let period = config.report_interval();
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            run_reporter(state, period, cancel).await;
        }))
    };

    let axum_listener = TcpListener::bind(http_addr).await?;
    info!("Listening on http://{}/metrics", config.listen_display());

    let cancel_for_http = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(axum_listener, metrics::router(state))
            .with_graceful_shutdown(async move {
                cancel_for_http.cancelled().await;
            })
            .await
    });

    let mut polling = true;
    let result: color_eyre::Result<()> = loop {
        tokio::select! {
            outcome = &mut poll_rx, if polling => {
                polling = false;
                match outcome {
                    Ok(Ok(PollExit::InvalidFrame(frame))) => {
                        error!(
                            frame = ?frame.0,
                            "Poll loop stopped after an invalid frame, readings will no longer update"
                        );
                    }
                    Ok(Err(e)) => break Err(e.into()),
                    Err(_) => break Err(eyre!("poll thread exited without a result")),
                }
            }
            joined = &mut server => {
                return match joined {
                    Ok(Ok(())) => {
                        info!("HTTP server shut down");
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(e.into()),
                };
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break Ok(());
            }
        }
    };

    cancel.cancel();
    let _ = server.await;
    if let Some(handle) = reporter_handle {
        let _ = handle.await;
    }

    info!("co2meter-exporter shut down complete");
    result
}
