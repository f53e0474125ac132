use sentinel_cam_common::config::Config;
use sentinel_cam_pipeline::api::Pipeline;
use sentinel_cam_pipeline::camera::{FrameSource, SyntheticSource};
use sentinel_cam_pipeline::device::{LogDevice, OutputDevice};
use sentinel_cam_pipeline::notify::build_notifier;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        source = config.camera.source,
        width = config.camera.width,
        height = config.camera.height,
        fps = config.camera.fps,
        preview_width = config.preview.width,
        preview_height = config.preview.height,
        auto_mode = config.device.auto_mode,
        "starting sentinel-cam"
    );

    let source: Box<dyn FrameSource> = match config.camera.source.as_str() {
        "synthetic" => Box::new(SyntheticSource::new(&config.camera)),
        other => {
            error!(source = other, "unknown camera source, expected 'synthetic'");
            std::process::exit(1);
        }
    };

    let device: Box<dyn OutputDevice> = match config.device.driver.as_str() {
        "log" => Box::new(LogDevice),
        other => {
            error!(driver = other, "unknown device driver, expected 'log'");
            std::process::exit(1);
        }
    };

    let notifier = match build_notifier(&config.notify) {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "failed to build notifier");
            std::process::exit(1);
        }
    };

    let (_pipeline, acquisition) = Pipeline::start(&config, source, device, notifier).await;

    // The acquisition task runs for the process lifetime; it resolves only
    // when capture retries are exhausted.
    match acquisition.await {
        Ok(Ok(())) => info!("acquisition loop exited"),
        Ok(Err(e)) => {
            error!(error = %e, "pipeline terminated");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "acquisition task panicked");
            std::process::exit(1);
        }
    }
}
