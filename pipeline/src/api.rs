use chrono::Utc;
use sentinel_cam_common::config::Config;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::acquisition::{AcquisitionLoop, PipelineError};
use crate::camera::FrameSource;
use crate::detector::MotionDetector;
use crate::device::{DeviceController, OutputDevice, Rgb};
use crate::hub::FrameHub;
use crate::notify::{send_detached, Notifier};
use crate::stream::{encode_full, PreviewStream, StreamError, StreamMultiplexer};

/// Motion status as served to clients.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MotionStatus {
    pub detected: bool,
}

/// Assembled pipeline and the call surface the web layer adapts onto.
///
/// The web layer itself (routing, templating, request parsing) lives
/// elsewhere; everything here returns plain values it can translate into
/// responses.
pub struct Pipeline {
    hub: Arc<FrameHub>,
    controller: Arc<DeviceController>,
    notifier: Arc<dyn Notifier>,
    multiplexer: StreamMultiplexer,
}

impl Pipeline {
    /// Wire up the shared state and start the acquisition task. The returned
    /// handle resolves only if capture retries are exhausted.
    pub async fn start(
        config: &Config,
        source: Box<dyn FrameSource>,
        device: Box<dyn OutputDevice>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, JoinHandle<Result<(), PipelineError>>) {
        let hub = Arc::new(FrameHub::new());
        let controller = Arc::new(DeviceController::new(
            device,
            Arc::clone(&notifier),
            &config.device,
        ));
        controller.sync_device().await;

        let detector = MotionDetector::new(&config.motion);
        let handle = AcquisitionLoop::new(
            source,
            detector,
            Arc::clone(&hub),
            Arc::clone(&controller),
            &config.camera,
        )
        .spawn();

        let multiplexer = StreamMultiplexer::new(Arc::clone(&hub), config.preview.clone());
        info!("pipeline started");

        (
            Self {
                hub,
                controller,
                notifier,
                multiplexer,
            },
            handle,
        )
    }

    /// Open a fresh live-preview session.
    pub fn live_preview(&self) -> PreviewStream {
        self.multiplexer.open()
    }

    /// Single preview-resolution frame, for clients that poll instead of
    /// streaming.
    pub fn live_preview_frame(&self) -> Result<Vec<u8>, StreamError> {
        self.multiplexer.latest_preview()
    }

    pub fn motion_status(&self) -> MotionStatus {
        MotionStatus {
            detected: self.hub.read_motion().map(|m| m.detected).unwrap_or(false),
        }
    }

    /// Full-resolution snapshot of the latest frame. Side effects: the
    /// capture flash and one push notification. The snapshot is not cached
    /// and the device controller's commanded state is untouched.
    pub async fn capture_snapshot(&self) -> Result<Vec<u8>, StreamError> {
        let update = self.hub.read_latest().ok_or(StreamError::NoFrame)?;
        let jpeg = encode_full(&update.frame)?;

        Arc::clone(&self.controller).flash().await;

        let (command, auto_mode) = self.controller.current().await;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let message = format!(
            "Snapshot captured at {timestamp}.\nLight: {}\nAuto mode: {}",
            command.friendly_name(),
            if auto_mode { "Enabled" } else { "Disabled" },
        );
        send_detached(&self.notifier, message, "Snapshot".into());

        info!(seq = update.frame.seq, bytes = jpeg.len(), "snapshot captured");
        Ok(jpeg)
    }

    pub async fn set_device_color(&self, red: u8, green: u8, blue: u8) {
        self.controller.set_color(Rgb::new(red, green, blue)).await;
    }

    pub async fn turn_device_off(&self) {
        self.controller.turn_off().await;
    }

    pub async fn toggle_auto_mode(&self) -> bool {
        self.controller.toggle_auto_mode().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::LightCommand;
    use crate::testutil::{
        frame_with_block, recording_device, recording_notifier, settle, solid_frame,
        ScriptedSource,
    };
    use sentinel_cam_common::config::{DeviceConfig, PreviewConfig};
    use sentinel_cam_common::frame::MotionState;

    fn bare_pipeline(auto_mode: bool) -> (Pipeline, crate::testutil::NotifyLog) {
        let (device, _) = recording_device(false);
        let (notifier, sent) = recording_notifier();
        let hub = Arc::new(FrameHub::new());
        let controller = Arc::new(DeviceController::new(
            device,
            Arc::clone(&notifier),
            &DeviceConfig {
                auto_mode,
                ..DeviceConfig::default()
            },
        ));
        let multiplexer = StreamMultiplexer::new(
            Arc::clone(&hub),
            PreviewConfig {
                width: 16,
                height: 12,
                jpeg_quality: 80,
            },
        );
        (
            Pipeline {
                hub,
                controller,
                notifier,
                multiplexer,
            },
            sent,
        )
    }

    fn publish(pipeline: &Pipeline, seq: u64, detected: bool) {
        pipeline.hub.publish(
            solid_frame(seq, 32, 24, (40, 40, 40)),
            MotionState {
                detected,
                frame_seq: seq,
            },
        );
    }

    #[tokio::test]
    async fn snapshot_before_first_frame_is_an_error() {
        let (pipeline, _) = bare_pipeline(true);
        assert!(matches!(
            pipeline.capture_snapshot().await,
            Err(StreamError::NoFrame)
        ));
    }

    #[tokio::test]
    async fn snapshot_returns_jpeg_and_notifies() {
        let (pipeline, sent) = bare_pipeline(false);
        publish(&pipeline, 0, false);

        let jpeg = pipeline.capture_snapshot().await.unwrap();
        settle().await;

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("Snapshot captured at"));
        assert!(sent[0].0.contains("Auto mode: Disabled"));
        assert_eq!(sent[0].1, "Snapshot");
    }

    #[tokio::test]
    async fn snapshot_leaves_pending_auto_transition_intact() {
        let (pipeline, _) = bare_pipeline(true);
        publish(&pipeline, 0, true);
        pipeline.controller.on_motion_transition(true).await;

        pipeline.capture_snapshot().await.unwrap();

        // The motion-driven command survives the snapshot...
        let (command, _) = pipeline.controller.current().await;
        assert_eq!(command, LightCommand::Color(Rgb::new(0, 0, 100)));

        // ...and the clearing transition still lands normally.
        pipeline.controller.on_motion_transition(false).await;
        let (command, _) = pipeline.controller.current().await;
        assert_eq!(command, LightCommand::Off);
    }

    #[tokio::test]
    async fn motion_status_reflects_hub() {
        let (pipeline, _) = bare_pipeline(true);
        assert!(!pipeline.motion_status().detected);
        publish(&pipeline, 0, true);
        assert!(pipeline.motion_status().detected);
    }

    #[tokio::test(start_paused = true)]
    async fn start_wires_capture_through_to_preview() {
        let frames = vec![
            solid_frame(0, 32, 24, (40, 40, 40)),
            frame_with_block(1, 32, 24, 40, 220),
        ];
        let (device, _) = recording_device(false);
        let (notifier, _) = recording_notifier();
        let config = Config {
            preview: PreviewConfig {
                width: 16,
                height: 12,
                jpeg_quality: 80,
            },
            ..Config::default()
        };

        let (pipeline, handle) = Pipeline::start(
            &config,
            Box::new(ScriptedSource::new(frames)),
            device,
            notifier,
        )
        .await;

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let jpeg = pipeline.live_preview_frame().unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert!(pipeline.motion_status().detected);

        assert!(!pipeline.toggle_auto_mode().await);
        assert!(pipeline.toggle_auto_mode().await);

        handle.abort();
    }
}
