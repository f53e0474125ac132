use sentinel_cam_common::config::CameraConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::camera::FrameSource;
use crate::detector::MotionDetector;
use crate::device::DeviceController;
use crate::hub::FrameHub;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("camera failed {attempts} consecutive capture attempts, giving up")]
    SourceExhausted { attempts: u32 },
}

/// The single frame producer.
///
/// Owns the camera capability and the motion detector exclusively; runs for
/// the process lifetime once spawned. Each cycle captures one frame, runs
/// detection, publishes the (frame, motion) pair atomically to the hub, and
/// forwards motion edges to the device controller. A cycle that overruns its
/// budget just slows the loop down — there is no skip/drop logic beyond
/// "latest wins" at the hub.
pub struct AcquisitionLoop {
    source: Box<dyn FrameSource>,
    detector: MotionDetector,
    hub: Arc<FrameHub>,
    controller: Arc<DeviceController>,
    cycle: Duration,
    max_consecutive_failures: u32,
}

impl AcquisitionLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: MotionDetector,
        hub: Arc<FrameHub>,
        controller: Arc<DeviceController>,
        config: &CameraConfig,
    ) -> Self {
        Self {
            source,
            detector,
            hub,
            controller,
            cycle: Duration::from_secs_f64(1.0 / config.fps.max(1.0)),
            max_consecutive_failures: config.max_consecutive_failures.max(1),
        }
    }

    /// Start the long-lived producer task. The handle resolves only if the
    /// camera is declared exhausted.
    pub fn spawn(self) -> JoinHandle<Result<(), PipelineError>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<(), PipelineError> {
        info!(
            source = self.source.name(),
            cycle_ms = self.cycle.as_millis() as u64,
            "acquisition loop started"
        );

        let mut ticker = tokio::time::interval(self.cycle);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut consecutive_failures: u32 = 0;
        let mut last_detected = false;

        loop {
            ticker.tick().await;

            let frame = match self.source.capture() {
                Ok(f) => f,
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        error = %e,
                        consecutive_failures,
                        "frame capture failed, retrying next cycle"
                    );
                    if consecutive_failures >= self.max_consecutive_failures {
                        error!(
                            attempts = consecutive_failures,
                            "camera capture retries exhausted, terminating pipeline"
                        );
                        return Err(PipelineError::SourceExhausted {
                            attempts: consecutive_failures,
                        });
                    }
                    continue;
                }
            };
            consecutive_failures = 0;

            let motion = self.detector.process(&frame);
            let detected = motion.detected;
            debug!(seq = frame.seq, detected, "publishing frame");
            self.hub.publish(frame, motion);

            if detected != last_detected {
                info!(detected, "motion transition");
                self.controller.on_motion_transition(detected).await;
                last_detected = detected;
            }
        }
    }
}
