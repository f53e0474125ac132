use chrono::Utc;
use sentinel_cam_common::config::CameraConfig;
use sentinel_cam_common::frame::{Frame, FrameError, PixelFormat};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("camera capability unavailable: {0}")]
    Unavailable(String),
    #[error("camera produced a bad frame: {0}")]
    BadFrame(#[from] FrameError),
}

/// Camera capability interface.
///
/// Only the acquisition loop may call `capture`; nothing else in the
/// pipeline touches the camera.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Result<Frame, SourceError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Deterministic test-pattern source, used when no camera hardware is
/// present and as the basis of pipeline tests.
///
/// Renders a flat gray field with a bright square that jumps to a new
/// position every `MOVE_PERIOD` frames, so the motion detector sees a
/// realistic alternation of static and changing scenes.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    seq: u64,
}

const BACKGROUND: u8 = 32;
const BLOCK_VALUE: u8 = 220;
const MOVE_PERIOD: u64 = 90;

impl SyntheticSource {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            seq: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn capture(&mut self) -> Result<Frame, SourceError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let mut data = vec![BACKGROUND; w * h * 3];

        // Block position changes only at period boundaries; frames within a
        // period are identical so the scene reads as static.
        let slot = self.seq / MOVE_PERIOD;
        let block = (w / 8).max(1);
        let x0 = (slot as usize * block * 3) % w.saturating_sub(block).max(1);
        let y0 = (slot as usize * block) % h.saturating_sub(block).max(1);
        for y in y0..(y0 + block).min(h) {
            for x in x0..(x0 + block).min(w) {
                let i = (y * w + x) * 3;
                data[i] = BLOCK_VALUE;
                data[i + 1] = BLOCK_VALUE;
                data[i + 2] = BLOCK_VALUE;
            }
        }

        let frame = Frame::new(
            self.width,
            self.height,
            PixelFormat::Rgb8,
            data,
            self.seq,
            Utc::now().timestamp_millis(),
        )?;
        self.seq += 1;
        Ok(frame)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
