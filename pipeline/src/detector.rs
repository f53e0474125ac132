use sentinel_cam_common::config::MotionConfig;
use sentinel_cam_common::frame::{Frame, MotionState};
use tracing::debug;

struct Reference {
    luma: Vec<u8>,
    width: u32,
    height: u32,
}

/// Frame-differencing motion detector.
///
/// Compares each frame's grayscale plane against a rolling reference plane:
/// pixels whose absolute delta exceeds `diff_threshold` count as changed, and
/// motion is declared when the changed fraction exceeds `min_changed_ratio`.
///
/// The reference is re-seeded every `reference_refresh_frames` cycles
/// regardless of the detection outcome — often enough to track slow lighting
/// drift, rarely enough that genuine motion is not absorbed into the
/// baseline. Pure with respect to its inputs: no I/O, no device access.
pub struct MotionDetector {
    diff_threshold: u8,
    min_changed_ratio: f64,
    refresh_interval: u64,
    reference: Option<Reference>,
    frames_since_refresh: u64,
}

impl MotionDetector {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            diff_threshold: config.diff_threshold,
            min_changed_ratio: config.min_changed_ratio,
            refresh_interval: config.reference_refresh_frames.max(1),
            reference: None,
            frames_since_refresh: 0,
        }
    }

    /// Classify one frame. First frame (and any dimension change) seeds the
    /// reference and reports no motion.
    pub fn process(&mut self, frame: &Frame) -> MotionState {
        let luma = frame.luma();

        let reference = match &self.reference {
            Some(r) if r.width == frame.width && r.height == frame.height => r,
            _ => {
                self.seed(luma, frame);
                return MotionState {
                    detected: false,
                    frame_seq: frame.seq,
                };
            }
        };

        let changed = luma
            .iter()
            .zip(reference.luma.iter())
            .filter(|(a, b)| a.abs_diff(**b) > self.diff_threshold)
            .count();
        let ratio = changed as f64 / frame.pixel_count() as f64;
        let detected = ratio > self.min_changed_ratio;

        debug!(
            seq = frame.seq,
            changed,
            ratio = format!("{:.4}", ratio),
            detected,
            "motion comparison"
        );

        self.frames_since_refresh += 1;
        if self.frames_since_refresh >= self.refresh_interval {
            self.seed(luma, frame);
        }

        MotionState {
            detected,
            frame_seq: frame.seq,
        }
    }

    fn seed(&mut self, luma: Vec<u8>, frame: &Frame) {
        debug!(seq = frame.seq, "re-seeding reference frame");
        self.reference = Some(Reference {
            luma,
            width: frame.width,
            height: frame.height,
        });
        self.frames_since_refresh = 0;
    }
}
