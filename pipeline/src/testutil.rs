//! Shared test fakes: scripted camera, recording device, recording notifier.

use futures_util::future::BoxFuture;
use sentinel_cam_common::frame::{Frame, PixelFormat};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::camera::{FrameSource, SourceError};
use crate::device::{DeviceError, OutputDevice, Rgb};
use crate::notify::{Notifier, NotifyError};

pub(crate) type DeviceLog = Arc<Mutex<Vec<Rgb>>>;
pub(crate) type NotifyLog = Arc<Mutex<Vec<(String, String)>>>;

/// Flat RGB frame.
pub(crate) fn solid_frame(seq: u64, width: u32, height: u32, rgb: (u8, u8, u8)) -> Frame {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for _ in 0..width * height {
        data.extend_from_slice(&[rgb.0, rgb.1, rgb.2]);
    }
    Frame::new(width, height, PixelFormat::Rgb8, data, seq, 0).unwrap()
}

/// Flat frame with a bright block over the top-left quarter — far more than
/// 1% changed pixels against a flat baseline.
pub(crate) fn frame_with_block(seq: u64, width: u32, height: u32, base: u8, block: u8) -> Frame {
    let mut frame = solid_frame(seq, width, height, (base, base, base));
    for y in 0..height / 2 {
        for x in 0..width / 2 {
            let i = ((y * width + x) * 3) as usize;
            frame.data[i] = block;
            frame.data[i + 1] = block;
            frame.data[i + 2] = block;
        }
    }
    frame
}

/// Camera fake that plays a fixed list of frames, then fails every capture.
pub(crate) struct ScriptedSource {
    frames: VecDeque<Frame>,
}

impl ScriptedSource {
    pub(crate) fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn capture(&mut self) -> Result<Frame, SourceError> {
        self.frames
            .pop_front()
            .ok_or_else(|| SourceError::Unavailable("script exhausted".into()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Camera fake that always fails.
pub(crate) struct FailingSource;

impl FrameSource for FailingSource {
    fn capture(&mut self) -> Result<Frame, SourceError> {
        Err(SourceError::Unavailable("no camera".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct RecordingDevice {
    writes: DeviceLog,
    fail: bool,
}

impl OutputDevice for RecordingDevice {
    fn write(&mut self, rgb: Rgb) -> Result<(), DeviceError> {
        if self.fail {
            return Err(DeviceError::Write("simulated failure".into()));
        }
        self.writes.lock().unwrap().push(rgb);
        Ok(())
    }
}

/// Output device fake; returns the device and a handle to its write log.
pub(crate) fn recording_device(fail: bool) -> (Box<dyn OutputDevice>, DeviceLog) {
    let writes: DeviceLog = Arc::new(Mutex::new(Vec::new()));
    (
        Box::new(RecordingDevice {
            writes: Arc::clone(&writes),
            fail,
        }),
        writes,
    )
}

struct RecordingNotifier {
    sent: NotifyLog,
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: String, title: String) -> BoxFuture<'static, Result<(), NotifyError>> {
        let sent = Arc::clone(&self.sent);
        Box::pin(async move {
            sent.lock().unwrap().push((message, title));
            Ok(())
        })
    }
}

/// Notifier fake; returns the notifier and a handle to its (message, title)
/// log.
pub(crate) fn recording_notifier() -> (Arc<dyn Notifier>, NotifyLog) {
    let sent: NotifyLog = Arc::new(Mutex::new(Vec::new()));
    (
        Arc::new(RecordingNotifier {
            sent: Arc::clone(&sent),
        }),
        sent,
    )
}

/// Let fire-and-forget notification tasks run to completion on the
/// current-thread test runtime.
pub(crate) async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}
