use bytes::{Bytes, BytesMut};
use futures_util::stream::Stream;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{RgbImage, RgbaImage};
use sentinel_cam_common::config::PreviewConfig;
use sentinel_cam_common::frame::{Frame, PixelFormat};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::hub::FrameHub;

const BOUNDARY: &[u8] = b"--frame\r\n";
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const SNAPSHOT_QUALITY: u8 = 90;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("no frame published yet")]
    NoFrame,
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

/// Fan-out point for live-preview consumers.
///
/// Opening a stream is cheap and the count is unbounded; every consumer
/// pulls from the hub at its own pace and never coordinates with the
/// producer or with other consumers.
pub struct StreamMultiplexer {
    hub: Arc<FrameHub>,
    config: PreviewConfig,
}

impl StreamMultiplexer {
    pub fn new(hub: Arc<FrameHub>, config: PreviewConfig) -> Self {
        Self { hub, config }
    }

    /// Open an independent consumer session against current hub state.
    pub fn open(&self) -> PreviewStream {
        PreviewStream {
            hub: Arc::clone(&self.hub),
            config: self.config.clone(),
            last_seq: None,
        }
    }

    /// One-off preview encode of the latest frame.
    pub fn latest_preview(&self) -> Result<Vec<u8>, StreamError> {
        let update = self.hub.read_latest().ok_or(StreamError::NoFrame)?;
        encode_preview(&update.frame, &self.config)
    }
}

/// One consumer's lazy, infinite MJPEG part sequence.
///
/// Each pull yields the newest frame not yet served to this consumer,
/// downscaled and wrapped as a self-delimited multipart unit. Frames the
/// consumer was too slow for are skipped, never replayed, so the served
/// sequence numbers are non-decreasing. Not restartable: a fresh session
/// comes from [`StreamMultiplexer::open`].
pub struct PreviewStream {
    hub: Arc<FrameHub>,
    config: PreviewConfig,
    last_seq: Option<u64>,
}

impl PreviewStream {
    /// Wait for a frame newer than the last served one and yield it as one
    /// multipart unit. An encode failure skips that frame for this consumer
    /// only.
    pub async fn next_part(&mut self) -> Bytes {
        loop {
            if let Some(update) = self.hub.read_latest() {
                let seq = update.frame.seq;
                if self.last_seq != Some(seq) {
                    self.last_seq = Some(seq);
                    match encode_preview(&update.frame, &self.config) {
                        Ok(jpeg) => return multipart_part(&jpeg),
                        Err(e) => {
                            warn!(seq, error = %e, "preview encode failed, skipping frame");
                        }
                    }
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Sequence number of the last frame served to this consumer.
    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    /// Adapter for web-layer response bodies.
    pub fn into_stream(self) -> impl Stream<Item = Bytes> {
        futures_util::stream::unfold(self, |mut stream| async move {
            let part = stream.next_part().await;
            Some((part, stream))
        })
    }
}

/// Downscale to the preview resolution and JPEG-encode.
pub fn encode_preview(frame: &Frame, config: &PreviewConfig) -> Result<Vec<u8>, StreamError> {
    let rgb = to_rgb_image(frame)?;
    let resized = if frame.width == config.width && frame.height == config.height {
        rgb
    } else {
        image::imageops::resize(&rgb, config.width, config.height, FilterType::Triangle)
    };
    encode_jpeg(&resized, config.jpeg_quality)
}

/// Full-resolution JPEG encode, used for on-demand snapshots.
pub fn encode_full(frame: &Frame) -> Result<Vec<u8>, StreamError> {
    let rgb = to_rgb_image(frame)?;
    encode_jpeg(&rgb, SNAPSHOT_QUALITY)
}

fn to_rgb_image(frame: &Frame) -> Result<RgbImage, StreamError> {
    match frame.format {
        PixelFormat::Rgb8 => RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| StreamError::Encode("pixel buffer does not match dimensions".into())),
        PixelFormat::Rgba8 => {
            let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
                .ok_or_else(|| {
                    StreamError::Encode("pixel buffer does not match dimensions".into())
                })?;
            Ok(image::DynamicImage::ImageRgba8(rgba).to_rgb8())
        }
    }
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, StreamError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(img)
        .map_err(|e| StreamError::Encode(e.to_string()))?;
    Ok(out)
}

/// Wrap one JPEG as a self-delimited MJPEG multipart unit, so consumers can
/// resynchronize on the boundary after loss.
fn multipart_part(jpeg: &[u8]) -> Bytes {
    let header = format!(
        "Content-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    let mut part = BytesMut::with_capacity(BOUNDARY.len() + header.len() + jpeg.len() + 2);
    part.extend_from_slice(BOUNDARY);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::solid_frame;
    use sentinel_cam_common::frame::MotionState;

    fn preview_config() -> PreviewConfig {
        PreviewConfig {
            width: 16,
            height: 12,
            jpeg_quality: 80,
        }
    }

    fn publish(hub: &FrameHub, seq: u64) {
        hub.publish(
            solid_frame(seq, 32, 24, (40, 40, 40)),
            MotionState {
                detected: false,
                frame_seq: seq,
            },
        );
    }

    #[test]
    fn preview_encode_produces_jpeg() {
        let frame = solid_frame(0, 32, 24, (40, 40, 40));
        let jpeg = encode_preview(&frame, &preview_config()).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let full = encode_full(&frame).unwrap();
        assert_eq!(&full[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn part_is_self_delimited() {
        let part = multipart_part(&[0xFF, 0xD8, 0xFF, 0xD9]);
        assert!(part.starts_with(b"--frame\r\n"));
        assert!(part
            .windows(b"Content-Length: 4".len())
            .any(|w| w == b"Content-Length: 4"));
        assert!(part.ends_with(b"\r\n"));
    }

    #[test]
    fn latest_preview_requires_a_frame() {
        let mux = StreamMultiplexer::new(Arc::new(FrameHub::new()), preview_config());
        assert!(matches!(mux.latest_preview(), Err(StreamError::NoFrame)));
    }

    #[tokio::test(start_paused = true)]
    async fn consumer_skips_to_newest_frame() {
        let hub = Arc::new(FrameHub::new());
        let mux = StreamMultiplexer::new(Arc::clone(&hub), preview_config());
        let mut stream = mux.open();

        publish(&hub, 0);
        stream.next_part().await;
        assert_eq!(stream.last_seq(), Some(0));

        // Two publishes before the next pull: the middle frame is skipped.
        publish(&hub, 1);
        publish(&hub, 2);
        stream.next_part().await;
        assert_eq!(stream.last_seq(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn ten_consumers_see_non_decreasing_seqs() {
        let hub = Arc::new(FrameHub::new());
        let mux = StreamMultiplexer::new(Arc::clone(&hub), preview_config());

        let publisher_hub = Arc::clone(&hub);
        let publisher = tokio::spawn(async move {
            for seq in 0..60u64 {
                publish(&publisher_hub, seq);
                tokio::time::sleep(Duration::from_millis(16)).await;
            }
        });

        let consumers: Vec<_> = (0..10)
            .map(|_| {
                let mut stream = mux.open();
                tokio::spawn(async move {
                    let mut last = 0u64;
                    for _ in 0..10 {
                        stream.next_part().await;
                        let seq = stream.last_seq().unwrap();
                        assert!(seq >= last);
                        last = seq;
                    }
                })
            })
            .collect();

        // The producer side never waits on consumers: it finishes its 60
        // publishes regardless of consumer pace.
        publisher.await.unwrap();
        for c in consumers {
            c.await.unwrap();
        }
    }
}
