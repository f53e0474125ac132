/// Pixel layout of a raw camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 24-bit RGB.
    Rgb8,
    /// Packed 32-bit RGBA (alpha/padding byte ignored).
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// One captured camera frame.
///
/// Immutable once constructed: the acquisition loop builds a frame per cycle,
/// publishes it, and never touches it again. Consumers share it behind an
/// `Arc` and must not mutate it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    /// Monotonic sequence number assigned by the producer.
    pub seq: u64,
    /// Capture timestamp, Unix millis.
    pub captured_at_ms: i64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        seq: u64,
        captured_at_ms: i64,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                got: data.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
            seq,
            captured_at_ms,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Grayscale plane of this frame, one byte per pixel.
    ///
    /// Integer BT.601 weights (77/150/29, >>8) — close enough for
    /// frame-differencing, no float work in the hot path.
    pub fn luma(&self) -> Vec<u8> {
        let bpp = self.format.bytes_per_pixel();
        self.data
            .chunks_exact(bpp)
            .map(|px| {
                let r = px[0] as u32;
                let g = px[1] as u32;
                let b = px[2] as u32;
                ((77 * r + 150 * g + 29 * b) >> 8) as u8
            })
            .collect()
    }
}

/// Motion decision derived from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionState {
    pub detected: bool,
    /// Sequence number of the frame this decision was computed from.
    pub frame_seq: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame buffer size mismatch: got {got} bytes, expected {expected}")]
    SizeMismatch { got: usize, expected: usize },
}
