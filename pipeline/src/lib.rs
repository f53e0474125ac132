pub mod acquisition;
pub mod api;
pub mod camera;
pub mod detector;
pub mod device;
pub mod hub;
pub mod notify;
pub mod stream;

pub use acquisition::{AcquisitionLoop, PipelineError};
pub use api::{MotionStatus, Pipeline};
pub use camera::{FrameSource, SourceError, SyntheticSource};
pub use detector::MotionDetector;
pub use device::{DeviceController, DeviceError, LightCommand, OutputDevice, Rgb};
pub use hub::{FrameHub, FrameUpdate};
pub use notify::{Notifier, NotifyError};
pub use stream::{PreviewStream, StreamError, StreamMultiplexer};

#[cfg(test)]
pub(crate) mod testutil;
