use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Frame source driver: currently only "synthetic".
    #[serde(default = "default_camera_source")]
    pub source: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Target acquisition cadence, cycles per second.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Consecutive capture failures tolerated before the pipeline gives up.
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionConfig {
    /// Per-pixel grayscale delta that counts as "changed".
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: u8,
    /// Fraction of changed pixels above which motion is declared.
    #[serde(default = "default_min_changed_ratio")]
    pub min_changed_ratio: f64,
    /// Reference frame is re-seeded every this many cycles, independent of
    /// detection decisions, to absorb slow lighting drift.
    #[serde(default = "default_reference_refresh")]
    pub reference_refresh_frames: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_width")]
    pub width: u32,
    #[serde(default = "default_preview_height")]
    pub height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Output device driver: currently only "log".
    #[serde(default = "default_device_driver")]
    pub driver: String,
    /// Whether motion drives the light at startup.
    #[serde(default = "default_auto_mode")]
    pub auto_mode: bool,
    /// Color applied when motion is detected in auto mode, percent RGB.
    #[serde(default = "default_motion_color")]
    pub motion_color: [u8; 3],
    /// Duration of the white capture flash, seconds.
    #[serde(default = "default_flash_secs")]
    pub flash_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_endpoint")]
    pub endpoint: String,
    /// Push service credentials; notifications are disabled when empty.
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub user_key: String,
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: default_camera_source(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            max_consecutive_failures: default_max_failures(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            diff_threshold: default_diff_threshold(),
            min_changed_ratio: default_min_changed_ratio(),
            reference_refresh_frames: default_reference_refresh(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: default_preview_width(),
            height: default_preview_height(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            driver: default_device_driver(),
            auto_mode: default_auto_mode(),
            motion_color: default_motion_color(),
            flash_secs: default_flash_secs(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_notify_endpoint(),
            api_token: String::new(),
            user_key: String::new(),
            timeout_secs: default_notify_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_camera_source() -> String {
    "synthetic".into()
}
fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}
fn default_fps() -> f64 {
    60.0
}
fn default_max_failures() -> u32 {
    120
}
fn default_diff_threshold() -> u8 {
    25
}
fn default_min_changed_ratio() -> f64 {
    0.01
}
fn default_reference_refresh() -> u64 {
    60
}
fn default_preview_width() -> u32 {
    1280
}
fn default_preview_height() -> u32 {
    720
}
fn default_jpeg_quality() -> u8 {
    80
}
fn default_device_driver() -> String {
    "log".into()
}
fn default_auto_mode() -> bool {
    true
}
fn default_motion_color() -> [u8; 3] {
    // Blue, percent intensities.
    [0, 0, 100]
}
fn default_flash_secs() -> u64 {
    2
}
fn default_notify_endpoint() -> String {
    "https://api.pushover.net/1/messages.json".into()
}
fn default_notify_timeout() -> u64 {
    5
}
fn default_log_level() -> String {
    "info".into()
}
