use sentinel_cam_common::config::DeviceConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::notify::{send_detached, Notifier};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device write failed: {0}")]
    Write(String),
}

/// RGB intensity triple, percent per channel (0–100, clamped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

pub const WHITE: Rgb = Rgb {
    red: 100,
    green: 100,
    blue: 100,
};
pub const DARK: Rgb = Rgb {
    red: 0,
    green: 0,
    blue: 0,
};

impl Rgb {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red.min(100),
            green: green.min(100),
            blue: blue.min(100),
        }
    }

    /// Human-readable label for the preset colors, used in notifications.
    pub fn friendly_name(&self) -> String {
        match (self.red, self.green, self.blue) {
            (0, 0, 100) => "Blue".into(),
            (50, 0, 50) => "Violet".into(),
            (0, 100, 0) => "Green".into(),
            (100, 0, 0) => "Red".into(),
            (100, 100, 0) => "Yellow".into(),
            (100, 100, 100) => "White".into(),
            (0, 0, 0) => "Off".into(),
            (r, g, b) => format!("Custom ({r}%, {g}%, {b}%)"),
        }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(v: [u8; 3]) -> Self {
        Rgb::new(v[0], v[1], v[2])
    }
}

/// The commanded logical state of the light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
    Color(Rgb),
    Off,
}

impl LightCommand {
    pub fn rgb(&self) -> Rgb {
        match self {
            LightCommand::Color(c) => *c,
            LightCommand::Off => DARK,
        }
    }

    pub fn friendly_name(&self) -> String {
        self.rgb().friendly_name()
    }
}

/// Physical light capability interface.
pub trait OutputDevice: Send {
    fn write(&mut self, rgb: Rgb) -> Result<(), DeviceError>;
}

/// Output device that only logs writes, for running without LED hardware.
pub struct LogDevice;

impl OutputDevice for LogDevice {
    fn write(&mut self, rgb: Rgb) -> Result<(), DeviceError> {
        info!(red = rgb.red, green = rgb.green, blue = rgb.blue, "light write");
        Ok(())
    }
}

struct ControllerState {
    command: LightCommand,
    auto_mode: bool,
    device: Box<dyn OutputDevice>,
}

impl ControllerState {
    /// Push `rgb` to the hardware. A write failure is logged and the logical
    /// state still advances; the device may lag reality until the next
    /// successful write.
    fn apply(&mut self, rgb: Rgb) {
        if let Err(e) = self.device.write(rgb) {
            error!(error = %e, "device write failed, keeping logical state");
        }
    }
}

/// Single source of truth for the light's commanded state.
///
/// Every transition — manual command, auto-mode motion edge, capture flash —
/// runs under one mutex, so a manual command and a concurrent motion
/// transition can never interleave their state update and device write.
/// Notifications go out fire-and-forget on the shared path and always carry
/// the auto-mode flag so the recipient can tell manual from auto cause.
pub struct DeviceController {
    state: Mutex<ControllerState>,
    notifier: Arc<dyn Notifier>,
    motion_color: Rgb,
    flash_duration: Duration,
}

impl DeviceController {
    pub fn new(
        device: Box<dyn OutputDevice>,
        notifier: Arc<dyn Notifier>,
        config: &DeviceConfig,
    ) -> Self {
        Self {
            state: Mutex::new(ControllerState {
                command: LightCommand::Off,
                auto_mode: config.auto_mode,
                device,
            }),
            notifier,
            motion_color: Rgb::from(config.motion_color),
            flash_duration: Duration::from_secs(config.flash_secs),
        }
    }

    /// Write the current commanded color to the hardware without changing
    /// state or notifying. Called once at startup.
    pub async fn sync_device(&self) {
        let mut state = self.state.lock().await;
        let rgb = state.command.rgb();
        state.apply(rgb);
    }

    /// Manual color command. Honored regardless of auto mode and does not
    /// change it.
    pub async fn set_color(&self, rgb: Rgb) {
        let mut state = self.state.lock().await;
        state.command = LightCommand::Color(rgb);
        state.apply(rgb);
        let auto = state.auto_mode;
        drop(state);
        info!(color = rgb.friendly_name(), auto, "light set manually");
        self.notify_command(LightCommand::Color(rgb), auto);
    }

    /// Manual off command. Honored regardless of auto mode and does not
    /// change it.
    pub async fn turn_off(&self) {
        let mut state = self.state.lock().await;
        state.command = LightCommand::Off;
        state.apply(DARK);
        let auto = state.auto_mode;
        drop(state);
        info!(auto, "light turned off manually");
        self.notify_command(LightCommand::Off, auto);
    }

    /// Flip auto mode. The color/off command is left as is; no device write,
    /// no notification.
    pub async fn toggle_auto_mode(&self) -> bool {
        let mut state = self.state.lock().await;
        state.auto_mode = !state.auto_mode;
        let auto = state.auto_mode;
        drop(state);
        info!(auto, "auto mode toggled");
        auto
    }

    /// Motion edge from the acquisition loop. Ignored unless auto mode is
    /// on; otherwise motion drives the preset color and clearing motion
    /// drives off, through the same notification path as manual commands.
    pub async fn on_motion_transition(&self, detected: bool) {
        let mut state = self.state.lock().await;
        if !state.auto_mode {
            return;
        }
        let command = if detected {
            LightCommand::Color(self.motion_color)
        } else {
            LightCommand::Off
        };
        state.command = command;
        state.apply(command.rgb());
        drop(state);
        info!(detected, color = command.friendly_name(), "auto light transition");
        self.notify_command(command, true);
    }

    /// Capture flash: white immediately, commanded color restored after the
    /// configured duration. The logical command never changes, so a motion
    /// transition landing mid-flash wins as soon as the flash expires.
    pub async fn flash(self: Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            state.apply(WHITE);
        }
        tokio::spawn(async move {
            tokio::time::sleep(self.flash_duration).await;
            let mut state = self.state.lock().await;
            let rgb = state.command.rgb();
            state.apply(rgb);
        });
    }

    /// Snapshot of (command, auto_mode) for status and notification text.
    pub async fn current(&self) -> (LightCommand, bool) {
        let state = self.state.lock().await;
        (state.command, state.auto_mode)
    }

    fn notify_command(&self, command: LightCommand, auto_mode: bool) {
        let auto = if auto_mode { "Enabled" } else { "Disabled" };
        let message = match command {
            LightCommand::Off => format!("Light turned off (Off).\nAuto mode: {auto}"),
            LightCommand::Color(c) => {
                format!("Light set to {}.\nAuto mode: {auto}", c.friendly_name())
            }
        };
        send_detached(&self.notifier, message, "Light Status".into());
    }
}
