use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Viewport widths below this are treated as touch-primary.
pub const DEFAULT_BREAKPOINT: u32 = 640;

/// Which interaction path is active: hover previews or direct taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    #[default]
    Pointer,
    Touch,
}

impl DeviceMode {
    pub fn from_viewport_width(width: u32, breakpoint: u32) -> Self {
        if width < breakpoint {
            DeviceMode::Touch
        } else {
            DeviceMode::Pointer
        }
    }

    pub fn supports_hover(self) -> bool {
        matches!(self, DeviceMode::Pointer)
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMode::Pointer => write!(f, "pointer"),
            DeviceMode::Touch => write!(f, "touch"),
        }
    }
}

/// Width breakpoint signal. Feed it viewport widths as they change and it
/// reports when the device mode flips.
#[derive(Debug, Clone)]
pub struct MediaQuery {
    breakpoint: u32,
    mode: DeviceMode,
}

impl MediaQuery {
    pub fn new(viewport_width: u32) -> Self {
        Self::with_breakpoint(viewport_width, DEFAULT_BREAKPOINT)
    }

    pub fn with_breakpoint(viewport_width: u32, breakpoint: u32) -> Self {
        Self {
            breakpoint,
            mode: DeviceMode::from_viewport_width(viewport_width, breakpoint),
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn breakpoint(&self) -> u32 {
        self.breakpoint
    }

    /// Returns the new mode only when it differs from the previous one.
    pub fn update(&mut self, viewport_width: u32) -> Option<DeviceMode> {
        let next = DeviceMode::from_viewport_width(viewport_width, self.breakpoint);
        if next == self.mode {
            return None;
        }
        debug!(from = %self.mode, to = %next, viewport_width, "device mode changed");
        self.mode = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_boundary() {
        assert_eq!(DeviceMode::from_viewport_width(639, 640), DeviceMode::Touch);
        assert_eq!(DeviceMode::from_viewport_width(640, 640), DeviceMode::Pointer);
    }

    #[test]
    fn update_reports_only_flips() {
        let mut query = MediaQuery::new(1280);
        assert_eq!(query.mode(), DeviceMode::Pointer);
        assert_eq!(query.update(1000), None);
        assert_eq!(query.update(400), Some(DeviceMode::Touch));
        assert_eq!(query.update(380), None);
        assert_eq!(query.update(800), Some(DeviceMode::Pointer));
    }
}
