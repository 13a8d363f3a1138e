//! Per-session reader settings

use serde::{Deserialize, Serialize};

pub const DEFAULT_ZOOM: u16 = 100;
pub const MIN_ZOOM: u16 = 50;
pub const MAX_ZOOM: u16 = 200;
pub const ZOOM_STEP: u16 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomAction {
    In,
    Out,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderSettings {
    /// Zoom in percent
    pub zoom: u16,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self { zoom: DEFAULT_ZOOM }
    }
}

impl ReaderSettings {
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(ZOOM_STEP).max(MIN_ZOOM);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = DEFAULT_ZOOM;
    }

    pub fn apply(&mut self, action: ZoomAction) {
        match action {
            ZoomAction::In => self.zoom_in(),
            ZoomAction::Out => self.zoom_out(),
            ZoomAction::Reset => self.reset_zoom(),
        }
    }
}
