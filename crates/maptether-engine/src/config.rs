#![forbid(unsafe_code)]

//! Engine tunables.

use maptether_core::geo::PixelSize;
use web_time::Duration;

use crate::gesture::GestureConfig;

/// Thresholds, margins, and caps for the overlay engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pointer gesture thresholds.
    pub gesture: GestureConfig,
    /// Dimensions a panel opens with before any user resize.
    pub default_panel_size: PixelSize,
    /// Collapsed height used for bounds math while a panel is minimized.
    pub minimized_height_px: f64,
    /// Inset from the true viewport boundary for edge arrangement.
    pub edge_margin_px: f64,
    /// Minimum separation distance used by the overlap-avoidance fallback.
    pub min_separation_px: f64,
    /// Radial arrangement radius as a fraction of the shorter viewport side.
    pub radial_radius_fraction: f64,
    /// Above this many panels, edge arrangement skips crossing checks and
    /// places by nearest edge only.
    pub crossing_check_limit: usize,
    /// How long tether redraws continue after a zoom gesture ends, covering
    /// the host map's post-zoom animation.
    pub zoom_settle: Duration,
    /// Maximum retained named snapshots; oldest evicted first.
    pub max_snapshots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            default_panel_size: PixelSize::new(260.0, 180.0),
            minimized_height_px: 32.0,
            edge_margin_px: 10.0,
            min_separation_px: 30.0,
            radial_radius_fraction: 0.3,
            crossing_check_limit: 50,
            zoom_settle: Duration::from_millis(200),
            max_snapshots: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!(config.default_panel_size.width > 0.0);
        assert!(config.minimized_height_px < config.default_panel_size.height);
        assert!(config.radial_radius_fraction > 0.0 && config.radial_radius_fraction < 1.0);
        assert!(config.max_snapshots > 0);
    }
}
