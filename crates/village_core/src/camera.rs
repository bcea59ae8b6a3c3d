//! Camera zoom and viewport culling.
//!
//! The camera is centred on the house. It zooms out as the village grows
//! so that enemy spawns (placed just outside the view) keep their distance.

use serde::{Deserialize, Serialize};

use crate::math::DVec2;

/// Structure count below which the camera stays at full zoom.
const ZOOM_START: usize = 20;

/// Structures over [`ZOOM_START`] needed to reach minimum zoom.
const ZOOM_SPAN: f64 = 80.0;

/// Smallest zoom scale.
const MAX_ZOOM_OUT: f64 = 0.5;

/// Easing rate towards the target zoom, per second.
const ZOOM_EASE: f64 = 2.0;

/// Extra world units kept around the visible area when culling.
pub const CULL_PADDING: f64 = 100.0;

/// Target zoom scale for a village of `structures` turrets and buildings.
#[must_use]
pub fn target_zoom(structures: usize) -> f64 {
    if structures <= ZOOM_START {
        return 1.0;
    }
    let progress = ((structures - ZOOM_START) as f64 / ZOOM_SPAN).min(1.0);
    1.0 - progress.sqrt() * MAX_ZOOM_OUT
}

/// Axis-aligned world rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Lower-left corner.
    pub min: DVec2,
    /// Upper-right corner.
    pub max: DVec2,
}

impl Viewport {
    /// Whether a circle overlaps the rectangle.
    #[must_use]
    pub fn overlaps(&self, center: DVec2, radius: f64) -> bool {
        center.x + radius > self.min.x
            && center.x - radius < self.max.x
            && center.y + radius > self.min.y
            && center.y - radius < self.max.y
    }
}

/// Zoom state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World point at the middle of the screen.
    pub center: DVec2,
    /// Current scale; 1.0 is fully zoomed in.
    pub zoom: f64,
}

impl Camera {
    /// Camera at full zoom over `center`.
    #[must_use]
    pub const fn new(center: DVec2) -> Self {
        Self { center, zoom: 1.0 }
    }

    /// Ease the zoom towards the target for `structures`.
    pub fn update(&mut self, structures: usize, dt: f64) {
        let target = target_zoom(structures);
        self.zoom += (target - self.zoom) * ZOOM_EASE * dt;
    }

    /// Visible world rectangle for a `width`×`height` screen, padded for culling.
    #[must_use]
    pub fn viewport(&self, width: f64, height: f64) -> Viewport {
        let half = DVec2::new(width / 2.0, height / 2.0) / self.zoom;
        let pad = DVec2::new(CULL_PADDING, CULL_PADDING);
        Viewport {
            min: self.center - half - pad,
            max: self.center + half + pad,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DVec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_zoom_curve() {
        assert_eq!(target_zoom(0), 1.0);
        assert_eq!(target_zoom(20), 1.0);
        assert!((target_zoom(40) - (1.0 - 0.5 * 0.25f64.sqrt())).abs() < 1e-12);
        assert_eq!(target_zoom(100), 0.5);
        assert_eq!(target_zoom(500), 0.5);
    }

    #[test]
    fn test_zoom_eases() {
        let mut camera = Camera::default();
        camera.update(100, 0.1);
        assert!(camera.zoom < 1.0 && camera.zoom > 0.5);
        for _ in 0..1000 {
            camera.update(100, 0.1);
        }
        assert!((camera.zoom - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_viewport_culling() {
        let camera = Camera::default();
        let view = camera.viewport(1280.0, 720.0);
        assert!(view.overlaps(DVec2::new(700.0, 0.0), 10.0));
        assert!(!view.overlaps(DVec2::new(800.0, 0.0), 10.0));

        let zoomed_out = Camera {
            zoom: 0.5,
            ..Camera::default()
        };
        assert!(zoomed_out.viewport(1280.0, 720.0).overlaps(DVec2::new(1300.0, 0.0), 10.0));
    }
}
