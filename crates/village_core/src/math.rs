//! Geometry helpers for the simulation.
//!
//! World coordinates are `f64` vectors ([`glam::DVec2`]). Balance formulas
//! (enemy power, craft difficulty) depend on exact float results, so the
//! whole core stays in double precision.

pub use glam::DVec2;

/// Full turn in radians.
pub const TAU: f64 = std::f64::consts::TAU;

/// Bearing in radians from `from` to `to` (`atan2` convention).
#[must_use]
pub fn bearing(from: DVec2, to: DVec2) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Offset of length `distance` along `angle`.
#[must_use]
pub fn polar(angle: f64, distance: f64) -> DVec2 {
    DVec2::new(angle.cos() * distance, angle.sin() * distance)
}

/// Unit vector from `from` towards `to`.
///
/// Returns `None` when the two points coincide, so callers skip movement
/// instead of dividing by zero.
#[must_use]
pub fn direction(from: DVec2, to: DVec2) -> Option<DVec2> {
    let delta = to - from;
    let length = delta.length();
    if length > 0.0 {
        Some(delta / length)
    } else {
        None
    }
}

/// Move `position` towards `target` by `speed * dt`. No-op at zero distance.
pub fn step_towards(position: &mut DVec2, target: DVec2, speed: f64, dt: f64) {
    if let Some(dir) = direction(*position, target) {
        *position += dir * speed * dt;
    }
}

/// Snap a coordinate to the centre of a `cell` sized grid line.
#[must_use]
pub fn snap_to_grid(point: DVec2, cell: f64) -> DVec2 {
    DVec2::new((point.x / cell).round() * cell, (point.y / cell).round() * cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearing_quadrants() {
        let origin = DVec2::ZERO;
        assert!((bearing(origin, DVec2::new(1.0, 0.0))).abs() < 1e-12);
        assert!((bearing(origin, DVec2::new(0.0, 1.0)) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_direction_zero_distance() {
        let p = DVec2::new(5.0, 5.0);
        assert!(direction(p, p).is_none());

        let mut moved = p;
        step_towards(&mut moved, p, 100.0, 1.0);
        assert_eq!(moved, p);
    }

    #[test]
    fn test_direction_is_unit_length() {
        let dir = direction(DVec2::ZERO, DVec2::new(3.0, 4.0)).unwrap();
        assert!((dir.length() - 1.0).abs() < 1e-12);
        assert!((dir.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_snap_to_grid() {
        let snapped = snap_to_grid(DVec2::new(74.0, -26.0), 50.0);
        assert_eq!(snapped, DVec2::new(50.0, -50.0));
    }

    #[test]
    fn test_polar() {
        let v = polar(0.0, 10.0);
        assert!((v.x - 10.0).abs() < 1e-12);
        assert!(v.y.abs() < 1e-12);
    }
}
