//! Road-load resistance forces
//!
//! Pure functions over speed, slope, and vehicle constants.

/// Air density at sea level [kg/m^3]
pub const AIR_DENSITY: f64 = 1.2041;

/// Gravitational acceleration [m/s^2]
pub const GRAVITY: f64 = 9.81;

/// Combined drag coefficient 0.5 * rho * cd * A for a given drag
/// coefficient and frontal area [m^2].
pub fn drag_coefficient(cd: f64, frontal_area: f64) -> f64 {
    0.5 * AIR_DENSITY * cd * frontal_area
}

/// Aerodynamic drag force at the given speed [N]
pub fn drag_force(drag_coefficient: f64, speed: f64) -> f64 {
    drag_coefficient * speed * speed
}

/// Rolling resistance force on a slope [N]
pub fn rolling_force(rolling_coefficient: f64, mass: f64, alpha: f64) -> f64 {
    rolling_coefficient * mass * GRAVITY * alpha.cos()
}

/// Downhill-negative gravity component along the road [N]
pub fn slope_force(mass: f64, alpha: f64) -> f64 {
    mass * GRAVITY * alpha.sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_grows_with_speed_squared() {
        let c = drag_coefficient(0.3, 2.0);
        assert!((c - 0.5 * AIR_DENSITY * 0.6).abs() < 1e-12);
        assert!((drag_force(c, 20.0) - 4.0 * drag_force(c, 10.0)).abs() < 1e-9);
    }

    #[test]
    fn slope_force_signed() {
        // uphill costs, downhill pushes
        assert!(slope_force(1500.0, 0.05) > 0.0);
        assert!(slope_force(1500.0, -0.05) < 0.0);
        assert_eq!(slope_force(1500.0, 0.0), 0.0);
    }

    #[test]
    fn rolling_force_flat_vs_slope() {
        let flat = rolling_force(0.015, 1500.0, 0.0);
        let hill = rolling_force(0.015, 1500.0, 0.3);
        assert!((flat - 0.015 * 1500.0 * GRAVITY).abs() < 1e-9);
        assert!(hill < flat);
    }
}
