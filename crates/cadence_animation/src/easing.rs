//! Easing curves for animations
//!
//! Every curve is a unit cubic bezier with fixed endpoints (0,0) and (1,1),
//! described by its two inner control points in CSS order.

use serde::{Deserialize, Serialize};

/// Number of bisection steps used to invert the horizontal component.
const BISECTION_STEPS: usize = 8;

/// A unit cubic bezier easing curve
///
/// `evaluate` maps normalized time to a normalized value. The result may leave
/// `[0, 1]` for overshoot curves (elastic/bounce style control points).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    /// Straight line
    pub const LINEAR: CubicBezier = CubicBezier::new(0.0, 0.0, 1.0, 1.0);

    /// Default curve for freshly staged runs
    pub const EASE_IN_OUT_CUBIC: CubicBezier = CubicBezier::new(0.645, 0.045, 0.355, 1.0);

    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Evaluate the curve at normalized time `x`.
    ///
    /// `x` is clamped to `[0, 1]`; the endpoints are exact. In between, the
    /// curve parameter is found by bounded bisection, which is plenty for
    /// frame-rate animation and never diverges on steep or flat segments.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x.is_nan() || x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let mut lo = 0.0_f64;
        let mut hi = 1.0_f64;
        let mut t = x;
        for _ in 0..BISECTION_STEPS {
            if bezier_sample(t, self.x1, self.x2) < x {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }

        bezier_sample(t, self.y1, self.y2)
    }

    /// True when all coordinates are finite and both x coordinates lie in
    /// `[0, 1]`, which keeps the horizontal component monotonic.
    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && (0.0..=1.0).contains(&self.x1)
            && (0.0..=1.0).contains(&self.x2)
    }
}

impl Default for CubicBezier {
    fn default() -> Self {
        Self::EASE_IN_OUT_CUBIC
    }
}

impl From<[f64; 4]> for CubicBezier {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<CubicBezier> for [f64; 4] {
    fn from(curve: CubicBezier) -> Self {
        [curve.x1, curve.y1, curve.x2, curve.y2]
    }
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    // Horner form: ((1-3p2+3p1)t + 3p2-6p1)t + 3p1) * t
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact() {
        let curve = CubicBezier::new(0.68, -0.55, 0.265, 1.55);
        assert_eq!(curve.evaluate(0.0), 0.0);
        assert_eq!(curve.evaluate(1.0), 1.0);
        assert_eq!(curve.evaluate(-3.0), 0.0);
        assert_eq!(curve.evaluate(7.5), 1.0);
        assert_eq!(curve.evaluate(f64::NAN), 0.0);
    }

    #[test]
    fn test_linear_tracks_input() {
        for i in 1..20 {
            let x = i as f64 / 20.0;
            let y = CubicBezier::LINEAR.evaluate(x);
            assert!((y - x).abs() < 0.01, "x={x} y={y}");
        }
    }

    #[test]
    fn test_monotonic_for_standard_curve() {
        let curve = CubicBezier::EASE_IN_OUT_CUBIC;
        let mut prev = 0.0;
        for i in 1..=50 {
            let y = curve.evaluate(i as f64 / 50.0);
            // Eight bisection steps bound the parameter error to ~0.004
            assert!(y + 0.01 >= prev, "dipped at step {i}: {prev} -> {y}");
            prev = y;
        }
        // Slow start, slow end
        assert!(curve.evaluate(0.1) < 0.1);
        assert!(curve.evaluate(0.9) > 0.9);
    }

    #[test]
    fn test_overshoot_is_not_clamped() {
        // Back-style curve dips below zero early and overshoots one late
        let curve = CubicBezier::new(0.68, -0.55, 0.265, 1.55);
        assert!(curve.evaluate(0.1) < 0.0);
        assert!(curve.evaluate(0.85) > 1.0);
    }

    #[test]
    fn test_well_formed() {
        assert!(CubicBezier::LINEAR.is_well_formed());
        assert!(CubicBezier::new(0.68, -0.55, 0.265, 1.55).is_well_formed());
        assert!(!CubicBezier::new(1.5, 0.0, 0.5, 1.0).is_well_formed());
        assert!(!CubicBezier::new(0.5, f64::INFINITY, 0.5, 1.0).is_well_formed());
    }

    #[test]
    fn test_array_conversion() {
        let curve: CubicBezier = [0.25, 0.46, 0.45, 0.94].into();
        assert_eq!(curve, CubicBezier::new(0.25, 0.46, 0.45, 0.94));
        let raw: [f64; 4] = curve.into();
        assert_eq!(raw, [0.25, 0.46, 0.45, 0.94]);
    }
}
