//! Variable-width outline for freehand strokes.
//!
//! Input points are streamlined towards the pointer, pressure is simulated from pointer
//! velocity, and the polygon formed by offsetting each point along its normal is capped with
//! half circles at both ends.

use kurbo::{BezPath, Point, Vec2};
use std::f64::consts::PI;

/// How quickly simulated pressure follows the pointer speed.
const PRESSURE_RATE: f64 = 0.275;

/// Segments used for each round cap.
const CAP_STEPS: usize = 8;

/// Shape parameters for [`stroke_outline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeOptions {
    /// Base diameter of the stroke.
    pub size: f64,
    /// How much pressure narrows the stroke, `0.0..=1.0`.
    pub thinning: f64,
    /// How strongly points lag behind the pointer, `0.0..=1.0`.
    pub streamline: f64,
    pub simulate_pressure: bool,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            thinning: 0.5,
            streamline: 0.5,
            simulate_pressure: true,
        }
    }
}

impl StrokeOptions {
    pub fn with_size(size: f64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    fn radius(&self, pressure: f64) -> f64 {
        (self.size * (0.5 - self.thinning * (0.5 - pressure))).max(0.0)
    }
}

/// Outline polygon around `points`. Empty input gives an empty outline.
pub fn stroke_outline(points: &[Point], options: &StrokeOptions) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };

    let t = 0.15 + (1.0 - options.streamline.clamp(0.0, 1.0)) * 0.85;
    let mut smoothed = vec![first];
    for &p in &points[1..] {
        let prev = smoothed[smoothed.len() - 1];
        let next = prev.lerp(p, t);
        if next.distance(prev) > 1e-9 {
            smoothed.push(next);
        }
    }

    let mut pressure = 0.5;
    let radii: Vec<f64> = smoothed
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if options.simulate_pressure && i > 0 {
                let speed = (p.distance(smoothed[i - 1]) / options.size.max(1e-9)).min(1.0);
                let target = 1.0 - speed;
                pressure = (pressure + (target - pressure) * speed * PRESSURE_RATE).min(1.0);
            }
            options.radius(pressure)
        })
        .collect();

    if smoothed.len() == 1 {
        return dot(first, radii[0]);
    }

    let last = smoothed.len() - 1;
    let mut heading = Vec2::new(1.0, 0.0);
    let directions: Vec<Vec2> = (0..smoothed.len())
        .map(|i| {
            let delta = smoothed[(i + 1).min(last)] - smoothed[i.saturating_sub(1)];
            let len = delta.hypot();
            if len > 1e-9 {
                heading = delta / len;
            }
            heading
        })
        .collect();
    let normal = |d: Vec2| Vec2::new(-d.y, d.x);

    let mut outline = Vec::with_capacity(smoothed.len() * 2 + CAP_STEPS * 2 + 2);

    // start cap: right side, around the back, to the left side
    let (d0, n0) = (directions[0], normal(directions[0]));
    for k in 0..=CAP_STEPS {
        let theta = PI * k as f64 / CAP_STEPS as f64;
        outline.push(smoothed[0] + (-n0 * theta.cos() - d0 * theta.sin()) * radii[0]);
    }
    for i in 1..last {
        outline.push(smoothed[i] + normal(directions[i]) * radii[i]);
    }
    // end cap: left side, around the front, to the right side
    let (dn, nn) = (directions[last], normal(directions[last]));
    for k in 0..=CAP_STEPS {
        let theta = PI * k as f64 / CAP_STEPS as f64;
        outline.push(smoothed[last] + (nn * theta.cos() + dn * theta.sin()) * radii[last]);
    }
    for i in (1..last).rev() {
        outline.push(smoothed[i] - normal(directions[i]) * radii[i]);
    }
    outline
}

fn dot(center: Point, radius: f64) -> Vec<Point> {
    let steps = CAP_STEPS * 2;
    (0..steps)
        .map(|k| {
            let theta = 2.0 * PI * k as f64 / steps as f64;
            center + Vec2::new(theta.cos(), theta.sin()) * radius
        })
        .collect()
}

/// Closed path through an outline polygon, using each vertex as the control point of a
/// quadratic segment ending at the midpoint to the next vertex.
pub fn outline_to_path(outline: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = outline.first() else {
        return path;
    };
    path.move_to(first.midpoint(outline[outline.len() - 1]));
    for (i, &p) in outline.iter().enumerate() {
        let next = outline[(i + 1) % outline.len()];
        path.quad_to(p, p.midpoint(next));
    }
    path.close_path();
    path
}

/// Filled outline path for a freehand point sequence.
pub fn freehand_path(points: &[Point], options: &StrokeOptions) -> BezPath {
    outline_to_path(&stroke_outline(points, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;

    #[test]
    fn test_empty_points() {
        assert!(stroke_outline(&[], &StrokeOptions::default()).is_empty());
        assert!(freehand_path(&[], &StrokeOptions::default()).elements().is_empty());
    }

    #[test]
    fn test_single_point_is_dot() {
        let center = Point::new(10.0, 10.0);
        let outline = stroke_outline(&[center], &StrokeOptions::with_size(8.0));
        assert!(!outline.is_empty());
        for p in outline {
            assert!((p.distance(center) - 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_streamline_zero_keeps_points() {
        let options = StrokeOptions {
            streamline: 0.0,
            simulate_pressure: false,
            ..StrokeOptions::with_size(4.0)
        };
        let points = [Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(100.0, 0.0)];
        let outline = stroke_outline(&points, &options);
        let max_x = outline.iter().map(|p| p.x).fold(f64::MIN, f64::max);
        let max_y = outline.iter().map(|p| p.y.abs()).fold(f64::MIN, f64::max);
        assert!((max_x - 102.0).abs() < 1e-9);
        assert!((max_y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_path_covers_stroke() {
        let points = [Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(40.0, 0.0)];
        let path = freehand_path(&points, &StrokeOptions::default());
        assert!(path.contains(Point::new(5.0, 0.0)));
        assert!(!path.contains(Point::new(5.0, 40.0)));
    }
}
