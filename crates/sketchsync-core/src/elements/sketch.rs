//! Hand-drawn sketch geometry for shape elements.
//!
//! A clean outline is traced twice with seeded jitter: endpoints wander and straight segments
//! bow outwards. The result only depends on the outline, the seed and the sloppiness, so every
//! participant derives the same strokes for the same element.

use super::ElementStyle;
use kurbo::{BezPath, PathEl, Point, Vec2};

/// Number of overlaid passes in the sketch geometry.
const PASSES: u32 = 2;

/// Seeded xorshift32 generator.
struct Jitter {
    state: u32,
}

impl Jitter {
    fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform in `[-amount, amount]`.
    fn spread(&mut self, amount: f64) -> f64 {
        ((self.next_u32() as f64 / u32::MAX as f64) * 2.0 - 1.0) * amount
    }

    fn nudge(&mut self, p: Point, amount: f64) -> Point {
        Point::new(p.x + self.spread(amount), p.y + self.spread(amount))
    }
}

/// Sketch geometry for `outline` under `style`. Zero roughness yields the outline itself.
pub fn sketch_path(outline: &BezPath, style: &ElementStyle) -> BezPath {
    let roughness = style.sloppiness.roughness();
    if roughness <= 0.0 {
        return outline.clone();
    }
    let mut sketch = BezPath::new();
    for pass in 0..PASSES {
        let seed = style.seed.wrapping_add(pass.wrapping_mul(99991));
        for el in roughen(outline, roughness, seed).elements() {
            sketch.push(*el);
        }
    }
    sketch
}

fn roughen(outline: &BezPath, roughness: f64, seed: u32) -> BezPath {
    let wander = roughness * 2.0;
    let mut jitter = Jitter::new(seed);
    let mut out = BezPath::new();
    let mut current = Point::ZERO;

    for el in outline.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                out.move_to(jitter.nudge(p, wander));
                current = p;
            }
            PathEl::LineTo(p) => {
                let seg = p - current;
                let len = seg.hypot();
                let normal = if len > 1e-3 {
                    Vec2::new(-seg.y / len, seg.x / len)
                } else {
                    Vec2::ZERO
                };
                let bow = jitter.spread(roughness * roughness * len / 200.0);
                let control = current.midpoint(p) + normal * bow;
                out.quad_to(control, jitter.nudge(p, wander));
                current = p;
            }
            PathEl::QuadTo(c, p) => {
                out.quad_to(jitter.nudge(c, wander * 0.7), jitter.nudge(p, wander));
                current = p;
            }
            PathEl::CurveTo(c1, c2, p) => {
                out.curve_to(
                    jitter.nudge(c1, wander * 0.5),
                    jitter.nudge(c2, wander * 0.5),
                    jitter.nudge(p, wander),
                );
                current = p;
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Sloppiness;

    fn square() -> BezPath {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((100.0, 0.0));
        path.line_to((100.0, 100.0));
        path.line_to((0.0, 100.0));
        path.close_path();
        path
    }

    #[test]
    fn test_architect_is_clean() {
        let mut style = ElementStyle::default();
        style.sloppiness = Sloppiness::Architect;
        assert_eq!(sketch_path(&square(), &style), square());
    }

    #[test]
    fn test_deterministic_for_seed() {
        let mut style = ElementStyle::default();
        style.seed = 42;
        assert_eq!(sketch_path(&square(), &style), sketch_path(&square(), &style));

        let mut other = style.clone();
        other.seed = 43;
        assert_ne!(sketch_path(&square(), &style), sketch_path(&square(), &other));
    }

    #[test]
    fn test_two_passes() {
        let style = ElementStyle::default();
        let sketch = sketch_path(&square(), &style);
        assert_eq!(sketch.elements().len(), square().elements().len() * 2);
    }
}
