use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A simple 2D vector struct in tissue coordinates (y grows toward the surface).
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2.
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Calculates the squared distance to another vector (point).
    pub fn distance_squared(&self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Calculates the distance to another vector (point).
    pub fn distance(&self, other: Vec2) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

/// Unit direction for a heading given in degrees.
///
/// Headings are tracked in `f64` degrees so that repeated scatter offsets do
/// not accumulate rounding; only the resulting direction is narrowed.
pub fn direction_from_degrees(angle_deg: f64) -> Vec2 {
    let rad = angle_deg.to_radians();
    Vec2::new(rad.cos() as f32, rad.sin() as f32)
}

const ELLIPSE_ROOT_ITERATIONS: usize = 160;

/// Axis-aligned ellipse described by its center and semi-axes.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Vec2,
    pub semi_x: f32,
    pub semi_y: f32,
}

impl Ellipse {
    /// Ellipse inscribed in the rectangle spanning `[left, left + width]` by
    /// `[bottom, bottom + height]`.
    pub fn from_bounds(left: f32, bottom: f32, width: f32, height: f32) -> Self {
        Ellipse {
            center: Vec2::new(left + width * 0.5, bottom + height * 0.5),
            semi_x: (width * 0.5).max(0.0),
            semi_y: (height * 0.5).max(0.0),
        }
    }

    /// True if the ellipse has no area.
    pub fn is_degenerate(&self) -> bool {
        self.semi_x <= 0.0 || self.semi_y <= 0.0
    }

    /// True if `p` lies inside or on the ellipse.
    pub fn contains(&self, p: Vec2) -> bool {
        if self.is_degenerate() {
            return false;
        }
        let nx = (p.x - self.center.x) as f64 / self.semi_x as f64;
        let ny = (p.y - self.center.y) as f64 / self.semi_y as f64;
        nx * nx + ny * ny <= 1.0
    }

    /// Euclidean distance from `p` to the nearest point of the ellipse
    /// region; zero when `p` is inside.
    ///
    /// Outside points are resolved by bisecting on the Lagrange parameter of
    /// the closest-point problem, which is robust for very eccentric shapes.
    pub fn distance_to_point(&self, p: Vec2) -> f32 {
        if self.contains(p) {
            return 0.0;
        }
        let mut x = ((p.x - self.center.x) as f64).abs();
        let mut y = ((p.y - self.center.y) as f64).abs();
        let mut a = self.semi_x.max(0.0) as f64;
        let mut b = self.semi_y.max(0.0) as f64;
        if b > a {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut x, &mut y);
        }

        // Collapsed shapes reduce to a segment along the major axis.
        if b <= 0.0 {
            let dx = (x - a).max(0.0);
            return (dx * dx + y * y).sqrt() as f32;
        }

        let dist = if y > 0.0 {
            if x > 0.0 {
                let z0 = x / a;
                let z1 = y / b;
                let g = z0 * z0 + z1 * z1 - 1.0;
                if g != 0.0 {
                    let r0 = (a / b) * (a / b);
                    let s = bisect_normal_root(r0, z0, z1, g);
                    let cx = r0 * x / (s + r0);
                    let cy = y / (s + 1.0);
                    ((cx - x) * (cx - x) + (cy - y) * (cy - y)).sqrt()
                } else {
                    0.0
                }
            } else {
                (y - b).abs()
            }
        } else {
            let numer = a * x;
            let denom = a * a - b * b;
            if numer < denom {
                let xd = numer / denom;
                let cx = a * xd;
                let cy = b * (1.0 - xd * xd).max(0.0).sqrt();
                ((cx - x) * (cx - x) + cy * cy).sqrt()
            } else {
                (x - a).abs()
            }
        };
        dist as f32
    }

    /// True if a disk of `radius` centered at `p` overlaps the ellipse.
    pub fn intersects_disk(&self, p: Vec2, radius: f32) -> bool {
        if self.is_degenerate() {
            return false;
        }
        self.distance_to_point(p) <= radius.max(0.0)
    }
}

fn bisect_normal_root(r0: f64, z0: f64, z1: f64, g: f64) -> f64 {
    let n0 = r0 * z0;
    let mut s0 = z1 - 1.0;
    let mut s1 = if g < 0.0 { 0.0 } else { n0.hypot(z1) - 1.0 };
    let mut s = 0.0;
    for _ in 0..ELLIPSE_ROOT_ITERATIONS {
        s = (s0 + s1) * 0.5;
        if s == s0 || s == s1 {
            break;
        }
        let ratio0 = n0 / (s + r0);
        let ratio1 = z1 / (s + 1.0);
        let g = ratio0 * ratio0 + ratio1 * ratio1 - 1.0;
        if g > 0.0 {
            s0 = s;
        } else if g < 0.0 {
            s1 = s;
        } else {
            break;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_degrees_points_down_at_270() {
        let d = direction_from_degrees(270.0);
        assert!(d.x.abs() < 1e-6);
        assert!((d.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn ellipse_from_bounds_centers_shape() {
        let e = Ellipse::from_bounds(200.0, 35.0, 60.0, 120.0);
        assert_eq!(e.center, Vec2::new(230.0, 95.0));
        assert_eq!(e.semi_x, 30.0);
        assert_eq!(e.semi_y, 60.0);
    }

    #[test]
    fn distance_along_axes_is_exact() {
        let e = Ellipse::from_bounds(0.0, 0.0, 60.0, 120.0);
        // Center (30, 60), semi-axes (30, 60).
        assert!((e.distance_to_point(Vec2::new(70.0, 60.0)) - 10.0).abs() < 1e-3);
        assert!((e.distance_to_point(Vec2::new(30.0, 125.0)) - 5.0).abs() < 1e-3);
        assert_eq!(e.distance_to_point(Vec2::new(30.0, 60.0)), 0.0);
    }

    #[test]
    fn distance_off_axis_matches_circle_case() {
        let e = Ellipse::from_bounds(-10.0, -10.0, 20.0, 20.0);
        let p = Vec2::new(10.0, 10.0);
        let expected = (200.0f32).sqrt() - 10.0;
        assert!((e.distance_to_point(p) - expected).abs() < 1e-3);
    }

    #[test]
    fn disk_intersection_near_boundary() {
        let e = Ellipse::from_bounds(0.0, 0.0, 60.0, 120.0);
        assert!(e.intersects_disk(Vec2::new(61.5, 60.0), 2.0));
        assert!(!e.intersects_disk(Vec2::new(62.5, 60.0), 2.0));
        // Corner of the bounding box is outside a disk of radius 2.
        assert!(!e.intersects_disk(Vec2::new(0.0, 0.0), 2.0));
    }

    #[test]
    fn degenerate_ellipse_never_intersects() {
        let e = Ellipse::from_bounds(10.0, 10.0, 0.0, 40.0);
        assert!(!e.intersects_disk(Vec2::new(10.0, 30.0), 5.0));
    }
}
