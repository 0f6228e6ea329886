//! Minimal 3-D vector used for positions, directions and normals.
//!
//! Units follow the sensor: millimetres for positions, unit length for
//! directions and normals.

use std::fmt;
use std::ops::{Add, Div, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vector { x, y, z }
    }

    pub fn dot(&self, other: &Vector) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn magnitude(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or [`Vector::ZERO`] for a
    /// (near) zero-length input.
    pub fn normalized(&self) -> Vector {
        let m = self.magnitude();
        if m < 1e-6 { return Vector::ZERO; }
        *self / m
    }

    /// Angle between two vectors in radians (0..=π).
    /// Zero-length inputs yield 0.
    pub fn angle_to(&self, other: &Vector) -> f32 {
        let denom = self.magnitude() * other.magnitude();
        if denom < 1e-6 { return 0.0; }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Div<f32> for Vector {
    type Output = Vector;
    fn div(self, rhs: f32) -> Vector {
        Vector::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl std::str::FromStr for Vector {
    type Err = String;

    /// Parse `x,y,z`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!("expected x,y,z but got \"{s}\""));
        }
        let mut xyz = [0.0f32; 3];
        for (slot, part) in xyz.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("invalid vector component \"{part}\""))?;
        }
        Ok(Vector::new(xyz[0], xyz[1], xyz[2]))
    }
}
