//! Arm (gene) and geometry types for epicycle chains.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A point or displacement in 3D space. Traces live in the `z = 0` plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    #[inline]
    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).magnitude()
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Polar form of a planar point: angle from the x-axis and distance from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Polar {
    pub angle: f32,
    pub radius: f32,
}

/// Shared closure mapping time to angular velocity.
#[derive(Clone)]
pub struct TimeFunction(Arc<dyn Fn(f32) -> f32 + Send + Sync>);

impl TimeFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    #[inline]
    pub fn eval(&self, time: f32) -> f32 {
        (self.0)(time)
    }
}

impl fmt::Debug for TimeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimeFunction(..)")
    }
}

/// Angular velocity of an arm.
///
/// `TimeVarying` takes precedence over any constant: the phase at time `t`
/// becomes `initial_phase + f(t) * t`.
#[derive(Debug, Clone)]
pub enum AngularVelocity {
    Constant(f32),
    TimeVarying(TimeFunction),
}

impl AngularVelocity {
    /// Angular velocity at the given time.
    #[inline]
    pub fn at(&self, time: f32) -> f32 {
        match self {
            AngularVelocity::Constant(omega) => *omega,
            AngularVelocity::TimeVarying(f) => f.eval(time),
        }
    }

    /// Representative value used by population statistics (the value at `t = 0`).
    #[inline]
    pub fn nominal(&self) -> f32 {
        self.at(0.0)
    }

    /// Mutable access to the constant value, `None` for time-varying velocities.
    #[inline]
    pub fn constant_mut(&mut self) -> Option<&mut f32> {
        match self {
            AngularVelocity::Constant(omega) => Some(omega),
            AngularVelocity::TimeVarying(_) => None,
        }
    }
}

impl Default for AngularVelocity {
    fn default() -> Self {
        AngularVelocity::Constant(0.0)
    }
}

impl From<f32> for AngularVelocity {
    fn from(omega: f32) -> Self {
        AngularVelocity::Constant(omega)
    }
}

impl PartialEq for AngularVelocity {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AngularVelocity::Constant(a), AngularVelocity::Constant(b)) => a == b,
            (AngularVelocity::TimeVarying(a), AngularVelocity::TimeVarying(b)) => {
                Arc::ptr_eq(&a.0, &b.0)
            }
            _ => false,
        }
    }
}

impl Serialize for AngularVelocity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AngularVelocity::Constant(omega) => serializer.serialize_f32(*omega),
            AngularVelocity::TimeVarying(_) => Err(serde::ser::Error::custom(
                "time-varying angular velocity cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for AngularVelocity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        f32::deserialize(deserializer).map(AngularVelocity::Constant)
    }
}

/// One rotating arm of the chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Circle {
    /// Phase at `t = 0`. For the first arm it is measured from the x-axis,
    /// for the others relative to the previous arm's reversed direction.
    pub initial_phase: f32,
    /// Rotation speed in radians per unit time.
    pub angular_velocity: AngularVelocity,
    /// Arm length.
    pub radius: f32,
}

impl Circle {
    pub fn new(initial_phase: f32, angular_velocity: f32, radius: f32) -> Self {
        Self {
            initial_phase,
            angular_velocity: AngularVelocity::Constant(angular_velocity),
            radius,
        }
    }

    /// Arm whose angular velocity follows `f(t)`.
    pub fn time_varying<F>(initial_phase: f32, radius: f32, f: F) -> Self
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static,
    {
        Self {
            initial_phase,
            angular_velocity: AngularVelocity::TimeVarying(TimeFunction::new(f)),
            radius,
        }
    }

    /// Phase of this arm at time `t`.
    #[inline]
    pub fn phase_at(&self, time: f32) -> f32 {
        self.initial_phase + self.angular_velocity.at(time) * time
    }
}

/// Ordered arm list. Arm `i` is anchored at the tip of arm `i - 1`.
pub type Chromosome = Vec<Circle>;

/// A target the traced curve should pass through at a given sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub sample_index: usize,
    pub target: Vec3,
}

impl KeyPoint {
    pub fn new(sample_index: usize, target: Vec3) -> Self {
        Self {
            sample_index,
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_distance() {
        let a = Vec3::new(3.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 4.0, 0.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
        assert_eq!(a - a, Vec3::ZERO);
    }

    #[test]
    fn test_time_varying_phase() {
        let circle = Circle::time_varying(0.5, 1.0, |t| 2.0 * t);
        // phase = 0.5 + (2 * 3) * 3
        assert!((circle.phase_at(3.0) - 18.5).abs() < 1e-5);
        assert_eq!(circle.angular_velocity.nominal(), 0.0);
    }

    #[test]
    fn test_circle_serialization() {
        let circle = Circle::new(0.25, -1.5, 2.0);
        let json = serde_json::to_string(&circle).unwrap();
        let parsed: Circle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, circle);
        assert!(json.contains("\"angular_velocity\":-1.5"));
    }

    #[test]
    fn test_time_varying_not_serializable() {
        let circle = Circle::time_varying(0.0, 1.0, |t| t);
        assert!(serde_json::to_string(&circle).is_err());
    }

    #[test]
    fn test_time_varying_equality_is_identity() {
        let a = Circle::time_varying(0.0, 1.0, |t| t);
        let b = a.clone();
        let c = Circle::time_varying(0.0, 1.0, |t| t);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
