//! Regions of space used to seed molecule placement.
//!
//! All samplers draw the radius uniformly (not the volume), so sphere samples cluster towards
//! the center. Membership tests use a small relative tolerance so that every sampled point is
//! accepted by the region that produced it, including points that landed on the boundary
//! through rounding.

use crate::core::utils::geometry::{Spherical, spherical_to_cartesian};
use nalgebra::Point3;
use rand::Rng;
use std::f64::consts::PI;
use thiserror::Error;

const RELATIVE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum SpaceError {
    #[error("Radius must be positive and finite, got {0}")]
    InvalidRadius(f64),
    #[error("Orbit requires 0 <= inner < outer, got inner {inner} and outer {outer}")]
    InvalidShell { inner: f64, outer: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllowedSpace {
    Sphere {
        center: Point3<f64>,
        radius: f64,
    },
    Orbit {
        center: Point3<f64>,
        inner: f64,
        outer: f64,
    },
    HalfSphere {
        center: Point3<f64>,
        radius: f64,
    },
}

impl AllowedSpace {
    pub fn sphere(center: Point3<f64>, radius: f64) -> Result<Self, SpaceError> {
        check_radius(radius)?;
        Ok(Self::Sphere { center, radius })
    }

    pub fn orbit(center: Point3<f64>, inner: f64, outer: f64) -> Result<Self, SpaceError> {
        if !(inner.is_finite() && outer.is_finite() && inner >= 0.0 && inner < outer) {
            return Err(SpaceError::InvalidShell { inner, outer });
        }
        Ok(Self::Orbit {
            center,
            inner,
            outer,
        })
    }

    pub fn half_sphere(center: Point3<f64>, radius: f64) -> Result<Self, SpaceError> {
        check_radius(radius)?;
        Ok(Self::HalfSphere { center, radius })
    }

    pub fn center(&self) -> Point3<f64> {
        match self {
            Self::Sphere { center, .. }
            | Self::Orbit { center, .. }
            | Self::HalfSphere { center, .. } => *center,
        }
    }

    /// Largest distance from the center any member point can have.
    pub fn outer_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius, .. } | Self::HalfSphere { radius, .. } => *radius,
            Self::Orbit { outer, .. } => *outer,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Point3<f64> {
        let (r, center) = match self {
            Self::Sphere { center, radius } | Self::HalfSphere { center, radius } => {
                (radius * rng.r#gen::<f64>(), *center)
            }
            Self::Orbit {
                center,
                inner,
                outer,
            } => ((outer - inner) * rng.r#gen::<f64>() + inner, *center),
        };
        let phi = 2.0 * PI * rng.r#gen::<f64>();
        let omega = PI * rng.r#gen::<f64>();
        let mut point = center + spherical_to_cartesian(&Spherical { r, phi, omega });

        if let Self::HalfSphere { center, .. } = self {
            if point.z < center.z {
                point.z = 2.0 * center.z - point.z;
            }
        }
        point
    }

    pub fn contains(&self, point: &Point3<f64>) -> bool {
        let dist = (point - self.center()).norm();
        match self {
            Self::Sphere { radius, .. } => dist <= radius * (1.0 + RELATIVE_TOLERANCE),
            Self::Orbit { inner, outer, .. } => {
                dist >= inner * (1.0 - RELATIVE_TOLERANCE)
                    && dist <= outer * (1.0 + RELATIVE_TOLERANCE)
            }
            Self::HalfSphere { center, radius } => {
                let slack = radius * RELATIVE_TOLERANCE;
                point.z >= center.z - slack && dist <= radius * (1.0 + RELATIVE_TOLERANCE)
            }
        }
    }
}

fn check_radius(radius: f64) -> Result<(), SpaceError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(SpaceError::InvalidRadius(radius))
    }
}
