//! Hard-iron and soft-iron compensation for the horizontal field pair.
//!
//! The fit is a closed-form approximation over extrema rather than a least
//! squares ellipse fit:
//!
//! 1. The hard-iron offset of each axis is the midpoint of its extrema.
//! 2. The centered point of largest magnitude gives the ellipse orientation
//!    `phi`. Rotating every point by `phi` aligns the ellipse with the axes,
//!    where the largest absolute coordinates approximate the semi-axes and
//!    their ratio `k = b / a`.
//! 3. The rotation, the rescale by `k` and the rotation back are folded into
//!    one 2x2 matrix so that correcting a live sample costs four products.
//!
//! Extrema are only meaningful when the dataset covers a full rotation, see
//! [`Collector`](crate::modules::collector::Collector).

use crate::constants::MIN_AXIS_RATIO;
use core::{f64::consts::FRAC_PI_2, fmt};
use log::info;
use nalgebra::{Matrix2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CalibrationError {
    #[error("calibration dataset is empty")]
    Empty,
    #[error("calibration dataset contains a non-finite value")]
    NonFinite,
    #[error("calibration dataset has no spread to fit")]
    Degenerate,
    #[error("calibration needs all heading sectors, only {progress} seen")]
    Incomplete { progress: usize },
}

/// Direction the centered dataset is rotated by to align it with the axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    fn resolve(x: f64, y: f64) -> (Self, f64) {
        if x * y > 0. {
            (Self::Clockwise, (y / x).atan())
        } else if x == 0. {
            // limit of -atan(y / x) as x approaches zero
            (Self::CounterClockwise, -y.signum() * FRAC_PI_2)
        } else {
            (Self::CounterClockwise, -(y / x).atan())
        }
    }

    /// Sign applied to `phi` when rotating.
    pub fn sign(self) -> f64 {
        match self {
            Self::Clockwise => -1.,
            Self::CounterClockwise => 1.,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Clockwise => f.write_str("clockwise"),
            Self::CounterClockwise => f.write_str("counter-clockwise"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    x_offset: f64,
    y_offset: f64,
    phi: f64,
    rotation: Rotation,
    k: f64,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl CalibrationModel {
    pub fn x_offset(&self) -> f64 {
        self.x_offset
    }

    pub fn y_offset(&self) -> f64 {
        self.y_offset
    }

    /// Ellipse orientation in radians.
    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn phi_degrees(&self) -> f64 {
        self.phi.to_degrees()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Minor to major axis ratio.
    pub fn k(&self) -> f64 {
        self.k
    }

    /// Soft-iron coefficients `(A, B, C, D)`.
    pub fn coefficients(&self) -> (f64, f64, f64, f64) {
        (self.a, self.b, self.c, self.d)
    }

    pub fn matrix(&self) -> Matrix2<f64> {
        let sign = self.rotation.sign();

        Matrix2::new(self.a, -sign * self.b, sign * self.c, self.d)
    }

    pub fn compensate_hard_iron(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.x_offset, y - self.y_offset)
    }

    /// Applies the soft-iron matrix to an already centered sample.
    pub fn compensate_soft_iron(&self, x: f64, y: f64) -> (f64, f64) {
        let corrected = self.matrix() * Vector2::new(x, y);

        (corrected.x, corrected.y)
    }

    pub fn correct(&self, x: f64, y: f64) -> (f64, f64) {
        let (x, y) = self.compensate_hard_iron(x, y);
        self.compensate_soft_iron(x, y)
    }
}

impl fmt::Display for CalibrationModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "x_offset={:.2}, y_offset={:.2}, phi={:.2}, {}, k={:.2}",
            self.x_offset,
            self.y_offset,
            self.phi_degrees(),
            self.rotation,
            self.k
        )
    }
}

pub fn fit(points: &[(f64, f64)]) -> Result<CalibrationModel, CalibrationError> {
    if points.is_empty() {
        return Err(CalibrationError::Empty);
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(CalibrationError::NonFinite);
    }

    let (x_offset, y_offset) = hard_iron(points);
    let centered: Vec<Vector2<f64>> = points
        .iter()
        .map(|&(x, y)| Vector2::new(x - x_offset, y - y_offset))
        .collect();

    // first point of largest magnitude
    let peak = centered
        .iter()
        .fold(&centered[0], |peak, point| {
            if point.norm() > peak.norm() {
                point
            } else {
                peak
            }
        });
    if peak.norm() == 0. {
        return Err(CalibrationError::Degenerate);
    }

    let (rotation, phi) = Rotation::resolve(peak.x, peak.y);
    let rotate = Rotation2::new(rotation.sign() * phi);

    let (a, b) = centered.iter().fold((0_f64, 0_f64), |(a, b), point| {
        let rotated = rotate * *point;
        (a.max(rotated.x.abs()), b.max(rotated.y.abs()))
    });
    if a == 0. {
        return Err(CalibrationError::Degenerate);
    }

    let k = b / a;
    // collinear datasets have no minor axis
    if k < MIN_AXIS_RATIO {
        return Err(CalibrationError::Degenerate);
    }

    let (sin, cos) = phi.sin_cos();
    let sin2 = (2. * phi).sin();

    let model = CalibrationModel {
        x_offset,
        y_offset,
        phi,
        rotation,
        k,
        a: k * cos * cos + sin * sin,
        b: (k * sin2 - sin2) * 0.5,
        c: (sin2 - k * sin2) * 0.5,
        d: k * sin * sin + cos * cos,
    };

    info!("Calibrated {} points: {}", points.len(), model);

    Ok(model)
}

fn hard_iron(points: &[(f64, f64)]) -> (f64, f64) {
    let (x_min, x_max, y_min, y_max) = points.iter().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(x_min, x_max, y_min, y_max), &(x, y)| {
            (x_min.min(x), x_max.max(x), y_min.min(y), y_max.max(y))
        },
    );

    ((x_max + x_min) * 0.5, (y_max + y_min) * 0.5)
}
