// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Soma representations.
//!
//! The soma is a point set with a shape-dependent derived geometry, not a
//! section tree. The representation is selected from the point count
//! (reference: <http://neuromorpho.org/SomaFormat.html>):
//!
//! * 1 point: a sphere centered on the point
//! * 3 points: three points on the circumference of a sphere; the
//!   equivalent radius is the average distance of the other two points
//!   from the first
//! * 4+ points: a simple contour; no closed-form volume
//!
//! Zero points and the two-point case are not valid soma representations
//! and are rejected.

use crate::dataformat::{Row, ROOT_ID};
use crate::error::{MorphologyError, Result};
use crate::morphmath;

/// A soma, tagged by its shape interpretation.
#[derive(Debug, Clone)]
pub enum Soma {
    /// Single point: a sphere with the point's radius.
    SinglePoint { points: Vec<Row> },
    /// Three points on the circumference of a sphere.
    ThreePoint { points: Vec<Row> },
    /// Multiple points forming a contour around the soma outline.
    SimpleContour { points: Vec<Row> },
}

impl Soma {
    /// The raw soma points.
    pub fn points(&self) -> &[Row] {
        match self {
            Soma::SinglePoint { points }
            | Soma::ThreePoint { points }
            | Soma::SimpleContour { points } => points,
        }
    }

    /// Center of the soma.
    pub fn center(&self) -> [f64; 3] {
        match self {
            Soma::SinglePoint { points } | Soma::ThreePoint { points } => points[0].xyz(),
            Soma::SimpleContour { points } => morphmath::centroid(points),
        }
    }

    /// Equivalent radius of the soma.
    pub fn radius(&self) -> f64 {
        match self {
            Soma::SinglePoint { points } => points[0].r,
            Soma::ThreePoint { points } => {
                morphmath::average_points_dist(points[0].xyz(), &points[1..])
            }
            Soma::SimpleContour { points } => {
                morphmath::average_points_dist(morphmath::centroid(points), points)
            }
        }
    }

    /// Volume of the soma; `None` where the representation has no
    /// closed-form volume.
    pub fn volume(&self) -> Option<f64> {
        match self {
            Soma::SinglePoint { points } => {
                let r = points[0].r;
                Some(4.0 / 3.0 * std::f64::consts::PI * r * r * r)
            }
            Soma::ThreePoint { .. } | Soma::SimpleContour { .. } => None,
        }
    }
}

/// Build a soma from the soma-typed rows of a data block.
///
/// The point count selects the representation; zero points and the
/// explicitly disallowed two-point case are errors.
pub fn make_soma(points: Vec<Row>) -> Result<Soma> {
    match points.len() {
        0 => Err(MorphologyError::NoSomaFound),
        1 => Ok(Soma::SinglePoint { points }),
        2 => Err(MorphologyError::Soma(
            "a two-point soma is not a valid representation".to_string(),
        )),
        3 => Ok(Soma::ThreePoint { points }),
        _ => Ok(Soma::SimpleContour { points }),
    }
}

/// Check that soma points form a valid flat-format soma.
///
/// A bifurcation inside a soma with more than three points is invalid.
pub fn check_soma_topology(points: &[Row]) -> Result<()> {
    if points.len() == 3 {
        return Ok(());
    }
    let parents: Vec<i64> = points
        .iter()
        .filter(|p| p.pid != ROOT_ID)
        .map(|p| p.pid)
        .collect();
    let unique: std::collections::HashSet<i64> = parents.iter().copied().collect();
    if parents.len() > unique.len() {
        return Err(MorphologyError::Soma("bifurcating soma".to_string()));
    }
    Ok(())
}
