// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Canonical data format shared by every morphology reader.
//!
//! Readers unpack source files into a flat stream of [`Row`] values whose
//! fields follow the canonical column order:
//!
//! ```text
//! [X, Y, Z, R, TYPE, ID, PARENT_ID]
//! ```
//!
//! There is one such row per measured point, regardless of how the source
//! format lays its fields out on disk.

use core::fmt;

/// Sentinel parent ID meaning "no parent" (a root row).
pub const ROOT_ID: i64 = -1;

/// Structural point types. These follow the SWC specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointType {
    Undefined = 0,
    Soma = 1,
    Axon = 2,
    BasalDendrite = 3,
    ApicalDendrite = 4,
    ForkPoint = 5,
    EndPoint = 6,
    Custom = 7,
}

impl PointType {
    /// The three point types that make up neurite trees.
    pub const NEURITES: [PointType; 3] = [
        PointType::Axon,
        PointType::BasalDendrite,
        PointType::ApicalDendrite,
    ];

    /// Largest type code a well-formed file is expected to use.
    pub const MAX_KNOWN_CODE: i64 = PointType::ApicalDendrite as i64;

    /// Map a raw integer type code to a `PointType`.
    pub fn from_code(code: i64) -> Option<PointType> {
        match code {
            0 => Some(PointType::Undefined),
            1 => Some(PointType::Soma),
            2 => Some(PointType::Axon),
            3 => Some(PointType::BasalDendrite),
            4 => Some(PointType::ApicalDendrite),
            5 => Some(PointType::ForkPoint),
            6 => Some(PointType::EndPoint),
            7 => Some(PointType::Custom),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    /// True for axon, basal dendrite and apical dendrite points.
    pub fn is_neurite(self) -> bool {
        matches!(
            self,
            PointType::Axon | PointType::BasalDendrite | PointType::ApicalDendrite
        )
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Classification of a whole neurite tree.
///
/// The numeric codes coincide with the corresponding [`PointType`] codes;
/// `AllNeurites` is a wildcard used only for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeuriteType {
    Undefined = 0,
    Soma = 1,
    Axon = 2,
    BasalDendrite = 3,
    ApicalDendrite = 4,
    AllNeurites = 32,
}

impl NeuriteType {
    /// Map a raw integer code to a `NeuriteType`. Codes outside the known
    /// range fold to `Undefined`.
    pub fn from_code(code: i64) -> NeuriteType {
        match code {
            1 => NeuriteType::Soma,
            2 => NeuriteType::Axon,
            3 => NeuriteType::BasalDendrite,
            4 => NeuriteType::ApicalDendrite,
            _ => NeuriteType::Undefined,
        }
    }

    /// Type match with `AllNeurites` acting as a wildcard for the three
    /// concrete neurite types.
    pub fn matches(self, other: NeuriteType) -> bool {
        if self == NeuriteType::AllNeurites {
            matches!(
                other,
                NeuriteType::Axon | NeuriteType::BasalDendrite | NeuriteType::ApicalDendrite
            )
        } else {
            self == other
        }
    }
}

impl From<PointType> for NeuriteType {
    fn from(ptype: PointType) -> NeuriteType {
        NeuriteType::from_code(ptype.code())
    }
}

/// One canonical morphology point.
///
/// * `x`, `y`, `z`: coordinates of the point
/// * `r`: radius of the node at that point
/// * `ntype`: structural type, one of [`PointType`]
/// * `id`: unique non-negative integer; not required to be dense
/// * `pid`: ID of the parent point, or [`ROOT_ID`]
///
/// Notes:
/// * there is no upper bound on the number of rows sharing a parent:
///   multifurcations are allowed
/// * ordering constraints (parent-before-child, increasing IDs) are
///   format-dependent and enforced by the consistency checks, not here
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
    pub ntype: PointType,
    pub id: i64,
    pub pid: i64,
}

impl Row {
    pub fn new(x: f64, y: f64, z: f64, r: f64, ntype: PointType, id: i64, pid: i64) -> Row {
        Row {
            x,
            y,
            z,
            r,
            ntype,
            id,
            pid,
        }
    }

    pub fn xyz(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn xyzr(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.r]
    }

    pub fn is_root(&self) -> bool {
        self.pid == ROOT_ID
    }
}
