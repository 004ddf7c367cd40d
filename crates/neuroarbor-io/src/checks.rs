// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Consistency and validity checks.
//!
//! Every check is an independent pass over a raw data block or a built
//! neuron, returning a pass/fail status together with the offending
//! identifiers. None of them raise: the loader decides which subset is
//! fatal, everything else is advisory and left to the caller.

use neuroarbor_structures::dataformat::{NeuriteType, PointType, ROOT_ID};
use neuroarbor_structures::datawrapper::DataWrapper;
use neuroarbor_structures::neuron::Neuron;
use neuroarbor_structures::tree;

/// Result of a single check: status plus the offending identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult<T> {
    pub status: bool,
    pub info: Vec<T>,
}

impl<T> CheckResult<T> {
    /// A check that passes exactly when there is nothing to report.
    pub fn from_info(info: Vec<T>) -> CheckResult<T> {
        CheckResult {
            status: info.is_empty(),
            info,
        }
    }

    pub fn passed(&self) -> bool {
        self.status
    }
}

/// Check that IDs are consecutive: each row's ID is its predecessor's
/// plus one. Reports the IDs breaking the sequence.
pub fn has_sequential_ids(data: &DataWrapper) -> CheckResult<i64> {
    let info = data
        .rows()
        .windows(2)
        .filter(|w| w[1].id - w[0].id != 1)
        .map(|w| w[1].id)
        .collect();
    CheckResult::from_info(info)
}

/// Check that IDs are strictly increasing (gaps allowed). Reports the IDs
/// breaking the ordering.
pub fn has_increasing_ids(data: &DataWrapper) -> CheckResult<i64> {
    let info = data
        .rows()
        .windows(2)
        .filter(|w| w[1].id - w[0].id <= 0)
        .map(|w| w[1].id)
        .collect();
    CheckResult::from_info(info)
}

/// Check that every referenced parent exists: the parent-ID set minus the
/// ID set, the root sentinel excluded. Reports the missing parent IDs in
/// ascending order.
pub fn no_missing_parents(data: &DataWrapper) -> CheckResult<i64> {
    let ids: std::collections::HashSet<i64> = data.rows().iter().map(|r| r.id).collect();
    let mut info: Vec<i64> = data
        .rows()
        .iter()
        .map(|r| r.pid)
        .filter(|pid| *pid != ROOT_ID && !ids.contains(pid))
        .collect();
    info.sort_unstable();
    info.dedup();
    CheckResult::from_info(info)
}

/// Check that the data forms exactly one tree: only the very first row may
/// have the root sentinel as parent. Reports the IDs of the extra roots.
pub fn is_single_tree(data: &DataWrapper) -> CheckResult<i64> {
    let info = data
        .rows()
        .iter()
        .skip(1)
        .filter(|r| r.pid == ROOT_ID)
        .map(|r| r.id)
        .collect();
    CheckResult::from_info(info)
}

/// Check that at least one row carries the soma type.
pub fn has_soma_points(data: &DataWrapper) -> CheckResult<i64> {
    CheckResult {
        status: data.rows().iter().any(|r| r.ntype == PointType::Soma),
        info: Vec::new(),
    }
}

/// Check that all neurite points have a radius above `threshold`.
/// Reports the offending row IDs in ascending order.
pub fn has_all_finite_radius_neurites(data: &DataWrapper, threshold: f64) -> CheckResult<i64> {
    let mut info: Vec<i64> = data
        .rows()
        .iter()
        .filter(|r| r.ntype.is_neurite() && r.r <= threshold)
        .map(|r| r.id)
        .collect();
    info.sort_unstable();
    CheckResult::from_info(info)
}

/// Check that consecutive-by-parent-pointer neurite point pairs are not
/// coincident. Reports `(parent_id, id)` pairs in row order.
pub fn has_all_finite_length_segments(data: &DataWrapper) -> CheckResult<(i64, i64)> {
    let mut info = Vec::new();
    for row in data.rows() {
        if row.pid == ROOT_ID {
            continue;
        }
        if let Ok(parent) = data.get_row(row.pid) {
            if parent.ntype.is_neurite()
                && row.ntype.is_neurite()
                && parent.xyz() == row.xyz()
            {
                info.push((row.pid, row.id));
            }
        }
    }
    CheckResult::from_info(info)
}

/// Check that the accumulated length along every section's point chain
/// exceeds `threshold`. Reports the offending section IDs.
pub fn has_all_nonzero_section_lengths(neuron: &Neuron, threshold: f64) -> CheckResult<usize> {
    let info = neuron
        .sections()
        .iter()
        .filter(|node| node.borrow().length() <= threshold)
        .map(|node| node.borrow().section_id)
        .collect();
    CheckResult::from_info(info)
}

/// Check that the accumulated length along every segment of the built
/// neurites exceeds `threshold`. Reports `(section_id, segment_index)`
/// pairs.
pub fn has_all_nonzero_segment_lengths(
    neuron: &Neuron,
    threshold: f64,
) -> CheckResult<(usize, usize)> {
    let mut info = Vec::new();
    for neurite in neuron.neurites() {
        for node in tree::ipreorder(&neurite.root_node) {
            let node = node.borrow();
            for (i, pair) in node.points.windows(2).enumerate() {
                if neuroarbor_structures::morphmath::segment_length(&pair[0], &pair[1])
                    <= threshold
                {
                    info.push((node.section_id, i));
                }
            }
        }
    }
    CheckResult::from_info(info)
}

fn has_neurite_of_type(neuron: &Neuron, wanted: NeuriteType) -> CheckResult<usize> {
    CheckResult {
        status: neuron
            .neurites()
            .iter()
            .any(|n| n.neurite_type == wanted),
        info: Vec::new(),
    }
}

/// Check that the neuron has an axon.
pub fn has_axon(neuron: &Neuron) -> CheckResult<usize> {
    has_neurite_of_type(neuron, NeuriteType::Axon)
}

/// Check that the neuron has at least one basal dendrite.
pub fn has_basal_dendrite(neuron: &Neuron) -> CheckResult<usize> {
    has_neurite_of_type(neuron, NeuriteType::BasalDendrite)
}

/// Check that the neuron has at least one apical dendrite.
pub fn has_apical_dendrite(neuron: &Neuron) -> CheckResult<usize> {
    has_neurite_of_type(neuron, NeuriteType::ApicalDendrite)
}
