// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Tests for section-tree building and the neuron aggregate.

use neuroarbor_structures::dataformat::{NeuriteType, PointType, Row, ROOT_ID};
use neuroarbor_structures::datawrapper::{DataWrapper, SourceFormat};
use neuroarbor_structures::neuron::{make_trees, Neuron};
use neuroarbor_structures::tree;
use neuroarbor_structures::MorphologyError;

fn row(x: f64, ntype: PointType, id: i64, pid: i64) -> Row {
    Row::new(x, 0.0, 0.0, 1.0, ntype, id, pid)
}

/// 3-point soma, axon trunk forking into two branches.
///
/// ```text
///   soma: 0-1-2
///   axon:      3-4 < (5-6, 7-8)
/// ```
fn branched_rows() -> Vec<Row> {
    vec![
        row(0.0, PointType::Soma, 0, -1),
        row(1.0, PointType::Soma, 1, 0),
        row(2.0, PointType::Soma, 2, 1),
        row(3.0, PointType::Axon, 3, 2),
        row(4.0, PointType::Axon, 4, 3),
        Row::new(5.0, 1.0, 0.0, 1.0, PointType::Axon, 5, 4),
        Row::new(6.0, 1.0, 0.0, 1.0, PointType::Axon, 6, 5),
        Row::new(5.0, -1.0, 0.0, 1.0, PointType::Axon, 7, 4),
        Row::new(6.0, -1.0, 0.0, 1.0, PointType::Axon, 8, 7),
    ]
}

fn branched_neuron() -> Neuron {
    let data = DataWrapper::new(branched_rows(), SourceFormat::Swc);
    Neuron::from_data(data, "branched").unwrap()
}

#[test]
fn test_section_count_is_forks_plus_leaves() {
    let data = DataWrapper::new(branched_rows(), SourceFormat::Swc);
    let n_forks = data.get_fork_points().len();
    let n_leaves = data.get_end_points().len();
    let neuron = Neuron::from_data(data, "branched").unwrap();
    assert_eq!(neuron.sections().len(), n_forks + n_leaves);
}

#[test]
fn test_parent_chains_terminate() {
    let data = DataWrapper::new(branched_rows(), SourceFormat::Swc);
    let total = data.section_count();
    for (idx, _) in data.sections() {
        let mut hops = 0;
        let mut current = idx;
        loop {
            let sec = match data.resolve_section(current) {
                Some((_, sec)) => sec,
                None => break,
            };
            if sec.pid <= ROOT_ID {
                break;
            }
            current = sec.pid as usize;
            hops += 1;
            assert!(hops <= total, "parent chain does not terminate");
        }
    }
}

#[test]
fn test_neurite_build_and_classification() {
    let neuron = branched_neuron();
    assert_eq!(neuron.neurites().len(), 1);
    let neurite = &neuron.neurites()[0];
    assert_eq!(neurite.neurite_type, NeuriteType::Axon);

    // trunk's leading soma point is trimmed away
    let root = neurite.root_node.borrow();
    assert_eq!(root.points[0].id, 3);
    assert!(root.points.iter().all(|p| p.ntype == PointType::Axon));
}

#[test]
fn test_soma_is_not_a_tree_node() {
    let neuron = branched_neuron();
    for node in neuron.sections() {
        assert_ne!(node.borrow().section_type, NeuriteType::Soma);
    }
    assert_eq!(neuron.soma().points().len(), 3);
}

#[test]
fn test_flatten_round_trip() {
    // soma points + deduplicated neurite points reproduce the file rows
    let neuron = branched_neuron();
    let pts = neuron.points();
    let rows = branched_rows();
    assert_eq!(pts.nrows(), rows.len());
    for (got, want) in pts.outer_iter().zip(&rows) {
        assert_eq!(got[0], want.x);
        assert_eq!(got[1], want.y);
        assert_eq!(got[2], want.z);
        assert_eq!(got[3], want.r);
    }
}

#[test]
fn test_neurite_traversal() {
    let neuron = branched_neuron();
    let root = &neuron.neurites()[0].root_node;
    assert_eq!(tree::ipreorder(root).count(), 3);
    assert_eq!(tree::ileaf(root).count(), 2);
    assert_eq!(tree::iforking_point(root).count(), 1);

    let leaf = tree::ileaf(root).next().unwrap();
    let upstream: Vec<usize> = tree::iupstream(&leaf)
        .map(|n| n.borrow().section_id)
        .collect();
    assert_eq!(upstream.len(), 2);
    assert_eq!(upstream[1], root.borrow().section_id);
}

#[test]
fn test_section_lookup() {
    let neuron = branched_neuron();
    let first_id = neuron.sections()[0].borrow().section_id;
    assert!(neuron.section(first_id).is_ok());
    assert!(matches!(
        neuron.section(9999),
        Err(MorphologyError::SectionLookup(9999))
    ));
}

#[test]
fn test_transform_does_not_alias_cache() {
    let neuron = branched_neuron();
    // populate the cached view before transforming
    let before = neuron.points().clone();

    let shifted = neuron
        .transform(|[x, y, z]| [x + 10.0, y, z])
        .unwrap();

    // original cache untouched
    assert_eq!(neuron.points(), &before);
    // new aggregate reflects the transform
    let after = shifted.points();
    assert_eq!(after.nrows(), before.nrows());
    for (new, old) in after.outer_iter().zip(before.outer_iter()) {
        assert_eq!(new[0], old[0] + 10.0);
        assert_eq!(new[1], old[1]);
        assert_eq!(new[2], old[2]);
        assert_eq!(new[3], old[3]);
    }
}

#[test]
fn test_sixteen_point_chain() {
    // single unbranched chain with sequential IDs 0..15
    let rows: Vec<Row> = (0..16).map(|i| row(i as f64, PointType::Axon, i, i - 1)).collect();
    let data = DataWrapper::new(rows, SourceFormat::Swc);

    assert_eq!(data.sections().count(), 1);
    let (_, section) = data.sections().next().unwrap();
    assert_eq!(section.point_positions().count(), 16);
    assert_eq!(data.get_fork_points().len(), 0);
    assert_eq!(data.get_end_points(), vec![15]);

    // building from the root sentinel yields one tree holding all rows
    let trees = make_trees(&data);
    assert_eq!(trees.len(), 1);
    let visited: usize = tree::ipreorder(&trees[0])
        .map(|n| n.borrow().points.len())
        .sum();
    assert_eq!(visited, 16);
    assert_eq!(tree::ileaf(&trees[0]).count(), 1);
}

#[test]
fn test_make_trees_with_unconnected_roots() {
    // a connected axon plus a second tree with no soma attachment
    let rows = vec![
        row(0.0, PointType::Soma, 0, -1),
        row(1.0, PointType::Axon, 1, 0),
        row(2.0, PointType::Axon, 2, 1),
        row(10.0, PointType::BasalDendrite, 3, -1),
        row(11.0, PointType::BasalDendrite, 4, 3),
    ];
    let data = DataWrapper::new(rows, SourceFormat::Swc);
    let trees = make_trees(&data);
    assert_eq!(trees.len(), 2);
}

#[test]
fn test_two_point_soma_is_rejected() {
    let rows = vec![
        row(0.0, PointType::Soma, 0, -1),
        row(1.0, PointType::Soma, 1, 0),
        row(2.0, PointType::Axon, 2, 1),
    ];
    let data = DataWrapper::new(rows, SourceFormat::Swc);
    assert!(matches!(
        Neuron::from_data(data, "bad"),
        Err(MorphologyError::Soma(_))
    ));
}
