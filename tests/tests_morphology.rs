// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests over the umbrella crate's public surface.

use std::io::Write;

use neuroarbor::prelude::*;
use neuroarbor::structures::tree;

const NEURON_SWC: &str = "\
# soma, then one axon and one basal dendrite
1 1 0 0 0 3.0 -1
2 1 0 1 0 3.0 1
3 1 0 2 0 3.0 2
4 2 1 0 0 1.0 3
5 2 2 0 0 1.0 4
6 2 3 1 0 1.0 5
7 2 4 1 0 1.0 6
8 2 3 -1 0 1.0 5
9 2 4 -1 0 1.0 8
10 3 -1 0 0 1.0 3
11 3 -2 0 0 1.0 10
";

fn fixture(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_load_and_traverse() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "neuron.swc", NEURON_SWC);
    let neuron = load_neuron(&path).unwrap();

    assert_eq!(neuron.name(), "neuron");
    assert_eq!(neuron.neurites().len(), 2);
    let types: Vec<NeuriteType> = neuron.neurites().iter().map(|n| n.neurite_type).collect();
    assert_eq!(types, vec![NeuriteType::Axon, NeuriteType::BasalDendrite]);

    // the axon forks once: three sections, two leaves
    let axon = &neuron.neurites()[0];
    assert_eq!(axon.iter_sections().count(), 3);
    assert_eq!(tree::ileaf(&axon.root_node).count(), 2);
    // the dendrite is a single unbranched section
    let dendrite = &neuron.neurites()[1];
    assert_eq!(dendrite.iter_sections().count(), 1);

    // soma summary
    assert_eq!(neuron.soma().points().len(), 3);
    assert_eq!(neuron.soma().center(), [0.0, 0.0, 0.0]);
}

#[test]
fn test_flattened_points_cover_all_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "neuron.swc", NEURON_SWC);
    let neuron = load_neuron(&path).unwrap();

    // soma points plus deduplicated neurite points reproduce every row
    assert_eq!(neuron.points().nrows(), 11);
}

#[test]
fn test_transform_produces_independent_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "neuron.swc", NEURON_SWC);
    let neuron = load_neuron(&path).unwrap();
    let original = neuron.points().clone();

    let moved = neuron.transform(|[x, y, z]| [x, y, z + 5.0]).unwrap();
    assert_eq!(neuron.points(), &original);
    for (new, old) in moved.points().outer_iter().zip(original.outer_iter()) {
        assert_eq!(new[2], old[2] + 5.0);
    }
}

#[test]
fn test_checks_rerun_clean_on_validated_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "neuron.swc", NEURON_SWC);
    let data = load_data(&path).unwrap();

    assert!(checks::has_increasing_ids(&data).passed());
    assert!(checks::is_single_tree(&data).passed());
    assert!(checks::no_missing_parents(&data).passed());
    assert!(checks::has_soma_points(&data).passed());
    // and again: validation has no side effects on the stream
    assert!(checks::has_increasing_ids(&data).passed());
    assert!(checks::is_single_tree(&data).passed());
    assert!(checks::no_missing_parents(&data).passed());
}

#[test]
fn test_typed_errors_discriminate() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "unknown.xyz", "");
    match load_neuron(&path) {
        Err(MorphologyError::UnknownExtension(ext)) => assert_eq!(ext, "xyz"),
        other => panic!("expected UnknownExtension, got {:?}", other.err()),
    }
}
