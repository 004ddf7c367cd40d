// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Morphology loading entry points.
//!
//! [`load_data`] dispatches on the file extension (case-insensitive) and
//! returns the wrapped raw data block. [`load_neuron`] additionally runs
//! the mandatory structural checks and builds the validated [`Neuron`]
//! aggregate. [`load_trees`] is the exploratory variant: it loads every
//! tree in the file, connected to a soma or not, and only enforces ID
//! sequencing.

use std::path::Path;

use tracing::debug;

use neuroarbor_structures::datawrapper::DataWrapper;
use neuroarbor_structures::neuron::{make_trees, Neuron};
use neuroarbor_structures::tree::SectionRef;
use neuroarbor_structures::{MorphologyError, Result};

use crate::checks;
use crate::container;
use crate::neurolucida;
use crate::swc;

/// Unpack a morphology file into a wrapped data block.
///
/// The reader is selected from the extension, case-insensitively:
///
/// * `.swc`: flat row format
/// * `.mhc`: hierarchical container
/// * `.asc`: s-expression text
pub fn load_data(path: &Path) -> Result<DataWrapper> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "swc" => swc::read(path),
        "mhc" => container::read(path),
        "asc" => neurolucida::read(path),
        _ => Err(MorphologyError::UnknownExtension(extension)),
    }
}

/// Run the mandatory structural checks on a loaded data block.
fn check_structure(data: &DataWrapper) -> Result<()> {
    let ids = checks::has_increasing_ids(data);
    if !ids.passed() {
        return Err(MorphologyError::IdSequence(ids.info));
    }
    let single = checks::is_single_tree(data);
    if !single.passed() {
        return Err(MorphologyError::MultipleTrees(single.info));
    }
    let parents = checks::no_missing_parents(data);
    if !parents.passed() {
        return Err(MorphologyError::MissingParents(parents.info));
    }
    Ok(())
}

/// Load a file as a validated neuron.
///
/// Raises typed structural errors on invalid ID sequences, multiple trees
/// or missing parents, and soma errors from the aggregate build. The
/// neuron is named after the file stem.
pub fn load_neuron(path: &Path) -> Result<Neuron> {
    let data = load_data(path)?;
    check_structure(&data)?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Neuron".to_string());
    debug!("building neuron '{}' from {}", name, data.fmt());
    Neuron::from_data(data, name)
}

/// Load all section trees in a file, including unconnected roots.
///
/// Skips the single-tree and soma-presence checks by design, while still
/// enforcing ID sequencing. Every build shares the data block's read-only
/// adjacency index.
pub fn load_trees(path: &Path) -> Result<Vec<SectionRef>> {
    let data = load_data(path)?;
    let ids = checks::has_increasing_ids(&data);
    if !ids.passed() {
        return Err(MorphologyError::IdSequence(ids.info));
    }
    Ok(make_trees(&data))
}
