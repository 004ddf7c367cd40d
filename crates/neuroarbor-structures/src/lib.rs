// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core data structures for neuronal morphologies.
//!
//! Defines the canonical point row shared by every file reader, the
//! section extraction over raw data blocks, the section-tree nodes with
//! their traversal iterators, the soma representations and the `Neuron`
//! aggregate that ties them together.

pub mod dataformat;
pub mod datawrapper;
mod error;
pub mod morphmath;
pub mod neuron;
pub mod soma;
pub mod tree;

pub use dataformat::{NeuriteType, PointType, Row, ROOT_ID};
pub use datawrapper::{BlockNeuronBuilder, DataBlockSection, DataWrapper, SourceFormat};
pub use error::{MorphologyError, Result};
pub use neuron::{find_tree_type, make_neurites, make_trees, Neurite, Neuron};
pub use soma::{make_soma, Soma};
pub use tree::{Section, SectionRef};
