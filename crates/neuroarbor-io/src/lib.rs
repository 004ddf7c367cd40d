// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Morphology file readers, consistency checks and the neuron loader.
//!
//! Three readers unpack source-specific encodings into the canonical row
//! stream of `neuroarbor-structures`:
//!
//! * [`swc`]: flat rows, one point per line
//! * [`container`]: hierarchical binary container with two schema
//!   revisions
//! * [`neurolucida`]: s-expression text (experimental)
//!
//! [`checks`] validates row streams and built neurons; [`loader`] ties it
//! all together behind extension-dispatched entry points.

pub mod checks;
pub mod container;
pub mod loader;
pub mod neurolucida;
pub mod swc;

pub use checks::CheckResult;
pub use container::{Archive, Dataset};
pub use loader::{load_data, load_neuron, load_trees};
pub use swc::SwcOptions;
