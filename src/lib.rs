// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neuroarbor - neuronal morphology ingestion and analysis structures
//!
//! neuroarbor reads digitized neuronal morphology files and reconstructs a
//! validated in-memory model: a soma plus one or more branching neurite
//! trees, exposing traversal and random access for geometric and
//! topological analysis code.
//!
//! ## Supported formats
//!
//! * **`.swc`** - flat rows, one measured point per line
//! * **`.mhc`** - hierarchical binary container (two schema revisions)
//! * **`.asc`** - s-expression morphology text (experimental reader)
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use neuroarbor::prelude::*;
//!
//! let neuron = load_neuron(std::path::Path::new("Neuron.swc"))?;
//! for neurite in neuron.neurites() {
//!     for section in neurite.iter_sections() {
//!         let _ = section.borrow().length();
//!     }
//! }
//! let _soma_center = neuron.soma().center();
//! # Ok::<(), neuroarbor::structures::MorphologyError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Readers: swc, container, neurolucida                   │
//! │  (bytes -> canonical [X,Y,Z,R,TYPE,ID,P] row stream)    │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Checks: ID ordering, single tree, missing parents, …   │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Section extraction + tree building                     │
//! │  (sections, neurites, soma -> Neuron aggregate)         │
//! └─────────────────────────────────────────────────────────┘
//! ```

// Re-export core data structures
pub use neuroarbor_structures as structures;

// Re-export readers, checks and the loader
pub use neuroarbor_io as io;

/// Prelude - commonly used types and entry points
pub mod prelude {
    pub use crate::io::checks::{self, CheckResult};
    pub use crate::io::{load_data, load_neuron, load_trees};
    pub use crate::structures::{
        MorphologyError, NeuriteType, Neurite, Neuron, PointType, Row, Soma, ROOT_ID,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        // Just test that re-exports work
        use crate::prelude::*;
        let _root = ROOT_ID;
        let _ptype = PointType::Soma;
    }
}
