// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The neuron aggregate and the section-tree builder.
//!
//! [`Neuron`] owns the soma and the ordered neurite trees built from a
//! [`DataWrapper`], plus the flattened section list for convenience. It is
//! immutable after construction; geometric transforms produce a new
//! aggregate so that cached derived views can never go stale.

use std::cell::OnceCell;
use std::rc::Rc;

use ndarray::Array2;
use tracing::debug;

use crate::dataformat::{NeuriteType, PointType, Row};
use crate::datawrapper::{DataWrapper, SourceFormat};
use crate::error::{MorphologyError, Result};
use crate::soma::{check_soma_topology, make_soma, Soma};
use crate::tree::{self, Section, SectionRef};

/// One rooted tree of sections hanging off the soma.
#[derive(Debug)]
pub struct Neurite {
    pub root_node: SectionRef,
    pub neurite_type: NeuriteType,
}

impl Neurite {
    /// Pre-order iterator over the neurite's sections.
    pub fn iter_sections(&self) -> tree::Preorder {
        tree::ipreorder(&self.root_node)
    }

    /// All points of the neurite, without the duplicate boundary point
    /// shared between a section and its parent.
    pub fn points(&self) -> Vec<Row> {
        let mut out = Vec::new();
        for (i, node) in self.iter_sections().enumerate() {
            let node = node.borrow();
            // every section's first point duplicates its parent's last
            // point, except for the very first point of the root
            let skip = if i == 0 { 0 } else { 1 };
            out.extend(node.points.iter().skip(skip).copied());
        }
        out
    }
}

/// Classify a neurite tree from the type codes of its points.
///
/// The tree type is the median point type code over the whole tree, so a
/// handful of mislabeled points does not change the classification.
pub fn find_tree_type(root: &SectionRef) -> NeuriteType {
    let mut codes: Vec<i64> = Vec::new();
    for node in tree::ipreorder(root) {
        codes.extend(node.borrow().points.iter().map(|p| p.ntype.code()));
    }
    if codes.is_empty() {
        return NeuriteType::Undefined;
    }
    codes.sort_unstable();
    let n = codes.len();
    let median = if n % 2 == 1 {
        codes[n / 2] as f64
    } else {
        (codes[n / 2 - 1] + codes[n / 2]) as f64 / 2.0
    };
    NeuriteType::from_code(median.floor() as i64)
}

/// Drop a tree's initial point if it is soma-typed.
///
/// Formats whose extracted sections overlap with the soma leave the shared
/// soma point at the head of each trunk section.
pub fn remove_soma_initial_point(root: &SectionRef) {
    let mut node = root.borrow_mut();
    if node.points.first().map(|p| p.ntype) == Some(PointType::Soma) {
        node.points.remove(0);
    }
}

/// Build neurite trees from a wrapped raw data block.
///
/// Sections are instantiated as tree nodes in one linear pass starting at
/// the smallest trunk index, then linked parent-to-child in a second pass.
/// Sections held inside the soma are never materialized as tree nodes.
/// `post_action` runs on every root node before the tree type is assigned.
pub fn make_neurites<F>(
    data: &DataWrapper,
    post_action: Option<F>,
) -> (Vec<Neurite>, Vec<SectionRef>)
where
    F: Fn(&SectionRef),
{
    let trunks = data.neurite_root_section_ids();
    if trunks.is_empty() {
        return (Vec::new(), Vec::new());
    }
    // trunk indexes come out in arena order, so the first is the smallest
    let offset = trunks[0];
    let count = data.section_count();

    // one pass over sections to build nodes
    let mut nodes: Vec<Option<SectionRef>> = vec![None; count];
    for (idx, slot) in nodes.iter_mut().enumerate().skip(offset) {
        if let Some(sec) = data.section_at(idx) {
            if sec.is_empty() {
                continue;
            }
            let points: Vec<Row> = sec.point_positions().map(|p| data.rows()[p]).collect();
            *slot = Some(Section::new(idx, NeuriteType::from(sec.ntype), points));
        }
    }

    // one pass over nodes to connect children to parents
    for idx in offset..count {
        let node = match &nodes[idx] {
            Some(node) => node,
            None => continue,
        };
        let sec = match data.section_at(idx) {
            Some(sec) => sec,
            None => continue,
        };
        if sec.pid >= offset as i64 {
            if let Some(parent) = nodes[sec.pid as usize].as_ref() {
                Section::add_child(parent, node);
            }
        }
    }

    let mut neurites = Vec::with_capacity(trunks.len());
    for trunk in trunks {
        let root = match &nodes[trunk] {
            Some(root) => Rc::clone(root),
            None => continue,
        };
        if let Some(action) = &post_action {
            action(&root);
        }
        let neurite_type = find_tree_type(&root);
        neurites.push(Neurite {
            root_node: root,
            neurite_type,
        });
    }

    let sections: Vec<SectionRef> = nodes.into_iter().flatten().collect();
    debug!(
        "built {} neurites over {} sections",
        neurites.len(),
        sections.len()
    );
    (neurites, sections)
}

/// Build one section tree per root section, connected to a soma or not.
///
/// Used by the exploratory multi-root loading mode: soma sections are
/// skipped, every other section becomes a node, and any node without a
/// materialized parent is a root. All builds share the wrapper's read-only
/// adjacency index.
pub fn make_trees(data: &DataWrapper) -> Vec<SectionRef> {
    let count = data.section_count();
    let mut nodes: Vec<Option<SectionRef>> = vec![None; count];
    for (idx, slot) in nodes.iter_mut().enumerate() {
        if let Some(sec) = data.section_at(idx) {
            if sec.is_empty() || sec.ntype == PointType::Soma {
                continue;
            }
            let points: Vec<Row> = sec.point_positions().map(|p| data.rows()[p]).collect();
            *slot = Some(Section::new(idx, NeuriteType::from(sec.ntype), points));
        }
    }
    for idx in 0..count {
        let node = match &nodes[idx] {
            Some(node) => node,
            None => continue,
        };
        let sec = match data.section_at(idx) {
            Some(sec) => sec,
            None => continue,
        };
        if sec.pid > -1 {
            if let Some(parent) = nodes[sec.pid as usize].as_ref() {
                Section::add_child(parent, node);
            }
        }
    }
    nodes
        .into_iter()
        .flatten()
        .filter(|node| node.borrow().is_root())
        .collect()
}

/// A neuron: soma plus neurite trees, built once from a raw data block.
///
/// Treated as immutable by consumers; [`Neuron::transform`] returns a new
/// aggregate rather than mutating coordinates in place, because the
/// flattened points view is cached per instance.
#[derive(Debug)]
pub struct Neuron {
    name: String,
    soma: Soma,
    neurites: Vec<Neurite>,
    sections: Vec<SectionRef>,
    data: DataWrapper,
    points: OnceCell<Array2<f64>>,
}

impl Neuron {
    /// Build a neuron from a wrapped raw data block.
    ///
    /// Fails with a typed error if the soma points are missing or do not
    /// form a valid soma.
    pub fn from_data(data: DataWrapper, name: impl Into<String>) -> Result<Neuron> {
        let soma_rows = data.soma_points();
        if data.fmt() == SourceFormat::Swc {
            check_soma_topology(&soma_rows)?;
        }
        let soma = make_soma(soma_rows)?;

        // extraction-based formats leave the shared soma point at the
        // head of each trunk section
        let post: Option<fn(&SectionRef)> = match data.fmt() {
            SourceFormat::Swc | SourceFormat::NeurolucidaAscii => Some(remove_soma_initial_point),
            SourceFormat::HierarchicalV1 | SourceFormat::HierarchicalV2 => None,
        };
        let (neurites, sections) = make_neurites(&data, post);

        Ok(Neuron {
            name: name.into(),
            soma,
            neurites,
            sections,
            data,
            points: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn soma(&self) -> &Soma {
        &self.soma
    }

    pub fn neurites(&self) -> &[Neurite] {
        &self.neurites
    }

    /// Flattened list of all built section nodes, in section-ID order.
    pub fn sections(&self) -> &[SectionRef] {
        &self.sections
    }

    /// Section node by section ID.
    pub fn section(&self, section_id: usize) -> Result<SectionRef> {
        self.sections
            .binary_search_by_key(&section_id, |s| s.borrow().section_id)
            .map(|i| Rc::clone(&self.sections[i]))
            .map_err(|_| MorphologyError::SectionLookup(section_id))
    }

    /// The underlying wrapped data block.
    pub fn data(&self) -> &DataWrapper {
        &self.data
    }

    /// Unordered `[X, Y, Z, R]` array with all the points in this neuron:
    /// soma points followed by each neurite's deduplicated points.
    ///
    /// Computed lazily and cached for the lifetime of the aggregate.
    pub fn points(&self) -> &Array2<f64> {
        self.points.get_or_init(|| {
            let mut flat: Vec<f64> = Vec::new();
            let mut count = 0;
            for p in self.soma.points() {
                flat.extend(p.xyzr());
                count += 1;
            }
            for neurite in &self.neurites {
                for p in neurite.points() {
                    flat.extend(p.xyzr());
                    count += 1;
                }
            }
            Array2::from_shape_vec((count, 4), flat)
                .unwrap_or_else(|_| Array2::zeros((0, 4)))
        })
    }

    /// Copy of this neuron with a 3D transformation applied to every
    /// coordinate. The original aggregate and its cached views are left
    /// untouched.
    pub fn transform<F>(&self, f: F) -> Result<Neuron>
    where
        F: Fn([f64; 3]) -> [f64; 3],
    {
        Neuron::from_data(self.data.map_coordinates(f), self.name.clone())
    }
}
