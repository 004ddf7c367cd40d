// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Raw data block wrapper and section extraction.
//!
//! [`DataWrapper`] holds the canonical row stream produced by a format
//! reader together with everything derived from it in a single pass:
//! the ID-to-position map, the parent-to-children adjacency index and the
//! topological sections extracted from the point chain.
//!
//! Sections are maximal unbranched single-type runs of points. They live in
//! an index-addressed arena; merging a gap artifact leaves a redirect
//! tombstone at the absorbed index so that recorded parent links stay valid
//! without rewriting neighboring records.

use ahash::{AHashMap, AHashSet};
use tracing::info;

use crate::dataformat::{PointType, Row, ROOT_ID};
use crate::error::{MorphologyError, Result};

/// Originating file format of a row stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Swc,
    HierarchicalV1,
    HierarchicalV2,
    NeurolucidaAscii,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            SourceFormat::Swc => "SWC",
            SourceFormat::HierarchicalV1 => "MHC-V1",
            SourceFormat::HierarchicalV2 => "MHC-V2",
            SourceFormat::NeurolucidaAscii => "NL-ASCII",
        };
        write!(f, "{}", tag)
    }
}

/// One extracted section: an ordered run of block positions, a structural
/// type and the index of the parent section.
///
/// `ids` holds positions into the data block, not row IDs. The first entry
/// is the connecting parent point shared with the parent section, so
/// adjacent sections overlap by exactly one point; for root-level sections
/// the connector is the `-1` sentinel and carries no point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlockSection {
    pub ids: Vec<i64>,
    pub ntype: PointType,
    pub pid: i64,
}

impl DataBlockSection {
    fn new(ntype: PointType) -> DataBlockSection {
        DataBlockSection {
            ids: Vec::new(),
            ntype,
            pid: ROOT_ID,
        }
    }

    /// Block positions of the section's points, connector sentinel excluded.
    pub fn point_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.ids.iter().filter(|&&i| i >= 0).map(|&i| i as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Arena slot: a live section, or a redirect left behind by a gap merge.
#[derive(Debug, Clone)]
enum SectionSlot {
    Live(DataBlockSection),
    Tombstone { redirect: usize },
}

/// Wrapper over a raw data block and everything derived from it.
///
/// There is no ordering constraint on the block: a child may reference a
/// parent ID that comes later, IDs need not be dense, and multifurcations
/// are allowed. Whether such streams are acceptable is decided by the
/// consistency checks, not here.
#[derive(Debug, Clone)]
pub struct DataWrapper {
    data_block: Vec<Row>,
    fmt: SourceFormat,
    slots: Vec<SectionSlot>,
    /// row ID -> block position; the ROOT_ID sentinel maps to -1
    id_map: AHashMap<i64, i64>,
    /// parent ID -> ordered child IDs; built once, read-only thereafter
    adjacency: AHashMap<i64, Vec<i64>>,
}

impl DataWrapper {
    /// Wrap a data block, extracting sections from the point chain.
    pub fn new(data_block: Vec<Row>, fmt: SourceFormat) -> DataWrapper {
        let (id_map, adjacency) = build_indexes(&data_block);
        let slots = extract_sections(&data_block, &id_map);
        DataWrapper {
            data_block,
            fmt,
            slots,
            id_map,
            adjacency,
        }
    }

    /// Wrap a data block whose sections are already known (block readers).
    pub fn with_sections(
        data_block: Vec<Row>,
        fmt: SourceFormat,
        sections: Vec<DataBlockSection>,
    ) -> DataWrapper {
        let (id_map, adjacency) = build_indexes(&data_block);
        DataWrapper {
            data_block,
            fmt,
            slots: sections.into_iter().map(SectionSlot::Live).collect(),
            id_map,
            adjacency,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.data_block
    }

    pub fn fmt(&self) -> SourceFormat {
        self.fmt
    }

    /// Block position of a row ID, if the ID exists.
    pub fn position_of(&self, id: i64) -> Option<usize> {
        match self.id_map.get(&id) {
            Some(&pos) if pos >= 0 => Some(pos as usize),
            _ => None,
        }
    }

    /// Row with the given ID.
    pub fn get_row(&self, id: i64) -> Result<&Row> {
        self.position_of(id)
            .map(|pos| &self.data_block[pos])
            .ok_or(MorphologyError::Lookup(id))
    }

    /// Parent ID of the row with the given ID.
    pub fn get_parent(&self, id: i64) -> Result<i64> {
        self.get_row(id).map(|row| row.pid)
    }

    /// IDs of the children of `id`. `ROOT_ID` is a valid query and yields
    /// the root rows.
    pub fn get_children(&self, id: i64) -> Result<&[i64]> {
        if id != ROOT_ID && self.position_of(id).is_none() {
            return Err(MorphologyError::Lookup(id));
        }
        Ok(self
            .adjacency
            .get(&id)
            .map(|children| children.as_slice())
            .unwrap_or(&[]))
    }

    /// IDs of rows with no children, in block order.
    pub fn get_end_points(&self) -> Vec<i64> {
        self.data_block
            .iter()
            .filter(|row| !self.adjacency.contains_key(&row.id))
            .map(|row| row.id)
            .collect()
    }

    /// IDs of rows with more than one child, in block order.
    pub fn get_fork_points(&self) -> Vec<i64> {
        self.data_block
            .iter()
            .filter(|row| self.adjacency.get(&row.id).map_or(0, Vec::len) > 1)
            .map(|row| row.id)
            .collect()
    }

    /// All soma-typed rows, in block order.
    pub fn soma_points(&self) -> Vec<Row> {
        self.data_block
            .iter()
            .filter(|row| row.ntype == PointType::Soma)
            .copied()
            .collect()
    }

    /// Number of arena slots, tombstones included. Section indexes recorded
    /// in `pid` fields address this range.
    pub fn section_count(&self) -> usize {
        self.slots.len()
    }

    /// Live section at an arena index; `None` for tombstones.
    pub fn section_at(&self, index: usize) -> Option<&DataBlockSection> {
        match self.slots.get(index) {
            Some(SectionSlot::Live(sec)) => Some(sec),
            _ => None,
        }
    }

    /// Resolve an arena index through at most one level of redirect chain,
    /// returning the live section and its final index.
    pub fn resolve_section(&self, index: usize) -> Option<(usize, &DataBlockSection)> {
        let mut idx = index;
        for _ in 0..2 {
            match self.slots.get(idx)? {
                SectionSlot::Live(sec) => return Some((idx, sec)),
                SectionSlot::Tombstone { redirect } => idx = *redirect,
            }
        }
        match self.slots.get(idx)? {
            SectionSlot::Live(sec) => Some((idx, sec)),
            SectionSlot::Tombstone { .. } => None,
        }
    }

    /// Externally visible sections: live and non-empty, with arena indexes.
    pub fn sections(&self) -> impl Iterator<Item = (usize, &DataBlockSection)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            SectionSlot::Live(sec) if !sec.is_empty() => Some((i, sec)),
            _ => None,
        })
    }

    /// Arena indexes of the initial neurite sections: sections whose parent
    /// section is soma-typed while they are not.
    pub fn neurite_root_section_ids(&self) -> Vec<usize> {
        self.sections()
            .filter(|(_, sec)| {
                if sec.pid <= ROOT_ID || sec.ntype == PointType::Soma {
                    return false;
                }
                match self.resolve_section(sec.pid as usize) {
                    Some((_, parent)) => parent.ntype == PointType::Soma,
                    None => false,
                }
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// New wrapper with every coordinate mapped through `f`.
    ///
    /// Topology (IDs, parents, sections, adjacency) is carried over
    /// untouched; only the coordinate columns change.
    pub fn map_coordinates<F>(&self, f: F) -> DataWrapper
    where
        F: Fn([f64; 3]) -> [f64; 3],
    {
        let data_block = self
            .data_block
            .iter()
            .map(|row| {
                let [x, y, z] = f(row.xyz());
                Row { x, y, z, ..*row }
            })
            .collect();
        DataWrapper {
            data_block,
            fmt: self.fmt,
            slots: self.slots.clone(),
            id_map: self.id_map.clone(),
            adjacency: self.adjacency.clone(),
        }
    }
}

/// Build the ID map and the parent-to-children adjacency index in one
/// linear pass over the block.
fn build_indexes(data_block: &[Row]) -> (AHashMap<i64, i64>, AHashMap<i64, Vec<i64>>) {
    let mut id_map = AHashMap::with_capacity(data_block.len() + 1);
    id_map.insert(ROOT_ID, -1);
    let mut adjacency: AHashMap<i64, Vec<i64>> = AHashMap::new();
    for (pos, row) in data_block.iter().enumerate() {
        id_map.insert(row.id, pos as i64);
        adjacency.entry(row.pid).or_default().push(row.id);
    }
    (id_map, adjacency)
}

/// Section end points: rows with no children or more than one (leaves and
/// multifurcations), plus points sitting at the soma/neurite boundary.
fn section_end_points(data_block: &[Row], id_map: &AHashMap<i64, i64>) -> AHashSet<i64> {
    let mut non_soma_parents = AHashSet::new();
    for row in data_block.iter().filter(|r| r.ntype != PointType::Soma) {
        non_soma_parents.insert(row.pid);
    }

    // soma points that parent a neurite point force a section break
    let mut end_pts: AHashSet<i64> = data_block
        .iter()
        .filter(|r| r.ntype == PointType::Soma && non_soma_parents.contains(&r.id))
        .filter_map(|r| id_map.get(&r.id).copied())
        .collect();

    let mut n_children: AHashMap<i64, usize> = AHashMap::new();
    for row in data_block {
        *n_children.entry(row.pid).or_insert(0) += 1;
    }
    for (pos, row) in data_block.iter().enumerate() {
        if n_children.get(&row.id).copied().unwrap_or(0) != 1 {
            end_pts.insert(pos as i64);
        }
    }
    end_pts
}

/// Partition a data block into sections.
///
/// A new section always starts by recording its connecting parent point, so
/// adjacent sections overlap by one point. A row whose parent is not the
/// previous accumulated point opens a "gap": the interrupted section is
/// marked as a gap artifact, the new section re-links to the true
/// parent/child pair, and the artifact is merged into its continuation
/// after the pass.
fn extract_sections(data_block: &[Row], id_map: &AHashMap<i64, i64>) -> Vec<SectionSlot> {
    if data_block.is_empty() {
        return Vec::new();
    }

    let mut end_pts = section_end_points(data_block, id_map);
    let mut gap_sections: AHashSet<usize> = AHashSet::new();
    let mut sections: Vec<DataBlockSection> = vec![DataBlockSection::new(PointType::Undefined)];

    // last point of a closed section -> index of that section
    let mut parent_section: AHashMap<i64, i64> = AHashMap::new();
    parent_section.insert(-1, -1);

    let last_pos = data_block.len() as i64 - 1;
    for (pos, row) in data_block.iter().enumerate() {
        let row_pos = pos as i64;
        let parent_pos = id_map.get(&row.pid).copied().unwrap_or(-1);

        let curr_idx = sections.len() - 1;
        let curr = &mut sections[curr_idx];
        if curr.ids.is_empty() {
            // first entry of a section is the connecting parent point
            curr.ids.push(parent_pos);
            curr.ntype = row.ntype;
        }

        let gap = curr.ids.last() != Some(&parent_pos);
        if gap {
            end_pts.insert(row_pos);
        } else {
            curr.ids.push(row_pos);
        }

        if end_pts.contains(&row_pos) {
            let closing = sections.len() - 1;
            if let Some(&last_id) = sections[closing].ids.last() {
                parent_section.insert(last_id, closing as i64);
            }
            if gap {
                // the interrupted section is a gap artifact; the new section
                // re-links the true parent/child pair spanning the gap
                let mut sec = DataBlockSection::new(row.ntype);
                sec.ids.extend([parent_pos, row_pos]);
                sections.push(sec);
                gap_sections.insert(closing);
            } else if row_pos != last_pos {
                sections.push(DataBlockSection::new(PointType::Undefined));
            }
        }
    }

    // parent of a section is the section owning its first point
    for sec in sections.iter_mut().filter(|s| !s.ids.is_empty()) {
        sec.pid = parent_section.get(&sec.ids[0]).copied().unwrap_or(ROOT_ID);
    }

    let mut slots: Vec<SectionSlot> = sections.into_iter().map(SectionSlot::Live).collect();

    // splice gap artifacts in front of their continuation; a redirect
    // tombstone keeps recorded parent indexes resolvable
    for idx in 0..slots.len() {
        let pid = match &slots[idx] {
            SectionSlot::Live(sec) if sec.pid > ROOT_ID => sec.pid as usize,
            _ => continue,
        };
        if !gap_sections.contains(&pid) {
            continue;
        }
        let artifact = match &slots[pid] {
            SectionSlot::Live(sec) => sec.clone(),
            SectionSlot::Tombstone { .. } => continue,
        };
        if let SectionSlot::Live(sec) = &mut slots[idx] {
            let mut ids = artifact.ids;
            ids.extend(sec.ids.iter().skip(1).copied());
            sec.ids = ids;
            sec.ntype = artifact.ntype;
            sec.pid = artifact.pid;
        }
        slots[pid] = SectionSlot::Tombstone { redirect: idx };
    }

    // chase parent links through redirects; a merge cascades one level
    for idx in 0..slots.len() {
        let pid = match &slots[idx] {
            SectionSlot::Live(sec) if sec.pid > ROOT_ID => sec.pid as usize,
            _ => continue,
        };
        let mut resolved = pid;
        for _ in 0..2 {
            match &slots[resolved] {
                SectionSlot::Tombstone { redirect } => resolved = *redirect,
                SectionSlot::Live(_) => break,
            }
        }
        if resolved != pid && resolved != idx {
            if let SectionSlot::Live(sec) = &mut slots[idx] {
                sec.pid = resolved as i64;
            }
        }
    }

    slots
}

/// Helper to create a [`DataWrapper`] from "block" sections.
///
/// Readers that already have contiguous point blocks per section (the
/// hierarchical container and the s-expression format) register each block
/// with its parent block and type, and the builder renumbers everything
/// into one dense data block with cross-block parent links.
#[derive(Debug, Default)]
pub struct BlockNeuronBuilder {
    sections: std::collections::BTreeMap<i64, BlockSection>,
}

#[derive(Debug)]
struct BlockSection {
    parent_id: i64,
    section_type: PointType,
    points: Vec<[f64; 4]>,
}

impl BlockNeuronBuilder {
    pub fn new() -> BlockNeuronBuilder {
        BlockNeuronBuilder::default()
    }

    /// Register a section block.
    ///
    /// `points` rows are `[X, Y, Z, R]`. Registering the same `id` twice is
    /// an error.
    pub fn add_section(
        &mut self,
        id: i64,
        parent_id: i64,
        section_type: PointType,
        points: Vec<[f64; 4]>,
    ) -> Result<()> {
        if self.sections.contains_key(&id) {
            return Err(MorphologyError::Parse(format!(
                "section id {} already exists in block builder",
                id
            )));
        }
        self.sections.insert(
            id,
            BlockSection {
                parent_id,
                section_type,
                points,
            },
        );
        Ok(())
    }

    /// Assemble the registered blocks into a [`DataWrapper`].
    ///
    /// Row IDs are renumbered densely in block order; within a block each
    /// point's parent is its predecessor and a block's first point is
    /// parent-linked to the last row of the parent block.
    pub fn build(self, fmt: SourceFormat) -> DataWrapper {
        self.check_consistency();

        // insertion ids ahead of time: children may carry a lower block id
        // than their parents
        let mut last_row_of: AHashMap<i64, i64> = AHashMap::new();
        let mut section_index_of: AHashMap<i64, i64> = AHashMap::new();
        let mut row_count: i64 = 0;
        for (index, (&id, sec)) in self.sections.iter().enumerate() {
            row_count += sec.points.len() as i64;
            last_row_of.insert(id, row_count - 1);
            section_index_of.insert(id, index as i64);
        }

        let mut data_block = Vec::with_capacity(row_count as usize);
        let mut sections = Vec::with_capacity(self.sections.len());
        let mut next_id: i64 = 0;
        for (_, sec) in self.sections.iter() {
            let start = next_id;
            for p in &sec.points {
                let pid = if next_id == start {
                    last_row_of
                        .get(&sec.parent_id)
                        .copied()
                        .unwrap_or(ROOT_ID)
                } else {
                    next_id - 1
                };
                data_block.push(Row::new(
                    p[0],
                    p[1],
                    p[2],
                    p[3],
                    sec.section_type,
                    next_id,
                    pid,
                ));
                next_id += 1;
            }
            sections.push(DataBlockSection {
                ids: (start..next_id).collect(),
                ntype: sec.section_type,
                pid: section_index_of
                    .get(&sec.parent_id)
                    .copied()
                    .unwrap_or(ROOT_ID),
            });
        }

        DataWrapper::with_sections(data_block, fmt, sections)
    }

    fn check_consistency(&self) {
        let soma_count = self
            .sections
            .values()
            .filter(|s| s.section_type == PointType::Soma)
            .count();
        if soma_count != 1 {
            info!("Have {} somas, expected 1", soma_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_rows(n: i64, ntype: PointType) -> Vec<Row> {
        (0..n)
            .map(|i| Row::new(i as f64, 0.0, 0.0, 1.0, ntype, i, i - 1))
            .collect()
    }

    #[test]
    fn test_single_chain_is_one_section() {
        let rows = chain_rows(16, PointType::Soma);
        let dw = DataWrapper::new(rows, SourceFormat::Swc);
        let sections: Vec<_> = dw.sections().collect();
        assert_eq!(sections.len(), 1);
        // connector sentinel + 16 points
        assert_eq!(sections[0].1.ids.len(), 17);
        assert_eq!(sections[0].1.point_positions().count(), 16);
        assert_eq!(sections[0].1.pid, ROOT_ID);
        assert_eq!(dw.get_fork_points().len(), 0);
        assert_eq!(dw.get_end_points(), vec![15]);
    }

    #[test]
    fn test_soma_boundary_breaks_section() {
        // 3-point soma followed by a 3-point axon, no fork anywhere
        let mut rows = chain_rows(3, PointType::Soma);
        for i in 3..6 {
            rows.push(Row::new(i as f64, 0.0, 0.0, 1.0, PointType::Axon, i, i - 1));
        }
        let dw = DataWrapper::new(rows, SourceFormat::Swc);
        let sections: Vec<_> = dw.sections().collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].1.ntype, PointType::Soma);
        assert_eq!(sections[1].1.ntype, PointType::Axon);
        // the axon section overlaps the soma by its connecting point
        assert_eq!(sections[1].1.ids[0], 2);
        assert_eq!(dw.neurite_root_section_ids(), vec![sections[1].0]);
    }

    #[test]
    fn test_bifurcation_yields_three_sections() {
        //      0-1-2
        //           \ 3-4
        //           \ 5-6   (both forks re-attach at row 2)
        let mut rows = chain_rows(3, PointType::Axon);
        rows.push(Row::new(3.0, 1.0, 0.0, 1.0, PointType::Axon, 3, 2));
        rows.push(Row::new(4.0, 1.0, 0.0, 1.0, PointType::Axon, 4, 3));
        rows.push(Row::new(3.0, -1.0, 0.0, 1.0, PointType::Axon, 5, 2));
        rows.push(Row::new(4.0, -1.0, 0.0, 1.0, PointType::Axon, 6, 5));
        let dw = DataWrapper::new(rows, SourceFormat::Swc);
        let sections: Vec<_> = dw.sections().collect();
        assert_eq!(sections.len(), 3);
        assert_eq!(dw.get_fork_points(), vec![2]);
        assert_eq!(dw.get_end_points(), vec![4, 6]);
        // both child sections record the fork section as parent
        let fork_section = sections[0].0 as i64;
        assert_eq!(sections[1].1.pid, fork_section);
        assert_eq!(sections[2].1.pid, fork_section);
    }

    #[test]
    fn test_gap_sections_are_merged() {
        // rows of one unbranched chain, but with the second half of another
        // branch interleaved: 0-1-2 continues at 5-6, 3-4 hangs off row 1
        let rows = vec![
            Row::new(0.0, 0.0, 0.0, 1.0, PointType::Axon, 0, -1),
            Row::new(1.0, 0.0, 0.0, 1.0, PointType::Axon, 1, 0),
            Row::new(2.0, 0.0, 0.0, 1.0, PointType::Axon, 2, 1),
            Row::new(2.0, 1.0, 0.0, 1.0, PointType::Axon, 3, 1),
            Row::new(2.0, 2.0, 0.0, 1.0, PointType::Axon, 4, 3),
            Row::new(3.0, 0.0, 0.0, 1.0, PointType::Axon, 5, 2),
            Row::new(4.0, 0.0, 0.0, 1.0, PointType::Axon, 6, 5),
        ];
        let dw = DataWrapper::new(rows, SourceFormat::Swc);
        let sections: Vec<_> = dw.sections().collect();
        // fork at row 1: three visible sections after the gap merge
        assert_eq!(sections.len(), 3);
        // the merged continuation spans 1-2-5-6 (connector + three points)
        let merged = sections
            .iter()
            .find(|(_, s)| s.point_positions().any(|p| p == 5))
            .expect("merged section present");
        let positions: Vec<usize> = merged.1.point_positions().collect();
        assert_eq!(positions, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_block_builder_renumbers_and_links() {
        let mut builder = BlockNeuronBuilder::new();
        builder
            .add_section(0, ROOT_ID, PointType::Soma, vec![[0.0, 0.0, 0.0, 2.0]])
            .unwrap();
        builder
            .add_section(
                1,
                0,
                PointType::Axon,
                vec![[1.0, 0.0, 0.0, 1.0], [2.0, 0.0, 0.0, 1.0]],
            )
            .unwrap();
        let dw = builder.build(SourceFormat::HierarchicalV1);
        let rows = dw.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].pid, ROOT_ID);
        // first axon row links to the last soma row
        assert_eq!(rows[1].pid, 0);
        assert_eq!(rows[2].pid, 1);
        assert_eq!(dw.neurite_root_section_ids(), vec![1]);
    }

    #[test]
    fn test_block_builder_rejects_duplicate_id() {
        let mut builder = BlockNeuronBuilder::new();
        builder
            .add_section(3, ROOT_ID, PointType::Soma, vec![[0.0; 4]])
            .unwrap();
        let err = builder
            .add_section(3, ROOT_ID, PointType::Axon, vec![[0.0; 4]])
            .unwrap_err();
        assert!(matches!(err, MorphologyError::Parse(_)));
    }

    #[test]
    fn test_lookup_errors() {
        let dw = DataWrapper::new(chain_rows(4, PointType::Soma), SourceFormat::Swc);
        assert!(matches!(
            dw.get_row(99),
            Err(MorphologyError::Lookup(99))
        ));
        assert!(matches!(
            dw.get_children(99),
            Err(MorphologyError::Lookup(99))
        ));
        assert_eq!(dw.get_children(ROOT_ID).unwrap(), &[0]);
        assert_eq!(dw.get_parent(2).unwrap(), 1);
    }
}
