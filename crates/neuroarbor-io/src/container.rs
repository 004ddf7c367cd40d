// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hierarchical container reader.
//!
//! The container is an archive of named numeric datasets serialized with
//! bincode. Two schema revisions exist and are normalized to one internal
//! shape before unpacking:
//!
//! * **Revision 1**: `points` (`[X, Y, Z, D]` per point, position is
//!   identity) and `structure` (`[first_point, type, parent_group]` per
//!   group).
//! * **Revision 2**: a `neuron1` namespace with one points table per
//!   processing stage (`repaired` preferred, then `unraveled`, then
//!   `raw`; `unraveled` reuses the `raw` structure table), a structure
//!   table `[first_point, parent_group]` per stage and a shared
//!   `sectiontype` table, column-joined and reordered to the revision-1
//!   group layout.
//!
//! Unpacking broadcasts each group's type over its point range, links each
//! point to its predecessor (a group's first point to the last point of
//! the parent group) and stores the radius, not the diameter.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use neuroarbor_structures::dataformat::PointType;
use neuroarbor_structures::datawrapper::{BlockNeuronBuilder, DataWrapper, SourceFormat};
use neuroarbor_structures::{MorphologyError, Result};

const GPFIRST: usize = 0;
const GTYPE: usize = 1;
const GPID: usize = 2;

/// One named dataset of an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Dataset {
    Floats(Vec<Vec<f64>>),
    Ints(Vec<Vec<i64>>),
}

/// An archive of named numeric datasets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Archive {
    datasets: BTreeMap<String, Dataset>,
}

impl Archive {
    pub fn new() -> Archive {
        Archive::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, dataset: Dataset) {
        self.datasets.insert(name.into(), dataset);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    fn floats(&self, name: &str) -> Result<&Vec<Vec<f64>>> {
        match self.datasets.get(name) {
            Some(Dataset::Floats(rows)) => Ok(rows),
            Some(Dataset::Ints(_)) => Err(MorphologyError::Container(format!(
                "dataset '{}' is not a float table",
                name
            ))),
            None => Err(MorphologyError::Container(format!(
                "missing dataset '{}'",
                name
            ))),
        }
    }

    fn ints(&self, name: &str) -> Result<&Vec<Vec<i64>>> {
        match self.datasets.get(name) {
            Some(Dataset::Ints(rows)) => Ok(rows),
            Some(Dataset::Floats(_)) => Err(MorphologyError::Container(format!(
                "dataset '{}' is not an integer table",
                name
            ))),
            None => Err(MorphologyError::Container(format!(
                "missing dataset '{}'",
                name
            ))),
        }
    }

    /// Deserialize an archive from a file.
    pub fn open(path: &Path) -> Result<Archive> {
        let file = File::open(path)?;
        bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| MorphologyError::Container(format!("failed to decode archive: {}", e)))
    }

    /// Serialize the archive to a file. Used to produce container files
    /// from unpacked datasets, e.g. test fixtures.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| MorphologyError::Container(format!("failed to encode archive: {}", e)))
    }
}

/// Container schema revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerVersion {
    V1,
    V2,
}

fn get_version(archive: &Archive) -> Result<ContainerVersion> {
    if archive.contains("points") && archive.contains("structure") {
        return Ok(ContainerVersion::V1);
    }
    if archive.contains("neuron1/structure/raw") || archive.contains("neuron1/structure/repaired")
    {
        return Ok(ContainerVersion::V2);
    }
    Err(MorphologyError::Container(
        "unrecognized container layout".to_string(),
    ))
}

/// Read a container file and unpack it into a wrapped data block.
pub fn read(path: &Path) -> Result<DataWrapper> {
    let archive = Archive::open(path)?;
    unpack(&archive, false)
}

/// Unpack an archive.
///
/// `remove_duplicates` strips the duplicate leading point from every
/// group that is not a root group, not a soma and not a child of a soma,
/// shifting the offsets of the following groups.
pub fn unpack(archive: &Archive, remove_duplicates: bool) -> Result<DataWrapper> {
    let version = get_version(archive)?;
    let (mut points, mut groups) = match version {
        ContainerVersion::V1 => unpack_v1(archive)?,
        ContainerVersion::V2 => unpack_v2(archive)?,
    };

    if remove_duplicates {
        remove_duplicate_points(&mut points, &mut groups)?;
    }

    // store radius, not diameter
    for p in points.iter_mut() {
        p[3] /= 2.0;
    }

    let mut builder = BlockNeuronBuilder::new();
    for (id, group) in groups.iter().enumerate() {
        let start = usize::try_from(group[GPFIRST]).map_err(|_| {
            MorphologyError::Container(format!("negative first-point index in group {}", id))
        })?;
        let end = match groups.get(id + 1) {
            Some(next) => usize::try_from(next[GPFIRST]).map_err(|_| {
                MorphologyError::Container(format!("negative first-point index in group {}", id + 1))
            })?,
            None => points.len(),
        };
        if start > end || end > points.len() {
            return Err(MorphologyError::Container(format!(
                "group {} spans points {}..{} outside the points table",
                id, start, end
            )));
        }
        let section_type = PointType::from_code(group[GTYPE]).ok_or_else(|| {
            MorphologyError::Container(format!(
                "invalid section type code {} in group {}",
                group[GTYPE], id
            ))
        })?;
        builder.add_section(
            id as i64,
            group[GPID],
            section_type,
            points[start..end].to_vec(),
        )?;
    }

    let fmt = match version {
        ContainerVersion::V1 => SourceFormat::HierarchicalV1,
        ContainerVersion::V2 => SourceFormat::HierarchicalV2,
    };
    Ok(builder.build(fmt))
}

fn table_to_points(rows: &[Vec<f64>], name: &str) -> Result<Vec<[f64; 4]>> {
    rows.iter()
        .map(|r| {
            if r.len() == 4 {
                Ok([r[0], r[1], r[2], r[3]])
            } else {
                Err(MorphologyError::Container(format!(
                    "'{}' rows must have 4 columns, found {}",
                    name,
                    r.len()
                )))
            }
        })
        .collect()
}

fn unpack_v1(archive: &Archive) -> Result<(Vec<[f64; 4]>, Vec<[i64; 3]>)> {
    let points = table_to_points(archive.floats("points")?, "points")?;
    let groups = archive
        .ints("structure")?
        .iter()
        .map(|r| {
            if r.len() == 3 {
                Ok([r[0], r[1], r[2]])
            } else {
                Err(MorphologyError::Container(format!(
                    "'structure' rows must have 3 columns, found {}",
                    r.len()
                )))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((points, groups))
}

fn unpack_v2(archive: &Archive) -> Result<(Vec<[f64; 4]>, Vec<[i64; 3]>)> {
    let stage = ["repaired", "unraveled", "raw"]
        .into_iter()
        .find(|s| archive.contains(&format!("neuron1/{}/points", s)))
        .ok_or_else(|| {
            MorphologyError::Container("no processing stage found under 'neuron1'".to_string())
        })?;
    let points_name = format!("neuron1/{}/points", stage);
    let points = table_to_points(archive.floats(&points_name)?, &points_name)?;

    // the unraveled stage reuses the raw structure table
    let groups_stage = if stage == "unraveled" { "raw" } else { stage };
    let structure = archive.ints(&format!("neuron1/structure/{}", groups_stage))?;
    let stypes = archive.ints("neuron1/structure/sectiontype")?;
    if structure.len() != stypes.len() {
        return Err(MorphologyError::Container(format!(
            "structure has {} groups but sectiontype has {}",
            structure.len(),
            stypes.len()
        )));
    }

    // join [first, parent] with [type], reordered to [first, type, parent]
    let groups = structure
        .iter()
        .zip(stypes)
        .map(|(s, t)| {
            if s.len() == 2 && t.len() == 1 {
                Ok([s[0], t[0], s[1]])
            } else {
                Err(MorphologyError::Container(
                    "revision 2 structure rows must have 2 columns and sectiontype rows 1"
                        .to_string(),
                ))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((points, groups))
}

/// Strip the duplicate leading point of each group that duplicates its
/// parent's last point by format convention.
fn remove_duplicate_points(points: &mut Vec<[f64; 4]>, groups: &mut [[i64; 3]]) -> Result<()> {
    let soma_code = PointType::Soma.code();
    let mut removed: Vec<usize> = Vec::new();
    let mut shift: Vec<i64> = vec![0; groups.len()];
    let mut removed_so_far: i64 = 0;
    for ig in 0..groups.len() {
        shift[ig] = removed_so_far;
        let [first, typ, pid] = groups[ig];
        if pid != -1 && typ != soma_code {
            let parent = usize::try_from(pid).ok().and_then(|p| groups.get(p)).ok_or_else(
                || MorphologyError::Container(format!("group {} has invalid parent {}", ig, pid)),
            )?;
            if parent[GTYPE] != soma_code {
                removed.push(usize::try_from(first).map_err(|_| {
                    MorphologyError::Container(format!("negative first-point index in group {}", ig))
                })?);
                removed_so_far += 1;
            }
        }
    }
    for (g, s) in groups.iter_mut().zip(&shift) {
        g[GPFIRST] -= s;
    }
    let removed_set: std::collections::HashSet<usize> = removed.into_iter().collect();
    let mut kept = Vec::with_capacity(points.len().saturating_sub(removed_set.len()));
    for (i, p) in points.iter().enumerate() {
        if !removed_set.contains(&i) {
            kept.push(*p);
        }
    }
    *points = kept;
    Ok(())
}
