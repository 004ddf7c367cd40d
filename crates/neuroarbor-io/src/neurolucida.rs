// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reader for s-expression morphology text (Neurolucida .asc style),
//! reverse engineered from instrument output.
//!
//! The file is a sequence of nested parenthesized lists. Geometry lives in
//! named top-level sections (cell body, axon, dendrite, apical); known
//! annotation subtrees are filtered out; `|` separates sibling branches at
//! a furcation.

use std::path::Path;

use tracing::warn;

use neuroarbor_structures::dataformat::PointType;
use neuroarbor_structures::datawrapper::{BlockNeuronBuilder, DataWrapper, SourceFormat};
use neuroarbor_structures::{MorphologyError, Result};

/// Non-geometric subtrees dropped during parsing.
const UNWANTED_SECTIONS: &[&str] = &[
    // Meta-data
    "Closed", "Color", "FillDensity", "GUID", "ImageCoords", "MBFObjectType",
    "Marker", "Name", "Resolution", "Set", "Sections",
    // Marker names
    "Asterisk", "Cross", "Dot", "DoubleCircle", "FilledCircle", "FilledDownTriangle",
    "FilledSquare", "FilledStar", "FilledUpTriangle", "Flower", "Flower2", "OpenCircle",
    "OpenDiamond", "OpenDownTriangle", "OpenSquare", "OpenStar", "OpenUpTriangle", "Plus",
    "ShadedStar", "Splat", "TriStar", "CircleArrow", "CircleCross", "FilledDiamond",
    "MalteseCross", "SnowFlake", "TexacoStar", "FilledQuadStar",
    "Circle1", "Circle2", "Circle3", "Circle4", "Circle5",
    "Circle6", "Circle7", "Circle8", "Circle9",
];

/// Markers tolerated between point rows.
const BLOCK_MARKERS: &[&str] = &[
    "Low", "Generated", "High", "Normal", "Incomplete", "Midpoint", "Origin",
];

fn wanted_type(keyword: &str) -> Option<PointType> {
    match keyword {
        "CellBody" => Some(PointType::Soma),
        "Axon" => Some(PointType::Axon),
        "Dendrite" => Some(PointType::BasalDendrite),
        "Apical" => Some(PointType::ApicalDendrite),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

/// Split a file into tokens: whitespace separated, parens split out,
/// `;` comments stripped, quoted strings squashed into one token (they
/// can span lines), single-line spine groups `<( ... )>` skipped.
fn tokenize(text: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut squash: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.split(';').next().unwrap_or("");
        if line.contains("<(") {
            if !line.contains(")>") {
                return Err(MorphologyError::Parse("missing end of spine".to_string()));
            }
            continue;
        }
        let expanded = line.replace('(', " ( ").replace(')', " ) ");
        for token in expanded.split_whitespace() {
            if !squash.is_empty() {
                squash.push(token.to_string());
                if token.ends_with('"') {
                    tokens.push(squash.join(" "));
                    squash.clear();
                }
            } else if token.starts_with('"') && !token.ends_with('"') {
                squash.push(token.to_string());
            } else {
                tokens.push(token.to_string());
            }
        }
    }
    Ok(tokens)
}

/// Consume tokens until the currently open paren is balanced.
fn consume_until_balanced<I: Iterator<Item = String>>(tokens: &mut I) {
    let mut depth = 1;
    for token in tokens {
        if token == ")" {
            depth -= 1;
        } else if token == "(" {
            depth += 1;
        }
        if depth == 0 {
            break;
        }
    }
}

/// Extract the nested list structure defined by the s-expressions.
/// Subtrees tagged with an unwanted keyword are dropped.
fn parse_section<I: Iterator<Item = String>>(tokens: &mut I) -> Vec<Sexp> {
    let mut sexp = Vec::new();
    while let Some(token) = tokens.next() {
        if token == "(" {
            let sub = parse_section(tokens);
            if !sub.is_empty() {
                sexp.push(Sexp::List(sub));
            }
        } else if token == ")" {
            return sexp;
        } else if UNWANTED_SECTIONS.contains(&token.as_str()) {
            consume_until_balanced(tokens);
            break;
        } else {
            sexp.push(Sexp::Atom(token));
        }
    }
    sexp
}

/// The non-empty top-level sections of the token stream.
fn top_level_sections(tokens: Vec<String>) -> Vec<Vec<Sexp>> {
    let mut iter = tokens.into_iter();
    let mut sections = Vec::new();
    while let Some(token) = iter.next() {
        if token == "(" {
            let section = parse_section(&mut iter);
            if !section.is_empty() {
                sections.push(section);
            }
        }
    }
    sections
}

fn atom_f64(elem: &Sexp) -> Result<f64> {
    match elem {
        Sexp::Atom(s) => s
            .parse::<f64>()
            .map_err(|_| MorphologyError::Parse(format!("non-numeric point field '{}'", s))),
        Sexp::List(_) => Err(MorphologyError::Parse(
            "nested list inside a point row".to_string(),
        )),
    }
}

/// Extract the points of a section up to its furcation point, which shows
/// up as a sub-list of sub-lists. Returns the points (diameter already
/// halved into a radius) and the number of elements consumed.
fn extract_section_points(section: &[Sexp]) -> Result<(Vec<[f64; 4]>, usize)> {
    let mut points = Vec::new();
    let mut consumed = 0;
    for elem in section {
        match elem {
            Sexp::Atom(marker) => {
                if !BLOCK_MARKERS.contains(&marker.as_str()) {
                    warn!("Row contains unknown block marker: {}", marker);
                }
                consumed += 1;
            }
            Sexp::List(items) => {
                match items.first() {
                    Some(Sexp::Atom(_)) => {}
                    // a sub-list of sub-lists is the furcation point
                    _ => break,
                }
                if items.len() != 4 && items.len() != 5 {
                    return Err(MorphologyError::Parse(format!(
                        "point row has {} columns, expected 4 or 5",
                        items.len()
                    )));
                }
                if items.len() == 5 {
                    if let Sexp::Atom(s) = &items[4] {
                        if !s.starts_with('S') {
                            warn!("Only known usage of a fifth member is Sn, found: {}", s);
                        }
                    }
                }
                let x = atom_f64(&items[0])?;
                let y = atom_f64(&items[1])?;
                let z = atom_f64(&items[2])?;
                let d = atom_f64(&items[3])?;
                points.push([x, y, z, d / 2.0]);
                consumed += 1;
            }
        }
    }
    Ok((points, consumed))
}

/// Split the contents of a furcation list on the `|` branch separator.
fn split_furcations(rows: &[Sexp]) -> Vec<&[Sexp]> {
    rows.split(|elem| matches!(elem, Sexp::Atom(s) if s == "|"))
        .collect()
}

/// Recursively register each subsection with the block builder. Every
/// sibling branch inherits the parent's last emitted point as its
/// connection point.
fn read_subsection(
    builder: &mut BlockNeuronBuilder,
    id: i64,
    parent_id: i64,
    section_type: PointType,
    subsection: &[Sexp],
    parent_point: Option<[f64; 4]>,
) -> Result<i64> {
    let (mut points, consumed) = extract_section_points(subsection)?;
    if let Some(pp) = parent_point {
        points.insert(0, pp);
    }
    let last_point = points.last().copied();
    builder.add_section(id, parent_id, section_type, points)?;
    let mut next_id = id + 1;

    let rest = &subsection[consumed..];
    if let Some(Sexp::List(furcation)) = rest.first() {
        for split in split_furcations(furcation) {
            if split.is_empty() {
                continue;
            }
            next_id = read_subsection(builder, next_id, id, section_type, split, last_point)?;
        }
    }
    Ok(next_id)
}

/// Locate the recognized keyword in the first two elements of a section.
fn section_type(section: &[Sexp]) -> Option<(PointType, usize)> {
    for (i, elem) in section.iter().take(2).enumerate() {
        let keyword = match elem {
            Sexp::Atom(s) => Some(s.as_str()),
            Sexp::List(items) => match items.first() {
                Some(Sexp::Atom(s)) => Some(s.as_str()),
                _ => None,
            },
        };
        if let Some(ptype) = keyword.and_then(wanted_type) {
            return Some((ptype, i + 1));
        }
    }
    None
}

/// Read an s-expression morphology file.
pub fn read(path: &Path) -> Result<DataWrapper> {
    let text = std::fs::read_to_string(path)?;
    read_str(&text)
}

/// Parse s-expression morphology text into a wrapped data block.
///
/// Exactly one cell-body section is required. Neurites are attached to the
/// last row of the soma block.
pub fn read_str(text: &str) -> Result<DataWrapper> {
    warn!(
        "This is an experimental reader. There are no guarantees regarding \
         ability to parse s-expression morphology files or correctness of output."
    );

    let tokens = tokenize(text)?;
    let mut builder = BlockNeuronBuilder::new();
    let mut id: i64 = 0;
    let mut soma_count = 0usize;
    for section in top_level_sections(tokens) {
        let (stype, start) = match section_type(&section) {
            Some(found) => found,
            // can't determine the type, skip section
            None => continue,
        };

        // TODO: all neurites are connected at the last soma point, should
        // probably be the point closest to the neurite start
        let parent_id = if stype == PointType::Soma {
            soma_count += 1;
            if soma_count > 1 {
                return Err(MorphologyError::MultipleSomas(soma_count));
            }
            -1
        } else {
            0
        };
        id = read_subsection(&mut builder, id, parent_id, stype, &section[start..], None)?;
    }
    if soma_count == 0 {
        return Err(MorphologyError::NoSomaFound);
    }

    Ok(builder.build(SourceFormat::NeurolucidaAscii))
}
