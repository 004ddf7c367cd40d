// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for morphology loading and access

/// Error type covering parsing, structural validation and lookups.
///
/// Structural errors carry the offending identifiers so that callers can
/// discriminate and report precisely, instead of receiving a flattened
/// message string.
#[derive(Debug, thiserror::Error)]
pub enum MorphologyError {
    /// Malformed source bytes (non-numeric fields, short rows, bad tokens)
    #[error("Failed to parse morphology data: {0}")]
    Parse(String),

    /// File extension not mapped to any reader
    #[error("Unknown morphology file extension: '{0}'")]
    UnknownExtension(String),

    /// Hierarchical container archive is missing datasets or has a bad schema
    #[error("Malformed container archive: {0}")]
    Container(String),

    /// Underlying I/O failure while reading a morphology file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Row IDs are not increasing; carries the offending ID values
    #[error("Invalid ID sequence found in raw data: {0:?}")]
    IdSequence(Vec<i64>),

    /// More than one root row; carries the IDs of the extra roots
    #[error("Multiple trees detected, extra root IDs: {0:?}")]
    MultipleTrees(Vec<i64>),

    /// Parent IDs referenced but never defined
    #[error("Missing parents detected: {0:?}")]
    MissingParents(Vec<i64>),

    /// No row carries the soma type
    #[error("No soma points found in raw data")]
    NoSomaFound,

    /// More than one soma section in a single-neuron file
    #[error("Multiple somas found: {0}")]
    MultipleSomas(usize),

    /// Soma points are incompatible with any soma representation
    #[error("Invalid soma: {0}")]
    Soma(String),

    /// Accessor called with an out-of-range or nonexistent point ID
    #[error("Invalid id: {0}")]
    Lookup(i64),

    /// Accessor called with an out-of-range or nonexistent section ID
    #[error("Invalid section id: {0}")]
    SectionLookup(usize),
}

pub type Result<T> = std::result::Result<T, MorphologyError>;
