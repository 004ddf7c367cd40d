// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Flat-format (SWC) reader.
//!
//! Data is unpacked into the canonical raw data block:
//!
//! ```text
//! [X, Y, Z, R, TYPE, ID, PARENT_ID]
//! ```
//!
//! SWC source column order:
//!
//! ```text
//! [ID, TYPE, X, Y, Z, R, PARENT_ID]
//! ```
//!
//! There is one such row per measured point; `#` starts a comment and the
//! radius is stored directly (not a diameter).

use std::path::Path;

use tracing::warn;

use neuroarbor_structures::dataformat::{PointType, Row};
use neuroarbor_structures::datawrapper::{DataWrapper, SourceFormat};
use neuroarbor_structures::{MorphologyError, Result};

/// Repair policies of the flat reader.
///
/// Both are deliberate leniency policies, on by default; disabling them
/// turns the repaired conditions into ordinary errors downstream.
#[derive(Debug, Clone, Copy)]
pub struct SwcOptions {
    /// Coerce type codes above the largest known type to `Undefined`.
    pub coerce_unknown_types: bool,
    /// If no row is tagged soma, retag the first row as soma.
    pub synthesize_soma: bool,
}

impl Default for SwcOptions {
    fn default() -> SwcOptions {
        SwcOptions {
            coerce_unknown_types: true,
            synthesize_soma: true,
        }
    }
}

/// Read an SWC file with the default leniency policies.
pub fn read(path: &Path) -> Result<DataWrapper> {
    read_with(path, SwcOptions::default())
}

/// Read an SWC file.
pub fn read_with(path: &Path, options: SwcOptions) -> Result<DataWrapper> {
    let text = std::fs::read_to_string(path)?;
    read_str(&text, options)
}

/// Parse SWC text into a wrapped data block.
pub fn read_str(text: &str, options: SwcOptions) -> Result<DataWrapper> {
    let mut fields: Vec<[f64; 7]> = Vec::new();
    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut values = [0.0f64; 7];
        let mut n = 0;
        for token in line.split_whitespace() {
            if n == 7 {
                n += 1;
                break;
            }
            values[n] = token.parse::<f64>().map_err(|_| {
                MorphologyError::Parse(format!(
                    "non-numeric field '{}' on line {}",
                    token,
                    lineno + 1
                ))
            })?;
            n += 1;
        }
        if n != 7 {
            return Err(MorphologyError::Parse(format!(
                "expected 7 fields on line {}, found {}",
                lineno + 1,
                n
            )));
        }
        fields.push(values);
    }
    if fields.is_empty() {
        return Err(MorphologyError::Parse("no data rows found".to_string()));
    }

    // source order: [ID, TYPE, X, Y, Z, R, P]
    let mut type_codes: Vec<i64> = fields.iter().map(|f| f[1] as i64).collect();

    if options.coerce_unknown_types
        && type_codes.iter().any(|&c| c > PointType::MAX_KNOWN_CODE)
    {
        warn!(
            "SWC in custom format, reading type codes > {} as undefined",
            PointType::MAX_KNOWN_CODE
        );
        for code in type_codes.iter_mut() {
            if *code > PointType::MAX_KNOWN_CODE {
                *code = PointType::Undefined.code();
            }
        }
    }

    if options.synthesize_soma && !type_codes.contains(&PointType::Soma.code()) {
        warn!("No soma found, setting soma at first row");
        type_codes[0] = PointType::Soma.code();
    }

    let mut data_block = Vec::with_capacity(fields.len());
    for (f, &code) in fields.iter().zip(&type_codes) {
        let ntype = PointType::from_code(code).ok_or_else(|| {
            MorphologyError::Parse(format!("invalid structural type code {}", code))
        })?;
        data_block.push(Row::new(
            f[2],
            f[3],
            f[4],
            f[5],
            ntype,
            f[0] as i64,
            f[6] as i64,
        ));
    }

    Ok(DataWrapper::new(data_block, SourceFormat::Swc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_permutation() {
        let dw = read_str("1 1 10.0 20.0 30.0 2.5 -1\n", SwcOptions::default()).unwrap();
        let rows = dw.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].xyzr(), [10.0, 20.0, 30.0, 2.5]);
        assert_eq!(rows[0].ntype, PointType::Soma);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].pid, -1);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let text = "# a header comment\n\n0 1 0 0 0 1 -1  # trailing comment\n1 2 1 0 0 1 0\n";
        let dw = read_str(text, SwcOptions::default()).unwrap();
        assert_eq!(dw.rows().len(), 2);
    }

    #[test]
    fn test_unknown_type_coercion() {
        let text = "0 1 0 0 0 1 -1\n1 7 1 0 0 1 0\n";
        let dw = read_str(text, SwcOptions::default()).unwrap();
        assert_eq!(dw.rows()[1].ntype, PointType::Undefined);

        let off = SwcOptions {
            coerce_unknown_types: false,
            ..SwcOptions::default()
        };
        let dw = read_str(text, off).unwrap();
        assert_eq!(dw.rows()[1].ntype, PointType::Custom);
    }

    #[test]
    fn test_soma_synthesis() {
        let text = "0 2 0 0 0 1 -1\n1 2 1 0 0 1 0\n";
        let dw = read_str(text, SwcOptions::default()).unwrap();
        assert_eq!(dw.rows()[0].ntype, PointType::Soma);

        let off = SwcOptions {
            synthesize_soma: false,
            ..SwcOptions::default()
        };
        let dw = read_str(text, off).unwrap();
        assert_eq!(dw.rows()[0].ntype, PointType::Axon);
    }

    #[test]
    fn test_malformed_rows() {
        assert!(matches!(
            read_str("0 1 0 0 0 1\n", SwcOptions::default()),
            Err(MorphologyError::Parse(_))
        ));
        assert!(matches!(
            read_str("a b c d e f g\n", SwcOptions::default()),
            Err(MorphologyError::Parse(_))
        ));
        assert!(matches!(
            read_str("# only a comment\n", SwcOptions::default()),
            Err(MorphologyError::Parse(_))
        ));
    }
}
