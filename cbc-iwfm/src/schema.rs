//! Declarative description of where a data block sits inside a legacy file.
//!
//! Every file kind is one [`BlockSchema`]: a signature line identified by
//! required substrings, a data offset counted from that signature, and an end
//! condition. Supporting a new layout variant means adding or editing a
//! schema constant, not scanning code.

use crate::error::{IwfmError, Result};
use std::str::FromStr;

/// Column-one characters that mark a comment line in the model's input files.
pub const COMMENT_MARKERS: &[char] = &['C', 'c', '*'];

/// A line is a signature line when it contains every `required` substring
/// and none of the `forbidden` ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signature {
    pub required: &'static [&'static str],
    pub forbidden: &'static [&'static str],
}

impl Signature {
    pub fn matches(&self, line: &str) -> bool {
        self.required.iter().all(|s| line.contains(s))
            && !self.forbidden.iter().any(|s| line.contains(s))
    }

    pub fn describe(&self) -> String {
        let mut text = self
            .required
            .iter()
            .map(|s| format!("'{s}'"))
            .collect::<Vec<String>>()
            .join(", ");
        if !self.forbidden.is_empty() {
            let forbidden = self
                .forbidden
                .iter()
                .map(|s| format!("'{s}'"))
                .collect::<Vec<String>>()
                .join(", ");
            text.push_str(&format!(" but not {forbidden}"));
        }
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockEnd {
    EndOfFile,
    /// The block stops before the first line matching this signature.
    /// A missing end signature is a format error.
    Signature(Signature),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSchema {
    pub name: &'static str,
    pub signature: Signature,
    /// Whether the signature may sit on a comment line (column headers
    /// usually do).
    pub signature_in_comments: bool,
    /// Lines between the signature and the first data line; 0 means the
    /// signature line is itself data.
    pub data_offset: usize,
    pub end: BlockEnd,
    pub comment_markers: &'static [char],
    /// Everything after this character is dropped from data lines.
    pub inline_comment: Option<char>,
}

/// One non-comment, non-blank line of a located block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataLine<'a> {
    /// 1-based line number in the source file
    pub number: usize,
    pub text: &'a str,
}

impl<'a> DataLine<'a> {
    pub fn tokens(&self) -> Vec<&'a str> {
        self.text.split_whitespace().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block<'a> {
    /// 1-based line number of the signature
    pub header_line: usize,
    pub header: &'a str,
    pub lines: Vec<DataLine<'a>>,
    /// Comment and blank lines skipped inside the block, kept for label
    /// lookups (units rows and the like)
    pub skipped: Vec<DataLine<'a>>,
}

impl BlockSchema {
    pub fn is_comment(&self, line: &str) -> bool {
        line.chars()
            .next()
            .map(|c| self.comment_markers.contains(&c))
            .unwrap_or(false)
    }

    /// Find this schema's block in `content`. `file` only labels errors.
    pub fn locate<'a>(&self, file: &str, content: &'a str) -> Result<Block<'a>> {
        let lines: Vec<&'a str> = content.lines().collect();
        let signature_idx = lines
            .iter()
            .position(|line| {
                (self.signature_in_comments || !self.is_comment(line))
                    && self.signature.matches(line)
            })
            .ok_or_else(|| IwfmError::Format {
                file: file.to_string(),
                signature: self.signature.describe(),
            })?;

        let mut data = Vec::new();
        let mut skipped = Vec::new();
        let mut found_end = false;
        for (idx, raw) in lines.iter().enumerate().skip(signature_idx + self.data_offset) {
            if let BlockEnd::Signature(end) = self.end {
                if idx > signature_idx && end.matches(raw) {
                    found_end = true;
                    break;
                }
            }
            let line = DataLine {
                number: idx + 1,
                text: raw,
            };
            if self.is_comment(raw) || raw.trim().is_empty() {
                skipped.push(line);
                continue;
            }
            let text = match self.inline_comment {
                Some(marker) => raw.split(marker).next().unwrap_or(""),
                None => raw,
            };
            if text.trim().is_empty() {
                skipped.push(line);
                continue;
            }
            data.push(DataLine {
                number: idx + 1,
                text,
            });
        }

        if let BlockEnd::Signature(end) = self.end {
            if !found_end {
                return Err(IwfmError::Format {
                    file: file.to_string(),
                    signature: end.describe(),
                });
            }
        }

        log::debug!(
            "{} block in {}: signature on line {}, {} data lines",
            self.name,
            file,
            signature_idx + 1,
            data.len()
        );
        Ok(Block {
            header_line: signature_idx + 1,
            header: lines[signature_idx],
            lines: data,
            skipped,
        })
    }
}

/// Constrained-head boundary condition specification file.
pub const SPEC_SCHEMA: BlockSchema = BlockSchema {
    name: "boundary condition specification",
    signature: Signature {
        required: &["INODE", "ILAYER", "BH", "BC"],
        forbidden: &[],
    },
    signature_in_comments: true,
    data_offset: 2,
    end: BlockEnd::EndOfFile,
    comment_markers: COMMENT_MARKERS,
    inline_comment: None,
};

/// Boundary condition time-series file; the first dated row is the start of data
/// and the `*` footer rows are dropped as comments.
pub const TIMESERIES_SCHEMA: BlockSchema = BlockSchema {
    name: "boundary condition time series",
    signature: Signature {
        required: &["_24:00"],
        forbidden: &[],
    },
    signature_in_comments: false,
    data_offset: 0,
    end: BlockEnd::EndOfFile,
    comment_markers: COMMENT_MARKERS,
    inline_comment: None,
};

/// Aquifer parameter section of the groundwater main file.
pub const GW_MAIN_SCHEMA: BlockSchema = BlockSchema {
    name: "groundwater main aquifer parameters",
    signature: Signature {
        required: &["ID", "PKH", "PS", "PN", "PV", "PL"],
        forbidden: &["PX"],
    },
    signature_in_comments: true,
    data_offset: 2,
    end: BlockEnd::Signature(Signature {
        required: &["Anomaly in Hydraulic Conductivity"],
        forbidden: &[],
    }),
    comment_markers: COMMENT_MARKERS,
    inline_comment: None,
};

/// Preprocessor stratigraphy file.
pub const STRATIGRAPHY_SCHEMA: BlockSchema = BlockSchema {
    name: "stratigraphy",
    signature: Signature {
        required: &["/FACT"],
        forbidden: &[],
    },
    signature_in_comments: false,
    data_offset: 1,
    end: BlockEnd::EndOfFile,
    comment_markers: COMMENT_MARKERS,
    inline_comment: None,
};

/// Nodal coordinates and effective areas in the preprocessor output file.
pub const NODAL_AREA_SCHEMA: BlockSchema = BlockSchema {
    name: "nodal areas",
    signature: Signature {
        required: &["NODE", "X", "Y", "AREA"],
        forbidden: &[],
    },
    signature_in_comments: true,
    data_offset: 1,
    end: BlockEnd::Signature(Signature {
        required: &["ELEMENT", "NODES", "AREA"],
        forbidden: &[],
    }),
    comment_markers: &[],
    inline_comment: None,
};

/// Ground surface and layer top/bottom elevations in the preprocessor output file.
pub const LAYER_ELEVATION_SCHEMA: BlockSchema = BlockSchema {
    name: "layer elevations",
    signature: Signature {
        required: &["*** TOP AND BOTTOM"],
        forbidden: &[],
    },
    signature_in_comments: true,
    data_offset: 3,
    end: BlockEnd::Signature(Signature {
        required: &["REACH", "STREAM", "GRID", "GROUND", "INVERT", "AQUIFER"],
        forbidden: &[],
    }),
    comment_markers: &[],
    inline_comment: None,
};

/// Storage-area-elevation table exported by the reservoir operations model.
pub const RATING_TABLE_SCHEMA: BlockSchema = BlockSchema {
    name: "storage-elevation rating table",
    signature: Signature {
        required: &["storage", "elevation"],
        forbidden: &[],
    },
    signature_in_comments: false,
    data_offset: 1,
    end: BlockEnd::EndOfFile,
    comment_markers: &['!', '#'],
    inline_comment: Some('!'),
};

/// Parse one cell, reporting file, line and column on failure.
pub fn parse_cell<T>(file: &str, line: usize, column: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| IwfmError::Parse {
        file: file.to_string(),
        line,
        column: column.to_string(),
        value: raw.trim().to_string(),
        reason: e.to_string(),
    })
}

/// Parse a real number, accepting Fortran `D` exponents.
pub fn parse_real(file: &str, line: usize, column: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) => Ok(v),
        Err(_) => parse_cell::<f64>(file, line, column, &trimmed.replace(['D', 'd'], "E")).map_err(
            |_| IwfmError::Parse {
                file: file.to_string(),
                line,
                column: column.to_string(),
                value: trimmed.to_string(),
                reason: "not a number".to_string(),
            },
        ),
    }
}

/// Optional real: an empty cell is `None`, a populated one must parse.
pub fn parse_optional_real(file: &str, line: usize, column: &str, raw: &str) -> Result<Option<f64>> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_real(file, line, column, raw).map(Some)
    }
}

/// True when `token` reads as a node id (used to tell data rows from
/// titles and separators inside report-style blocks).
pub fn is_node_id(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}
