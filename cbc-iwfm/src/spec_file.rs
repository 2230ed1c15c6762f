use crate::error::{IwfmError, Result};
use crate::schema::{parse_cell, parse_optional_real, parse_real, SPEC_SCHEMA};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::Write;

/// Column order of the boundary condition specification table.
pub const SPEC_COLUMNS: [&str; 9] = [
    "INODE", "ILAYER", "ITSCOL", "BH", "BC", "LBH", "ITSCOLF", "CFLOW", "Notes",
];

/// One constrained-head boundary condition row.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConditionRecord {
    pub node_id: u32,
    /// Aquifer layer, 1-based
    pub layer: u32,
    /// Time-series column holding the head for this boundary (ITSCOL)
    pub ts_column: u32,
    /// Head value, or factor when `ts_column` is set (BH)
    pub head_value: f64,
    /// Lakebed conductance (BC)
    pub conductance: Option<f64>,
    /// Head below which no more outflow is computed (LBH)
    pub limiting_head: Option<f64>,
    /// Time-series column holding the maximum flow (ITSCOLF)
    pub ts_column_flow: u32,
    /// Maximum flow, or factor when `ts_column_flow` is set (CFLOW)
    pub flow_value: f64,
    /// Free-text label, conventionally `/<lake name>`
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecTable {
    pub records: Vec<BoundaryConditionRecord>,
}

/// `{}` formatting keeps integral reals free of a trailing `.0`.
pub fn format_real(value: f64) -> String {
    format!("{value}")
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_real).unwrap_or_default()
}

impl BoundaryConditionRecord {
    fn from_cells(file: &str, line: usize, cells: &[&str], note: &str) -> Result<Self> {
        let cell = |i: usize| cells.get(i).copied().unwrap_or("");
        let node_id = parse_cell(file, line, SPEC_COLUMNS[0], cell(0))?;
        let layer: u32 = parse_cell(file, line, SPEC_COLUMNS[1], cell(1))?;
        if layer < 1 {
            return Err(IwfmError::Parse {
                file: file.to_string(),
                line,
                column: SPEC_COLUMNS[1].to_string(),
                value: cell(1).to_string(),
                reason: "layers are numbered from 1".to_string(),
            });
        }
        Ok(BoundaryConditionRecord {
            node_id,
            layer,
            ts_column: parse_cell(file, line, SPEC_COLUMNS[2], cell(2))?,
            head_value: parse_real(file, line, SPEC_COLUMNS[3], cell(3))?,
            conductance: parse_optional_real(file, line, SPEC_COLUMNS[4], cell(4))?,
            limiting_head: parse_optional_real(file, line, SPEC_COLUMNS[5], cell(5))?,
            ts_column_flow: parse_cell(file, line, SPEC_COLUMNS[6], cell(6))?,
            flow_value: parse_real(file, line, SPEC_COLUMNS[7], cell(7))?,
            note: note.trim().to_string(),
        })
    }

    fn to_cells(&self) -> [String; 9] {
        [
            self.node_id.to_string(),
            self.layer.to_string(),
            self.ts_column.to_string(),
            format_real(self.head_value),
            format_optional(self.conductance),
            format_optional(self.limiting_head),
            self.ts_column_flow.to_string(),
            format_real(self.flow_value),
            self.note.clone(),
        ]
    }
}

/// Tab cells with leading and trailing empties dropped; empty cells in
/// between stay in place (an unset BC or LBH).
fn tab_cells(text: &str) -> Vec<&str> {
    let cells: Vec<&str> = text.split('\t').map(str::trim).collect();
    let start = cells.iter().position(|c| !c.is_empty()).unwrap_or(cells.len());
    let end = cells.iter().rposition(|c| !c.is_empty()).map(|i| i + 1).unwrap_or(start);
    cells[start..end.max(start)].to_vec()
}

/// Whitespace-delimited variant: numbers first, then everything from the
/// first `/` is the note.
fn whitespace_record(file: &str, line: usize, text: &str) -> Result<BoundaryConditionRecord> {
    let (numbers, note) = match text.split_once('/') {
        Some((left, right)) => (left, format!("/{}", right.trim_end())),
        None => (text, String::new()),
    };
    let cells: Vec<&str> = numbers.split_whitespace().collect();
    if cells.len() < 8 {
        return Err(IwfmError::Parse {
            file: file.to_string(),
            line,
            column: SPEC_COLUMNS[cells.len().min(7)].to_string(),
            value: numbers.trim().to_string(),
            reason: format!("expected 8 values before the note, found {}", cells.len()),
        });
    }
    BoundaryConditionRecord::from_cells(file, line, &cells, &note)
}

impl SpecTable {
    /// Parse a legacy specification file. Rows are tab-delimited; when every
    /// row collapses to a single tab column the whole file is read as the
    /// whitespace-plus-`/note` variant instead.
    pub fn parse(file: &str, content: &str) -> Result<SpecTable> {
        let block = SPEC_SCHEMA.locate(file, content)?;
        let split: Vec<Vec<&str>> = block.lines.iter().map(|l| tab_cells(l.text)).collect();
        let whitespace_variant = split.iter().all(|cells| cells.len() <= 1);
        if whitespace_variant {
            log::debug!("{file}: reading whitespace-delimited specification rows");
        }

        let mut records = Vec::with_capacity(block.lines.len());
        for (line, cells) in block.lines.iter().zip(split.iter()) {
            let record = if whitespace_variant {
                whitespace_record(file, line.number, line.text)?
            } else {
                if cells.len() < 8 {
                    return Err(IwfmError::Parse {
                        file: file.to_string(),
                        line: line.number,
                        column: SPEC_COLUMNS[cells.len()].to_string(),
                        value: String::new(),
                        reason: format!("expected 8 or 9 columns, found {}", cells.len()),
                    });
                }
                let note = cells.get(8..).map(|rest| rest.join(" ")).unwrap_or_default();
                BoundaryConditionRecord::from_cells(file, line.number, cells, &note)?
            };
            records.push(record);
        }
        Ok(SpecTable { records })
    }

    /// Read a table previously written by [`SpecTable::write_csv`].
    pub fn from_csv(file: &str, content: &str) -> Result<SpecTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut records = Vec::new();
        for row in rdr.records() {
            let row: StringRecord = row?;
            let line = row.position().map(|p| p.line() as usize).unwrap_or_default();
            let cells: Vec<&str> = row.iter().collect();
            let note = cells.get(8).copied().unwrap_or("");
            records.push(BoundaryConditionRecord::from_cells(file, line, &cells, note)?);
        }
        Ok(SpecTable { records })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(SPEC_COLUMNS)?;
        for record in &self.records {
            wtr.write_record(record.to_cells())?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Highest time-series column referenced as either a head or a flow slot.
    pub fn max_slot(&self) -> u32 {
        self.records
            .iter()
            .flat_map(|r| [r.ts_column, r.ts_column_flow])
            .max()
            .unwrap_or(0)
    }
}
