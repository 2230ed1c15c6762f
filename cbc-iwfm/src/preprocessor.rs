//! Tables read back from the preprocessor's printed output file.
//!
//! The output is a report rather than an input deck: titles, separators and
//! unit rows sit between the signature and the numbers, so only rows whose
//! first token is a node id are treated as data.

use crate::error::Result;
use crate::schema::{
    is_node_id, parse_cell, parse_real, DataLine, LAYER_ELEVATION_SCHEMA, NODAL_AREA_SCHEMA,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodalArea {
    pub node_id: u32,
    pub x: f64,
    pub y: f64,
    /// Effective area in the unit named by [`NodalAreaTable::unit_label`]
    pub area: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodalAreaTable {
    /// Header text from the AREA column on, plus any unit rows before the data
    pub unit_label: String,
    pub rows: Vec<NodalArea>,
}

impl NodalAreaTable {
    pub fn in_acres(&self) -> bool {
        self.unit_label.to_ascii_lowercase().contains("acre")
    }
}

/// Ground surface and layer top/bottom elevations of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerElevation {
    pub node_id: u32,
    pub values: Vec<f64>,
}

fn data_rows<'a>(lines: &[DataLine<'a>]) -> (Vec<DataLine<'a>>, Vec<DataLine<'a>>) {
    lines
        .iter()
        .copied()
        .partition(|l| l.tokens().first().map(|t| is_node_id(t)).unwrap_or(false))
}

pub fn parse_nodal_areas(file: &str, content: &str) -> Result<NodalAreaTable> {
    let block = NODAL_AREA_SCHEMA.locate(file, content)?;
    let (data, labels) = data_rows(&block.lines);

    let mut unit_label = block
        .header
        .find("AREA")
        .map(|i| block.header[i..].trim().to_string())
        .unwrap_or_default();
    let first_data = data.first().map(|l| l.number).unwrap_or(usize::MAX);
    for line in labels.iter().filter(|l| l.number < first_data) {
        unit_label.push(' ');
        unit_label.push_str(line.text.trim());
    }

    let mut rows = Vec::with_capacity(data.len());
    for line in &data {
        let tokens = line.tokens();
        let cell = |i: usize| tokens.get(i).copied().unwrap_or("");
        rows.push(NodalArea {
            node_id: parse_cell(file, line.number, "NODE", cell(0))?,
            x: parse_real(file, line.number, "X", cell(1))?,
            y: parse_real(file, line.number, "Y", cell(2))?,
            area: parse_real(file, line.number, "AREA", cell(3))?,
        });
    }
    log::debug!(
        "{file}: {} nodal areas ({})",
        rows.len(),
        if unit_label.is_empty() { "no unit label" } else { unit_label.as_str() }
    );
    Ok(NodalAreaTable {
        unit_label: unit_label.trim().to_string(),
        rows,
    })
}

pub fn parse_layer_elevations(file: &str, content: &str) -> Result<Vec<LayerElevation>> {
    let block = LAYER_ELEVATION_SCHEMA.locate(file, content)?;
    let (data, _) = data_rows(&block.lines);
    let mut rows = Vec::with_capacity(data.len());
    for line in &data {
        let tokens = line.tokens();
        let values = tokens[1..]
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_real(file, line.number, &format!("V{}", i + 1), raw))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(LayerElevation {
            node_id: parse_cell(file, line.number, "NODE", tokens[0])?,
            values,
        });
    }
    Ok(rows)
}
