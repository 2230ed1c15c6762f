use crate::error::{IwfmError, Result};
use crate::schema::{parse_cell, parse_real, STRATIGRAPHY_SCHEMA};

/// Thicknesses of one model layer: the aquitard above it (`A{n}`) and the
/// aquifer itself (`L{n}`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerThickness {
    pub aquitard: f64,
    pub aquifer: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StratigraphyRow {
    pub node_id: u32,
    /// Ground surface elevation (ELV)
    pub ground_elevation: f64,
    pub layers: Vec<LayerThickness>,
}

impl StratigraphyRow {
    /// Aquifer thickness of a 1-based layer.
    pub fn aquifer_thickness(&self, layer: usize) -> Option<f64> {
        layer
            .checked_sub(1)
            .and_then(|i| self.layers.get(i))
            .map(|l| l.aquifer)
    }
}

/// Column names for a stratigraphy table with `layer_count` layers:
/// `ID, ELV, A1, L1, A2, L2, ...`
pub fn column_names(layer_count: usize) -> Vec<String> {
    let mut names = vec!["ID".to_string(), "ELV".to_string()];
    for n in 1..=layer_count {
        names.push(format!("A{n}"));
        names.push(format!("L{n}"));
    }
    names
}

pub fn parse_stratigraphy(file: &str, content: &str) -> Result<Vec<StratigraphyRow>> {
    let block = STRATIGRAPHY_SCHEMA.locate(file, content)?;
    let mut rows = Vec::with_capacity(block.lines.len());
    let mut layer_count: Option<usize> = None;

    for line in &block.lines {
        let tokens = line.tokens();
        if tokens.len() < 4 || tokens.len() % 2 != 0 {
            return Err(IwfmError::Parse {
                file: file.to_string(),
                line: line.number,
                column: "ID".to_string(),
                value: line.text.trim().to_string(),
                reason: format!(
                    "expected ID, ELV and thickness pairs, found {} values",
                    tokens.len()
                ),
            });
        }
        let layers_here = (tokens.len() - 2) / 2;
        let expected = *layer_count.get_or_insert(layers_here);
        if layers_here != expected {
            return Err(IwfmError::Parse {
                file: file.to_string(),
                line: line.number,
                column: format!("L{}", layers_here.min(expected) + 1),
                value: line.text.trim().to_string(),
                reason: format!("row has {layers_here} layers, the table has {expected}"),
            });
        }
        let names = column_names(layers_here);
        let mut layers = Vec::with_capacity(layers_here);
        for n in 0..layers_here {
            let a = 2 + 2 * n;
            layers.push(LayerThickness {
                aquitard: parse_real(file, line.number, &names[a], tokens[a])?,
                aquifer: parse_real(file, line.number, &names[a + 1], tokens[a + 1])?,
            });
        }
        rows.push(StratigraphyRow {
            node_id: parse_cell(file, line.number, "ID", tokens[0])?,
            ground_elevation: parse_real(file, line.number, "ELV", tokens[1])?,
            layers,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRAT: &str = "C  Stratigraphy
     4                    /NL
     1.0                  /FACT
C   ID     ELV     A1    L1     A2    L2
C-----------------------------------------
     1    120.0    0.0   50.0   5.0   80.0
     2    118.5    0.0   45.0   5.0   82.0
";

    #[test]
    fn test_parse_stratigraphy() {
        let rows = parse_stratigraphy("strat.dat", STRAT).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].node_id, 1);
        assert_eq!(rows[0].ground_elevation, 120.0);
        assert_eq!(rows[0].aquifer_thickness(1), Some(50.0));
        assert_eq!(rows[1].layers[1].aquitard, 5.0);
        assert_eq!(rows[1].aquifer_thickness(2), Some(82.0));
        assert_eq!(rows[1].aquifer_thickness(0), None);
        assert_eq!(rows[1].aquifer_thickness(3), None);
    }

    #[test]
    fn test_inconsistent_layer_count() {
        let content = "  1.0  /FACT\n  1  100  0  50  5  80\n  2  100  0  50\n";
        match parse_stratigraphy("strat.dat", content).unwrap_err() {
            IwfmError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_names(2), vec!["ID", "ELV", "A1", "L1", "A2", "L2"]);
    }
}
