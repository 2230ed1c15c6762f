use crate::error::{IwfmError, Result};
use crate::schema::{parse_cell, parse_real, GW_MAIN_SCHEMA};

const PARAMETER_COLUMNS: [&str; 5] = ["PKH", "PS", "PN", "PV", "PL"];

/// Aquifer parameters of one node and layer from the groundwater main file.
#[derive(Debug, Clone, PartialEq)]
pub struct AquiferParameters {
    pub node_id: u32,
    /// 1-based layer
    pub layer: u32,
    /// Horizontal hydraulic conductivity
    pub pkh: f64,
    /// Specific storage
    pub ps: f64,
    /// Specific yield
    pub pn: f64,
    /// Aquitard vertical hydraulic conductivity
    pub pv: f64,
    /// Aquifer vertical hydraulic conductivity
    pub pl: f64,
}

/// Parse the node-by-layer aquifer parameter block.
///
/// The first row of each node carries its id (six tokens); the following
/// `layer_count - 1` rows carry only the five parameters. Layers are
/// attached by position within each group.
pub fn parse_gw_main(file: &str, content: &str, layer_count: usize) -> Result<Vec<AquiferParameters>> {
    if layer_count == 0 {
        return Err(IwfmError::InvalidArgument(
            "layer count must be at least 1".to_string(),
        ));
    }
    let block = GW_MAIN_SCHEMA.locate(file, content)?;
    let mut parameters = Vec::with_capacity(block.lines.len());
    let mut current_node: Option<u32> = None;

    for (idx, line) in block.lines.iter().enumerate() {
        let tokens = line.tokens();
        let values = match tokens.len() {
            6 => {
                current_node = Some(parse_cell(file, line.number, "ID", tokens[0])?);
                &tokens[1..]
            }
            5 => &tokens[..],
            n => {
                return Err(IwfmError::Parse {
                    file: file.to_string(),
                    line: line.number,
                    column: "ID".to_string(),
                    value: line.text.trim().to_string(),
                    reason: format!("expected 5 or 6 values, found {n}"),
                })
            }
        };
        let node_id = current_node.ok_or_else(|| IwfmError::Parse {
            file: file.to_string(),
            line: line.number,
            column: "ID".to_string(),
            value: line.text.trim().to_string(),
            reason: "continuation row before any node id".to_string(),
        })?;
        let layer = (idx % layer_count) as u32 + 1;
        if layer > 1 && tokens.len() == 6 {
            let group_node = parameters
                .last()
                .map(|p: &AquiferParameters| p.node_id)
                .unwrap_or(node_id);
            return Err(IwfmError::Parse {
                file: file.to_string(),
                line: line.number,
                column: "ID".to_string(),
                value: tokens[0].to_string(),
                reason: format!(
                    "node {group_node} has {} of {layer_count} layers",
                    layer - 1
                ),
            });
        }

        let mut reals = [0.0; 5];
        for (i, raw) in values.iter().enumerate() {
            reals[i] = parse_real(file, line.number, PARAMETER_COLUMNS[i], raw)?;
        }
        parameters.push(AquiferParameters {
            node_id,
            layer,
            pkh: reals[0],
            ps: reals[1],
            pn: reals[2],
            pv: reals[3],
            pl: reals[4],
        });
    }

    if parameters.len() % layer_count != 0 {
        let last = block.lines.last().map(|l| l.number).unwrap_or(block.header_line);
        return Err(IwfmError::Parse {
            file: file.to_string(),
            line: last,
            column: "ID".to_string(),
            value: String::new(),
            reason: format!(
                "{} parameter rows do not divide into {layer_count} layers",
                parameters.len()
            ),
        });
    }
    log::debug!(
        "{file}: {} nodes with {layer_count} layers",
        parameters.len() / layer_count
    );
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gw_file(rows: &str) -> String {
        format!(
            "C  Parametric grid\nC   ID   PKH   PS   PN   PV   PL   PX\n\
C*******************************************************
C   Aquifer parameters
C   ID        PKH       PS        PN        PV        PL
C------------------------------------------------------
{rows}C*******************************************************
C   Anomaly in Hydraulic Conductivity
     0
"
        )
    }

    #[test]
    fn test_four_layers_three_nodes() {
        let rows = "\
     1   10.0  1E-6  0.1  0.01  2.0
         11.0  1E-6  0.1  0.02  2.1
         12.0  1E-6  0.1  0.03  2.2
         13.0  1E-6  0.1  0.04  2.3
     2   20.0  1E-6  0.2  0.01  3.0
         21.0  1E-6  0.2  0.02  3.1
         22.0  1E-6  0.2  0.03  3.2
         23.0  1E-6  0.2  0.04  3.3
     3   30.0  1E-6  0.3  0.01  4.0
         31.0  1E-6  0.3  0.02  4.1
         32.0  1E-6  0.3  0.03  4.2
         33.0  1E-6  0.3  0.04  4.3
";
        let params = parse_gw_main("gw.dat", &gw_file(rows), 4).unwrap();
        assert_eq!(params.len(), 12);
        for (i, p) in params.iter().enumerate() {
            assert_eq!(p.node_id, (i / 4) as u32 + 1);
            assert_eq!(p.layer, (i % 4) as u32 + 1);
        }
        assert_eq!(params[4].pkh, 20.0);
        assert_eq!(params[4].pl, 3.0);
        assert_eq!(params[11].pv, 0.04);
    }

    #[test]
    fn test_short_group_is_rejected() {
        let rows = "\
     1   10.0  1E-6  0.1  0.01  2.0
         11.0  1E-6  0.1  0.02  2.1
     2   20.0  1E-6  0.2  0.01  3.0
         21.0  1E-6  0.2  0.02  3.1
";
        assert!(matches!(
            parse_gw_main("gw.dat", &gw_file(rows), 4),
            Err(IwfmError::Parse { .. })
        ));
    }

    #[test]
    fn test_continuation_before_id_is_rejected() {
        let rows = "         11.0  1E-6  0.1  0.02  2.1\n";
        assert!(matches!(
            parse_gw_main("gw.dat", &gw_file(rows), 1),
            Err(IwfmError::Parse { .. })
        ));
    }

    #[test]
    fn test_zero_layers_is_invalid() {
        assert!(matches!(
            parse_gw_main("gw.dat", &gw_file(""), 0),
            Err(IwfmError::InvalidArgument(_))
        ));
    }
}
