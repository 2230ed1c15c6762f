use cbc_iwfm::{AquiferParameters, NodalAreaTable, StratigraphyRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ACRES_TO_SQUARE_FEET: f64 = 43560.0;

/// Lakebed conductance of a node in the top model layer, treating the
/// layer as a flat Darcy plate: `K_v / thickness * area`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductanceEstimate {
    pub node_id: u32,
    /// Layer-1 vertical hydraulic conductivity (ft/day)
    pub vertical_conductivity: f64,
    /// Layer-1 aquifer thickness (ft)
    pub layer_thickness: f64,
    /// Nodal area (ft²)
    pub nodal_area: f64,
    pub conductance: f64,
}

/// Estimate conductance for every node present in all three tables.
///
/// Nodes missing from any table are left out; an empty result is not an
/// error. Areas labelled in acres are converted to square feet.
pub fn estimate_conductance(
    parameters: &[AquiferParameters],
    stratigraphy: &[StratigraphyRow],
    areas: &NodalAreaTable,
) -> Vec<ConductanceEstimate> {
    let area_factor = if areas.in_acres() {
        ACRES_TO_SQUARE_FEET
    } else {
        1.0
    };
    let conductivity: BTreeMap<u32, f64> = parameters
        .iter()
        .filter(|p| p.layer == 1)
        .map(|p| (p.node_id, p.pl))
        .collect();
    let thickness: BTreeMap<u32, f64> = stratigraphy
        .iter()
        .filter_map(|row| row.aquifer_thickness(1).map(|t| (row.node_id, t)))
        .collect();
    let area: BTreeMap<u32, f64> = areas
        .rows
        .iter()
        .map(|row| (row.node_id, row.area * area_factor))
        .collect();

    let mut estimates = Vec::new();
    for (node_id, vertical_conductivity) in &conductivity {
        let (Some(layer_thickness), Some(nodal_area)) = (thickness.get(node_id), area.get(node_id))
        else {
            continue;
        };
        if *layer_thickness <= 0.0 {
            log::warn!("Node {node_id} has layer 1 thickness {layer_thickness}; no conductance");
            continue;
        }
        estimates.push(ConductanceEstimate {
            node_id: *node_id,
            vertical_conductivity: *vertical_conductivity,
            layer_thickness: *layer_thickness,
            nodal_area: *nodal_area,
            conductance: vertical_conductivity / layer_thickness * nodal_area,
        });
    }
    log::info!(
        "Estimated conductance for {} of {} layer 1 nodes",
        estimates.len(),
        conductivity.len()
    );
    estimates
}
