use crate::error::Result;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

/// A model node lying under a lake, as delivered by the geospatial overlay.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeAssociation {
    #[serde(rename = "INODE")]
    pub node_id: u32,
    /// Lake name as labelled in the overlay
    #[serde(rename = "Name")]
    pub name: String,
}

/// Comparison key for lake names and notes: no `/`, trimmed, lowercase.
pub fn normalize_name(name: &str) -> String {
    name.replace('/', "").trim().to_lowercase()
}

impl NodeAssociation {
    /// Parse an `INODE,Name` CSV. Rows with an empty name are skipped.
    pub fn parse_csv(csv_object: &str) -> Result<Vec<NodeAssociation>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_object.as_bytes());
        let mut associations = Vec::new();
        for row in rdr.deserialize::<NodeAssociation>() {
            let association = row?;
            if !association.name.is_empty() {
                associations.push(association);
            }
        }
        Ok(associations)
    }
}
