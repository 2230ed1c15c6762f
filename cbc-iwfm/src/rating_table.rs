use crate::error::{IwfmError, Result};
use crate::schema::{parse_real, RATING_TABLE_SCHEMA};

/// One anchor of a reservoir's storage-area-elevation table.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRow {
    /// Reservoir key (first column, `res_num` in the operations model export)
    pub reservoir: String,
    /// Storage in acre-feet
    pub storage: f64,
    pub area: Option<f64>,
    /// Elevation in feet
    pub elevation: f64,
}

fn column(header: &[&str], name: &str) -> Option<usize> {
    header.iter().position(|h| h.eq_ignore_ascii_case(name))
}

/// Parse a whitespace-delimited rating table whose header names at least
/// `storage` and `elevation`. Columns are located by header name.
pub fn parse_rating_table(file: &str, content: &str) -> Result<Vec<RatingRow>> {
    let block = RATING_TABLE_SCHEMA.locate(file, content)?;
    let header: Vec<&str> = block.header.split_whitespace().collect();
    let storage_idx = column(&header, "storage");
    let elevation_idx = column(&header, "elevation");
    let (storage_idx, elevation_idx) = match (storage_idx, elevation_idx) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            return Err(IwfmError::Format {
                file: file.to_string(),
                signature: "'storage' and 'elevation' header columns".to_string(),
            })
        }
    };
    let area_idx = column(&header, "area");
    let width = storage_idx.max(elevation_idx) + 1;

    let mut rows = Vec::with_capacity(block.lines.len());
    for line in &block.lines {
        let tokens = line.tokens();
        if tokens.len() < width {
            return Err(IwfmError::Parse {
                file: file.to_string(),
                line: line.number,
                column: header.get(tokens.len()).unwrap_or(&"").to_string(),
                value: line.text.trim().to_string(),
                reason: format!("expected at least {width} values"),
            });
        }
        let area = match area_idx.and_then(|i| tokens.get(i).map(|raw| (i, *raw))) {
            Some((i, raw)) => Some(parse_real(file, line.number, header[i], raw)?),
            None => None,
        };
        rows.push(RatingRow {
            reservoir: tokens[0].to_string(),
            storage: parse_real(file, line.number, header[storage_idx], tokens[storage_idx])?,
            area,
            elevation: parse_real(
                file,
                line.number,
                header[elevation_idx],
                tokens[elevation_idx],
            )?,
        });
    }
    Ok(rows)
}
