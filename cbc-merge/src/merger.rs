use crate::association::{normalize_name, NodeAssociation};
use crate::error::{MergeError, Result};
use crate::slots::{allocate, first_free_slot, SlotKind, SlotPair, UNBOUNDED_FLOW};
use crate::warning::{MergeWarning, UnmatchedReason};
use cbc_cdec::{SensorType, StationSelection};
use cbc_data::{ConductanceEstimate, MonthlySeries};
use cbc_iwfm::{BoundaryConditionRecord, SpecTable, TimeSeriesRow, TimeSeriesTable};
use cbc_utils::dates::format_legacy_date;
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

/// A selected reservoir with whatever the earlier stages produced for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservoirData {
    pub selection: StationSelection,
    /// Monthly series, with elevations attached for storage sensors
    pub series: Option<MonthlySeries>,
    /// Dead pool elevation from the rating curve
    pub limiting_head: Option<f64>,
}

impl ReservoirData {
    /// Series usable as heads: present, non-empty, and carrying elevations
    /// when the sensor reports storage.
    fn head_series(&self) -> std::result::Result<&MonthlySeries, UnmatchedReason> {
        let series = self
            .series
            .as_ref()
            .filter(|s| !s.records.is_empty())
            .ok_or(UnmatchedReason::NoSeries)?;
        if series.sensor_type == SensorType::Storage
            && series.records.iter().any(|r| r.value_elevation.is_none())
        {
            return Err(UnmatchedReason::NoRatingCurve);
        }
        Ok(series)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Last month written to the time-series table
    pub cutoff: NaiveDate,
    /// Lake names never added as new reservoirs
    pub exclusions: Vec<String>,
    /// Existing note to selected station name (or id), for reservoirs whose
    /// note does not match the selection by name
    pub note_aliases: BTreeMap<String, String>,
}

pub struct MergeInput<'a> {
    pub spec: &'a SpecTable,
    pub timeseries: &'a TimeSeriesTable,
    pub associations: &'a [NodeAssociation],
    pub reservoirs: &'a [ReservoirData],
    pub conductance: &'a [ConductanceEstimate],
}

/// A reservoir added by the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedReservoir {
    pub station_id: String,
    pub note: String,
    pub nodes: Vec<u32>,
    pub slots: SlotPair,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutput {
    pub spec: SpecTable,
    pub timeseries: TimeSeriesTable,
    pub added: Vec<AddedReservoir>,
    pub warnings: Vec<MergeWarning>,
}

struct SlotFill<'a> {
    series: &'a MonthlySeries,
    kind: SlotKind,
    /// Gaps in slots of existing reservoirs are reported, new slots take the
    /// default silently
    report_gaps: bool,
}

impl SlotFill<'_> {
    fn value_on(&self, date: &NaiveDate) -> Option<f64> {
        let head = self.series.head_on(date);
        match self.kind {
            SlotKind::Head => head,
            SlotKind::Flow => head.map(|_| UNBOUNDED_FLOW),
        }
    }
}

fn unmatched(reservoir: &str, reason: UnmatchedReason) -> MergeWarning {
    MergeWarning::UnmatchedAssociation {
        reservoir: reservoir.to_string(),
        reason,
    }
}

/// Existing reservoirs whose note resolves to a selected station, with the
/// slots they already own.
fn resolve_extensions<'a>(
    spec: &SpecTable,
    reservoirs: &'a [ReservoirData],
    aliases: &BTreeMap<String, String>,
) -> Vec<(String, SlotPair, &'a ReservoirData)> {
    let aliases: BTreeMap<String, String> = aliases
        .iter()
        .map(|(note, target)| (normalize_name(note), normalize_name(target)))
        .collect();
    let mut seen = BTreeSet::new();
    let mut extensions = Vec::new();
    for record in &spec.records {
        let key = normalize_name(&record.note);
        if key.is_empty() || record.ts_column == 0 || !seen.insert(key.clone()) {
            continue;
        }
        let target = aliases.get(&key).unwrap_or(&key);
        let found = reservoirs.iter().find(|r| {
            normalize_name(&r.selection.name) == *target
                || r.selection.station_id.to_lowercase() == *target
        });
        if let Some(reservoir) = found {
            extensions.push((
                record.note.clone(),
                SlotPair {
                    head: record.ts_column,
                    flow: record.ts_column_flow,
                },
                reservoir,
            ));
        }
    }
    extensions
}

/// Merge new reservoirs into an existing specification and time-series
/// table.
///
/// Lakes already described by the specification (by note prefix) or listed
/// as exclusions are left alone. Every other overlay lake that matches a
/// selected station with a usable series becomes one row per node, with a
/// fresh head/flow slot pair. The time-series table gains the new slots and
/// existing reservoirs are extended with new months.
///
/// The output rows are the months covered by the new and extended series,
/// trimmed to start no earlier than the original first date and to end at
/// the cutoff. Months only the old file holds are dropped. Existing cells
/// back-fill matching months and are never overwritten. With no series to
/// merge the old axis is kept as it is.
pub fn merge(input: &MergeInput, config: &MergeConfig) -> Result<MergeOutput> {
    let existing_first = input.timeseries.first_date();
    if let Some(first) = existing_first {
        if config.cutoff < first {
            return Err(MergeError::CutoffBeforeStart {
                cutoff: config.cutoff,
                first,
            });
        }
    }

    let existing_notes: BTreeSet<String> = input
        .spec
        .records
        .iter()
        .map(|r| normalize_name(&r.note))
        .filter(|n| !n.is_empty())
        .collect();
    let exclusions: BTreeSet<String> = config.exclusions.iter().map(|e| normalize_name(e)).collect();
    let is_excluded = |name: &str| {
        let name = normalize_name(name);
        exclusions.contains(&name) || existing_notes.iter().any(|note| name.starts_with(note.as_str()))
    };

    let mut warnings = Vec::new();

    // overlay lakes that may become new reservoirs, keyed by normalized name
    let mut lakes: BTreeMap<String, (String, BTreeSet<u32>)> = BTreeMap::new();
    for association in input.associations {
        if is_excluded(&association.name) {
            debug!("Skipping {} (node {})", association.name, association.node_id);
            continue;
        }
        lakes
            .entry(normalize_name(&association.name))
            .or_insert_with(|| (association.name.trim().to_string(), BTreeSet::new()))
            .1
            .insert(association.node_id);
    }

    let extensions = resolve_extensions(input.spec, input.reservoirs, &config.note_aliases);
    let extended: BTreeSet<&str> = extensions
        .iter()
        .map(|(_, _, r)| r.selection.station_id.as_str())
        .collect();

    let by_name: BTreeMap<String, &ReservoirData> = input
        .reservoirs
        .iter()
        .map(|r| (normalize_name(&r.selection.name), r))
        .collect();

    let mut accepted: Vec<(&ReservoirData, &MonthlySeries, String, Vec<u32>)> = Vec::new();
    for (key, (display, nodes)) in &lakes {
        let Some(&reservoir) = by_name.get(key) else {
            warnings.push(unmatched(display, UnmatchedReason::NoStation));
            continue;
        };
        match reservoir.head_series() {
            Ok(series) => {
                if reservoir.limiting_head.is_none() {
                    warnings.push(unmatched(display, UnmatchedReason::NoDeadPool));
                }
                accepted.push((reservoir, series, display.clone(), nodes.iter().copied().collect()));
            }
            Err(reason) => warnings.push(unmatched(display, reason)),
        }
    }
    for reservoir in input.reservoirs {
        let name = &reservoir.selection.name;
        if !lakes.contains_key(&normalize_name(name))
            && !extended.contains(reservoir.selection.station_id.as_str())
            && !is_excluded(name)
        {
            warnings.push(unmatched(name, UnmatchedReason::NoNode));
        }
    }
    accepted.sort_by(|a, b| a.0.selection.station_id.cmp(&b.0.selection.station_id));

    let first = first_free_slot(input.spec, input.timeseries.column_count);
    let pairs = allocate(first, accepted.len());

    let conductance: BTreeMap<u32, f64> = input
        .conductance
        .iter()
        .map(|c| (c.node_id, c.conductance))
        .collect();
    let mut records = input.spec.records.clone();
    let mut added = Vec::with_capacity(accepted.len());
    for ((reservoir, _, display, nodes), pair) in accepted.iter().zip(&pairs) {
        let note = format!("/{display}");
        for node_id in nodes {
            let bc = conductance.get(node_id).copied();
            if bc.is_none() {
                warnings.push(unmatched(
                    display,
                    UnmatchedReason::NoConductance { node_id: *node_id },
                ));
            }
            records.push(BoundaryConditionRecord {
                node_id: *node_id,
                layer: 1,
                ts_column: pair.head,
                head_value: 0.0,
                conductance: bc,
                limiting_head: reservoir.limiting_head,
                ts_column_flow: pair.flow,
                flow_value: 0.0,
                note: note.clone(),
            });
        }
        info!(
            "Adding {} ({}) on {} nodes, slots {} and {}",
            display,
            reservoir.selection.station_id,
            nodes.len(),
            pair.head,
            pair.flow
        );
        added.push(AddedReservoir {
            station_id: reservoir.selection.station_id.clone(),
            note,
            nodes: nodes.clone(),
            slots: *pair,
        });
    }
    records.sort_by_key(|r| r.node_id);

    let mut fills: BTreeMap<u32, SlotFill> = BTreeMap::new();
    for (note, pair, reservoir) in &extensions {
        match reservoir.head_series() {
            Ok(series) => {
                info!("Extending {} with {}", note, reservoir.selection.station_id);
                fills.insert(pair.head, SlotFill { series, kind: SlotKind::Head, report_gaps: true });
                if pair.flow > 0 {
                    fills.insert(pair.flow, SlotFill { series, kind: SlotKind::Flow, report_gaps: true });
                }
            }
            Err(reason) => debug!("Not extending {note}: {reason}"),
        }
    }
    for ((_, series, _, _), pair) in accepted.iter().zip(&pairs) {
        let series: &MonthlySeries = series;
        fills.insert(pair.head, SlotFill { series, kind: SlotKind::Head, report_gaps: false });
        fills.insert(pair.flow, SlotFill { series, kind: SlotKind::Flow, report_gaps: false });
    }

    // the axis follows the merged series; old rows only back-fill cells
    let mut dates: BTreeSet<NaiveDate> = fills
        .values()
        .flat_map(|fill| fill.series.records.iter().map(|r| r.period_end))
        .collect();
    if fills.is_empty() {
        dates.extend(input.timeseries.rows.iter().map(|r| r.date));
    }
    dates.retain(|d| existing_first.map_or(true, |first| *d >= first) && *d <= config.cutoff);

    let column_count = records
        .iter()
        .flat_map(|r| [r.ts_column, r.ts_column_flow])
        .chain([input.timeseries.column_count as u32])
        .max()
        .unwrap_or(0);
    let flow_slots: BTreeSet<u32> = records
        .iter()
        .map(|r| r.ts_column_flow)
        .filter(|s| *s > 0)
        .collect();

    let existing_rows: BTreeMap<NaiveDate, &TimeSeriesRow> =
        input.timeseries.rows.iter().map(|r| (r.date, r)).collect();
    let mut sentinel_columns = BTreeSet::new();
    let mut rows = Vec::with_capacity(dates.len());
    for date in &dates {
        let existing = existing_rows.get(date);
        let mut values = Vec::with_capacity(column_count as usize);
        for slot in 1..=column_count {
            let kept = existing.and_then(|row| row.values.get(slot as usize - 1).copied());
            let value = match (kept, fills.get(&slot)) {
                (Some(value), _) => value,
                (None, Some(fill)) => match fill.value_on(date) {
                    Some(value) => value,
                    None => {
                        if fill.report_gaps {
                            sentinel_columns.insert(slot);
                        }
                        fill.kind.sentinel()
                    }
                },
                (None, None) => {
                    sentinel_columns.insert(slot);
                    if flow_slots.contains(&slot) {
                        SlotKind::Flow.sentinel()
                    } else {
                        SlotKind::Head.sentinel()
                    }
                }
            };
            values.push(value);
        }
        rows.push(TimeSeriesRow {
            date: *date,
            label: existing
                .map(|row| row.label.clone())
                .unwrap_or_else(|| format_legacy_date(date)),
            values,
        });
    }
    if !sentinel_columns.is_empty() {
        warnings.push(MergeWarning::SentinelFilledColumns {
            columns: sentinel_columns.into_iter().collect(),
        });
    }

    info!(
        "Merged {} new reservoirs: {} specification rows, {} time-series rows, {} slots",
        added.len(),
        records.len(),
        rows.len(),
        column_count
    );
    Ok(MergeOutput {
        spec: SpecTable { records },
        timeseries: TimeSeriesTable {
            column_count: column_count as usize,
            rows,
        },
        added,
        warnings,
    })
}
