use cbc_iwfm::SpecTable;

/// Head written where a head slot has no value.
pub const HEAD_SENTINEL: f64 = 9999.0;
/// Flow written where a flow slot has no value.
pub const FLOW_SENTINEL: f64 = 0.0;
/// Flow limit written in months that carry a head.
pub const UNBOUNDED_FLOW: f64 = 9999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Head,
    Flow,
}

impl SlotKind {
    pub fn sentinel(&self) -> f64 {
        match self {
            SlotKind::Head => HEAD_SENTINEL,
            SlotKind::Flow => FLOW_SENTINEL,
        }
    }
}

/// Time-series columns of one reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPair {
    pub head: u32,
    pub flow: u32,
}

/// First slot no existing row references and the time-series file does
/// not already hold.
pub fn first_free_slot(spec: &SpecTable, ts_columns: usize) -> u32 {
    spec.max_slot().max(ts_columns as u32) + 1
}

/// Slots for `count` new reservoirs: head slots run `first..first+count`,
/// flow slots follow as one contiguous run.
pub fn allocate(first: u32, count: usize) -> Vec<SlotPair> {
    let count = count as u32;
    (0..count)
        .map(|i| SlotPair {
            head: first + i,
            flow: first + count + i,
        })
        .collect()
}
