use std::fmt;

/// Why a lake or reservoir did not make it into the output, or made it in
/// with a gap.
#[derive(Debug, Clone, PartialEq)]
pub enum UnmatchedReason {
    /// Overlay lake with no selected station of the same name
    NoStation,
    /// Selected station with no node under it
    NoNode,
    /// Station whose download or normalization produced nothing
    NoSeries,
    /// Storage series without elevations to write as heads
    NoRatingCurve,
    /// Added without a limiting head
    NoDeadPool,
    /// Added with an empty conductance on this node
    NoConductance { node_id: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeWarning {
    UnmatchedAssociation {
        reservoir: String,
        reason: UnmatchedReason,
    },
    /// Time-series slots that had cells with no value anywhere and were
    /// filled with the slot's sentinel
    SentinelFilledColumns { columns: Vec<u32> },
}

impl MergeWarning {
    /// Subject the operator should look at (reservoir name or slot list).
    pub fn subject(&self) -> String {
        match self {
            MergeWarning::UnmatchedAssociation { reservoir, .. } => reservoir.clone(),
            MergeWarning::SentinelFilledColumns { columns } => columns
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<String>>()
                .join(" "),
        }
    }

    pub fn detail(&self) -> String {
        match self {
            MergeWarning::UnmatchedAssociation { reason, .. } => reason.to_string(),
            MergeWarning::SentinelFilledColumns { .. } => {
                "cells without data filled with 9999 (head) or 0 (flow)".to_string()
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MergeWarning::UnmatchedAssociation { .. } => "unmatched",
            MergeWarning::SentinelFilledColumns { .. } => "sentinel",
        }
    }
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedReason::NoStation => write!(f, "no selected station"),
            UnmatchedReason::NoNode => write!(f, "no associated model node"),
            UnmatchedReason::NoSeries => write!(f, "no monthly series"),
            UnmatchedReason::NoRatingCurve => write!(f, "storage series without a rating curve"),
            UnmatchedReason::NoDeadPool => write!(f, "no dead pool elevation"),
            UnmatchedReason::NoConductance { node_id } => {
                write!(f, "no conductance estimate for node {node_id}")
            }
        }
    }
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeWarning::UnmatchedAssociation { reservoir, reason } => {
                write!(f, "{reservoir}: {reason}")
            }
            MergeWarning::SentinelFilledColumns { .. } => {
                write!(f, "sentinel values written to slots {}", self.subject())
            }
        }
    }
}
