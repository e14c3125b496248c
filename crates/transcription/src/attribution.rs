use std::collections::{BTreeMap, HashMap};

use crate::SpeakerTurn;

/// Label returned when no turn overlaps a segment.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Picks the speaker whose turns cover most of `[seg_start, seg_end]`.
///
/// Overlap is accumulated per label across all of that label's turns. Equal
/// totals resolve to the lexicographically smallest label. The winning label
/// is mapped through `names`, falling back to the raw label; when nothing
/// overlaps, [`UNKNOWN_SPEAKER`] is returned unmapped.
pub fn attribute(
    seg_start: f64,
    seg_end: f64,
    turns: &[SpeakerTurn],
    names: &HashMap<String, String>,
) -> String {
    let mut overlap_by_speaker: BTreeMap<&str, f64> = BTreeMap::new();
    for turn in turns {
        let overlap = (seg_end.min(turn.end) - seg_start.max(turn.start)).max(0.0);
        if overlap > 0.0 {
            *overlap_by_speaker.entry(turn.speaker.as_str()).or_default() += overlap;
        }
    }

    let mut best: Option<(&str, f64)> = None;
    for (label, total) in overlap_by_speaker {
        match best {
            Some((_, best_total)) if total <= best_total => {}
            _ => best = Some((label, total)),
        }
    }

    match best {
        Some((label, _)) => names
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string()),
        None => UNKNOWN_SPEAKER.to_string(),
    }
}
