pub mod remote;

use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use crate::SpeakerTurn;

#[derive(Debug, Error)]
pub enum DiarizationError {
    /// Missing credential or inaccessible pipeline models.
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Partitions a media timeline into speaker turns. Blocking.
pub trait DiarizationEngine: Send + Sync + 'static {
    fn diarize(&self, media: &Path) -> Result<Vec<SpeakerTurn>, DiarizationError>;

    /// Whether the credential the engine needs is present.
    fn is_configured(&self) -> bool;
}

/// Distinct labels in `turns`, sorted.
pub fn distinct_speakers(turns: &[SpeakerTurn]) -> Vec<String> {
    turns
        .iter()
        .map(|t| t.speaker.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_speakers_are_sorted_and_unique() {
        let turns = vec![
            SpeakerTurn::new(0.0, 1.0, "SPEAKER_02"),
            SpeakerTurn::new(1.0, 2.0, "SPEAKER_00"),
            SpeakerTurn::new(2.0, 3.0, "SPEAKER_02"),
        ];
        assert_eq!(distinct_speakers(&turns), vec!["SPEAKER_00", "SPEAKER_02"]);
        assert!(distinct_speakers(&[]).is_empty());
    }
}
