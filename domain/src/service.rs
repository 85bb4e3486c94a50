use serde::{Deserialize, Serialize};

use crate::Transcript;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerTurn {
    pub speaker: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

fn overlap_ms(turn: &SpeakerTurn, start_ms: u64, end_ms: u64) -> u64 {
    end_ms
        .min(turn.end_ms)
        .saturating_sub(start_ms.max(turn.start_ms))
}

fn dominant_speaker(turns: &[SpeakerTurn], start_ms: u64, end_ms: u64) -> Option<String> {
    let mut best: Option<(&SpeakerTurn, u64)> = None;
    for turn in turns {
        let overlap = overlap_ms(turn, start_ms, end_ms);
        if overlap == 0 {
            continue;
        }
        if best.map_or(true, |(_, current)| overlap > current) {
            best = Some((turn, overlap));
        }
    }
    best.map(|(turn, _)| turn.speaker.clone())
}

/// Labels segments and words with the speaker whose turns overlap them the most.
/// Spans with no overlapping turn keep whatever label they had.
pub fn assign_word_speakers(turns: &[SpeakerTurn], mut transcript: Transcript) -> Transcript {
    if turns.is_empty() {
        return transcript;
    }
    for segment in &mut transcript.segments {
        if let Some(speaker) = dominant_speaker(turns, segment.start_ms, segment.end_ms) {
            segment.speaker = Some(speaker);
        }
        for word in &mut segment.words {
            if let Some(speaker) = dominant_speaker(turns, word.start_ms, word.end_ms) {
                word.speaker = Some(speaker);
            }
        }
    }
    transcript
}
