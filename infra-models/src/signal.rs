use photon_domain::AudioBuffer;

/// Voiced `(start_ms, end_ms)` regions by frame RMS, merged across gaps shorter than `merge_gap_ms`.
pub(crate) fn voiced_regions(
    audio: &AudioBuffer,
    frame_ms: u32,
    threshold: f32,
    merge_gap_ms: u64,
) -> Vec<(u64, u64)> {
    if audio.sample_rate_hz == 0 {
        return Vec::new();
    }
    let frame_ms = u64::from(frame_ms.max(1));
    let frame_len = ((u64::from(audio.sample_rate_hz) * frame_ms) / 1_000).max(1) as usize;

    let mut regions: Vec<(u64, u64)> = Vec::new();
    for (idx, frame) in audio.samples.chunks(frame_len).enumerate() {
        let power = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
        if power.sqrt() < threshold {
            continue;
        }
        let start_ms = idx as u64 * frame_ms;
        let end_ms = start_ms + frame.len() as u64 * 1_000 / u64::from(audio.sample_rate_hz);
        match regions.last_mut() {
            Some(last) if start_ms.saturating_sub(last.1) < merge_gap_ms => last.1 = end_ms,
            _ => regions.push((start_ms, end_ms)),
        }
    }
    regions
}
