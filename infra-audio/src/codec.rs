use std::io::Cursor;

use photon_domain::{AudioBuffer, AudioCodecPort, DomainError};

/// WAV container support through `hound`. Everything is downmixed to mono
/// and resampled to the rate the caller asks for.
#[derive(Default)]
pub struct WavAudioCodec;

impl WavAudioCodec {
    pub fn new() -> Self {
        Self
    }
}

impl AudioCodecPort for WavAudioCodec {
    fn decode(&self, bytes: &[u8], target_sample_rate_hz: u32) -> Result<AudioBuffer, DomainError> {
        if target_sample_rate_hz == 0 {
            return Err(DomainError::internal_error(
                "sample rate must be greater than zero",
            ));
        }

        let mut reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|err| DomainError::InvalidInput(format!("failed to parse WAV: {err}")))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let bits = u32::from(spec.bits_per_sample.max(1));
                let max_val = if bits > 1 {
                    ((1i64 << (bits - 1)) - 1) as f32
                } else {
                    1.0
                };
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / max_val))
                    .collect::<Result<_, _>>()
            }
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>(),
        }
        .map_err(|err| DomainError::InvalidInput(format!("failed to read WAV samples: {err}")))?;

        let mut samples = downmix(&interleaved, channels);
        let clamped = clamp_samples(&mut samples);
        let source_sample_rate_hz = spec.sample_rate;
        let resampled = source_sample_rate_hz != target_sample_rate_hz && !samples.is_empty();
        if resampled {
            samples = resample_linear(&samples, source_sample_rate_hz, target_sample_rate_hz);
        }

        tracing::debug!(
            source_sample_rate_hz,
            target_sample_rate_hz,
            channels,
            output_samples = samples.len(),
            clamped,
            resampled,
            "decoded wav input"
        );

        Ok(AudioBuffer::new(target_sample_rate_hz, samples))
    }

    fn encode_wav(&self, audio: &AudioBuffer) -> Result<Vec<u8>, DomainError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|err| DomainError::internal_error(&format!("wav writer: {err}")))?;
            for sample in &audio.samples {
                let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
                writer
                    .write_sample(value)
                    .map_err(|err| DomainError::internal_error(&format!("wav write: {err}")))?;
            }
            writer
                .finalize()
                .map_err(|err| DomainError::internal_error(&format!("wav finalize: {err}")))?;
        }
        Ok(cursor.into_inner())
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn clamp_samples(samples: &mut [f32]) -> bool {
    let mut clamped_any = false;
    for sample in samples {
        let clamped = if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        if clamped != *sample {
            clamped_any = true;
            *sample = clamped;
        }
    }
    clamped_any
}

pub fn resample_linear(samples: &[f32], source_rate_hz: u32, target_rate_hz: u32) -> Vec<f32> {
    if source_rate_hz == target_rate_hz || source_rate_hz == 0 || target_rate_hz == 0 {
        return samples.to_vec();
    }
    if samples.len() <= 1 {
        return samples.to_vec();
    }

    let output_len = ((samples.len() as u64 * target_rate_hz as u64) / source_rate_hz as u64)
        .max(1) as usize;
    if output_len <= 1 {
        return vec![samples[0]];
    }

    let mut output = Vec::with_capacity(output_len);
    let max_source_idx = samples.len() - 1;

    for out_idx in 0..output_len {
        let source_pos = out_idx as f64 * source_rate_hz as f64 / target_rate_hz as f64;
        let left_idx = (source_pos.floor() as usize).min(max_source_idx);
        let right_idx = (left_idx + 1).min(max_source_idx);
        let frac = (source_pos - left_idx as f64) as f32;

        let left = samples[left_idx];
        let right = samples[right_idx];
        output.push(left * (1.0 - frac) + right * frac);
    }

    output
}
