use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::pcm::PcmBuffer;

/// WAV spec the engine works with natively: mono 16-bit PCM.
pub fn pcm_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write mono 16-bit samples to `path`, creating parent directories.
pub fn write_pcm(path: &Path, pcm: &PcmBuffer) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut writer = WavWriter::create(path, pcm_spec(pcm.sample_rate()))
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for &s in pcm.samples() {
        writer.write_sample(s).context("Failed to write WAV sample")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Load a WAV file into a mono `PcmBuffer`.
///
/// Integer formats are rescaled to 16 bits, float formats are quantized,
/// and multi-channel files are downmixed by averaging each frame.
pub fn load_pcm(path: &Path) -> Result<PcmBuffer> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();

    let normalized: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<hound::Result<Vec<_>>>()
                .context("Failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<hound::Result<Vec<_>>>()
            .context("Failed to read WAV samples")?,
    };

    let channels = spec.channels.max(1) as usize;
    let mono: Vec<i16> = normalized
        .chunks(channels)
        .map(|frame| {
            let avg = frame.iter().sum::<f32>() / frame.len() as f32;
            (avg.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        })
        .collect();

    PcmBuffer::new(mono, spec.sample_rate)
        .with_context(|| format!("Unusable audio in {}", path.display()))
}
