//! Audio test file generation
//!
//! Writes small deterministic WAV files for the headless backend's probe.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Standard test sample rate (44.1 kHz)
pub const TEST_SAMPLE_RATE: u32 = 44100;

fn stereo_spec() -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Generate a 440 Hz stereo sine of `duration_ms`
pub fn generate_tone_wav<P: AsRef<Path>>(path: P, duration_ms: u64) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, stereo_spec())?;

    let total_frames = (TEST_SAMPLE_RATE as u64 * duration_ms) / 1000;
    let amplitude = (0.5 * i16::MAX as f32) as i16;

    for frame_idx in 0..total_frames {
        let t = frame_idx as f32 / TEST_SAMPLE_RATE as f32;
        let sample = ((2.0 * PI * 440.0 * t).sin() * amplitude as f32) as i16;
        writer.write_sample(sample)?;
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    Ok(())
}

/// Write bytes that no demuxer recognises
pub fn write_garbage<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    std::fs::write(path, b"this is not an audio file, just some plain text bytes")
}
