//! instantiate::probe
//!
//! Media format probing.
//!
//! Only PCM WAV headers are understood. Anything else reports a
//! [`ProbeError`], which callers log and otherwise ignore: an AudioFile
//! whose source could not be probed is still created, just without format
//! properties and with a zero length.

use std::path::Path;

use thiserror::Error;

/// Errors from media probing.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unreadable audio file: {0}")]
    Decode(#[from] hound::Error),

    #[error("audio file reports a zero sample rate")]
    ZeroSampleRate,
}

/// Format information read from a media file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel.
    pub frames: u32,
}

impl MediaInfo {
    /// Sample rate in kHz, the unit AudioFile objects store.
    pub fn frequency_khz(&self) -> f64 {
        f64::from(self.sample_rate) / 1000.0
    }

    pub fn duration_secs(&self) -> f64 {
        f64::from(self.frames) / f64::from(self.sample_rate)
    }
}

/// Read the header of a WAV file.
pub fn probe(path: &Path) -> Result<MediaInfo, ProbeError> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(ProbeError::ZeroSampleRate);
    }
    Ok(MediaInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames: reader.duration(),
    })
}
