//! Audio decoding
//!
//! Decodes any container/codec symphonia supports into mono `f64` samples at
//! the file's native sample rate. No resampling is done.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Audio file extensions picked up when scanning directories
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "wave", "flac", "ogg", "oga", "mp3"];

/// Mono PCM at native sample rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Whether a path has one of the [`SUPPORTED_EXTENSIONS`]
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode a file to mono, stopping after `max_duration_secs` if given
pub fn decode_file(path: &Path, max_duration_secs: Option<f64>) -> Result<DecodedAudio> {
    let file =
        File::open(path).map_err(|e| Error::extraction(path, format!("open failed: {}", e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::extraction(path, format!("unrecognized format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| Error::extraction(path, "no audio track"))?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::extraction(path, format!("unsupported codec: {}", e)))?;

    let max_samples = max_duration_secs.map(|secs| (secs * sample_rate as f64) as usize);
    let mut samples = Vec::new();
    let mut sample_buf: Option<(SampleBuffer<f32>, SignalSpec, u64)> = None;
    let mut bad_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "stopped reading packets");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                bad_packets += 1;
                debug!(path = %path.display(), error = e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(Error::extraction(path, format!("decode failed: {}", e))),
        };

        let spec = *decoded.spec();
        let capacity = decoded.capacity() as u64;
        let needs_new = match sample_buf {
            Some((_, ref s, c)) => *s != spec || c < capacity,
            None => true,
        };
        if needs_new {
            sample_buf = Some((SampleBuffer::new(capacity, spec), spec, capacity));
        }

        if let Some((ref mut buf, _, _)) = sample_buf {
            let channel_count = spec.channels.count().max(1);
            buf.copy_interleaved_ref(decoded);

            // Convert to mono f64
            for chunk in buf.samples().chunks(channel_count) {
                let mono: f64 = chunk.iter().map(|&s| s as f64).sum::<f64>() / channel_count as f64;
                samples.push(mono);
            }
        }

        if let Some(max) = max_samples {
            if samples.len() >= max {
                samples.truncate(max);
                break;
            }
        }
    }

    if bad_packets > 0 {
        warn!(path = %path.display(), bad_packets, "some packets could not be decoded");
    }

    if samples.is_empty() {
        return Err(Error::extraction(path, "no audio samples decoded"));
    }

    Ok(DecodedAudio { samples, sample_rate })
}
