//! Audio decoding
//!
//! Turns an encoded blob (WAV, MP3, FLAC, OGG, ...) into an [`AudioBuffer`]
//! using symphonia. Everything is decoded up front since the editor needs the
//! whole signal for the chart anyway.

use std::io::Cursor;

use symphonia::core::audio::{AudioBuffer as PlanarBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use super::buffer::AudioBuffer;
use crate::error::DecodeError;

/// Decode a complete encoded file held in memory
pub fn decode_bytes(bytes: Vec<u8>) -> Result<AudioBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    // No extension to go on, let the probe sniff the container
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTracks)?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| match e {
            SymphoniaError::Unsupported(_) => DecodeError::UnsupportedCodec,
            other => DecodeError::Decoder(other.to_string()),
        })?;

    let mut channels: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                log::debug!("Stopping at unreadable packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_rate.is_none() {
                    sample_rate = Some(decoded.spec().rate);
                }
                append_planar(&decoded, &mut channels);
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping corrupt packet: {}", e);
                continue;
            }
            Err(SymphoniaError::IoError(e)) => {
                log::debug!("Skipping packet after io error: {}", e);
                continue;
            }
            Err(e) => return Err(DecodeError::Decoder(e.to_string())),
        }
    }

    if channels.first().map_or(true, Vec::is_empty) {
        return Err(DecodeError::Empty);
    }

    let sample_rate = sample_rate.ok_or_else(|| DecodeError::Decoder("unknown sample rate".into()))?;
    let buffer = AudioBuffer::new(sample_rate, channels)?;
    log::info!(
        "Decoded {:.2}s of audio ({} ch @ {} Hz)",
        buffer.duration(),
        buffer.number_of_channels(),
        buffer.sample_rate()
    );
    Ok(buffer)
}

/// Append a decoded packet to the planar output, converting to `f32`
fn append_planar(decoded: &AudioBufferRef<'_>, channels: &mut Vec<Vec<f32>>) {
    match decoded {
        AudioBufferRef::U8(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::U16(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::U24(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::U32(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::S8(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::S16(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::S24(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::S32(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::F32(buf) => extend_planes(&**buf, channels),
        AudioBufferRef::F64(buf) => extend_planes(&**buf, channels),
    }
}

fn extend_planes<S>(buf: &PlanarBuffer<S>, channels: &mut Vec<Vec<f32>>)
where
    S: Sample + IntoSample<f32>,
{
    let count = buf.spec().channels.count();
    if channels.is_empty() {
        channels.resize_with(count.max(1), Vec::new);
    }

    let frames = buf.frames();
    for (ch, plane) in channels.iter_mut().enumerate() {
        if ch < count {
            plane.extend(buf.chan(ch).iter().map(|&s| s.into_sample()));
        } else {
            // Channel layout changed mid-stream, keep planes aligned
            plane.extend(std::iter::repeat(0.0).take(frames));
        }
    }
}
