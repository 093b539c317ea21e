//! services/api/src/audio.rs
//!
//! PCM plumbing for the voice lab: float/integer sample conversion, fixed
//! framing of the capture stream, base64 wire encoding and the playback
//! scheduling cursor.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Sample rate of the capture (microphone) stream.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of the synthesized tutor audio.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Samples per outbound frame.
pub const FRAME_SAMPLES: usize = 4_096;

/// Converts 32-bit float samples in `[-1.0, 1.0]` to signed 16-bit PCM.
/// Out-of-range input is clamped rather than wrapped.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Reinterprets little-endian bytes as 32-bit float samples. A trailing
/// partial sample is dropped.
pub fn le_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Reinterprets little-endian bytes as signed 16-bit samples.
pub fn le_bytes_to_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

fn i16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Base64-encodes a frame of PCM16 samples for the upstream wire.
pub fn encode_frame(samples: &[i16]) -> String {
    STANDARD.encode(i16_to_le_bytes(samples))
}

/// Decodes a base64 PCM16 chunk back into samples.
pub fn decode_chunk(data: &str) -> Result<Vec<i16>, base64::DecodeError> {
    Ok(le_bytes_to_i16(&STANDARD.decode(data)?))
}

/// Playback time of a chunk, in seconds.
pub fn chunk_duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    sample_count as f64 / sample_rate as f64
}

//=========================================================================================
// Capture Framing
//=========================================================================================

/// Packs an incoming sample stream into fixed [`FRAME_SAMPLES`]-sized frames,
/// carrying the remainder across pushes so no sample is dropped or
/// reordered.
pub struct FrameChunker {
    pending: Vec<i16>,
}

impl FrameChunker {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(FRAME_SAMPLES),
        }
    }

    /// Appends captured samples and returns every complete frame now
    /// available, in capture order.
    pub fn push(&mut self, samples: &[i16]) -> Vec<Vec<i16>> {
        self.pending.extend_from_slice(samples);
        let mut frames = Vec::new();
        while self.pending.len() >= FRAME_SAMPLES {
            let rest = self.pending.split_off(FRAME_SAMPLES);
            frames.push(std::mem::replace(&mut self.pending, rest));
        }
        frames
    }

    /// Hands back whatever partial frame remains.
    pub fn flush(&mut self) -> Option<Vec<i16>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

impl Default for FrameChunker {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================================
// Playback Scheduling
//=========================================================================================

/// The advancing playback cursor for one session.
///
/// Each decoded chunk is assigned a start time of `max(cursor, now)` and the
/// cursor moves to `start + duration`, so consecutive chunks queue
/// back-to-back with no gap and no overlap even though they arrive with
/// variable latency. The cursor has exactly one writer: the session's event
/// pump.
pub struct PlaybackScheduler {
    next_start: f64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self { next_start: 0.0 }
    }

    /// Schedules a chunk of `duration` seconds at clock time `now`, returning
    /// its start time.
    pub fn schedule(&mut self, now: f64, duration: f64) -> f64 {
        let start = self.next_start.max(now);
        self.next_start = start + duration;
        start
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_conversion_clamps() {
        let samples = f32_to_i16(&[0.0, 1.0, -1.0, 2.0, -2.0]);
        assert_eq!(samples[0], 0);
        assert_eq!(samples[1], i16::MAX);
        assert_eq!(samples[3], i16::MAX);
        assert_eq!(samples[4], -i16::MAX);
    }

    #[test]
    fn wire_encoding_round_trips() {
        let samples: Vec<i16> = vec![0, 1, -1, i16::MAX, i16::MIN, 12_345];
        let decoded = decode_chunk(&encode_frame(&samples)).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn chunker_emits_fixed_frames_in_order() {
        let mut chunker = FrameChunker::new();

        assert!(chunker.push(&vec![7; FRAME_SAMPLES - 1]).is_empty());

        // One more sample completes the first frame; the next full frame's
        // worth spills into a second frame plus remainder.
        let frames = chunker.push(&vec![7; FRAME_SAMPLES + 10]);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|frame| frame.len() == FRAME_SAMPLES));

        let tail = chunker.flush().unwrap();
        assert_eq!(tail.len(), 9);
        assert!(chunker.flush().is_none());
    }

    #[test]
    fn chunker_preserves_sample_order() {
        let mut chunker = FrameChunker::new();
        let input: Vec<i16> = (0..(FRAME_SAMPLES * 2) as i32).map(|i| i as i16).collect();
        let frames = chunker.push(&input);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0][0], 0);
        assert_eq!(frames[1][0], input[FRAME_SAMPLES]);
    }

    #[test]
    fn consecutive_chunks_play_back_to_back() {
        let mut scheduler = PlaybackScheduler::new();
        let d1 = 0.48;
        let d2 = 0.32;

        let start1 = scheduler.schedule(0.1, d1);
        // The second chunk arrives while the first is still playing.
        let start2 = scheduler.schedule(0.2, d2);

        assert_eq!(start1, 0.1);
        // Zero gap, zero overlap.
        assert_eq!(start2, start1 + d1);
    }

    #[test]
    fn cursor_never_schedules_in_the_past() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.schedule(0.0, 0.1);
        // A long silence: the next chunk starts now, not at the stale cursor.
        let start = scheduler.schedule(5.0, 0.1);
        assert_eq!(start, 5.0);
    }

    #[test]
    fn chunk_duration_follows_sample_rate() {
        let duration = chunk_duration_secs(PLAYBACK_SAMPLE_RATE as usize, PLAYBACK_SAMPLE_RATE);
        assert!((duration - 1.0).abs() < f64::EPSILON);
        assert_eq!(chunk_duration_secs(12_000, PLAYBACK_SAMPLE_RATE), 0.5);
    }
}
