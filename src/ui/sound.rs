/// Sound engine: short procedural chimes via rodio.
///
/// The fixed effects are rendered to in-memory WAV buffers at init time;
/// the paint blip is rendered per call since its pitch follows the colour.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_correct: Arc<Vec<u8>>,
        sfx_wrong: Arc<Vec<u8>>,
        sfx_complete: Arc<Vec<u8>>,
        sfx_reject: Arc<Vec<u8>>,
        sfx_share: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::info!("no audio output, sound disabled: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_correct: Arc::new(make_wav(&gen_correct())),
                sfx_wrong: Arc::new(make_wav(&gen_wrong())),
                sfx_complete: Arc::new(make_wav(&gen_complete())),
                sfx_reject: Arc::new(make_wav(&gen_reject())),
                sfx_share: Arc::new(make_wav(&gen_share())),
            })
        }

        fn play_buf(&self, buf: Vec<u8>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(buf)) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            self.play_buf(buf.as_ref().clone());
        }

        /// Tick for a painted cell; brighter colours ring higher.
        pub fn play_paint(&self, value: u8, levels: usize) {
            let ratio = value as f32 / levels.max(2).saturating_sub(1) as f32;
            let freq = 520.0 + ratio * 520.0;
            self.play_buf(make_wav(&gen_blip(freq, 0.03, 0.2)));
        }

        pub fn play_correct(&self) { self.play(&self.sfx_correct); }
        pub fn play_wrong(&self) { self.play(&self.sfx_wrong); }
        pub fn play_complete(&self) { self.play(&self.sfx_complete); }
        pub fn play_reject(&self) { self.play(&self.sfx_reject); }
        pub fn play_share(&self) { self.play(&self.sfx_share); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn sample_count(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Sine with a linear fade out
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = sample_count(duration);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Notes played back to back. `harmonics` are (multiple, weight) pairs.
    fn gen_notes(notes: &[(f32, f32)], harmonics: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in notes {
            let n = sample_count(dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5) * 0.7;
                let wave: f32 = harmonics.iter().map(|&(m, w)| (t * freq * m * TAU).sin() * w).sum();
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Correct answer: rising major triad C5→E5→G5
    fn gen_correct() -> Vec<f32> {
        gen_notes(&[(523.0, 0.08), (659.0, 0.08), (784.0, 0.16)], &[(1.0, 0.7), (2.0, 0.3)], 0.3)
    }

    /// Wrong answer: two falling tones, A4→F4
    fn gen_wrong() -> Vec<f32> {
        let mut samples = gen_notes(&[(440.0, 0.12), (349.0, 0.2)], &[(1.0, 1.0)], 0.28);
        fade_tail(&mut samples, 4);
        samples
    }

    /// All levels complete: fanfare C5→E5→G5→C6 with a held top note
    fn gen_complete() -> Vec<f32> {
        let mut samples = gen_notes(
            &[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.35)],
            &[(1.0, 0.6), (2.0, 0.3), (3.0, 0.1)],
            0.3,
        );
        fade_tail(&mut samples, 3);
        samples
    }

    /// Rejected input: low buzz with noise
    fn gen_reject() -> Vec<f32> {
        let n = sample_count(0.1);
        let mut rng: u32 = 2024;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let tone = (t * 150.0 * TAU).sin().signum();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = 1.0 - i as f32 / n as f32;
                (tone * 0.7 + noise * 0.3) * env * 0.15
            })
            .collect()
    }

    /// Share code ready: quick arpeggio G5→C6→E6
    fn gen_share() -> Vec<f32> {
        gen_notes(&[(784.0, 0.045), (1047.0, 0.045), (1319.0, 0.07)], &[(1.0, 0.7), (3.0, 0.3)], 0.22)
    }

    /// Linear fade over the last 1/`fraction` of the buffer
    fn fade_tail(samples: &mut [f32], fraction: usize) {
        let total = samples.len();
        let fade_len = (total / fraction).max(1);
        for (k, s) in samples[total.saturating_sub(fade_len)..].iter_mut().enumerate() {
            *s *= 1.0 - k as f32 / fade_len as f32;
        }
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_paint(&self, _value: u8, _levels: usize) {}
    pub fn play_correct(&self) {}
    pub fn play_wrong(&self) {}
    pub fn play_complete(&self) {}
    pub fn play_reject(&self) {}
    pub fn play_share(&self) {}
}
