use std::path::Path;

use anyhow::Context;
use symphonia::core::audio::SampleBuffer as DecodeBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::frame::StereoFrame;

#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>, // the audio data array, always stereo at the engine rate
}

impl SampleBuffer {
    pub fn from_frames(data: Vec<StereoFrame>) -> Self {
        Self { data }
    }

    pub fn silence(frames: usize) -> Self {
        Self { data: vec![StereoFrame::zero(); frames] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decodes a `.wav` or `.mp3` file, picked by extension.
    pub fn load_file(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "wav" => Self::load_wav(path, target_rate),
            "mp3" => Self::load_mp3(path, target_rate),
            _ => anyhow::bail!("unsupported sample file {} (expected .wav or .mp3)", path.display()),
        }
    }

    // Load a WAV file from disk into the sample buffer
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;
        let spec = reader.spec();

        // Read the samples from the WAV file
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, convert to float
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let frames = interleaved_to_frames(&samples, spec.channels as usize);
        Ok(Self { data: resample_linear(&frames, spec.sample_rate, target_rate) })
    }

    pub fn load_mp3(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        hint.with_extension("mp3");

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format.default_track().context("no audio track in file")?;
        let track_id = track.id;
        let params = track.codec_params.clone();
        let file_rate = params.sample_rate.context("unknown sample rate")?;
        let mut decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

        let mut frames = Vec::new();
        let mut scratch: Option<DecodeBuffer<f32>> = None;
        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }
            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(_)) => continue, // skip the corrupt frame
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let capacity = decoded.capacity();
            if scratch.as_ref().is_none_or(|buf| buf.capacity() < capacity) {
                scratch = Some(DecodeBuffer::new(capacity as u64, spec));
            }
            let Some(buf) = scratch.as_mut() else { continue };
            buf.copy_interleaved_ref(decoded);
            frames.extend(interleaved_to_frames(buf.samples(), spec.channels.count()));
        }

        if frames.is_empty() {
            anyhow::bail!("{} decoded to no audio", path.display());
        }
        Ok(Self { data: resample_linear(&frames, file_rate, target_rate) })
    }
}

// mono is duplicated, anything wider keeps its first two channels
fn interleaved_to_frames(samples: &[f32], channels: usize) -> Vec<StereoFrame> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().map(|&x| StereoFrame::mono(x)).collect(),
        n => samples
            .chunks_exact(n)
            .map(|c| StereoFrame { left: c[0], right: c[1] })
            .collect(),
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        // fractional position in the source buffer
        let src_pos = i as f64 / ratio; // ex. 3.7
        let idx = src_pos.floor() as usize; // ex. 3
        let frac = (src_pos - idx as f64) as f32; // ex. 0.7
        if idx >= frames.len().saturating_sub(1) { // edge case
            out.push(*frames.last().unwrap_or(&StereoFrame::zero()));
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(a.mix(b, frac)); // linear interpolation
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn write_wav(path: &Path, rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn mono_wav_is_duplicated_to_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("click.wav");
        write_wav(&path, 44_100, 1, &[16_384, -16_384, 0]);

        let buf = SampleBuffer::load_file(&path, 44_100).unwrap();
        assert_eq!(buf.len(), 3);
        assert_relative_eq!(buf.data[0].left, 0.5);
        assert_relative_eq!(buf.data[0].right, 0.5);
        assert_relative_eq!(buf.data[1].left, -0.5);
    }

    #[test]
    fn stereo_wav_is_resampled_to_the_engine_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pad.WAV");
        write_wav(&path, 22_050, 2, &[0, 0, 1000, -1000, 2000, -2000, 3000, -3000]);

        let buf = SampleBuffer::load_file(&path, 44_100).unwrap();
        assert_eq!(buf.len(), 8);
        assert!(buf.data[1].left > 0.0 && buf.data[1].left < buf.data[2].left);
        assert!(buf.data[2].right < 0.0);
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let err = SampleBuffer::load_file(Path::new("loop.ogg"), 44_100).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn missing_files_fail_with_the_path() {
        let err = SampleBuffer::load_file(Path::new("/nope/kick.wav"), 44_100).unwrap_err();
        assert!(err.to_string().contains("/nope/kick.wav"));
    }

    #[test]
    fn resampling_keeps_the_duration() {
        let frames: Vec<StereoFrame> = (0..100).map(|i| StereoFrame::mono(i as f32)).collect();
        assert_eq!(resample_linear(&frames, 48_000, 24_000).len(), 50);
        assert_eq!(resample_linear(&frames, 44_100, 44_100).len(), 100);
    }
}
