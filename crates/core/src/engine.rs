use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::audio::encode_wav;
use crate::error::SupertonicError;
use crate::model::{load_text_to_speech, TextToSpeech};
use crate::style::{style_store_for, StyleStore, VoiceId};

const DEFAULT_SILENCE_DURATION_SECONDS: f32 = 0.3;

/// A synthesis request, mirroring the JSON body an HTTP layer built on top
/// of this crate would parse (SPEC_FULL §6.1). This crate does not parse
/// JSON or speak HTTP itself — it only defines the shape.
#[derive(Debug, Clone)]
pub struct SynthesizeRequest {
    pub text: String,
    pub voice: VoiceId,
    /// Number of denoising steps. Defaults to `5`; only `>= 1` is enforced
    /// here (the UI's `<= 20` bound is not this crate's concern).
    pub total_step: usize,
    /// Speed factor; no default is enforced by this crate (SPEC_FULL §4.9,
    /// §9 Open Question 1) — callers choose their own default.
    pub speed: f32,
    pub silence_duration_seconds: f32,
}

impl SynthesizeRequest {
    pub fn new(text: impl Into<String>, voice: VoiceId, speed: f32) -> Self {
        SynthesizeRequest {
            text: text.into(),
            voice,
            total_step: 5,
            speed,
            silence_duration_seconds: DEFAULT_SILENCE_DURATION_SECONDS,
        }
    }

    pub fn with_total_step(mut self, total_step: usize) -> Self {
        self.total_step = total_step;
        self
    }

    pub fn with_silence_duration_seconds(mut self, seconds: f32) -> Self {
        self.silence_duration_seconds = seconds;
        self
    }
}

/// Result of one `synthesize` call (SPEC_FULL §4.9).
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub wav_bytes: Vec<u8>,
    pub sample_rate: i32,
    pub duration_seconds: f32,
}

/// Process-wide session manager (SPEC_FULL §4.7): lazily loads config,
/// indexer, and the four ONNX sessions on first use, and retains them for
/// the process lifetime. Concurrent first-use requests converge on the same
/// `OnceCell::get_or_try_init` call rather than performing redundant loads.
pub struct Engine {
    asset_root: PathBuf,
    use_gpu: bool,
    tts: OnceCell<std::sync::Mutex<TextToSpeech>>,
    styles: OnceCell<Arc<StyleStore>>,
}

impl Engine {
    pub fn new<P: Into<PathBuf>>(asset_root: P, use_gpu: bool) -> Self {
        Engine {
            asset_root: asset_root.into(),
            use_gpu,
            tts: OnceCell::new(),
            styles: OnceCell::new(),
        }
    }

    fn tts(&self) -> Result<&std::sync::Mutex<TextToSpeech>, SupertonicError> {
        self.tts.get_or_try_init(|| {
            info!(asset_root = %self.asset_root.display(), "loading Supertonic TTS session");
            let tts = load_text_to_speech(
                self.asset_root
                    .to_str()
                    .ok_or_else(|| SupertonicError::Config("asset root is not valid UTF-8".into()))?,
                self.use_gpu,
            )?;
            Ok(std::sync::Mutex::new(tts))
        })
    }

    fn styles(&self) -> &Arc<StyleStore> {
        self.styles
            .get_or_init(|| style_store_for(self.asset_root.as_path()))
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// The single synthesis operation (SPEC_FULL §4.9): chunk, synthesize
    /// each chunk, concatenate with inter-chunk silence, truncate, encode.
    pub fn synthesize(&self, request: &SynthesizeRequest) -> Result<SynthesisOutput, SupertonicError> {
        if request.text.trim().is_empty() {
            return Err(SupertonicError::Validation(
                "text must not be empty".to_string(),
            ));
        }
        if request.total_step < 1 {
            return Err(SupertonicError::Validation(
                "total_step must be >= 1".to_string(),
            ));
        }

        let style = self.styles().get(request.voice)?;

        let tts_lock = self.tts()?;
        let mut tts = tts_lock
            .lock()
            .map_err(|_| SupertonicError::Unknown("TTS session lock poisoned".to_string()))?;

        let (wav, duration) = tts.call(
            &request.text,
            &style,
            request.total_step,
            request.speed,
            request.silence_duration_seconds,
        )?;

        let truncated_len = ((tts.sample_rate as f32 * duration) as usize).min(wav.len());
        let wav_bytes = encode_wav(&wav[..truncated_len], tts.sample_rate)?;

        Ok(SynthesisOutput {
            wav_bytes,
            sample_rate: tts.sample_rate,
            duration_seconds: duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_text_before_touching_the_engine() {
        let engine = Engine::new("assets/onnx", false);
        let req = SynthesizeRequest::new("   ", VoiceId::F1, 1.0);
        let err = engine.synthesize(&req).unwrap_err();
        assert!(matches!(err, SupertonicError::Validation(_)));
        assert_eq!(err.class(), crate::error::ErrorClass::ClientError);
    }

    #[test]
    fn rejects_zero_total_step() {
        let engine = Engine::new("assets/onnx", false);
        let req = SynthesizeRequest::new("Hello.", VoiceId::F1, 1.0).with_total_step(0);
        let err = engine.synthesize(&req).unwrap_err();
        assert!(matches!(err, SupertonicError::Validation(_)));
    }
}
