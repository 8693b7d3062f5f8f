use ndarray::{Array, Array3};
use ort::{session::Session, value::Value};
use tracing::info;

use crate::config::Config;
use crate::error::SupertonicError;
use crate::latent::sample_noisy_latent_default;
use crate::style::Style;
use crate::text::{chunk_text, UnicodeProcessor};

pub use crate::style::{
    load_voice_style, load_voice_style_from_bytes, parse_voice_style, VoiceStyleData,
};

// ============================================================================
// ONNX Runtime Integration — the Inference Orchestrator (SPEC_FULL §4.6)
// ============================================================================

pub struct TextToSpeech {
    cfgs: Config,
    text_processor: UnicodeProcessor,
    dp_ort: Session,
    text_enc_ort: Session,
    vector_est_ort: Session,
    vocoder_ort: Session,
    pub sample_rate: i32,
}

impl TextToSpeech {
    pub fn new(
        cfgs: Config,
        text_processor: UnicodeProcessor,
        dp_ort: Session,
        text_enc_ort: Session,
        vector_est_ort: Session,
        vocoder_ort: Session,
    ) -> Self {
        let sample_rate = cfgs.ae.sample_rate;
        TextToSpeech {
            cfgs,
            text_processor,
            dp_ort,
            text_enc_ort,
            vector_est_ort,
            vocoder_ort,
            sample_rate,
        }
    }

    /// Runs the five-stage pipeline (tokenize, duration, text encoding,
    /// latent sampling, denoising loop, vocoder) for a batch of independent
    /// texts sharing one style tensor per row. Used directly by `call` with
    /// `bsz == 1`, and by `batch` for `bsz > 1` (SPEC_FULL §4.6a).
    fn _infer(
        &mut self,
        text_list: &[String],
        style: &Style,
        total_step: usize,
        speed: f32,
    ) -> Result<(Vec<Vec<f32>>, Vec<f32>), SupertonicError> {
        let bsz = text_list.len();

        // 1. Tokenize and mask.
        let (text_ids, text_mask) = self.text_processor.call(text_list);

        let text_ids_array = {
            let text_ids_shape = (bsz, text_ids[0].len());
            let mut flat = Vec::new();
            for row in &text_ids {
                flat.extend_from_slice(row);
            }
            Array::from_shape_vec(text_ids_shape, flat).map_err(|_| {
                SupertonicError::ShapeMismatch {
                    expected: vec![bsz, text_ids[0].len()],
                    got: vec![],
                }
            })?
        };

        let text_ids_value = Value::from_array(text_ids_array)?;
        let text_mask_value = Value::from_array(text_mask.clone())?;
        let style_dp_value = Value::from_array(style.dp.clone())?;

        // 2. Duration prediction.
        let dp_outputs = self.dp_ort.run(ort::inputs! {
            "text_ids" => &text_ids_value,
            "style_dp" => &style_dp_value,
            "text_mask" => &text_mask_value
        })?;

        let (_, duration_data) = dp_outputs["duration"].try_extract_tensor::<f32>()?;
        let mut duration: Vec<f32> = duration_data.to_vec();
        for dur in duration.iter_mut() {
            *dur /= speed;
        }

        // 3. Text encoding.
        let style_ttl_value = Value::from_array(style.ttl.clone())?;
        let text_enc_outputs = self.text_enc_ort.run(ort::inputs! {
            "text_ids" => &text_ids_value,
            "style_ttl" => &style_ttl_value,
            "text_mask" => &text_mask_value
        })?;

        let (text_emb_shape, text_emb_data) =
            text_enc_outputs["text_emb"].try_extract_tensor::<f32>()?;
        let text_emb = Array3::from_shape_vec(
            (
                text_emb_shape[0] as usize,
                text_emb_shape[1] as usize,
                text_emb_shape[2] as usize,
            ),
            text_emb_data.to_vec(),
        )
        .map_err(|_| SupertonicError::ShapeMismatch {
            expected: text_emb_shape.iter().map(|&d| d as usize).collect(),
            got: vec![],
        })?;

        // 4. Initial latent.
        let (mut xt, latent_mask) = sample_noisy_latent_default(
            &duration,
            self.sample_rate,
            self.cfgs.ae.base_chunk_size,
            self.cfgs.ttl.chunk_compress_factor,
            self.cfgs.ttl.latent_dim,
        );

        let total_step_array = Array::from_elem(bsz, total_step as f32);

        // 5. Denoising loop — strictly sequential (SPEC_FULL §5).
        for step in 0..total_step {
            let current_step_array = Array::from_elem(bsz, step as f32);

            let xt_value = Value::from_array(xt.clone())?;
            let text_emb_value = Value::from_array(text_emb.clone())?;
            let latent_mask_value = Value::from_array(latent_mask.clone())?;
            let text_mask_value2 = Value::from_array(text_mask.clone())?;
            let current_step_value = Value::from_array(current_step_array)?;
            let total_step_value = Value::from_array(total_step_array.clone())?;

            let vector_est_outputs = self.vector_est_ort.run(ort::inputs! {
                "noisy_latent" => &xt_value,
                "text_emb" => &text_emb_value,
                "style_ttl" => &style_ttl_value,
                "latent_mask" => &latent_mask_value,
                "text_mask" => &text_mask_value2,
                "current_step" => &current_step_value,
                "total_step" => &total_step_value
            })?;

            let (denoised_shape, denoised_data) =
                vector_est_outputs["denoised_latent"].try_extract_tensor::<f32>()?;
            xt = Array3::from_shape_vec(
                (
                    denoised_shape[0] as usize,
                    denoised_shape[1] as usize,
                    denoised_shape[2] as usize,
                ),
                denoised_data.to_vec(),
            )
            .map_err(|_| SupertonicError::ShapeMismatch {
                expected: denoised_shape.iter().map(|&d| d as usize).collect(),
                got: vec![],
            })?;
        }

        // 6. Vocoder.
        let final_latent_value = Value::from_array(xt)?;
        let vocoder_outputs = self.vocoder_ort.run(ort::inputs! {
            "latent" => &final_latent_value
        })?;

        let (_, wav_data) = vocoder_outputs["wav_tts"].try_extract_tensor::<f32>()?;
        let wav_flat: Vec<f32> = wav_data.to_vec();

        let mut wav_outputs = Vec::with_capacity(bsz);
        let wav_len_per_sample = wav_flat.len() / bsz.max(1);

        for i in 0..bsz {
            let actual_len = (self.sample_rate as f32 * duration[i]) as usize;
            let wav_start = i * wav_len_per_sample;
            let wav_end = wav_start + actual_len.min(wav_len_per_sample);
            wav_outputs.push(wav_flat[wav_start..wav_end].to_vec());
        }

        Ok((wav_outputs, duration))
    }

    /// Single-text entry point (`B == 1`): chunks the text, runs the
    /// pipeline once per chunk, and concatenates waveforms with inter-chunk
    /// silence (SPEC_FULL §4.9).
    pub fn call(
        &mut self,
        text: &str,
        style: &Style,
        total_step: usize,
        speed: f32,
        silence_duration: f32,
    ) -> Result<(Vec<f32>, f32), SupertonicError> {
        let chunks = chunk_text(text, None);

        let mut wav_cat: Vec<f32> = Vec::new();
        let mut dur_cat: f32 = 0.0;

        for (i, chunk) in chunks.iter().enumerate() {
            let (wav_batch, duration) = self._infer(&[chunk.clone()], style, total_step, speed)?;

            let dur = duration[0];
            let wav_chunk = &wav_batch[0];

            if i == 0 {
                wav_cat.extend_from_slice(wav_chunk);
                dur_cat = dur;
            } else {
                let silence_len = (silence_duration * self.sample_rate as f32) as usize;
                let silence = vec![0.0f32; silence_len];

                wav_cat.extend_from_slice(&silence);
                wav_cat.extend_from_slice(wav_chunk);
                dur_cat += silence_duration + dur;
            }
        }

        Ok((wav_cat, dur_cat))
    }

    /// Multi-text batch entry point (`B > 1`), one style row per text
    /// (SPEC_FULL §4.6a). Unlike `call`, this does not chunk long inputs —
    /// callers are expected to supply already-bounded texts.
    pub fn batch(
        &mut self,
        text_list: &[String],
        style: &Style,
        total_step: usize,
        speed: f32,
    ) -> Result<(Vec<Vec<f32>>, Vec<f32>), SupertonicError> {
        self._infer(text_list, style, total_step, speed)
    }
}

pub struct ModelBytes<'a> {
    pub config: &'a [u8],
    pub duration_predictor: &'a [u8],
    pub text_encoder: &'a [u8],
    pub vector_estimator: &'a [u8],
    pub vocoder: &'a [u8],
    pub unicode_indexer: &'a [u8],
}

/// Load TTS components from memory (SPEC_FULL §4.7 Session Manager).
pub fn load_text_to_speech_from_memory(
    models: ModelBytes,
    use_gpu: bool,
) -> Result<TextToSpeech, SupertonicError> {
    if use_gpu {
        return Err(SupertonicError::Config(
            "GPU mode is not supported yet".to_string(),
        ));
    }
    info!("Using CPU for inference");

    let cfgs = crate::config::load_cfgs_from_bytes(models.config)
        .map_err(|e| SupertonicError::Config(e.to_string()))?;

    let dp_ort = Session::builder()?.commit_from_memory(models.duration_predictor)?;
    let text_enc_ort = Session::builder()?.commit_from_memory(models.text_encoder)?;
    let vector_est_ort = Session::builder()?.commit_from_memory(models.vector_estimator)?;
    let vocoder_ort = Session::builder()?.commit_from_memory(models.vocoder)?;

    let text_processor = UnicodeProcessor::from_bytes(models.unicode_indexer)
        .map_err(|e| SupertonicError::TextProcessing(e.to_string()))?;

    Ok(TextToSpeech::new(
        cfgs,
        text_processor,
        dp_ort,
        text_enc_ort,
        vector_est_ort,
        vocoder_ort,
    ))
}

/// Load TTS components from an asset directory laid out per SPEC_FULL §6.2.
pub fn load_text_to_speech(onnx_dir: &str, use_gpu: bool) -> Result<TextToSpeech, SupertonicError> {
    let cfg_path = format!("{}/tts.json", onnx_dir);
    let dp_path = format!("{}/duration_predictor_quant.onnx", onnx_dir);
    let text_enc_path = format!("{}/text_encoder_quant.onnx", onnx_dir);
    let vector_est_path = format!("{}/vector_estimator_quant.onnx", onnx_dir);
    let vocoder_path = format!("{}/vocoder_quant.onnx", onnx_dir);
    let unicode_indexer_path = format!("{}/unicode_indexer.json", onnx_dir);

    let config = std::fs::read(cfg_path)?;
    let dp = std::fs::read(dp_path)?;
    let text_enc = std::fs::read(text_enc_path)?;
    let vector_est = std::fs::read(vector_est_path)?;
    let vocoder = std::fs::read(vocoder_path)?;
    let unicode_indexer = std::fs::read(unicode_indexer_path)?;

    load_text_to_speech_from_memory(
        ModelBytes {
            config: &config,
            duration_predictor: &dp,
            text_encoder: &text_enc,
            vector_estimator: &vector_est,
            vocoder: &vocoder,
            unicode_indexer: &unicode_indexer,
        },
        use_gpu,
    )
}
