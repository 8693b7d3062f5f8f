pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod latent;
pub mod model;
pub mod style;
pub mod text;
pub mod utils;

pub use audio::{encode_wav, write_wav_file};
pub use config::{load_cfgs, AEConfig, Config, TTLConfig};
pub use engine::{Engine, SynthesisOutput, SynthesizeRequest};
pub use error::{ErrorClass, SupertonicError};
pub use latent::sample_noisy_latent_default as sample_noisy_latent;
pub use model::{
    load_text_to_speech, load_text_to_speech_from_memory, ModelBytes, TextToSpeech,
};
pub use style::{load_voice_style, load_voice_style_from_bytes, Style, VoiceId};
pub use text::{chunk_text, length_to_mask, preprocess_text, UnicodeProcessor};
pub use utils::{sanitize_filename, timer};
