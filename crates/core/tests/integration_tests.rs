use std::path::PathBuf;
use supertonic_tts::{load_text_to_speech, load_voice_style, Engine, SynthesizeRequest, VoiceId};

fn assets_present() -> bool {
    PathBuf::from("assets/onnx").is_dir() && PathBuf::from("assets/voice_styles/M1.json").exists()
}

#[test]
fn test_load_components() {
    let onnx_dir = "assets/onnx";
    let style_path = "assets/voice_styles/M1.json";

    if !assets_present() {
        eprintln!("Assets not found, skipping integration test.");
        return;
    }

    match load_text_to_speech(onnx_dir, false) {
        Ok(_) => (),
        Err(e) => {
            panic!("Failed to load TTS components: {:?}", e);
        }
    }

    match load_voice_style(&[style_path.to_string()]) {
        Ok(_) => (),
        Err(e) => {
            panic!("Failed to load voice style: {:?}", e);
        }
    }
}

// Scenario 1: a single short chunk at totalStep=1 produces at least one
// sample, tagged with the config's sample rate.
#[test]
fn synthesize_single_short_chunk_at_total_step_one() {
    if !assets_present() {
        eprintln!("Assets not found, skipping integration test.");
        return;
    }

    let engine = Engine::new("assets/onnx", false);
    let request = SynthesizeRequest::new("Hi.", VoiceId::F1, 1.0).with_total_step(1);
    let output = engine.synthesize(&request).expect("synthesis should succeed");

    assert!(output.wav_bytes.len() > 44); // header plus at least one sample
    assert!(output.duration_seconds > 0.0);
}

// Scenario 5: doubling speed on identical text and voice roughly halves the
// reported duration.
#[test]
fn doubling_speed_roughly_halves_duration() {
    if !assets_present() {
        eprintln!("Assets not found, skipping integration test.");
        return;
    }

    let engine = Engine::new("assets/onnx", false);
    let text = "This morning I took a short walk.";

    let normal = engine
        .synthesize(&SynthesizeRequest::new(text, VoiceId::F1, 1.0).with_total_step(2))
        .expect("synthesis at speed 1.0 should succeed");
    let fast = engine
        .synthesize(&SynthesizeRequest::new(text, VoiceId::F1, 2.0).with_total_step(2))
        .expect("synthesis at speed 2.0 should succeed");

    let ratio = fast.duration_seconds / normal.duration_seconds;
    assert!(
        (ratio - 0.5).abs() < 0.1,
        "expected ~2x speedup, got ratio {ratio}"
    );
}

// A request with empty text is rejected without ever loading a session,
// so this assertion holds even when no ONNX assets are present.
#[test]
fn empty_text_is_rejected_without_needing_assets() {
    let engine = Engine::new("assets/onnx", false);
    let request = SynthesizeRequest::new("   ", VoiceId::F1, 1.0);
    let err = engine.synthesize(&request).unwrap_err();
    assert_eq!(err.class(), supertonic_tts::ErrorClass::ClientError);
}
