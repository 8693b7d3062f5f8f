use supertonic_tts::style::parse_voice_style;
use supertonic_tts::{chunk_text, preprocess_text, sanitize_filename, SupertonicError};

#[test]
fn test_text_preprocessing() {
    let input = "Hello, World! 123";
    let processed = preprocess_text(input);
    // Based on the regex rules, it should retain punctuation and numbers if not stripped
    // Let's check what it actually does.
    // It replaces extra spaces, fixes punctuation spacing, etc.
    assert!(processed.contains("Hello"));
    assert!(processed.ends_with('.')); // It adds a period if missing
}

#[test]
fn test_chunk_text() {
    let text = "This is a sentence. This is another sentence.";
    let chunks = chunk_text(text, Some(20));
    assert!(chunks.len() >= 2);
    assert_eq!(chunks[0], "This is a sentence.");
}

#[test]
fn test_sanitize_filename() {
    let name = "Hello World! @#$";
    let sanitized = sanitize_filename(name, 10);
    assert_eq!(sanitized.len(), 10);
    assert!(!sanitized.contains('!'));
    assert!(!sanitized.contains('@'));
    // It replaces non-alphanumeric with '_'
    assert_eq!(sanitized, "Hello_Worl");
}

// Testable property: chunker idempotence on short input.
#[test]
fn chunker_is_idempotent_on_short_input() {
    let text = "  Just one short line.  ";
    let chunks = chunk_text(text, Some(200));
    assert_eq!(chunks, vec!["Just one short line.".to_string()]);
}

// Scenario 3: "Mr. Smith went to Dr. Jones." must not be split on the
// abbreviation periods.
#[test]
fn chunker_keeps_abbreviation_sentence_whole() {
    let text = "Mr. Smith went to Dr. Jones.";
    let chunks = chunk_text(text, Some(200));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0], text);
}

// Scenario 2's first half: a blank-line separator always starts a new chunk,
// regardless of max_len.
#[test]
fn chunker_splits_on_blank_line_separator() {
    let text = "A.\n\nB.";
    let chunks = chunk_text(text, Some(200));
    assert_eq!(chunks, vec!["A.".to_string(), "B.".to_string()]);
}

// Scenario 4: a voice style whose style_ttl reports more than one speaker is
// rejected before any inference session is touched.
#[test]
fn rejects_multi_speaker_voice_style_before_inference() {
    let json = r#"{
        "style_ttl": {"data": [[[0.0]], [[0.0]]], "dims": [2, 1, 1], "type": "float32"},
        "style_dp": {"data": [[[0.0]], [[0.0]]], "dims": [2, 1, 1], "type": "float32"}
    }"#;
    let err = parse_voice_style(json.as_bytes()).unwrap_err();
    assert!(matches!(err, SupertonicError::ShapeMismatch { .. }));
}
