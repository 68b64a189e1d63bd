use serial_test::serial;
use tempfile::TempDir;

use ticketrag_embed::{get_default_embedder, resolve_model_dir, Embedder, FakeEmbedder, DEFAULT_DIM};

#[test]
#[serial]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading a model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let embedder = get_default_embedder(std::path::Path::new("models/missing")).expect("embedder");
    std::env::remove_var("APP_USE_FAKE_EMBEDDINGS");

    let texts = vec!["camera offline".to_string(), "camera offline".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].len(), DEFAULT_DIM);
    assert_eq!(embedder.dim(), DEFAULT_DIM);

    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in embs[0].iter().zip(embs[1].iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_separates_texts_and_handles_empty() {
    let embedder = FakeEmbedder::new(64);
    let embs = embedder
        .embed_batch(&["door lock".to_string(), "router down".to_string(), String::new()])
        .unwrap();
    assert_ne!(embs[0], embs[1]);
    let norm: f32 = embs[2].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3);
}

#[test]
#[serial]
fn model_dir_resolution_reports_what_was_tried() {
    std::env::remove_var("APP_EMBED_MODEL_DIR");
    let err = resolve_model_dir(std::path::Path::new("definitely/not/here")).unwrap_err();
    assert!(err.to_string().contains("definitely/not/here"));

    let tmp = TempDir::new().unwrap();
    assert_eq!(resolve_model_dir(tmp.path()).unwrap(), tmp.path());
}
