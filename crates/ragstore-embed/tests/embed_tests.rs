use ragstore_core::config::{DenseConfig, DenseProvider};
use ragstore_core::traits::DenseEmbedder;
use ragstore_embed::{build_dense_embedder, HashingEmbedder};

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[test]
fn hashing_embedder_shapes_and_determinism() {
    let embedder = HashingEmbedder::new(64).expect("embedder");
    let v1 = embedder.embed("hello world").unwrap();
    let v2 = embedder.embed("hello world").unwrap();

    assert_eq!(v1.len(), 64);
    assert!((norm(&v1) - 1.0).abs() <= 1e-3, "vector is L2-normalized");
    assert_eq!(v1, v2);
    assert_eq!(embedder.model_id(), "hashing-64");
}

#[test]
fn hashing_embedder_ignores_case_and_punctuation() {
    let embedder = HashingEmbedder::new(32).unwrap();
    assert_eq!(embedder.embed("Paris, France!").unwrap(), embedder.embed("paris france").unwrap());
    assert_ne!(embedder.embed("paris").unwrap(), embedder.embed("berlin").unwrap());
}

#[test]
fn hashing_embedder_output_is_unit_length_without_tokens() {
    let embedder = HashingEmbedder::new(8).unwrap();
    let v = embedder.embed("... !!!").unwrap();
    assert!((norm(&v) - 1.0).abs() <= 1e-6);
}

#[test]
fn zero_dimension_is_rejected() {
    assert!(HashingEmbedder::new(0).is_err());
}

#[test]
fn builder_selects_hashing_provider() {
    let cfg = DenseConfig { provider: DenseProvider::Hashing, dim: 16, ..DenseConfig::default() };
    let embedder = build_dense_embedder(&cfg).expect("build");
    assert_eq!(embedder.dim(), 16);
}

#[test]
fn builder_reports_missing_model_directory() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DenseConfig { model_dir: Some(dir.path().join("absent").display().to_string()), ..DenseConfig::default() };
    // models/bge-m3 is not present next to the test binary's working directory
    if std::path::Path::new("models/bge-m3").exists() || std::path::Path::new("../models/bge-m3").exists() {
        return;
    }
    let err = build_dense_embedder(&cfg).err().expect("load must fail");
    assert!(err.to_string().contains("BGE-M3"), "{err}");
}
