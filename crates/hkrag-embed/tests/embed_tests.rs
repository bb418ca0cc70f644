use std::time::Duration;

use hkrag_core::config::{EmbeddingProviderKind, EmbeddingSettings};
use hkrag_core::error::Error;
use hkrag_core::traits::Embedder;
use hkrag_embed::{get_default_embedder, CohereEmbedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { provider: EmbeddingProviderKind::Hash, dimension: 384, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["public hospitals in Hong Kong".to_string(), "public hospitals in Hong Kong".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 384);
    assert_eq!(embedder.dim(), 384);
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn hash_embedder_query_matches_related_text() {
    let e = HashEmbedder::new(256);
    let q = e.embed_query("Who governs public hospitals?").unwrap();
    let docs = e
        .embed_batch(&[
            "The Hospital Authority governs public hospitals.".to_string(),
            "Dental clinics open on weekdays.".to_string(),
        ])
        .unwrap();
    assert!(cosine(&q, &docs[0]) > cosine(&q, &docs[1]));
}

#[test]
fn embedder_id_records_model_and_dimension() {
    assert_eq!(HashEmbedder::new(64).embedder_id(), "hash:xxh64:d64");
    let c = CohereEmbedder::new(Some("k"), "https://api.cohere.com/", "embed-english-light-v3.0", 384, 96, Duration::from_secs(5)).unwrap();
    assert_eq!(c.embedder_id(), "cohere:embed-english-light-v3.0:d384");
    assert_eq!(c.endpoint(), "https://api.cohere.com/v1/embed");
}

#[test]
fn cohere_without_key_is_a_credentials_error() {
    for key in [None, Some("   ")] {
        let err = CohereEmbedder::new(key, "https://api.cohere.com", "embed-english-light-v3.0", 384, 96, Duration::from_secs(5))
            .err()
            .expect("missing key must fail");
        let core = err.downcast_ref::<Error>().expect("typed error");
        assert!(matches!(core, Error::MissingCredentials { .. }));
        assert!(core.is_configuration());
        assert!(err.to_string().contains("COHERE_API_KEY"));
    }
}

#[test]
fn default_settings_require_cohere_key() {
    let settings = EmbeddingSettings { api_key: None, ..Default::default() };
    assert!(get_default_embedder(&settings).is_err());
}

#[test]
fn local_provider_without_model_files_is_not_found() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = EmbeddingSettings {
        provider: EmbeddingProviderKind::Local,
        model: "all-MiniLM-L6-v2".into(),
        model_dir: Some(tmp.path().to_string_lossy().to_string()),
        ..Default::default()
    };
    let err = get_default_embedder(&settings).err().expect("empty model dir must fail");
    let core = err.downcast_ref::<Error>().expect("typed error");
    assert!(matches!(core, Error::NotFound(_)));
    assert!(err.to_string().contains("tokenizer.json"), "{err}");
}
