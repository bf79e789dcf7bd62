use super::*;

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn vectors_are_unit_length() {
    let embedder = HashingEmbedder::new(384);
    let texts = vec![
        "The sky is blue.".to_string(),
        "Water boils at 100 degrees.".to_string(),
        String::new(),
        "!!! ???".to_string(),
    ];

    let vectors = embedder.embed(&texts).expect("hashing never fails");

    assert_eq!(vectors.len(), texts.len());
    for vector in &vectors {
        assert_eq!(vector.len(), 384);
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {}", norm);
    }
}

#[test]
fn batch_and_single_calls_match() {
    let embedder = HashingEmbedder::new(128);
    let texts = vec!["hello world".to_string(), "another text".to_string()];

    let batch = embedder.embed(&texts).expect("embed batch");
    let single = embedder.embed_one("another text").expect("embed one");

    assert_eq!(batch[1], single);
}

#[test]
fn case_and_punctuation_are_ignored() {
    let embedder = HashingEmbedder::new(256);
    let a = embedder.embed_one("The Sky, is BLUE!").expect("embed");
    let b = embedder.embed_one("the sky is blue").expect("embed");
    assert_eq!(a, b);
}

#[test]
fn shared_words_score_higher() {
    let embedder = HashingEmbedder::new(384);
    let query = embedder.embed_one("What color is the sky?").expect("embed");
    let related = embedder.embed_one("The sky is blue.").expect("embed");
    let unrelated = embedder.embed_one("Water boils at 100 degrees.").expect("embed");

    assert!(cosine(&query, &related) > cosine(&query, &unrelated));
}

#[test]
fn metadata() {
    let embedder = HashingEmbedder::new(0);
    assert_eq!(embedder.dimension(), 1);
    assert_eq!(embedder.model_id(), "feature-hashing");
}
