//! Embedders used by unit tests

use std::sync::atomic::{AtomicUsize, Ordering};

use super::embedding::{Embedder, EmbeddingError};

/// Each group of synonyms is one dimension.
const CONCEPTS: &[&[&str]] = &[
    &["revenue", "sales", "income"],
    &["region", "regional", "geography"],
    &["employee", "employees", "staff", "headcount", "workforce"],
    &["attrition", "turnover", "churn", "leaving"],
    &["customer", "customers", "client"],
    &["profit", "margin"],
    &["quarterly", "quarter"],
    &["trend", "trends"],
];

/// Bag-of-concepts embedder: words outside `CONCEPTS` are ignored.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    fn embed_text(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; CONCEPTS.len()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
        {
            if let Some(dim) = CONCEPTS.iter().position(|g| g.contains(&word.as_str())) {
                vector[dim] += 1.0;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    fn dimension(&self) -> usize {
        CONCEPTS.len()
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }
}

/// Delegates to [`KeywordEmbedder`] but fails on the n-th batch call (1-based).
pub struct FailingEmbedder {
    fail_on_call: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new(fail_on_call: usize) -> Self {
        Self {
            fail_on_call,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        CONCEPTS.len()
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call {
            return Err(EmbeddingError::Backend("quota exceeded".to_string()));
        }
        KeywordEmbedder.embed_batch(texts)
    }
}

/// Fixed-dimension embedder returning the same vector for everything.
pub struct ConstantEmbedder(pub usize);

impl Embedder for ConstantEmbedder {
    fn name(&self) -> &str {
        "constant"
    }

    fn dimension(&self) -> usize {
        self.0
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![1.0; self.0]).collect())
    }
}
