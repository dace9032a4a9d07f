//! Lazily-initialized, thread-safe handle to the classification capability
//!
//! The gateway owns the model lifecycle as a guarded one-shot transition:
//! nothing is loaded until the first call, concurrent first calls await the
//! same in-flight load, and a failed load leaves the gateway eligible to
//! retry on the next call.

use std::sync::Arc;
use tokio::sync::OnceCell;

use guardpost_core::{truncate_chars, Error, LabelScore, Result};

use crate::classifier::{Classifier, ClassifierLoader};

/// Character cap applied to input before it reaches the model.
///
/// The tokenizer additionally truncates to the model sequence length; this
/// bound keeps tokenization itself cheap on pathological input.
pub const MAX_INPUT_CHARS: usize = 4096;

/// Thread-safe gateway over a lazily-loaded classifier.
pub struct ClassifierGateway {
    loader: Arc<dyn ClassifierLoader>,
    classifier: OnceCell<Arc<dyn Classifier>>,
}

impl ClassifierGateway {
    /// Create a gateway. No model work happens until the first
    /// [`classify`](Self::classify) call.
    pub fn new(loader: Arc<dyn ClassifierLoader>) -> Self {
        Self {
            loader,
            classifier: OnceCell::new(),
        }
    }

    /// Whether the underlying model has finished loading. Never blocks.
    pub fn is_ready(&self) -> bool {
        self.classifier.initialized()
    }

    /// Classify text into a ranked label/score vector.
    ///
    /// The first call (or the first call after a failed load) performs the
    /// model load; every other call runs against the already-loaded instance
    /// and may proceed fully in parallel.
    pub async fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let classifier = self
            .classifier
            .get_or_try_init(|| async {
                tracing::info!("Loading classification model");
                self.loader.load().await
            })
            .await?;

        let input = truncate_chars(text, MAX_INPUT_CHARS);
        let scores = classifier.classify(input).await?;

        if scores.is_empty() {
            return Err(Error::classifier(format!(
                "classifier '{}' returned an empty score vector",
                classifier.name()
            )));
        }

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct MockClassifier {
        scores: Vec<LabelScore>,
        last_input_chars: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl Classifier for MockClassifier {
        async fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
            *self.last_input_chars.lock().unwrap() = text.chars().count();
            Ok(self.scores.clone())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    struct MockLoader {
        load_count: AtomicUsize,
        fail_next: AtomicBool,
        scores: Vec<LabelScore>,
        last_input_chars: Arc<Mutex<usize>>,
    }

    impl MockLoader {
        fn new(scores: Vec<LabelScore>) -> Self {
            Self {
                load_count: AtomicUsize::new(0),
                fail_next: AtomicBool::new(false),
                scores,
                last_input_chars: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl ClassifierLoader for MockLoader {
        async fn load(&self) -> Result<Arc<dyn Classifier>> {
            // Make the load slow enough that concurrent first calls overlap
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.load_count.fetch_add(1, Ordering::SeqCst);

            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(Error::model_unavailable("weights missing"));
            }

            Ok(Arc::new(MockClassifier {
                scores: self.scores.clone(),
                last_input_chars: self.last_input_chars.clone(),
            }))
        }
    }

    fn toxic_scores() -> Vec<LabelScore> {
        vec![
            LabelScore::new("toxicity", 0.92),
            LabelScore::new("insult", 0.81),
        ]
    }

    #[tokio::test]
    async fn test_lazy_initialization() {
        let loader = Arc::new(MockLoader::new(toxic_scores()));
        let gateway = ClassifierGateway::new(loader.clone());

        assert!(!gateway.is_ready());
        assert_eq!(loader.load_count.load(Ordering::SeqCst), 0);

        let scores = gateway.classify("some text").await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(gateway.is_ready());
        assert_eq!(loader.load_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let loader = Arc::new(MockLoader::new(toxic_scores()));
        let gateway = Arc::new(ClassifierGateway::new(loader.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gateway = gateway.clone();
            handles.push(tokio::spawn(
                async move { gateway.classify("race").await },
            ));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(loader.load_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let loader = Arc::new(MockLoader::new(toxic_scores()));
        loader.fail_next.store(true, Ordering::SeqCst);
        let gateway = ClassifierGateway::new(loader.clone());

        let err = gateway.classify("text").await.unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
        assert!(!gateway.is_ready());

        // The failure must not poison the gateway
        let scores = gateway.classify("text").await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(loader.load_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_score_vector_is_an_error() {
        let loader = Arc::new(MockLoader::new(Vec::new()));
        let gateway = ClassifierGateway::new(loader);

        let err = gateway.classify("text").await.unwrap_err();
        assert!(matches!(err, Error::Classifier(_)));
    }

    #[tokio::test]
    async fn test_oversized_input_is_truncated() {
        let loader = Arc::new(MockLoader::new(toxic_scores()));
        let gateway = ClassifierGateway::new(loader.clone());

        let huge = "a".repeat(MAX_INPUT_CHARS * 3);
        gateway.classify(&huge).await.unwrap();

        assert_eq!(
            *loader.last_input_chars.lock().unwrap(),
            MAX_INPUT_CHARS
        );
    }
}
