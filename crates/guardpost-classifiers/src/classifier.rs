//! Classifier trait and the loader seam

use async_trait::async_trait;
use std::sync::Arc;

use guardpost_core::{LabelScore, Result};

/// Trait for text classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text into a ranked label/score vector.
    ///
    /// A successful call returns at least one entry.
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Produces a ready-to-use classifier on demand.
///
/// This is the seam between [`crate::ClassifierGateway`] and the concrete
/// model: the gateway decides *when* to load, the loader knows *how*.
#[async_trait]
pub trait ClassifierLoader: Send + Sync {
    /// Load the classifier. Called lazily on first use, and again after a
    /// failed attempt.
    async fn load(&self) -> Result<Arc<dyn Classifier>>;
}
