use std::sync::Arc;

use crate::config::Config;
use crate::document::DocumentDecoder;
use crate::rewrite::Rewriter;
use crate::scoring::Scorer;
use crate::store::TransactionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Lazily-connecting transaction store (connects on first use).
    pub store: Arc<TransactionStore>,
    /// Scoring seam. Production: `LlmScorer`.
    pub scorer: Arc<dyn Scorer>,
    /// Rewrite seam. Production: `LlmRewriter`.
    pub rewriter: Arc<dyn Rewriter>,
    /// Document decode seam. Production: `FileDecoder`.
    pub decoder: Arc<dyn DocumentDecoder>,
    pub config: Config,
}
