use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::backend::PolicyBackend;
use crate::error::GuardError;
use crate::policy::{PolicyVerdict, DEFAULT_POLICY_TEXT};

/// The Policy Classifier: a latency-bounded wrapper around a
/// pluggable [`PolicyBackend`]. Never propagates a runtime error to its
/// caller — timeout, backend failure, and uninitialized-layer all degrade
/// to [`PolicyVerdict::safe`] on timeout or backend error.
pub struct PolicyClassifier {
    backend: Arc<dyn PolicyBackend>,
    policy_text: String,
    timeout: Duration,
    init: OnceCell<()>,
    disabled: AtomicBool,
}

impl PolicyClassifier {
    pub fn new(backend: Arc<dyn PolicyBackend>, policy_text: String, timeout: Duration) -> Self {
        Self {
            backend,
            policy_text,
            timeout,
            init: OnceCell::new(),
            disabled: AtomicBool::new(false),
        }
    }

    /// Constructs a classifier with the built-in default policy text, for
    /// the case where no policy file is configured.
    pub fn with_default_policy(backend: Arc<dyn PolicyBackend>, timeout: Duration) -> Self {
        Self::new(backend, DEFAULT_POLICY_TEXT.to_string(), timeout)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    async fn ensure_initialized(&self) -> Result<(), GuardError> {
        if self.disabled.load(Ordering::Relaxed) {
            return Err(GuardError::InitFailed("guard disabled after prior init failure".into()));
        }
        let backend = &self.backend;
        let result = self.init.get_or_try_init(|| async { backend.initialize().await }).await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "policy classifier initialization failed, disabling layer");
            self.disabled.store(true, Ordering::Relaxed);
        }
        result.map(|_| ())
    }

    /// Classifies `text`, enforcing the configured deadline. On timeout,
    /// backend error, or disabled layer, returns a safe verdict — this
    /// method itself never returns `Err`; there is nothing for the caller
    /// to handle beyond the verdict.
    pub async fn validate(&self, text: &str) -> PolicyVerdict {
        if self.ensure_initialized().await.is_err() {
            return PolicyVerdict::safe();
        }

        match tokio::time::timeout(self.timeout, self.backend.classify(text, &self.policy_text)).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(err)) => {
                tracing::error!(error = %err, "policy classifier failed during validate, degrading to safe verdict");
                PolicyVerdict::safe()
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs_f64(), text_length = text.len(), "policy classifier timed out, degrading to safe verdict");
                PolicyVerdict::safe()
            }
        }
    }
}
