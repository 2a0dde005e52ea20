use async_trait::async_trait;

use crate::error::GuardError;
use crate::policy::PolicyVerdict;

/// Pluggable policy-classifier backend. A real implementation wraps a
/// generative safety model (e.g. a Llama-Guard-class checkpoint); tests and
/// local development use [`MockBackend`].
///
/// Implementations whose inference is blocking (CPU/GPU-bound, as a real
/// model's `generate()` call is) should run it via [`run_on_worker`] rather
/// than inline, so the calling request task is never monopolized — the same
/// shape as `guard_validator.py::_run_inference`'s `asyncio.to_thread`.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    /// One-time (possibly expensive) model load. Called lazily on first use.
    async fn initialize(&self) -> Result<(), GuardError>;

    /// Classifies `text` against `policy_text`. Implementations do not need
    /// to enforce the deadline themselves — [`crate::PolicyClassifier`] does
    /// that around this call.
    async fn classify(&self, text: &str, policy_text: &str) -> Result<PolicyVerdict, GuardError>;
}

/// Runs a blocking closure on Tokio's blocking thread pool, for classifier
/// backends that wrap a CPU-bound model call.
pub async fn run_on_worker<F, T>(f: F) -> Result<T, GuardError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| GuardError::ClassificationFailed(err.to_string()))
}

/// Deterministic backend for tests: flags any text containing a configured
/// trigger phrase as unsafe under category S4.
pub struct MockBackend {
    triggers: Vec<&'static str>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            triggers: vec!["ignore", "jailbreak", "system prompt"],
        }
    }
}

impl MockBackend {
    pub fn with_triggers(triggers: Vec<&'static str>) -> Self {
        Self { triggers }
    }

    pub fn always_safe() -> Self {
        Self { triggers: vec![] }
    }
}

#[async_trait]
impl PolicyBackend for MockBackend {
    async fn initialize(&self) -> Result<(), GuardError> {
        Ok(())
    }

    async fn classify(&self, text: &str, _policy_text: &str) -> Result<PolicyVerdict, GuardError> {
        let lower = text.to_lowercase();
        if self.triggers.iter().any(|t| lower.contains(t)) {
            let mut categories = std::collections::HashSet::new();
            categories.insert("S4".to_string());
            Ok(PolicyVerdict::unsafe_with(0.95, categories))
        } else {
            Ok(PolicyVerdict::safe())
        }
    }
}
