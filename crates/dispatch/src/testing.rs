//! Scriptable in-memory provider for pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::provider::{EmailProvider, OutboundEmail, ProviderError, ProviderResponse};

/// An [`EmailProvider`] that records every message and can be scripted to
/// fail. Successes acknowledge with sequential `mock-N` message ids.
#[derive(Default)]
pub struct MockProvider {
    failures: Mutex<VecDeque<ProviderError>>,
    sent: Mutex<Vec<OutboundEmail>>,
    counter: AtomicU64,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next call(s) to fail; queued failures are consumed in
    /// order before the provider succeeds again.
    pub fn queue_failure(&self, error: ProviderError) {
        self.failures.lock().expect("mock lock").push_back(error);
    }

    /// Every message handed to [`EmailProvider::send`], in order, including
    /// failed attempts.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mock lock").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mock lock").len()
    }
}

#[async_trait::async_trait]
impl EmailProvider for MockProvider {
    async fn send(&self, message: &OutboundEmail) -> Result<ProviderResponse, ProviderError> {
        self.sent.lock().expect("mock lock").push(message.clone());

        if let Some(error) = self.failures.lock().expect("mock lock").pop_front() {
            return Err(error);
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderResponse {
            provider_message_id: format!("mock-{n}"),
        })
    }
}
