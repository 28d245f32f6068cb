use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::header::HeaderMap;

/// Response header asking the client to show the user agreement notice.
pub const USER_AGREEMENT_HEADER: &str = "skills-display-ua";

/// Set-only flag raised by any successful response carrying [`USER_AGREEMENT_HEADER`].
///
/// Clones share the same flag. Nothing in this crate ever lowers it.
#[derive(Debug, Clone, Default)]
pub struct UserAgreementSignal {
    raised: Arc<AtomicBool>,
}

impl UserAgreementSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, headers: &HeaderMap) {
        let present = headers
            .get(USER_AGREEMENT_HEADER)
            .is_some_and(|value| !value.is_empty());

        if present && !self.raised.swap(true, Ordering::SeqCst) {
            log::info!("Response asked to display the user agreement");
        }
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
