//! Session resumer for SamePage flows
//!
//! SamePage launches destroy the browsing context that initiated them, so
//! cross-context messaging cannot deliver the result. Instead the relay
//! persists pending state into tab-scoped storage just before navigating
//! away, and on the next load of the application the resumer consumes that
//! state exactly once to reconstruct the terminal result.

use crate::storage::KeyValueStore;
use crate::types::LaunchResult;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tab-scoped storage key for pending-session state
const PENDING_KEY: &str = "rr.pending";

/// Pending state older than this resumes as `Cancelled` instead of replaying
/// a stale callback
const DEFAULT_PENDING_TTL_SECS: i64 = 300;

#[derive(Debug, Serialize, Deserialize)]
struct PendingState {
    pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_scheme: Option<String>,
    stored_at: DateTime<Utc>,
}

pub struct SessionResumer {
    store: Arc<dyn KeyValueStore>,
    pending_ttl: Duration,
    /// Serializes resume's read-and-clear so the state is consumed once
    consume_lock: Mutex<()>,
}

impl SessionResumer {
    /// Create a resumer over the tab-scoped store with the default
    /// pending-state freshness window
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(store, Duration::seconds(DEFAULT_PENDING_TTL_SECS))
    }

    pub fn with_ttl(store: Arc<dyn KeyValueStore>, pending_ttl: Duration) -> Self {
        Self {
            store,
            pending_ttl,
            consume_lock: Mutex::new(()),
        }
    }

    /// Persist pending state carrying the full callback URI
    pub fn store_pending_uri(&self, callback_uri: &str) {
        self.write_state(PendingState {
            pending: true,
            callback_uri: Some(callback_uri.to_string()),
            callback_scheme: None,
            stored_at: Utc::now(),
        });
    }

    /// Persist pending state carrying only the originating scheme; resume
    /// falls back to the page location current at that time
    pub fn store_pending_scheme(&self, scheme: &str) {
        self.write_state(PendingState {
            pending: true,
            callback_uri: None,
            callback_scheme: Some(scheme.to_ascii_lowercase()),
            stored_at: Utc::now(),
        });
    }

    fn write_state(&self, state: PendingState) {
        // Restricted origins deny storage access; losing the relay here is
        // tolerated, not fatal.
        match serde_json::to_string(&state) {
            Ok(json) => self.store.set(PENDING_KEY, &json),
            Err(e) => warn!("Failed to encode pending session state: {}", e),
        }
    }

    fn read_state(&self) -> Option<PendingState> {
        let raw = self.store.get(PENDING_KEY)?;
        match serde_json::from_str::<PendingState>(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Malformed pending session state: {}", e);
                None
            }
        }
    }

    fn is_fresh(&self, state: &PendingState) -> bool {
        Utc::now().signed_duration_since(state.stored_at) <= self.pending_ttl
    }

    /// Whether a fresh pending redirect is waiting to be resumed
    pub fn has_pending_redirect(&self) -> bool {
        match self.read_state() {
            Some(state) => state.pending && self.is_fresh(&state),
            None => false,
        }
    }

    /// Consume the pending state exactly once and reconstruct the result.
    ///
    /// `current_location` is the page URL at resume time, used when only a
    /// scheme was stored. No usable data (absent, stale, or scheme-only with
    /// no location) resumes as `Cancelled`.
    pub fn resume_pending_redirect(&self, current_location: Option<&str>) -> LaunchResult {
        let _guard = self.consume_lock.lock();

        let state = self.read_state();
        self.store.remove(PENDING_KEY);

        let Some(state) = state else {
            debug!("No pending session state to resume");
            return LaunchResult::Cancelled;
        };

        if !state.pending {
            return LaunchResult::Cancelled;
        }

        if !self.is_fresh(&state) {
            info!("Pending session state expired, resuming as cancelled");
            return LaunchResult::Cancelled;
        }

        if let Some(uri) = state.callback_uri {
            info!("Resuming redirect from stored callback URI");
            return LaunchResult::from_callback_uri(&uri);
        }

        if state.callback_scheme.is_some() {
            if let Some(location) = current_location {
                info!("Resuming redirect from current page location");
                return LaunchResult::from_callback_uri(location);
            }
        }

        LaunchResult::Cancelled
    }

    /// Drop any pending state unconditionally
    pub fn clear_pending_redirect(&self) {
        self.store.remove(PENDING_KEY);
    }
}
