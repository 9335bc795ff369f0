//! Redirect coordinator - orchestrates launch-and-await-callback operations
//!
//! The caller-facing facade. `launch` allocates a handle, registers its
//! delivery channel, opens the surface, and hands back a [`LaunchHandle`]
//! whose result settles exactly once — from the callback message, the
//! timeout, a manual cancel, a user-closed surface, or a launch failure,
//! whichever comes first. All completion sources funnel through one
//! resolve-once path on the handle registry.

use crate::broker::ChannelBroker;
use crate::bus::MessageBus;
use crate::launcher::{OpenedSurface, SurfaceLauncher};
use crate::registry::HandleRegistry;
use crate::relay::CallbackRelay;
use crate::session::SessionResumer;
use crate::storage::KeyValueStore;
use crate::surface::SurfaceHost;
use crate::timeout::TimeoutController;
use crate::types::{FailureReason, HandleId, LaunchOptions, LaunchResult, Scope};
use rr_types::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// State shared between the coordinator and the background tasks driving
/// each launch (callback driver, timeout, liveness poll)
struct FlowState {
    registry: HandleRegistry,
    broker: Arc<ChannelBroker>,
    launcher: SurfaceLauncher,
    timeouts: TimeoutController,
}

impl FlowState {
    /// Resolve-once path shared by every completion source. Returns whether
    /// this call was the one that resolved the handle.
    fn finish(&self, id: HandleId, result: LaunchResult) -> bool {
        let Some(released) = self.registry.resolve(id, result) else {
            debug!("Handle {} already resolved, ignoring", id);
            return false;
        };

        self.timeouts.disarm(id);
        self.launcher.release(id);
        self.broker.unsubscribe(&released.channel_name);
        self.broker.unregister(&released.scope, &released.channel_name);

        info!("Handle {} resolved and released", id);
        true
    }
}

#[derive(Clone)]
pub struct RedirectCoordinator {
    flows: Arc<FlowState>,
    relay: Arc<CallbackRelay>,
    session: Arc<SessionResumer>,
}

impl RedirectCoordinator {
    /// Create a coordinator over the platform seams.
    ///
    /// `shared_store` backs the channel registry visible to every browsing
    /// context; `tab_store` holds pending-session state scoped to the
    /// current tab only.
    pub fn new(
        host: Arc<dyn SurfaceHost>,
        shared_store: Arc<dyn KeyValueStore>,
        tab_store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        let broker = Arc::new(ChannelBroker::new(shared_store, bus));
        let session = Arc::new(SessionResumer::new(tab_store));
        let relay = Arc::new(CallbackRelay::new(broker.clone(), session.clone()));

        Self {
            flows: Arc::new(FlowState {
                registry: HandleRegistry::new(),
                broker,
                launcher: SurfaceLauncher::new(host),
                timeouts: TimeoutController::new(),
            }),
            relay,
            session,
        }
    }

    /// Launch the external page and return a handle awaiting its callback.
    ///
    /// Fails synchronously only for invalid options; everything after that —
    /// including a surface that cannot be opened — settles the handle's
    /// result with a terminal [`LaunchResult`] instead.
    pub fn launch(&self, url: &str, options: LaunchOptions) -> AppResult<LaunchHandle> {
        validate(url, &options)?;

        let scope = match &options.callback_scheme {
            Some(scheme) => Scope::for_scheme(scheme),
            None => Scope::Global,
        };

        let (id, channel_name, result_rx) = self
            .flows
            .registry
            .allocate(options.channel_name.as_deref(), scope.clone());

        info!("Starting redirect launch {} ({:?})", id, options.mode);

        self.flows.broker.register(&scope, &channel_name);
        let message_rx = self.flows.broker.subscribe(&channel_name);

        // Driver: waits for the callback URL to arrive on this handle's
        // channel. Any other completion source unsubscribes the channel,
        // which wakes the driver empty-handed and it exits.
        let flows = Arc::clone(&self.flows);
        tokio::spawn(async move {
            if let Some(uri) = message_rx.recv().await {
                flows.finish(id, LaunchResult::from_callback_uri(&uri));
            }
        });

        if let Some(duration) = options.timeout {
            let flows = Arc::clone(&self.flows);
            self.flows.timeouts.arm(id, duration, move || {
                flows.finish(id, LaunchResult::Cancelled);
            });
        }

        let on_user_closed = {
            let flows = Arc::clone(&self.flows);
            move || {
                flows.finish(id, LaunchResult::Cancelled);
            }
        };

        match self.flows.launcher.open(id, url, &options.mode, on_user_closed) {
            Ok(OpenedSurface::CurrentPage) => {
                // The current context is navigating away; the true result is
                // recovered by the session resumer after reload.
                self.flows.finish(id, LaunchResult::Pending);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Surface open failed for handle {}: {}", id, e);
                self.flows.finish(
                    id,
                    LaunchResult::Failure {
                        error: FailureReason::LaunchFailed {
                            message: e.to_string(),
                        },
                    },
                );
            }
        }

        Ok(LaunchHandle {
            id,
            channel_name,
            result_rx,
            flows: Arc::clone(&self.flows),
        })
    }

    /// Cancel one handle. Resolves it `Cancelled` if still pending; a no-op
    /// afterwards.
    pub fn cancel(&self, id: HandleId) -> bool {
        self.flows.finish(id, LaunchResult::Cancelled)
    }

    /// Cancel every pending handle
    pub fn cancel_all(&self) {
        for id in self.flows.registry.pending_ids() {
            self.cancel(id);
        }
    }

    /// Relay entry point for a callback page or intercepting router: publish
    /// `uri` to the registered channels (or straight to `channel_override`).
    /// Returns the number of channels published to.
    pub fn deliver_callback(&self, uri: &str, channel_override: Option<&str>) -> usize {
        self.relay.deliver(uri, channel_override)
    }

    /// The relay, for wiring a [`crate::relay::CallbackInterceptor`] or a
    /// standalone callback page
    pub fn relay(&self) -> Arc<CallbackRelay> {
        self.relay.clone()
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.session.has_pending_redirect()
    }

    pub fn resume_pending_redirect(&self, current_location: Option<&str>) -> LaunchResult {
        self.session.resume_pending_redirect(current_location)
    }

    pub fn clear_pending_redirect(&self) {
        self.session.clear_pending_redirect();
    }

    /// Number of handles that have not reached a terminal state
    pub fn active_handle_count(&self) -> usize {
        self.flows.registry.pending_count()
    }
}

/// A single tracked launch. Await [`LaunchHandle::result`] for the terminal
/// outcome, or [`LaunchHandle::cancel`] to abandon it. Dropping the handle
/// only discards the receiver; the launch stays pending and still resolves
/// through the coordinator's completion sources.
pub struct LaunchHandle {
    id: HandleId,
    channel_name: String,
    result_rx: oneshot::Receiver<LaunchResult>,
    flows: Arc<FlowState>,
}

impl LaunchHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The delivery channel a callback page must publish to for this handle
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Resolve `Cancelled` if the launch is still pending
    pub fn cancel(&self) -> bool {
        self.flows.finish(self.id, LaunchResult::Cancelled)
    }

    /// Wait for the terminal result. Never errors: internal channel loss
    /// degrades to `Cancelled`.
    pub async fn result(self) -> LaunchResult {
        self.result_rx.await.unwrap_or(LaunchResult::Cancelled)
    }
}

fn validate(url: &str, options: &LaunchOptions) -> AppResult<()> {
    if url.trim().is_empty() {
        return Err(AppError::InvalidOptions("launch URL is empty".to_string()));
    }
    if let Some(name) = &options.channel_name {
        if name.trim().is_empty() {
            return Err(AppError::InvalidOptions(
                "explicit channel name is empty".to_string(),
            ));
        }
    }
    if let Some(scheme) = &options.callback_scheme {
        if scheme.trim().is_empty() {
            return Err(AppError::InvalidOptions(
                "callback scheme is empty".to_string(),
            ));
        }
    }
    Ok(())
}
