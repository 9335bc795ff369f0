//! Browser redirect coordination engine
//!
//! Launches an external authorization page and delivers exactly one
//! asynchronous callback result per launched handle, even when many launches
//! are in flight concurrently and the callback arrives in a different
//! browsing context (popup, new tab, hidden frame, or after a full-page
//! navigation). Contexts that cannot share memory coordinate through
//! persistent storage and pub/sub only, behind the [`storage::KeyValueStore`],
//! [`bus::MessageBus`] and [`surface::SurfaceHost`] seams.
//!
//! # Features
//! - Four presentation strategies: popup, new tab, hidden iframe, same-page
//! - At-most-one delivery per handle, with correct isolation between
//!   concurrently active handles
//! - Timeout and manual cancellation unified into one resolve-once path
//! - Same-page flows survive full-page navigation via persisted session state
//! - Optional request-interception fast path that resolves flows without
//!   rendering a callback page
//!
//! # Usage Example
//! ```no_run
//! use rr_engine::{LaunchMode, LaunchOptions, PopupConfig, RedirectCoordinator};
//! # use std::sync::Arc;
//! # async fn example(
//! #     host: Arc<dyn rr_engine::surface::SurfaceHost>,
//! #     shared: Arc<dyn rr_engine::storage::KeyValueStore>,
//! #     tab: Arc<dyn rr_engine::storage::KeyValueStore>,
//! #     bus: Arc<dyn rr_engine::bus::MessageBus>,
//! # ) {
//! let coordinator = RedirectCoordinator::new(host, shared, tab, bus);
//!
//! let mut options = LaunchOptions::new(LaunchMode::Popup(PopupConfig::default()));
//! options.timeout = Some(std::time::Duration::from_secs(300));
//!
//! let handle = coordinator
//!     .launch("https://provider.example/authorize?...", options)
//!     .unwrap();
//! // A callback page (or interceptor) later calls
//! // coordinator.deliver_callback("app://callback?code=...", None);
//! let result = handle.result().await;
//! # }
//! ```

pub mod broker;
pub mod bus;
pub mod coordinator;
pub mod launcher;
pub mod registry;
pub mod relay;
pub mod session;
pub mod storage;
pub mod surface;
pub mod timeout;
pub mod types;

// Re-export public API
pub use broker::ChannelBroker;
pub use bus::{CallbackReceiver, LocalBus, MessageBus};
pub use coordinator::{LaunchHandle, RedirectCoordinator};
pub use launcher::{OpenedSurface, SurfaceLauncher};
pub use registry::HandleRegistry;
pub use relay::{CallbackInterceptor, CallbackRelay, InterceptedResponse};
pub use session::SessionResumer;
pub use storage::{DeniedStore, FileStore, KeyValueStore, MemoryStore};
pub use surface::{Surface, SurfaceHost};
pub use timeout::TimeoutController;
pub use types::{
    AuthError, FailureReason, FrameConfig, HandleId, LaunchMode, LaunchOptions, LaunchResult,
    PopupConfig, Scope,
};
