//! Presentation surface seam
//!
//! A surface is the browsing context that displays the external provider: a
//! popup window, a new tab, a hidden inline frame, or the current page
//! itself. Platform integrations implement [`SurfaceHost`] over the real
//! windowing primitives; the engine only drives lifecycles through these
//! traits.

use crate::types::{FrameConfig, PopupConfig};
use rr_types::AppResult;
use std::sync::Arc;

/// An opened browsing surface
pub trait Surface: Send + Sync {
    /// Whether the surface has been closed out from under us (e.g. the user
    /// dismissed the popup). Platforms that cannot observe closure return
    /// `false` here and `false` from [`Surface::supports_close_detection`].
    fn is_closed(&self) -> bool;

    /// Whether `is_closed` is meaningful on this platform. New-tab contexts
    /// often cannot be observed; the launcher then relies on timeout or
    /// message completion alone.
    fn supports_close_detection(&self) -> bool {
        true
    }

    /// Tear the surface down (close the window, remove the frame). Must be
    /// safe to call on an already-closed surface.
    fn close(&self);
}

/// Opens surfaces on behalf of the launcher
pub trait SurfaceHost: Send + Sync {
    /// Open a sized and positioned popup at `url`
    fn open_popup(&self, url: &str, config: &PopupConfig) -> AppResult<Arc<dyn Surface>>;

    /// Open an unsized new browsing context at `url`
    fn open_tab(&self, url: &str) -> AppResult<Arc<dyn Surface>>;

    /// Append an invisible inline frame pointed at `url` to the current
    /// document
    fn open_hidden_frame(&self, url: &str, config: &FrameConfig) -> AppResult<Arc<dyn Surface>>;

    /// Navigate the current browsing context to `url`, destroying it
    fn navigate_current(&self, url: &str) -> AppResult<()>;
}
