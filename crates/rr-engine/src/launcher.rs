//! Surface launcher: opens the external page and manages surface lifecycles
//!
//! Each handle's surface moves through `Opening -> AwaitingCallback ->
//! Closed`. Windowed surfaces get a periodic liveness poll so a user closing
//! the popup resolves the handle as cancelled; hidden frames have no
//! user-facing close path; SamePage destroys the current context and is
//! resolved `Pending` by the coordinator immediately.

use crate::surface::{Surface, SurfaceHost};
use crate::types::{HandleId, LaunchMode};
use parking_lot::Mutex;
use rr_types::AppResult;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How often a windowed surface is polled for user closure
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What kind of surface a launch produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenedSurface {
    /// Popup or new tab; a liveness poll may be running
    Windowed,

    /// Hidden inline frame; only timeout or message completion apply
    Frame,

    /// The current context navigated away; nothing to watch
    CurrentPage,
}

pub struct SurfaceLauncher {
    host: Arc<dyn SurfaceHost>,
    surfaces: Mutex<HashMap<HandleId, Arc<dyn Surface>>>,
    pollers: Mutex<HashMap<HandleId, JoinHandle<()>>>,
}

impl SurfaceLauncher {
    pub fn new(host: Arc<dyn SurfaceHost>) -> Self {
        Self {
            host,
            surfaces: Mutex::new(HashMap::new()),
            pollers: Mutex::new(HashMap::new()),
        }
    }

    /// Open the surface for `mode` at `url`.
    ///
    /// `on_user_closed` runs at most once, from the liveness poll, if the
    /// user closes a windowed surface before the handle resolves. Open
    /// failures (popup blocked) propagate to the caller, which resolves the
    /// handle as `Failure`.
    pub fn open<F>(
        &self,
        id: HandleId,
        url: &str,
        mode: &LaunchMode,
        on_user_closed: F,
    ) -> AppResult<OpenedSurface>
    where
        F: FnOnce() + Send + 'static,
    {
        match mode {
            LaunchMode::Popup(config) => {
                let surface = self.host.open_popup(url, config)?;
                info!("Opened popup surface for handle {}", id);
                self.track(id, surface.clone());
                self.watch_close(id, surface, on_user_closed);
                Ok(OpenedSurface::Windowed)
            }
            LaunchMode::NewTab => {
                let surface = self.host.open_tab(url)?;
                info!("Opened tab surface for handle {}", id);
                self.track(id, surface.clone());
                if surface.supports_close_detection() {
                    self.watch_close(id, surface, on_user_closed);
                } else {
                    debug!("Tab closure not observable for handle {}, relying on timeout/message", id);
                }
                Ok(OpenedSurface::Windowed)
            }
            LaunchMode::HiddenIframe(config) => {
                let surface = self.host.open_hidden_frame(url, config)?;
                info!("Opened hidden frame for handle {}", id);
                self.track(id, surface);
                Ok(OpenedSurface::Frame)
            }
            LaunchMode::SamePage => {
                self.host.navigate_current(url)?;
                info!("Navigating current context for handle {}", id);
                Ok(OpenedSurface::CurrentPage)
            }
        }
    }

    fn track(&self, id: HandleId, surface: Arc<dyn Surface>) {
        if self.surfaces.lock().insert(id, surface).is_some() {
            warn!("Replaced tracked surface for handle {}", id);
        }
    }

    fn watch_close<F>(&self, id: HandleId, surface: Arc<dyn Surface>, on_user_closed: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLOSE_POLL_INTERVAL).await;
                if surface.is_closed() {
                    debug!("Surface for handle {} closed by user", id);
                    on_user_closed();
                    break;
                }
            }
        });
        self.pollers.lock().insert(id, task);
    }

    /// Release the surface for `id`: stop the liveness poll, then close.
    ///
    /// The poll is stopped first so our own teardown is never mistaken for a
    /// user close.
    pub fn release(&self, id: HandleId) {
        if let Some(poller) = self.pollers.lock().remove(&id) {
            poller.abort();
        }
        if let Some(surface) = self.surfaces.lock().remove(&id) {
            surface.close();
            debug!("Released surface for handle {}", id);
        }
    }

    pub fn open_surface_count(&self) -> usize {
        self.surfaces.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameConfig, PopupConfig};
    use rr_types::AppError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct TestSurface {
        closed: AtomicBool,
        close_calls: AtomicUsize,
        observable: bool,
    }

    impl TestSurface {
        fn new(observable: bool) -> Arc<Self> {
            Arc::new(Self {
                closed: AtomicBool::new(false),
                close_calls: AtomicUsize::new(0),
                observable,
            })
        }

        fn simulate_user_close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    impl Surface for TestSurface {
        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        fn supports_close_detection(&self) -> bool {
            self.observable
        }

        fn close(&self) {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct TestHost {
        surface: Arc<TestSurface>,
        block_popups: bool,
    }

    impl SurfaceHost for TestHost {
        fn open_popup(&self, _url: &str, _config: &PopupConfig) -> AppResult<Arc<dyn Surface>> {
            if self.block_popups {
                return Err(AppError::Launch("popup blocked".to_string()));
            }
            Ok(self.surface.clone())
        }

        fn open_tab(&self, _url: &str) -> AppResult<Arc<dyn Surface>> {
            Ok(self.surface.clone())
        }

        fn open_hidden_frame(
            &self,
            _url: &str,
            _config: &FrameConfig,
        ) -> AppResult<Arc<dyn Surface>> {
            Ok(self.surface.clone())
        }

        fn navigate_current(&self, _url: &str) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_popup_user_close_fires_callback() {
        let surface = TestSurface::new(true);
        let launcher = SurfaceLauncher::new(Arc::new(TestHost {
            surface: surface.clone(),
            block_popups: false,
        }));

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let opened = launcher
            .open(
                HandleId::new(),
                "https://provider/auth",
                &LaunchMode::Popup(PopupConfig::default()),
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap();
        assert_eq!(opened, OpenedSurface::Windowed);

        surface.simulate_user_close();
        tokio::time::sleep(CLOSE_POLL_INTERVAL * 3).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blocked_popup_propagates_error() {
        let launcher = SurfaceLauncher::new(Arc::new(TestHost {
            surface: TestSurface::new(true),
            block_popups: true,
        }));

        let result = launcher.open(
            HandleId::new(),
            "https://provider/auth",
            &LaunchMode::Popup(PopupConfig::default()),
            || {},
        );
        assert!(matches!(result, Err(AppError::Launch(_))));
        assert_eq!(launcher.open_surface_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unobservable_tab_skips_liveness_poll() {
        let surface = TestSurface::new(false);
        let launcher = SurfaceLauncher::new(Arc::new(TestHost {
            surface: surface.clone(),
            block_popups: false,
        }));

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        launcher
            .open(HandleId::new(), "https://p/a", &LaunchMode::NewTab, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        surface.simulate_user_close();
        tokio::time::sleep(CLOSE_POLL_INTERVAL * 3).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_closes_without_firing_user_close() {
        let surface = TestSurface::new(true);
        let launcher = SurfaceLauncher::new(Arc::new(TestHost {
            surface: surface.clone(),
            block_popups: false,
        }));

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let id = HandleId::new();
        launcher
            .open(
                id,
                "https://p/a",
                &LaunchMode::Popup(PopupConfig::default()),
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap();

        launcher.release(id);
        tokio::time::sleep(CLOSE_POLL_INTERVAL * 3).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(surface.close_calls.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.open_surface_count(), 0);
    }

    #[tokio::test]
    async fn test_hidden_frame_is_tracked_and_released() {
        let surface = TestSurface::new(true);
        let launcher = SurfaceLauncher::new(Arc::new(TestHost {
            surface: surface.clone(),
            block_popups: false,
        }));

        let id = HandleId::new();
        let opened = launcher
            .open(
                id,
                "https://p/a",
                &LaunchMode::HiddenIframe(FrameConfig::default()),
                || {},
            )
            .unwrap();
        assert_eq!(opened, OpenedSurface::Frame);
        assert_eq!(launcher.open_surface_count(), 1);

        launcher.release(id);
        assert_eq!(surface.close_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_page_opens_nothing_to_track() {
        let launcher = SurfaceLauncher::new(Arc::new(TestHost {
            surface: TestSurface::new(true),
            block_popups: false,
        }));

        let opened = launcher
            .open(HandleId::new(), "https://p/a", &LaunchMode::SamePage, || {})
            .unwrap();
        assert_eq!(opened, OpenedSurface::CurrentPage);
        assert_eq!(launcher.open_surface_count(), 0);
    }
}
