//! Shared test fixtures: a scriptable surface host
#![allow(dead_code)]

use parking_lot::Mutex;
use rr_engine::types::{FrameConfig, PopupConfig};
use rr_engine::{LocalBus, MemoryStore, RedirectCoordinator, Surface, SurfaceHost};
use rr_types::{AppError, AppResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Surface whose closure the tests control
pub struct StubSurface {
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl StubSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub fn simulate_user_close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Surface for StubSurface {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Host that records every opened surface and can refuse popups
#[derive(Default)]
pub struct StubHost {
    pub block_popups: bool,
    pub opened: Mutex<Vec<Arc<StubSurface>>>,
    pub navigations: Mutex<Vec<String>>,
}

impl StubHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocking_popups() -> Self {
        Self {
            block_popups: true,
            ..Self::default()
        }
    }

    fn open(&self) -> Arc<StubSurface> {
        let surface = StubSurface::new();
        self.opened.lock().push(surface.clone());
        surface
    }

    pub fn last_surface(&self) -> Arc<StubSurface> {
        self.opened.lock().last().cloned().expect("a surface was opened")
    }
}

impl SurfaceHost for StubHost {
    fn open_popup(&self, _url: &str, _config: &PopupConfig) -> AppResult<Arc<dyn Surface>> {
        if self.block_popups {
            return Err(AppError::Launch("popup blocked by the browser".to_string()));
        }
        Ok(self.open())
    }

    fn open_tab(&self, _url: &str) -> AppResult<Arc<dyn Surface>> {
        Ok(self.open())
    }

    fn open_hidden_frame(&self, _url: &str, _config: &FrameConfig) -> AppResult<Arc<dyn Surface>> {
        Ok(self.open())
    }

    fn navigate_current(&self, url: &str) -> AppResult<()> {
        self.navigations.lock().push(url.to_string());
        Ok(())
    }
}

/// Coordinator over in-memory seams, returning the host and shared store for
/// inspection
pub fn test_coordinator() -> (RedirectCoordinator, Arc<StubHost>, Arc<MemoryStore>) {
    coordinator_with_host(StubHost::new())
}

pub fn coordinator_with_host(
    host: StubHost,
) -> (RedirectCoordinator, Arc<StubHost>, Arc<MemoryStore>) {
    let host = Arc::new(host);
    let shared_store = Arc::new(MemoryStore::new());
    let coordinator = RedirectCoordinator::new(
        host.clone(),
        shared_store.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(LocalBus::new()),
    );
    (coordinator, host, shared_store)
}
