//! Callback relay: runs where the provider's callback navigation landed
//!
//! The relay reads the channel registry and broadcasts the exact callback
//! URL string to every registered channel, then its surface is disposed. For
//! SamePage flows the relay instead persists pending session state before
//! the context navigates back to the application. An equivalent relay can
//! run inside an intercepting request router (see [`CallbackInterceptor`]),
//! resolving flows without ever rendering a callback page.

use crate::broker::ChannelBroker;
use crate::session::SessionResumer;
use crate::types::Scope;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub struct CallbackRelay {
    broker: Arc<ChannelBroker>,
    session: Arc<SessionResumer>,
}

impl CallbackRelay {
    pub fn new(broker: Arc<ChannelBroker>, session: Arc<SessionResumer>) -> Self {
        Self { broker, session }
    }

    /// Broadcast `uri` to the channels that should hear about it.
    ///
    /// With an explicit channel override the message goes straight to that
    /// channel, registered or not. Otherwise the registry is consulted:
    /// first the scope derived from the URI's scheme, then the global scope.
    /// Registration is single-scope, so the double publish cannot reach the
    /// same channel twice. Returns the number of channels published to.
    pub fn deliver(&self, uri: &str, channel_override: Option<&str>) -> usize {
        if let Some(channel) = channel_override {
            info!("Delivering callback to explicit channel {}", channel);
            self.broker.publish_to(channel, uri);
            return 1;
        }

        let mut published = 0;
        if let Some(scheme) = scheme_of(uri) {
            published += self.broker.publish_all(&Scope::for_scheme(&scheme), uri);
        }
        published += self.broker.publish_all(&Scope::Global, uri);

        debug!("Delivered callback to {} channel(s)", published);
        published
    }

    /// SamePage path: broadcast the callback like any other relay, then
    /// persist pending session state so the resumer can reconstruct the
    /// result after the application reloads. Other in-flight handles
    /// registered for the scope hear the callback through the broadcast;
    /// the persisted state covers the handle whose context is about to be
    /// destroyed. Storage denial is tolerated silently. Returns the number
    /// of channels published to.
    pub fn deliver_same_page(&self, uri: &str) -> usize {
        let published = self.deliver(uri, None);
        info!("Persisting same-page callback before navigation");
        self.session.store_pending_uri(uri);
        published
    }

    /// SamePage path when only the originating scheme is known. With no URI
    /// in hand there is nothing to broadcast; only the pending state is
    /// persisted.
    pub fn deliver_same_page_scheme(&self, scheme: &str) {
        self.session.store_pending_scheme(scheme);
    }
}

fn scheme_of(uri: &str) -> Option<String> {
    Url::parse(uri)
        .ok()
        .map(|url| url.scheme().to_ascii_lowercase())
}

/// Synthetic response the interceptor answers a callback request with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: &'static str,
}

const CALLBACK_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>Authorization complete</title></head>\
<body><p>Authorization complete. You may close this window.</p></body></html>";

/// Request-interception fast path.
///
/// Matches outgoing requests by callback path prefix and answers them with a
/// generic same-origin page instead of letting the navigation hit the
/// network, performing the relay broadcast with the intercepted request's
/// full URL. Optional: when no interceptor is installed, the callback page
/// relay is the fallback path.
pub struct CallbackInterceptor {
    callback_path: String,
    relay: Arc<CallbackRelay>,
}

impl CallbackInterceptor {
    pub fn new(callback_path: impl Into<String>, relay: Arc<CallbackRelay>) -> Self {
        Self {
            callback_path: callback_path.into(),
            relay,
        }
    }

    /// Whether `url` is a callback request this interceptor should answer
    pub fn matches(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => parsed.path().starts_with(&self.callback_path),
            Err(_) => false,
        }
    }

    /// Intercept `url` if it matches: broadcast it and synthesize the
    /// response the surface renders instead of a network round trip.
    /// Returns `None` for non-callback requests, which proceed normally.
    pub fn intercept(&self, url: &str) -> Option<InterceptedResponse> {
        if !self.matches(url) {
            return None;
        }

        info!("Intercepted callback request, skipping network");
        self.relay.deliver(url, None);

        Some(InterceptedResponse {
            status: 200,
            content_type: "text/html",
            body: CALLBACK_PAGE,
        })
    }
}
