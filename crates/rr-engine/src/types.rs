//! Core types for redirect launches and their results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Unique identifier for a single launch-and-await-callback operation.
///
/// Generated per launch with no cross-context coordination, so it doubles as
/// the correlation nonce between a launch and its eventual callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry for a popup surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupConfig {
    /// Popup width in pixels
    pub width: u32,

    /// Popup height in pixels
    pub height: u32,

    /// Distance from the left edge of the screen, if positioned explicitly
    pub left: Option<i32>,

    /// Distance from the top edge of the screen, if positioned explicitly
    pub top: Option<i32>,

    /// Window name passed to the platform when opening
    pub window_name: Option<String>,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 600,
            left: None,
            top: None,
            window_name: None,
        }
    }
}

/// Configuration for a hidden inline frame surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameConfig {
    /// Element id assigned to the frame, if the caller wants to find it later
    pub frame_id: Option<String>,
}

/// Presentation strategy for the external authorization page.
///
/// Mode-specific presentation settings live on the variant itself, so a
/// launch cannot carry popup geometry into an iframe flow or vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Sized and positioned popup window
    Popup(PopupConfig),

    /// Unsized new browsing context
    NewTab,

    /// Navigate the current browsing context away; the result is recovered
    /// by the session resumer after the application reloads
    SamePage,

    /// Invisible inline frame for silent, non-interactive flows
    HiddenIframe(FrameConfig),
}

/// Options for a single launch. Immutable once the launch starts.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Presentation strategy
    pub mode: LaunchMode,

    /// How long to wait for a callback before resolving `Cancelled`.
    /// `None` waits indefinitely for a message or explicit cancel.
    pub timeout: Option<Duration>,

    /// Explicit delivery channel name. When absent, a name unique to the
    /// handle is derived from its nonce.
    pub channel_name: Option<String>,

    /// Callback URI scheme used to partition channel registration.
    /// When absent, the channel registers under the global scope.
    pub callback_scheme: Option<String>,
}

impl LaunchOptions {
    pub fn new(mode: LaunchMode) -> Self {
        Self {
            mode,
            timeout: None,
            channel_name: None,
            callback_scheme: None,
        }
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::new(LaunchMode::Popup(PopupConfig::default()))
    }
}

/// Partition under which channel names are registered and looked up
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Single shared registry key
    Global,

    /// Registry key qualified by callback URI scheme (lowercased)
    Scheme(String),
}

impl Scope {
    pub fn for_scheme(scheme: &str) -> Self {
        Self::Scheme(scheme.to_ascii_lowercase())
    }

    /// Storage key holding the JSON-encoded channel list for this scope
    pub fn storage_key(&self) -> String {
        match self {
            Scope::Global => "rr.channels".to_string(),
            Scope::Scheme(scheme) => format!("rr.channels.{}", scheme),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Scheme(scheme) => write!(f, "scheme:{}", scheme),
        }
    }
}

/// Structured authorization error carried in a callback URL's query string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthError {
    /// Provider error code (the `error` parameter)
    pub code: String,

    /// Human-readable description, if the provider sent one
    pub description: Option<String>,

    /// Documentation URI, if the provider sent one
    pub uri: Option<String>,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "{}: {}", self.code, desc),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Why a launch resolved as `Failure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FailureReason {
    /// The surface could not be opened (e.g. popup blocked)
    LaunchFailed {
        /// Platform error message
        message: String,
    },

    /// The callback URL carried a provider error parameter
    Provider {
        /// Parsed authorization error
        error: AuthError,
    },
}

/// Terminal outcome of a launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LaunchResult {
    /// Callback received; carries the exact callback URL string
    Success {
        /// Full callback URI as delivered
        callback_uri: String,
    },

    /// Timed out, cancelled by the caller, or the user closed the surface
    Cancelled,

    /// SamePage only: the current context is navigating away and the true
    /// result will be recovered after reload
    Pending,

    /// Launch or provider failure
    Failure {
        /// Structured failure cause
        error: FailureReason,
    },
}

impl LaunchResult {
    /// Classify a delivered callback URI.
    ///
    /// A URI whose query carries an `error` parameter becomes a provider
    /// `Failure`; anything else, including strings that do not parse as a
    /// URL, is `Success` with the literal string — the engine transports
    /// callbacks, it does not validate them.
    pub fn from_callback_uri(uri: &str) -> Self {
        if let Ok(parsed) = Url::parse(uri) {
            let mut code = None;
            let mut description = None;
            let mut doc_uri = None;
            for (key, value) in parsed.query_pairs() {
                match key.as_ref() {
                    "error" => code = Some(value.into_owned()),
                    "error_description" => description = Some(value.into_owned()),
                    "error_uri" => doc_uri = Some(value.into_owned()),
                    _ => {}
                }
            }
            if let Some(code) = code {
                return LaunchResult::Failure {
                    error: FailureReason::Provider {
                        error: AuthError {
                            code,
                            description,
                            uri: doc_uri,
                        },
                    },
                };
            }
        }

        LaunchResult::Success {
            callback_uri: uri.to_string(),
        }
    }

    pub fn is_terminal_success(&self) -> bool {
        matches!(self, LaunchResult::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_ids_are_unique() {
        let a = HandleId::new();
        let b = HandleId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_scope_storage_keys() {
        assert_eq!(Scope::Global.storage_key(), "rr.channels");
        assert_eq!(
            Scope::for_scheme("APP").storage_key(),
            "rr.channels.app"
        );
    }

    #[test]
    fn test_callback_uri_success() {
        let result = LaunchResult::from_callback_uri("app://callback?code=abc&state=xyz");
        assert_eq!(
            result,
            LaunchResult::Success {
                callback_uri: "app://callback?code=abc&state=xyz".to_string()
            }
        );
    }

    #[test]
    fn test_callback_uri_provider_error() {
        let result = LaunchResult::from_callback_uri(
            "app://callback?error=access_denied&error_description=User%20denied",
        );
        match result {
            LaunchResult::Failure {
                error: FailureReason::Provider { error },
            } => {
                assert_eq!(error.code, "access_denied");
                assert_eq!(error.description.as_deref(), Some("User denied"));
                assert!(error.uri.is_none());
            }
            other => panic!("expected provider failure, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_uri_is_success() {
        let result = LaunchResult::from_callback_uri("not a url at all");
        assert_eq!(
            result,
            LaunchResult::Success {
                callback_uri: "not a url at all".to_string()
            }
        );
    }

    #[test]
    fn test_result_serialization() {
        let result = LaunchResult::Success {
            callback_uri: "app://cb".to_string(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("Success"));
        assert!(json.contains("app://cb"));

        let cancelled = serde_json::to_string(&LaunchResult::Cancelled).unwrap();
        assert!(cancelled.contains("Cancelled"));
    }
}
