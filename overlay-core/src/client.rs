//! Browser-facing client.
//!
//! Tracks the browser's lifecycle (created, loaded, closed), forwards the
//! host's create/render/reset calls to the render handler, and decodes
//! `ui-event` messages the page sends to the host.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::OverlayBackend;
use crate::handler::{CursorImage, OverlayRenderHandler};
use crate::render::{FrameReport, HostPipeline};

/// Name of the process message carrying page events.
pub const UI_EVENT_MESSAGE: &str = "ui-event";

/// The browser engine, as seen by the overlay.
pub trait BrowserHost: Send + Sync {
    /// The view rect changed; re-query it and repaint at the new size.
    fn was_resized(&self);
}

/// A message sent from the browser's render process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMessage {
    /// Message name.
    pub name: String,
    /// Positional arguments.
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl ProcessMessage {
    /// Create a message.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// An event raised by the overlay page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiEvent {
    /// Event name chosen by the page.
    pub name: String,
    /// Event payload.
    pub arguments: Vec<Value>,
}

impl UiEvent {
    /// Decode a `ui-event` message: `[name: string, args: list]`.
    ///
    /// Returns `None` for other messages or malformed arguments.
    #[must_use]
    pub fn from_message(message: &ProcessMessage) -> Option<Self> {
        if message.name != UI_EVENT_MESSAGE {
            return None;
        }

        let name = message.arguments.first()?.as_str()?.to_string();
        let arguments = match message.arguments.get(1) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return None,
        };

        Some(Self { name, arguments })
    }
}

/// Owns the render handler and the browser lifecycle state.
pub struct OverlayClient<B: OverlayBackend> {
    handler: Arc<OverlayRenderHandler<B>>,
    loaded: AtomicBool,
}

impl<B: OverlayBackend> OverlayClient<B> {
    /// Wrap a render handler.
    #[must_use]
    pub fn new(handler: Arc<OverlayRenderHandler<B>>) -> Self {
        Self {
            handler,
            loaded: AtomicBool::new(false),
        }
    }

    /// The render handler. Hand a clone to the browser thread for paints.
    #[must_use]
    pub fn handler(&self) -> &Arc<OverlayRenderHandler<B>> {
        &self.handler
    }

    /// The browser finished creation.
    pub fn on_after_created(&self, browser: Arc<dyn BrowserHost>) {
        tracing::debug!("Browser attached to overlay");
        self.handler.attach_browser(browser);
    }

    /// The browser is about to close.
    pub fn on_before_close(&self) {
        if self.handler.detach_browser().is_some() {
            tracing::debug!("Browser detached from overlay");
        }
        self.loaded.store(false, Ordering::Release);
    }

    /// Record the page's load state.
    pub fn set_loaded(&self, loaded: bool) {
        self.loaded.store(loaded, Ordering::Release);
    }

    /// True once a browser is attached and its page has loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.handler.browser().is_some() && self.loaded.load(Ordering::Acquire)
    }

    /// Cursor asset paths, in load order.
    #[must_use]
    pub fn cursor_paths(&self) -> [&Path; 2] {
        self.handler.config().cursor_paths()
    }

    /// Forward to [`OverlayRenderHandler::create`].
    pub fn create<H>(&self, host: &H, cursor: Option<&CursorImage>)
    where
        H: HostPipeline<B::View> + ?Sized,
    {
        self.handler.create(host, cursor);
    }

    /// Forward to [`OverlayRenderHandler::render`].
    pub fn render<H>(&self, host: &mut H) -> FrameReport
    where
        H: HostPipeline<B::View> + ?Sized,
    {
        self.handler.render(host)
    }

    /// Forward to [`OverlayRenderHandler::reset`].
    pub fn reset<H>(&self, host: &H, cursor: Option<&CursorImage>)
    where
        H: HostPipeline<B::View> + ?Sized,
    {
        self.handler.reset(host, cursor);
    }

    /// Handle a message from the browser's render process.
    ///
    /// Returns the decoded event for `ui-event` messages, `None` otherwise.
    pub fn on_process_message(&self, message: &ProcessMessage) -> Option<UiEvent> {
        let event = UiEvent::from_message(message);
        match &event {
            Some(event) => tracing::debug!(name = %event.name, "UI event received"),
            None if message.name == UI_EVENT_MESSAGE => {
                tracing::warn!("Malformed ui-event message: {:?}", message.arguments);
            }
            None => tracing::trace!(name = %message.name, "Unhandled process message"),
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;
    use crate::config::OverlayConfig;
    use crate::geometry::SurfaceSize;
    use crate::software::{RecordingPipeline, SoftwareBackend};

    #[derive(Default)]
    struct CountingBrowser {
        resizes: AtomicUsize,
    }

    impl BrowserHost for CountingBrowser {
        fn was_resized(&self) {
            self.resizes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client() -> OverlayClient<SoftwareBackend> {
        let handler = OverlayRenderHandler::new(
            Arc::new(SoftwareBackend::new()),
            OverlayConfig::default(),
        );
        OverlayClient::new(Arc::new(handler))
    }

    #[test]
    fn test_ready_requires_browser_and_load() {
        let client = client();
        assert!(!client.is_ready());

        client.set_loaded(true);
        assert!(!client.is_ready());

        client.on_after_created(Arc::new(CountingBrowser::default()));
        assert!(client.is_ready());

        client.on_before_close();
        assert!(!client.is_ready());
        assert!(client.handler().browser().is_none());
    }

    #[test]
    fn test_resize_notifies_attached_browser() {
        let client = client();
        let browser = Arc::new(CountingBrowser::default());
        client.on_after_created(browser.clone());

        let mut host = RecordingPipeline::new(SurfaceSize::new(640, 480));
        client.render(&mut host);
        client.render(&mut host);
        assert_eq!(browser.resizes.load(Ordering::SeqCst), 1);

        host.set_output(Some(SurfaceSize::new(320, 240)));
        client.render(&mut host);
        assert_eq!(browser.resizes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ui_event_decoded() {
        let client = client();
        let message = ProcessMessage::new("ui-event", vec![json!("connect"), json!(["127.0.0.1", 10578])]);

        let event = client.on_process_message(&message).expect("event");
        assert_eq!(event.name, "connect");
        assert_eq!(event.arguments, vec![json!("127.0.0.1"), json!(10578)]);
    }

    #[test]
    fn test_ui_event_without_args() {
        let message = ProcessMessage::new("ui-event", vec![json!("close")]);
        let event = UiEvent::from_message(&message).expect("event");
        assert!(event.arguments.is_empty());
    }

    #[test]
    fn test_other_messages_unhandled() {
        let client = client();
        assert!(client
            .on_process_message(&ProcessMessage::new("focus", vec![]))
            .is_none());
        assert!(client
            .on_process_message(&ProcessMessage::new("ui-event", vec![json!(42)]))
            .is_none());
        assert!(client
            .on_process_message(&ProcessMessage::new("ui-event", vec![json!("x"), json!("y")]))
            .is_none());
    }

    #[test]
    fn test_process_message_json_roundtrip_defaults() {
        let message: ProcessMessage =
            serde_json::from_str(r#"{ "name": "ui-event" }"#).expect("parse");
        assert!(message.arguments.is_empty());
    }

    #[test]
    fn test_cursor_paths_from_config() {
        let client = client();
        let [png, dds] = client.cursor_paths();
        assert!(png.ends_with("cursor.png"));
        assert!(dds.ends_with("cursor.dds"));
    }
}
