//! Core engine for the storefront assistant chat widget.
//!
//! Decodes the streamed response, assembles assistant messages, owns the
//! session and widget state machines, and tracks the widget's screen anchor
//! against the host page. The presentation layer talks to exactly one seam:
//! [`WidgetController`].

mod anchor;
mod assembler;
mod config;
mod decoder;
mod error;
mod locator;
pub mod logging;
mod session;
mod tracker;
mod transport;
mod widget;

pub use anchor::{
    compute_anchor, AnchorOffsets, AnchorPolicy, Breakpoint, ElementRect, Viewport,
};
pub use config::{AnchorConfig, Config};
pub use decoder::FragmentDecoder;
pub use error::ShopchatError;
pub use locator::{AnchorLocator, LocatorHint, PageElement, PageProbe};
pub use session::{ChatSession, SendOutcome};
pub use tracker::{AnchorTracker, AnchorTrackerHandle, LayoutSignal};
pub use transport::{
    ByteStream, CredentialProvider, HttpTransport, StaticCredentials, StreamingTransport,
};
pub use widget::{WidgetController, WidgetSnapshot, WidgetState};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ShopchatError>;
