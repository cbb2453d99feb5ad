//! uni-runtime - Client-side reactivity engine
//!
//! Headless runtime for server-driven components: declarative DOM
//! attributes bind model fields and method calls, mutations queue up
//! per component, and each flush posts the batch to the server message
//! endpoint and reconciles the rerendered markup back into the live
//! tree.
//!
//! # Example
//! ```rust,ignore
//! use uni_runtime::{Runtime, RuntimeConfig};
//!
//! let doc = uni_html::parse_document(page_html);
//! let mut runtime = Runtime::new(doc, RuntimeConfig::default())?;
//! runtime.handle_event(&mut input_event);
//! runtime.advance(250); // fire the debounced flush
//! for effect in runtime.drain_effects() { /* navigate, call host fns */ }
//! ```

pub mod attribute;
pub mod component;
pub mod config;
pub mod element;
pub mod errors;
pub mod expr;
pub mod message;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod transport;

mod runtime;
mod sync;

pub use component::Component;
pub use config::{CsrfConfig, RuntimeConfig};
pub use errors::Error;
pub use message::{MessageRequest, MessageResponse};
pub use queue::{Action, ActionQueue};
pub use runtime::{Effect, Runtime, RuntimeHooks};
pub use transport::{HttpReply, HttpRequest, HttpTransport, RequestBody, Transport};

// Re-export sub-crates so embedders need a single dependency.
pub use uni_dom as dom;
pub use uni_html as html;
pub use uni_morph as morph;

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
