//! Example: Basic usage of the uni-engine runtime
//!
//! Drives a counter component against a canned transport so the whole
//! event -> queue -> message -> morph loop runs without a server.

use uni_runtime::dom::UiEvent;
use uni_runtime::transport::{HttpReply, HttpRequest, Transport, TransportError};
use uni_runtime::{Runtime, RuntimeConfig};

/// Pretends to be the server: always answers with count = 1.
struct CannedTransport;

impl Transport for CannedTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpReply, TransportError> {
        println!("-> POST {}", request.url);
        Ok(HttpReply {
            status: 200,
            body: r#"{"data":{"count":1},"checksum":"c2","epoch":1,
                "dom":"<div unicorn:id=\"counter-1\" unicorn:name=\"counter\" unicorn:checksum=\"c2\"><span>Count: 1</span><button unicorn:click=\"increment()\">+</button></div>"}"#
                .to_string(),
        })
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let page = r#"<html><body>
        <div unicorn:id="counter-1" unicorn:name="counter" unicorn:checksum="c1">
            <span>Count: 0</span>
            <button unicorn:click="increment()">+</button>
        </div>
    </body></html>"#;

    let doc = uni_html::parse_document(page);
    let mut runtime =
        Runtime::with_transport(doc, RuntimeConfig::default(), Box::new(CannedTransport))
            .expect("valid configuration");

    println!("uni-runtime v{} initialized", uni_runtime::VERSION);

    let button = runtime
        .document()
        .find_in(runtime.document().root(), |n| {
            n.as_element().is_some_and(|e| e.tag == "button")
        })
        .expect("button exists");

    runtime.handle_event(&mut UiEvent::new("click", button));

    let counter = runtime.component("counter-1").expect("registered");
    println!("confirmed count: {}", counter.data["count"]);

    let span = runtime
        .document()
        .find_in(runtime.document().root(), |n| {
            n.as_element().is_some_and(|e| e.tag == "span")
        })
        .expect("span exists");
    println!("rendered: {}", runtime.document().tree().text_content(span));
}
