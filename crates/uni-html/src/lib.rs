//! uni-html - HTML5 parsing and serialization
//!
//! Built on html5ever. Parsed markup is converted into the uni-dom arena
//! representation; the serializer walks the arena back out to markup.

mod parser;
mod serialize;

pub use parser::HtmlParser;
pub use serialize::{inner_html, outer_html};

use uni_dom::Document;

/// Parse a full HTML document.
pub fn parse_document(html: &str) -> Document {
    HtmlParser::new().parse_document(html, "about:blank")
}

/// Parse an HTML fragment (body context). The returned document's root
/// children are the fragment's top-level nodes.
pub fn parse_fragment(html: &str) -> Document {
    HtmlParser::new().parse_fragment(html)
}
