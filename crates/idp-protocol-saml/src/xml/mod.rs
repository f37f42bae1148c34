//! XML reading and writing for the protocol messages.

pub mod reader;
pub mod writer;

pub use reader::{parse_document, soap_body, Element, ResponseSummary};
pub use writer::{format_instant, soap_envelope};
