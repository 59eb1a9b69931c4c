//! HTTP protocol layer module
//!
//! Base protocol functionality shared by the handlers, decoupled from the
//! path-resolution logic.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used helpers
pub use range::parse_range_header;
pub use response::{
    apply_cors_headers, build_400_response, build_404_response, build_405_response,
    build_416_response, build_500_response, build_options_response,
};
