//! Request handler module
//!
//! Every inbound request enters the SPA fallback handler directly; there is
//! no further dispatch.

pub mod spa;
pub mod static_files;

// Re-export main entry point
pub use spa::handle_request;
