//! Request dispatch.

pub mod handlers;

pub use handlers::{HandleResult, HandlerContext, Pacing, handle_frame};
