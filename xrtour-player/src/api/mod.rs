//! HTTP control surface for the player
//!
//! Visual surfaces read the snapshot, post intents and follow the SSE
//! event stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
