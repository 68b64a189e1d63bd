pub mod chat;
pub mod commands;
pub mod pipeline;
pub mod runtime;
pub mod server;

pub use runtime::{init_tracing, AppState, Workspace};
