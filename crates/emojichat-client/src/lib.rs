//! # emojichat-client
//!
//! Terminal client for emoji-only chat rooms. The [`controller`] composes the
//! codec, the content rule, the [`timeline`] and the [`presence`] roster on
//! top of any [`emojichat_store::RealtimeStore`]; [`app`] drives it from
//! stdin.

pub mod app;
pub mod commands;
pub mod config;
pub mod controller;
pub mod identity;
pub mod notices;
pub mod presence;
pub mod render;
pub mod session;
pub mod timeline;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use controller::{ControllerError, RoomController, RoomMode, SessionState};
pub use session::SessionContext;

/// Install the global subscriber. Logs go to stderr so they never mix with
/// the chat on stdout; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("emojichat_client=info,emojichat_store=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
