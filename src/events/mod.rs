//! Runtime events and the broadcast bus that carries them.
//!
//! Every layer of the execution stack publishes what it is doing to a shared
//! [`Bus`]; observers consume the stream without ever sitting on the command
//! path.
//!
//! ```text
//! Publishers (many):                    Consumers (observers):
//!   runner   ──┐
//!   pool     ──┼──────► Bus ──────► observer listener ──► LogWriter / custom
//!   executor ──┤  (broadcast chan)
//!   lifecycle ─┘
//! ```
//!
//! Publishing is non-blocking; a command never waits for its own diagnostics.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

pub(crate) use event::truncate;
