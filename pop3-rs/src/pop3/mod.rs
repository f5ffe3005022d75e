//! POP3 server implementation (RFC 1939)
//!
//! - [`server`]: TCP accept loop, one task per connection
//! - [`session`]: per-connection state machine and command handlers
//! - [`commands`]: command tokenizing and verb table
//! - [`line`]: bounded command line reading
//! - [`response`]: `+OK`/`-ERR` replies and multi-line framing
//!
//! TOP, UIDL and APOP are answered with "Command not implemented".

pub mod commands;
pub mod line;
pub mod response;
pub mod server;
pub mod session;

pub use commands::{CommandLine, Pop3Command};
pub use line::{InboundLine, LineFault, LineReader};
pub use server::Pop3Server;
pub use session::{CommandOutcome, Flow, Pop3Session, SessionState};
