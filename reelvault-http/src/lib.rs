//! Hand-built HTTP/1.1 serving layer for the catalog server.
//!
//! No web framework: a connection acceptor, a per-connection session state
//! machine with an inactivity deadline, a `(method, path)` router, and a
//! closed response taxonomy translated to wire responses. Handlers return
//! `Outcome` values and never touch the socket.

pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use request::{Method, ParseError, Request, Version};
pub use response::{Outcome, StatusCode, WireResponse, translate};
pub use router::{Handler, Router};
pub use server::{HttpServer, ServerConfig, ServerError, SessionError};
