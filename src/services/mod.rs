//! Service layer module
//!
//! Contains the HTTP transport, the request engine, and the client facade

pub mod client;
pub mod request;
pub mod transport;

pub use client::{client, Client, NO_PARAMS};
pub use request::{Outcome, RequestDescriptor, RequestEngine};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
