//! HTTP client module for the file-browser service.
//!
//! This module provides the `FileClient` for logging in and fetching files,
//! the `HttpTransport` seam it sends requests through, and the `ClientError`
//! taxonomy every operation reports failures with.
//!
//! The service authenticates with a `sessionId` cookie issued by the login
//! endpoint; the client replays it on every protected request.

pub mod client;
pub mod completion;
pub mod error;
pub mod transport;

pub use client::{FetchResult, FileClient, ResponseMeta};
pub use error::{ClientError, ErrorKind};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
