pub mod client;
pub mod error;
pub mod payloads;
pub mod pipeline;
pub mod session;
pub mod signer;
pub mod testing;
pub mod transport;
pub mod types;

pub use client::SessionClient;
pub use error::{ApiError, ApiErrorKind};
pub use session::{Identity, RequestClock, Session};
pub use signer::{Signer, SignTokens};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, Transport};
