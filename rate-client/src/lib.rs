//! Rate Client - access to the pricing backend
//!
//! [`RateApi`] is the CRUD surface the engine consumes. [`NetworkRateClient`]
//! talks to the backend over HTTP; [`InMemoryRateApi`] applies the same
//! server-side rules in process.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;

pub use api::RateApi;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::NetworkRateClient;
pub use memory::InMemoryRateApi;
