//! QDN gateway interface
//!
//! Everything the crate sends to the content network funnels through one
//! asynchronous request function that takes an action descriptor and returns
//! JSON or an error. [`HttpGateway`] is the production implementation;
//! [`GatewayTransport`] is the seam tests inject mocks through.

pub mod error;
pub mod transport;
pub mod types;

pub use error::GatewayError;
pub use transport::{GatewayTransport, HttpGateway};
pub use types::{
    FetchOutcome, GatewayAction, PublishRequest, ResourceInfo, ResourceMetadata, ResourceStatus,
    SearchMode, SearchParams, Service, NOT_FOUND_SENTINEL,
};
