//! Request pipeline and shop services for shopfront.
//!
//! This crate provides the HTTP request pipeline (token injection, loading
//! coalescing, response normalization, failure side effects), the transport
//! and presenter seams, a host-reachability connectivity source, and the user,
//! product, cart and order services.

pub mod connectivity;
pub mod error;
pub mod handler;
pub mod loading;
pub mod presenter;
pub mod request;
pub mod services;
pub mod transport;

#[cfg(test)]
mod testing;

pub use connectivity::ReachabilitySource;
pub use error::{ApiError, TransportError};
pub use handler::ErrorHandler;
pub use loading::{LoadingGuard, LoadingTracker};
pub use presenter::{LogPresenter, Presenter};
pub use request::{ApiClient, PipelineConfig, RequestDescriptor, UploadOptions};
pub use services::{CartService, OrderService, ProductService, UserService};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportConfig, UploadRequest};
