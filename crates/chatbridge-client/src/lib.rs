pub mod backend;
pub mod error;
pub mod http;

pub use backend::Backend;
pub use error::ClientError;
pub use http::{HttpBackend, HttpBackendOptions};
