pub mod id;
pub mod logging;

pub use logging::{init_tracing, LogHandle};
