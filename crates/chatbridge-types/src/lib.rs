pub mod message;
pub mod openai;
pub mod provider;
pub mod session;

pub use message::*;
pub use openai::*;
pub use provider::*;
pub use session::*;
