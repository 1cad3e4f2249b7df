pub mod loader;
pub mod schema;
pub mod settings;

pub use loader::{load_config, ConfigLoader};
pub use schema::*;
pub use settings::*;
