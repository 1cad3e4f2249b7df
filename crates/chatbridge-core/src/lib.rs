pub mod aggregate;
pub mod bridge;
pub mod emitter;
pub mod error;
pub mod poller;
pub mod prompt;
pub mod registry;
pub mod render;
pub mod usage;

pub use aggregate::{aggregate, select_turn};
pub use bridge::{Bridge, TurnResult};
pub use emitter::{EmitOutcome, FrameWriter, StreamEvent};
pub use error::BridgeError;
pub use poller::{PollOutcome, TurnPoller, TurnState};
pub use prompt::{combine_messages, map_model};
pub use registry::{SessionHandle, SessionRegistry, DEFAULT_SESSION_KEY};
pub use render::render_part;
pub use usage::{estimate_tokens, estimate_usage};
