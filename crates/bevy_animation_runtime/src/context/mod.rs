mod graph_context;
mod sampled_events;

pub use graph_context::*;
pub use sampled_events::*;
