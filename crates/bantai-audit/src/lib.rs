//! Audit extension: lifecycle event sinks, the stable wire format, and the
//! explain-tree builder (§4.8, §6).

pub mod context;
pub mod emitter;
pub mod explain;
pub mod sink;
pub mod wire;

pub use context::with_audit;
pub use emitter::SinkFanoutEmitter;
pub use explain::{build_explain_trees, render_tree, ExplainNode};
pub use sink::{InMemorySink, Sink, TracingSink};
pub use wire::{to_wire, WireEvent};
