pub mod flow;
pub mod kernel;
pub mod link;
pub mod metrics;
pub mod node;

pub use flow::{CongestionPolicy, DelayPolicy, FlowCommon, FlowState, PolicyOutcome, RenoPolicy};
pub use kernel::{EventKind, Kernel};
pub use link::Link;
pub use metrics::{InMemoryMetrics, Metrics, NullMetrics};
pub use node::{Host, Node, Router};
