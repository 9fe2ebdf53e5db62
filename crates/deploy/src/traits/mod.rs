//! Collaborators consumed by the orchestrator.
//!
//! The core never talks to a node, an explorer or a timer directly. Each of
//! those concerns is a trait so runs can be driven by the production services
//! in [`crate::services`] or by in-memory doubles in tests.

mod broadcaster;
mod clock;
mod reporter;
mod verifier;

pub use broadcaster::{Broadcaster, Confirmation, PendingTransaction};
pub use clock::{Clock, TokioClock};
pub use reporter::{ProgressEvent, Reporter, TracingReporter};
pub use verifier::Verifier;
