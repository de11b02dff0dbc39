//! Nested transform pipeline.
//!
//! [`run`] processes one input archive through the state machine described
//! by [`PipelineState`]. [`process_batch`] runs independent inputs on a
//! thread pool and collects one classified outcome per input.

mod batch;
mod context;
mod run;
mod state;

pub use batch::process_batch;
pub use context::CancelToken;
pub use context::RunContext;
pub use run::run;
pub use state::NoopObserver;
pub use state::PipelineObserver;
pub use state::PipelineState;
