//! Blueprint playback engine (reel-engine)
//!
//! The sequencer replays a validated [`reel_model::Blueprint`] against host
//! contracts, one action at a time:
//! - [`host`]: the editing surface, terminal and audio traits it consumes
//! - [`placement`]: where inserted content lands and at what indent
//! - [`sequencer`]: the run state machine, typing playback and timing
//! - [`progress`]: push-only execution-state reporting
//! - [`error`]: what aborts a file versus what is merely logged
//!
//! Hosts are injected as `Arc<dyn _>`; the engine itself never touches the
//! filesystem outside of reading blueprint files.

pub mod error;
pub mod host;
pub mod placement;
pub mod progress;
pub mod sequencer;

pub use error::EngineError;
pub use host::{
    AudioPlayer, DecorationId, DocumentId, ExitStatus, HostError, Position, Range, TerminalHost,
    Workspace,
};
pub use placement::{plan_insert, InsertPlan};
pub use progress::{ExecutionState, NullReporter, ProgressReporter, RunStatus, WatchReporter};
pub use sequencer::Sequencer;
