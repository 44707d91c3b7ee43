//! Process supervision: spawning the developer's binary, detecting readiness
//! from its output and stopping it gracefully.

pub mod sink;
pub mod supervisor;
pub mod terminate;

pub use sink::{MarkerWait, OutputSink};
pub use supervisor::{
    DEFAULT_GRACE_PERIOD, ProcessSpec, ProcessState, StopOutcome, Supervisor,
};
pub use terminate::Terminate;
