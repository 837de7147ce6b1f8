//! `floorscan-verification`: the pure scan verification engine.
//!
//! Given the operating mode, the pending tasks and the location master, the engine
//! checks every scan against what the current step expects and emits commit payloads
//! once a task has been physically verified. No IO happens here: lot lookups, commits
//! and exception reports are handed out as [`Effect`]s.

pub mod engine;
pub mod exceptions;
pub mod flow;
pub mod location;
pub mod lots;
pub mod packing;
pub mod selector;
pub mod session;
pub mod task;

pub use engine::{Outcome, ScanEngine};
pub use exceptions::ExceptionReporter;
pub use flow::{
    Closure, Effect, FlowContext, MatchedBy, MoveFlow, ReceiveFlow, SessionInput, TemplateFlow,
    Transition, VerificationFlow, flow_for, prompt, transition,
};
pub use location::{Location, LocationMaster, LocationType};
pub use lots::{LotCandidate, LotQuery, LotSelector, RankedLot};
pub use packing::{CompositeCodeInterpreter, PackLine, PackOutcome, PackingOrder};
pub use selector::TaskSelector;
pub use session::{Pending, Prompt, Scratch, SessionState, Step, VerificationSession};
pub use task::{OrderNeed, Task, TaskBoard, TaskKind, TaskStatus};
