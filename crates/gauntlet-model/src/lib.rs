pub mod action;
pub mod chromosome;
pub mod device;
pub mod episode;
pub mod sim;
pub mod state;
pub mod suite;

pub use action::{
    Action, ActionResult, ComponentType, IntentAction, PrimitiveAction, PrimitiveKind,
    SystemAction, WidgetAction, WidgetActionKind,
};
pub use chromosome::{Candidate, CandidateRef, Chromosome, ChromosomeId};
pub use device::{execute_action, ActionExecutor, Device, ExecutionError, ScreenStateProvider};
pub use episode::{CrashInfo, Episode, EpisodeError, EpisodeId, StateReach};
pub use state::{Bounds, ScreenState, StateId, Widget, WidgetTrait};
pub use suite::TestSuite;
