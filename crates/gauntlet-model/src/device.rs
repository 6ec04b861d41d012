use crate::action::{Action, ActionResult};
use crate::state::ScreenState;

/// Failure raised by an executor while applying an action.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("app crashed")]
    Crash { stack_trace: Option<String> },
    #[error("device failure: {0}")]
    Device(String),
}

/// Applies one action to the app under test.
///
/// Implementations may return [`ExecutionError::Crash`] instead of
/// `ActionResult::FailureCrash`; callers go through [`execute_action`]
/// which folds both into a plain outcome.
pub trait ActionExecutor {
    fn execute(&mut self, action: &Action) -> Result<ActionResult, ExecutionError>;
}

/// Source of the current abstract screen and control over the app lifecycle.
pub trait ScreenStateProvider {
    fn current_state(&mut self) -> ScreenState;

    /// Return the app to its initial state.
    fn reset_app(&mut self);

    /// Try to bring `activity` to the foreground. Returns false if it
    /// cannot be reached directly.
    fn launch_activity(&mut self, activity: &str) -> bool;

    /// Give back any resources held for the session.
    fn release(&mut self) {}
}

/// The live app: both an executor and a state provider.
pub trait Device: ActionExecutor + ScreenStateProvider {}

impl<T: ActionExecutor + ScreenStateProvider + ?Sized> Device for T {}

/// Outcome of [`execute_action`], with the crash trace if one was reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub result: ActionResult,
    pub stack_trace: Option<String>,
}

/// Execute `action`, translating executor errors into outcomes.
pub fn execute_action<D: ActionExecutor + ?Sized>(device: &mut D, action: &Action) -> Executed {
    match device.execute(action) {
        Ok(result) => Executed {
            result,
            stack_trace: None,
        },
        Err(ExecutionError::Crash { stack_trace }) => Executed {
            result: ActionResult::FailureCrash,
            stack_trace,
        },
        Err(ExecutionError::Device(reason)) => {
            tracing::warn!(%action, %reason, "executor failed");
            Executed {
                result: ActionResult::FailureUnknown,
                stack_trace: None,
            }
        }
    }
}
