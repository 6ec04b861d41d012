use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::{Action, ActionResult};
use crate::device::{execute_action, Device, ScreenStateProvider};
use crate::state::{ScreenState, StateId};

static NEXT_EPISODE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of an episode within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeId(pub u64);

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep-{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EpisodeError {
    #[error("episode {0} is finished and can no longer be edited")]
    Finished(EpisodeId),
    #[error("action {action} is not executable in state {state}")]
    NotApplicable { action: String, state: StateId },
}

/// How a state was first reached within an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateReach {
    /// Observed before any action was applied.
    Initial,
    /// Reached by the action at this index.
    Action(usize),
}

/// Diagnostic record of the first crash observed in an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashInfo {
    pub action_index: usize,
    pub activity: String,
    pub stack_trace: Option<String>,
}

impl CrashInfo {
    /// Key used to tell distinct crashes apart.
    pub fn signature(&self) -> String {
        match &self.stack_trace {
            Some(trace) => trace.lines().next().unwrap_or_default().trim().to_string(),
            None => format!("crash in {}", self.activity),
        }
    }
}

/// An ordered sequence of actions executed against the app, with what they
/// revealed.
///
/// Visited sets only grow. The crash record is set at most once. After
/// [`finish`](Episode::finish) the episode is read-only.
#[derive(Debug, Clone, Serialize)]
pub struct Episode {
    id: EpisodeId,
    actions: Vec<Action>,
    results: Vec<ActionResult>,
    activity_sequence: Vec<String>,
    visited_activities: BTreeSet<String>,
    visited_states: BTreeSet<StateId>,
    states_map: BTreeMap<StateId, StateReach>,
    crash: Option<CrashInfo>,
    desired_size: Option<usize>,
    finished: bool,
}

impl Episode {
    pub fn new() -> Self {
        Self {
            id: EpisodeId(NEXT_EPISODE_ID.fetch_add(1, Ordering::Relaxed)),
            actions: Vec::new(),
            results: Vec::new(),
            activity_sequence: Vec::new(),
            visited_activities: BTreeSet::new(),
            visited_states: BTreeSet::new(),
            states_map: BTreeMap::new(),
            crash: None,
            desired_size: None,
            finished: false,
        }
    }

    /// Record the state the app is in before the first action.
    pub fn begin<D: ScreenStateProvider + ?Sized>(
        &mut self,
        device: &mut D,
    ) -> Result<(), EpisodeError> {
        if self.finished {
            return Err(EpisodeError::Finished(self.id));
        }
        let state = device.current_state();
        if self.activity_sequence.is_empty() {
            self.activity_sequence.push(state.activity.clone());
        }
        self.record_state(&state, StateReach::Initial);
        Ok(())
    }

    /// Execute `action` and append it to the episode.
    ///
    /// The action is appended whatever the outcome. Callers stop extending
    /// the episode once the returned result says it should not continue.
    pub fn apply_action<D: Device + ?Sized>(
        &mut self,
        device: &mut D,
        action: Action,
    ) -> Result<ActionResult, EpisodeError> {
        if self.finished {
            return Err(EpisodeError::Finished(self.id));
        }

        let before = device.current_state();
        if !before.can_execute(&action) {
            return Err(EpisodeError::NotApplicable {
                action: action.to_string(),
                state: before.id,
            });
        }
        if self.activity_sequence.is_empty() {
            self.activity_sequence.push(before.activity.clone());
        }

        let index = self.actions.len();
        let executed = execute_action(device, &action);
        self.actions.push(action);
        self.results.push(executed.result);

        let after = device.current_state();
        debug!(
            episode = %self.id,
            index,
            from = %before.activity,
            to = %after.activity,
            result = ?executed.result,
            "applied action"
        );
        self.activity_sequence.push(after.activity.clone());

        match executed.result {
            ActionResult::Success | ActionResult::SuccessNewState => {
                self.record_state(&after, StateReach::Action(index));
            }
            ActionResult::FailureCrash => {
                if self.crash.is_none() {
                    info!(episode = %self.id, index, activity = %before.activity, "crash detected");
                    self.crash = Some(CrashInfo {
                        action_index: index,
                        activity: before.activity,
                        stack_trace: executed.stack_trace,
                    });
                }
            }
            ActionResult::SuccessOutbound | ActionResult::FailureUnknown => {}
        }

        Ok(executed.result)
    }

    /// Seal the episode. Only the first call has an effect.
    pub fn finish(&mut self) {
        if self.finished {
            warn!(episode = %self.id, "episode finished twice");
            return;
        }
        self.finished = true;
        debug!(
            episode = %self.id,
            actions = self.actions.len(),
            crashed = self.crash.is_some(),
            activities = ?self.visited_activities,
            "episode finished"
        );
    }

    fn record_state(&mut self, state: &ScreenState, reach: StateReach) {
        self.visited_activities.insert(state.activity.clone());
        self.visited_states.insert(state.id.clone());
        self.states_map.entry(state.id.clone()).or_insert(reach);
    }

    pub fn id(&self) -> EpisodeId {
        self.id
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn results(&self) -> &[ActionResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Foreground activity before the first action, then after each action.
    pub fn activity_sequence(&self) -> &[String] {
        &self.activity_sequence
    }

    pub fn activity_before_action(&self, index: usize) -> Option<&str> {
        self.activity_sequence.get(index).map(String::as_str)
    }

    pub fn activity_after_action(&self, index: usize) -> Option<&str> {
        self.activity_sequence.get(index + 1).map(String::as_str)
    }

    pub fn visited_activities(&self) -> &BTreeSet<String> {
        &self.visited_activities
    }

    pub fn visited_states(&self) -> &BTreeSet<StateId> {
        &self.visited_states
    }

    pub fn states_map(&self) -> &BTreeMap<StateId, StateReach> {
        &self.states_map
    }

    pub fn crash(&self) -> Option<&CrashInfo> {
        self.crash.as_ref()
    }

    pub fn has_crashed(&self) -> bool {
        self.crash.is_some()
    }

    /// Target length when this episode is used as a replay template.
    pub fn desired_size(&self) -> Option<usize> {
        self.desired_size
    }

    pub fn set_desired_size(&mut self, size: Option<usize>) {
        self.desired_size = size;
    }
}

impl Default for Episode {
    fn default() -> Self {
        Self::new()
    }
}
