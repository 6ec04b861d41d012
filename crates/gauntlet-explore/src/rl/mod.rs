//! Reinforcement-learning explorers.

pub mod aimdroid;
pub mod qlearning;
pub mod qtable;
pub mod reward;

pub use aimdroid::{ActivityInsulatedExplorer, CageParams};
pub use qlearning::{QLearningExplorer, QPolicy, RlParams};
pub use qtable::QTable;
pub use reward::{intermediate_reward, state_difference, widget_difference};
