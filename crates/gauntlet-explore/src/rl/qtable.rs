use std::collections::HashMap;

use gauntlet_model::{Action, StateId};

/// Action values per abstract state.
///
/// Entries are created lazily: an action never seen in a state is worth 0,
/// and a state never entered has a best value of 0.
#[derive(Debug, Clone, Default)]
pub struct QTable {
    values: HashMap<StateId, Vec<(Action, f64)>>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure every action in `actions` has an entry for `state`.
    pub fn ensure_state(&mut self, state: &StateId, actions: &[Action]) {
        let row = self.values.entry(state.clone()).or_default();
        for action in actions {
            if !row.iter().any(|(a, _)| a == action) {
                row.push((action.clone(), 0.0));
            }
        }
    }

    pub fn contains_state(&self, state: &StateId) -> bool {
        self.values.contains_key(state)
    }

    pub fn get(&self, state: &StateId, action: &Action) -> f64 {
        self.values
            .get(state)
            .and_then(|row| row.iter().find(|(a, _)| a == action))
            .map_or(0.0, |(_, v)| *v)
    }

    pub fn set(&mut self, state: &StateId, action: &Action, value: f64) {
        let row = self.values.entry(state.clone()).or_default();
        match row.iter_mut().find(|(a, _)| a == action) {
            Some(entry) => entry.1 = value,
            None => row.push((action.clone(), value)),
        }
    }

    pub fn max_value(&self, state: &StateId) -> f64 {
        self.values
            .get(state)
            .and_then(|row| row.iter().map(|(_, v)| *v).reduce(f64::max))
            .unwrap_or(0.0)
    }

    /// Actions of `candidates` sharing the highest value in `state`.
    pub fn best_actions<'a>(&self, state: &StateId, candidates: &'a [Action]) -> Vec<&'a Action> {
        let scored: Vec<(&Action, f64)> = candidates
            .iter()
            .map(|a| (a, self.get(state, a)))
            .collect();
        let Some(best) = scored.iter().map(|(_, v)| *v).reduce(f64::max) else {
            return Vec::new();
        };
        scored
            .into_iter()
            .filter(|(_, v)| *v == best)
            .map(|(a, _)| a)
            .collect()
    }

    /// Apply `Q(s,a) = reward + gamma * max Q(s', .)` and return the new value.
    pub fn learn(
        &mut self,
        state: &StateId,
        action: &Action,
        reward: f64,
        next: &StateId,
        gamma: f64,
    ) -> f64 {
        let value = reward + gamma * self.max_value(next);
        self.set(state, action, value);
        value
    }

    pub fn state_count(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_model::{Widget, WidgetAction};

    fn click(id: &str) -> Action {
        WidgetAction::click(Widget::button(id, id, (0, 0, 10, 10)))
    }

    #[test]
    fn test_unseen_entries_default_to_zero() {
        let table = QTable::new();
        let s = StateId::new("s");
        assert_eq!(table.get(&s, &click("a")), 0.0);
        assert_eq!(table.max_value(&s), 0.0);
    }

    #[test]
    fn test_learn_uses_next_state_max() {
        let mut table = QTable::new();
        let s = StateId::new("s");
        let t = StateId::new("t");
        table.set(&t, &click("x"), 2.0);
        table.set(&t, &click("y"), 5.0);
        let v = table.learn(&s, &click("a"), 1.0, &t, 0.5);
        assert_eq!(v, 3.5);
        assert_eq!(table.get(&s, &click("a")), 3.5);
    }

    #[test]
    fn test_best_actions_returns_all_ties() {
        let mut table = QTable::new();
        let s = StateId::new("s");
        let actions = vec![click("a"), click("b"), click("c")];
        table.ensure_state(&s, &actions);
        table.set(&s, &click("a"), 1.0);
        table.set(&s, &click("c"), 1.0);
        let best = table.best_actions(&s, &actions);
        assert_eq!(best, vec![&actions[0], &actions[2]]);
    }
}
