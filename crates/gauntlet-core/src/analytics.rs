//! Run statistics for a finished search.
//!
//! Aggregates what the final population exercised: action counts per
//! variant, intents per component type, crashes, activities and states,
//! plus the best-value curve over generations.

use std::collections::{BTreeMap, BTreeSet};

use gauntlet_explore::{RunOutcome, SearchOutcome, StopCause};
use gauntlet_model::{Action, Candidate, ComponentType};
use serde::Serialize;

/// A point of the best-value curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
    pub generation: u64,
    pub best_value: f64,
    pub covered_objectives: usize,
}

/// Best raw value reached for one objective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveSummary {
    pub name: String,
    pub best: Option<f64>,
}

/// Serializable summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub algorithm: String,
    pub stop: StopCause,
    pub generations: u64,
    pub elapsed_secs: f64,
    /// Candidates in the final population.
    pub candidates: usize,
    pub archive_size: usize,
    pub episodes: usize,
    pub total_actions: usize,
    /// Episodes that ended in a crash.
    pub crashes: usize,
    /// Crashes with distinct signatures.
    pub distinct_crashes: usize,
    pub activities: BTreeSet<String>,
    pub states: usize,
    pub actions_by_variant: BTreeMap<String, usize>,
    pub intents_by_component: BTreeMap<String, usize>,
    pub objectives: Vec<ObjectiveSummary>,
    pub best_value_curve: Vec<CurvePoint>,
}

impl RunReport {
    pub fn from_outcome(algorithm: &str, outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Episodes(outcome) => Self::from_search(algorithm, outcome),
            RunOutcome::Suites(outcome) => Self::from_search(algorithm, outcome),
        }
    }

    pub fn from_search<T: Candidate>(algorithm: &str, outcome: &SearchOutcome<T>) -> Self {
        let mut report = Self {
            algorithm: algorithm.to_string(),
            stop: outcome.stop,
            generations: outcome.generations,
            elapsed_secs: outcome.elapsed.as_secs_f64(),
            candidates: outcome.population.len(),
            archive_size: outcome.archive.len(),
            episodes: 0,
            total_actions: 0,
            crashes: 0,
            distinct_crashes: 0,
            activities: BTreeSet::new(),
            states: 0,
            actions_by_variant: BTreeMap::new(),
            intents_by_component: BTreeMap::new(),
            objectives: Vec::new(),
            best_value_curve: Vec::new(),
        };

        let mut signatures = BTreeSet::new();
        let mut states = BTreeSet::new();
        for chromosome in &outcome.population {
            for episode in chromosome.value().view().episodes() {
                report.episodes += 1;
                report.total_actions += episode.len();
                if let Some(crash) = episode.crash() {
                    report.crashes += 1;
                    signatures.insert(crash.signature());
                }
                report
                    .activities
                    .extend(episode.visited_activities().iter().cloned());
                states.extend(episode.visited_states().iter().cloned());
                for action in episode.actions() {
                    report.count_action(action);
                }
            }
        }
        report.distinct_crashes = signatures.len();
        report.states = states.len();

        report.objectives = outcome
            .objectives
            .iter()
            .enumerate()
            .map(|(i, name)| ObjectiveSummary {
                name: name.clone(),
                // population is best first
                best: outcome.fitness.first().and_then(|f| f.get(i)).copied(),
            })
            .collect();

        report.best_value_curve = outcome
            .history
            .iter()
            .filter_map(|h| {
                h.best_value.map(|best_value| CurvePoint {
                    generation: h.generation,
                    best_value,
                    covered_objectives: h.covered_objectives,
                })
            })
            .collect();
        report
    }

    fn count_action(&mut self, action: &Action) {
        *self
            .actions_by_variant
            .entry(action.variant_name().to_string())
            .or_default() += 1;
        if let Action::Intent(intent) = action {
            let component = match intent.component_type {
                ComponentType::Activity => "activity",
                ComponentType::Service => "service",
                ComponentType::BroadcastReceiver => "broadcast_receiver",
            };
            *self
                .intents_by_component
                .entry(component.to_string())
                .or_default() += 1;
        }
    }

    /// Crashing episodes per thousand actions.
    pub fn crash_rate_per_k_actions(&self) -> f64 {
        if self.total_actions == 0 {
            0.0
        } else {
            self.crashes as f64 / self.total_actions as f64 * 1000.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gauntlet_explore::GenerationSummary;
    use gauntlet_model::sim::sample_app;
    use gauntlet_model::{
        Chromosome, Episode, IntentAction, PrimitiveAction, PrimitiveKind, Widget, WidgetAction,
    };

    fn row(id: &str, text: &str, index: u32) -> Widget {
        Widget::button(id, text, (0, index * 200, 1080, index * 200 + 150))
    }

    fn outcome(episodes: Vec<Episode>) -> SearchOutcome<Episode> {
        SearchOutcome {
            population: episodes.into_iter().map(Chromosome::new).collect(),
            fitness: vec![vec![3.0]],
            archive: Vec::new(),
            objectives: vec!["number_of_activities".into()],
            generations: 2,
            stop: StopCause::ConditionMet,
            history: vec![
                GenerationSummary {
                    generation: 0,
                    population: 1,
                    best_value: Some(1.0),
                    covered_objectives: 0,
                    purged_entries: 0,
                },
                GenerationSummary {
                    generation: 1,
                    population: 1,
                    best_value: Some(3.0),
                    covered_objectives: 0,
                    purged_entries: 4,
                },
            ],
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_counts_actions_by_variant() {
        let mut app = sample_app();
        let mut episode = Episode::new();
        episode.begin(&mut app).unwrap();
        episode
            .apply_action(&mut app, WidgetAction::click(row("list_btn", "Notes", 1)))
            .unwrap();
        episode
            .apply_action(
                &mut app,
                Action::Primitive(PrimitiveAction::new(PrimitiveKind::Back, 0, 0)),
            )
            .unwrap();
        episode
            .apply_action(
                &mut app,
                Action::Intent(IntentAction {
                    component: "AboutActivity".into(),
                    component_type: ComponentType::Activity,
                    action: "android.intent.action.VIEW".into(),
                    data_uri: None,
                }),
            )
            .unwrap();
        episode.finish();

        let report = RunReport::from_search("nsga2", &outcome(vec![episode]));
        assert_eq!(report.total_actions, 3);
        assert_eq!(report.actions_by_variant["widget"], 1);
        assert_eq!(report.actions_by_variant["primitive"], 1);
        assert_eq!(report.intents_by_component["activity"], 1);
        assert!(report.activities.contains("AboutActivity"));
        assert_eq!(report.crashes, 0);
    }

    #[test]
    fn test_crashes_and_signatures() {
        let mut app = sample_app();
        let mut episodes = Vec::new();
        for _ in 0..2 {
            let mut episode = Episode::new();
            episode.begin(&mut app).unwrap();
            episode
                .apply_action(&mut app, WidgetAction::click(row("crash_btn", "Sync", 2)))
                .unwrap();
            episode.finish();
            episodes.push(episode);
        }
        let report = RunReport::from_search("standard_ga", &outcome(episodes));
        assert_eq!(report.crashes, 2);
        assert_eq!(report.distinct_crashes, 1);
        assert_eq!(report.crash_rate_per_k_actions(), 1000.0);
    }

    #[test]
    fn test_curve_and_objectives() {
        let report = RunReport::from_search("one_plus_one", &outcome(Vec::new()));
        assert_eq!(report.best_value_curve.len(), 2);
        assert_eq!(report.best_value_curve[1].best_value, 3.0);
        assert_eq!(report.objectives[0].best, Some(3.0));
        assert_eq!(report.elapsed_secs, 1.5);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stop"], "condition_met");
        assert_eq!(json["algorithm"], "one_plus_one");
    }
}
