use std::sync::atomic::Ordering;

use gauntlet_core::{Campaign, CampaignError, StopReason};
use gauntlet_explore::fitness::{NoOracle, ScriptedOracle};
use gauntlet_explore::RunOutcome;
use gauntlet_model::sim::sample_app;

fn nsga2_oracle() -> ScriptedOracle {
    ScriptedOracle::new().with_branch("MainActivity.onCreate#3", &["home", "list", "detail"])
}

#[test]
fn test_nsga2_suite_campaign_from_fixture() {
    let json = include_str!("../../gauntlet-config/tests/fixtures/nsga2_suite.json");
    let campaign = Campaign::from_json(json).unwrap();
    let mut app = sample_app();
    let mut oracle = nsga2_oracle();

    let result = campaign.run(&mut app, &mut oracle).unwrap();
    assert_eq!(result.stop_reason, StopReason::Complete);
    assert_eq!(result.report.algorithm, "nsga2");
    assert_eq!(result.report.generations, 25);
    assert_eq!(result.report.candidates, 6);
    assert_eq!(result.report.episodes, 18);
    assert_eq!(result.report.objectives.len(), 4);
    match &result.outcome {
        RunOutcome::Suites(outcome) => {
            for suite in &outcome.population {
                assert_eq!(suite.value().len(), 3);
            }
        }
        RunOutcome::Episodes(_) => panic!("suite factory produced episodes"),
    }
    assert!(app.stats().released);
    assert_eq!(
        oracle.recorded_episodes().len() as u64,
        app.stats().resets
    );
}

#[test]
fn test_activity_insulated_campaign_drains_queue() {
    let json = include_str!("../../gauntlet-config/tests/fixtures/aimdroid.json");
    let campaign = Campaign::from_json(json).unwrap();
    let mut app = sample_app();
    let mut oracle = NoOracle;

    let result = campaign.run(&mut app, &mut oracle).unwrap();
    assert_eq!(result.stop_reason, StopReason::WorkDrained);
    assert!(result.report.activities.contains("MainActivity"));
    assert!(result.report.activities.contains("AboutActivity"));
    assert!(result.report.activities.contains("SettingsActivity"));
    assert!(app.stats().launches >= 3);
    assert!(app.stats().released);
}

#[test]
fn test_same_seed_same_report() {
    let json = r#"{
        "algorithm": "standard_ga",
        "fitness_functions": ["number_of_states", "test_length"],
        "crossover": "test_case_merge",
        "mutation": "cut_point",
        "termination": { "kind": "iterations", "iterations": 4 },
        "max_actions": 12,
        "seed": 1234
    }"#;
    let run = || {
        let campaign = Campaign::from_json(json).unwrap();
        let mut app = sample_app();
        let result = campaign.run(&mut app, &mut NoOracle).unwrap();
        (
            result.report.total_actions,
            result.report.actions_by_variant,
            result.report.states,
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn test_search_error_still_releases_device() {
    // the scripted oracle does not know this branch
    let json = r#"{
        "algorithm": "one_plus_one",
        "fitness_functions": ["branch_distance:Unknown#1"],
        "mutation": "cut_point",
        "termination": { "kind": "iterations", "iterations": 2 }
    }"#;
    let campaign = Campaign::from_json(json).unwrap();
    let mut app = sample_app();
    let err = campaign
        .run(&mut app, &mut ScriptedOracle::new())
        .unwrap_err();
    assert!(matches!(err, CampaignError::Search(_)));
    assert!(app.stats().released);
}

#[test]
fn test_cancel_handle_aborts() {
    let json = r#"{
        "algorithm": "q_learning",
        "termination": { "kind": "never" }
    }"#;
    let campaign = Campaign::from_json(json).unwrap();
    let handle = campaign.cancel_handle();

    let worker = std::thread::spawn(move || {
        let mut app = sample_app();
        campaign.run(&mut app, &mut NoOracle).map(|r| r.stop_reason)
    });
    std::thread::sleep(std::time::Duration::from_millis(50));
    handle.store(true, Ordering::SeqCst);
    let stop = worker.join().unwrap().unwrap();
    assert_eq!(stop, StopReason::UserAborted);
}

#[tokio::test]
async fn test_timeout_returns_partial_results() {
    let json = r#"{
        "algorithm": "nsga2",
        "fitness_functions": ["number_of_activities", "number_of_crashes"],
        "crossover": "test_case_merge",
        "mutation": "cut_point",
        "termination": { "kind": "never" },
        "timeout_secs": 1
    }"#;
    let campaign = Campaign::from_json(json).unwrap();
    let timed = campaign
        .run_with_timeout(sample_app(), NoOracle)
        .await
        .unwrap();

    assert_eq!(timed.result.stop_reason, StopReason::WallTimeExceeded);
    assert!(timed.result.report.candidates <= 4);
    assert!(timed.device.stats().released);
}

#[tokio::test]
async fn test_timed_run_that_finishes_in_time() {
    let json = r#"{
        "algorithm": "random_search",
        "fitness_functions": ["number_of_activities"],
        "termination": { "kind": "iterations", "iterations": 3 },
        "timeout_secs": 60
    }"#;
    let campaign = Campaign::from_json(json).unwrap();
    let timed = campaign
        .run_with_timeout(sample_app(), NoOracle)
        .await
        .unwrap();
    assert_eq!(timed.result.stop_reason, StopReason::Complete);
    assert_eq!(timed.result.report.generations, 3);
    assert!(timed.device.stats().released);
}
