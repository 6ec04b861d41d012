use gauntlet_model::sim::{sample_app, SimulatedApp};
use gauntlet_model::{
    Action, ActionResult, Candidate, Episode, EpisodeError, PrimitiveAction, PrimitiveKind,
    ScreenStateProvider, StateId, StateReach, TestSuite, Widget, WidgetAction,
};

fn click_action(app: &mut SimulatedApp, widget: &str) -> Action {
    app.current_state()
        .actions
        .into_iter()
        .find(|a| matches!(a, Action::Widget(w) if w.widget.id == widget))
        .unwrap_or_else(|| panic!("no widget {widget} on screen"))
}

fn step(app: &mut SimulatedApp, episode: &mut Episode, widget: &str) -> ActionResult {
    let action = click_action(app, widget);
    episode.apply_action(app, action).unwrap()
}

#[test]
fn test_begin_records_initial_state() {
    let mut app = sample_app();
    let mut episode = Episode::new();
    episode.begin(&mut app).unwrap();

    assert!(episode.is_empty());
    assert_eq!(episode.activity_sequence(), ["MainActivity"]);
    assert!(episode.visited_states().contains(&StateId::new("home")));
    assert_eq!(
        episode.states_map().get(&StateId::new("home")),
        Some(&StateReach::Initial)
    );
}

#[test]
fn test_apply_action_tracks_visits() {
    let mut app = sample_app();
    let mut episode = Episode::new();
    episode.begin(&mut app).unwrap();

    assert_eq!(step(&mut app, &mut episode, "settings_btn"), ActionResult::SuccessNewState);
    assert_eq!(step(&mut app, &mut episode, "dark_mode"), ActionResult::SuccessNewState);
    assert_eq!(step(&mut app, &mut episode, "settings_back"), ActionResult::Success);

    assert_eq!(episode.len(), 3);
    assert_eq!(
        episode.activity_sequence(),
        ["MainActivity", "SettingsActivity", "SettingsActivity", "MainActivity"]
    );
    assert_eq!(episode.activity_before_action(1), Some("SettingsActivity"));
    assert_eq!(episode.activity_after_action(2), Some("MainActivity"));
    assert_eq!(episode.visited_activities().len(), 2);
    assert_eq!(episode.visited_states().len(), 3);
    assert_eq!(
        episode.states_map().get(&StateId::new("settings_on")),
        Some(&StateReach::Action(1))
    );
    // home was reached first before any action
    assert_eq!(
        episode.states_map().get(&StateId::new("home")),
        Some(&StateReach::Initial)
    );
}

#[test]
fn test_crash_is_recorded_and_stops() {
    let mut app = sample_app();
    let mut episode = Episode::new();
    episode.begin(&mut app).unwrap();

    let result = step(&mut app, &mut episode, "crash_btn");
    assert_eq!(result, ActionResult::FailureCrash);
    assert!(!result.should_continue());
    assert_eq!(episode.len(), 1);

    let crash = episode.crash().unwrap();
    assert_eq!(crash.action_index, 0);
    assert_eq!(crash.activity, "MainActivity");
    assert_eq!(crash.signature(), "java.lang.NullPointerException: sync token");
}

#[test]
fn test_crash_flag_is_sticky_first_wins() {
    let mut app = sample_app();
    let mut episode = Episode::new();
    episode.begin(&mut app).unwrap();

    step(&mut app, &mut episode, "crash_btn");
    step(&mut app, &mut episode, "list_btn");
    step(&mut app, &mut episode, "note_item");
    step(&mut app, &mut episode, "delete_btn");

    let crash = episode.crash().unwrap();
    assert_eq!(crash.action_index, 0);
    assert!(episode.has_crashed());
}

#[test]
fn test_outbound_does_not_count_as_visit() {
    let mut app = sample_app();
    let mut episode = Episode::new();
    episode.begin(&mut app).unwrap();

    let result = step(&mut app, &mut episode, "share_btn");
    assert_eq!(result, ActionResult::SuccessOutbound);
    assert!(!result.should_continue());
    assert!(!episode.visited_activities().contains("BrowserActivity"));
    assert_eq!(episode.activity_sequence().last().unwrap(), "BrowserActivity");
}

#[test]
fn test_non_applicable_widget_action_is_rejected() {
    let mut app = sample_app();
    let mut episode = Episode::new();
    episode.begin(&mut app).unwrap();

    let stray = WidgetAction::click(Widget::button("ghost", "Ghost", (0, 0, 1, 1)));
    let err = episode.apply_action(&mut app, stray).unwrap_err();
    assert!(matches!(err, EpisodeError::NotApplicable { .. }));
    assert!(episode.is_empty());
    assert_eq!(app.stats().executed, 0);
}

#[test]
fn test_finished_episode_is_read_only() {
    let mut app = sample_app();
    let mut episode = Episode::new();
    episode.begin(&mut app).unwrap();
    step(&mut app, &mut episode, "list_btn");
    episode.finish();
    episode.finish();

    assert!(episode.is_finished());
    let back = Action::Primitive(PrimitiveAction::new(PrimitiveKind::Back, 0, 0));
    assert!(matches!(
        episode.apply_action(&mut app, back),
        Err(EpisodeError::Finished(_))
    ));
    assert!(matches!(episode.begin(&mut app), Err(EpisodeError::Finished(_))));
    assert_eq!(episode.len(), 1);
}

#[test]
fn test_suite_aggregates_members() {
    let mut app = sample_app();
    let mut suite = TestSuite::new();

    for widget in ["settings_btn", "crash_btn"] {
        app.reset_app();
        let mut episode = Episode::new();
        episode.begin(&mut app).unwrap();
        step(&mut app, &mut episode, widget);
        episode.finish();
        suite.push(episode);
    }

    assert_eq!(suite.len(), 2);
    assert!(Candidate::is_finished(&suite));
    assert_eq!(suite.total_actions(), 2);
    assert_eq!(suite.crash_count(), 1);
    assert_eq!(
        suite.visited_activities().into_iter().collect::<Vec<_>>(),
        vec!["MainActivity", "SettingsActivity"]
    );
}
