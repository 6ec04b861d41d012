//! A deterministic scripted app used to drive searches without a device.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::trace;

use crate::action::{Action, ActionResult, PrimitiveKind, WidgetAction};
use crate::device::{ActionExecutor, ExecutionError, ScreenStateProvider};
use crate::state::{ScreenState, StateId, Widget};
use crate::ComponentType;

/// What happens when an action fires in a given state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Goto(StateId),
    /// Leave the app for a screen of another package.
    Outbound(StateId),
    /// Crash with the given stack trace; the app restarts at its initial state.
    Crash(String),
    /// The device fails to deliver the action.
    Fail(String),
}

/// Counters describing how the app was driven.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    pub executed: u64,
    pub resets: u64,
    pub launches: u64,
    pub crashes: u64,
    pub released: bool,
}

/// Build a screen whose executable actions are clicks on its clickable widgets.
pub fn screen(id: &str, activity: &str, package: &str, widgets: Vec<Widget>) -> ScreenState {
    let actions = widgets
        .iter()
        .filter(|w| w.clickable && w.enabled)
        .map(|w| WidgetAction::click(w.clone()))
        .collect();
    ScreenState {
        id: StateId::new(id),
        activity: activity.to_string(),
        package: package.to_string(),
        actions,
        widgets,
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedApp {
    package: String,
    screens: BTreeMap<StateId, ScreenState>,
    initial: StateId,
    current: StateId,
    transitions: HashMap<(StateId, Action), Transition>,
    back_edges: HashMap<StateId, StateId>,
    launchable: BTreeMap<String, StateId>,
    seen: HashSet<StateId>,
    stats: SimStats,
}

impl SimulatedApp {
    pub fn new(initial: ScreenState) -> Self {
        let package = initial.package.clone();
        let id = initial.id.clone();
        let mut screens = BTreeMap::new();
        screens.insert(id.clone(), initial);
        Self {
            package,
            screens,
            initial: id.clone(),
            current: id.clone(),
            transitions: HashMap::new(),
            back_edges: HashMap::new(),
            launchable: BTreeMap::new(),
            seen: HashSet::from([id]),
            stats: SimStats::default(),
        }
    }

    pub fn add_screen(&mut self, screen: ScreenState) -> &mut Self {
        self.screens.insert(screen.id.clone(), screen);
        self
    }

    /// Script the effect of clicking widget `widget_id` in state `from`.
    pub fn on_click(&mut self, from: &str, widget_id: &str, transition: Transition) -> &mut Self {
        let from = StateId::new(from);
        let action = self.screens.get(&from).and_then(|s| {
            s.widgets
                .iter()
                .find(|w| w.id == widget_id)
                .map(|w| WidgetAction::click(w.clone()))
        });
        if let Some(action) = action {
            self.transitions.insert((from, action), transition);
        }
        self
    }

    pub fn on_back(&mut self, from: &str, to: &str) -> &mut Self {
        self.back_edges.insert(StateId::new(from), StateId::new(to));
        self
    }

    pub fn launchable(&mut self, activity: &str, state: &str) -> &mut Self {
        self.launchable
            .insert(activity.to_string(), StateId::new(state));
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn current_id(&self) -> &StateId {
        &self.current
    }

    fn apply(&mut self, transition: Option<Transition>) -> Result<ActionResult, ExecutionError> {
        match transition {
            None => Ok(ActionResult::Success),
            Some(Transition::Goto(next)) => {
                self.current = next.clone();
                if self.seen.insert(next) {
                    Ok(ActionResult::SuccessNewState)
                } else {
                    Ok(ActionResult::Success)
                }
            }
            Some(Transition::Outbound(next)) => {
                self.current = next;
                Ok(ActionResult::SuccessOutbound)
            }
            Some(Transition::Crash(stack_trace)) => {
                self.stats.crashes += 1;
                self.current = self.initial.clone();
                Err(ExecutionError::Crash {
                    stack_trace: Some(stack_trace),
                })
            }
            Some(Transition::Fail(reason)) => Err(ExecutionError::Device(reason)),
        }
    }

    fn widget_at(&self, x: u32, y: u32) -> Option<Action> {
        let screen = self.screens.get(&self.current)?;
        screen
            .widgets
            .iter()
            .find(|w| w.clickable && w.enabled && w.bounds.contains(x, y))
            .map(|w| WidgetAction::click(w.clone()))
    }
}

impl ActionExecutor for SimulatedApp {
    fn execute(&mut self, action: &Action) -> Result<ActionResult, ExecutionError> {
        self.stats.executed += 1;
        trace!(state = %self.current, %action, "sim execute");

        let transition = match action {
            Action::Widget(_) => {
                let listed = self
                    .screens
                    .get(&self.current)
                    .is_some_and(|s| s.actions.contains(action));
                if !listed {
                    return Err(ExecutionError::Device(format!(
                        "widget not on screen {}",
                        self.current
                    )));
                }
                self.transitions
                    .get(&(self.current.clone(), action.clone()))
                    .cloned()
            }
            Action::Primitive(primitive) => match primitive.kind {
                PrimitiveKind::Back => self
                    .back_edges
                    .get(&self.current)
                    .cloned()
                    .map(Transition::Goto),
                PrimitiveKind::Click | PrimitiveKind::LongClick => self
                    .widget_at(primitive.x, primitive.y)
                    .and_then(|hit| self.transitions.get(&(self.current.clone(), hit)).cloned()),
                _ => None,
            },
            Action::Intent(intent) => match intent.component_type {
                ComponentType::Activity => self
                    .launchable
                    .get(&intent.component)
                    .cloned()
                    .map(Transition::Goto),
                ComponentType::Service | ComponentType::BroadcastReceiver => None,
            },
            Action::System(_) => None,
        };

        self.apply(transition)
    }
}

impl ScreenStateProvider for SimulatedApp {
    fn current_state(&mut self) -> ScreenState {
        match self.screens.get(&self.current) {
            Some(screen) => screen.clone(),
            None => ScreenState {
                id: self.current.clone(),
                activity: String::new(),
                package: self.package.clone(),
                actions: Vec::new(),
                widgets: Vec::new(),
            },
        }
    }

    fn reset_app(&mut self) {
        self.stats.resets += 1;
        self.current = self.initial.clone();
    }

    fn launch_activity(&mut self, activity: &str) -> bool {
        self.stats.launches += 1;
        match self.launchable.get(activity) {
            Some(state) => {
                self.current = state.clone();
                self.seen.insert(state.clone());
                true
            }
            None => false,
        }
    }

    fn release(&mut self) {
        self.stats.released = true;
    }
}

fn row(id: &str, text: &str, index: u32) -> Widget {
    Widget::button(id, text, (0, index * 200, 1080, index * 200 + 150))
}

/// A small note-taking app with five activities, one outbound link,
/// and two crashes.
///
/// `MainActivity` (states `home`, `list`) links to `SettingsActivity`
/// (`settings`, `settings_on`) and `DetailActivity` (`detail`).
/// `AboutActivity` is only reachable by launching it directly.
pub fn sample_app() -> SimulatedApp {
    const PKG: &str = "com.example.notes";

    let home = screen(
        "home",
        "MainActivity",
        PKG,
        vec![
            row("settings_btn", "Settings", 0),
            row("list_btn", "Notes", 1),
            row("crash_btn", "Sync", 2),
            row("share_btn", "Share", 3),
        ],
    );
    let mut toggle = row("dark_mode", "Dark mode", 0);
    toggle.class = "android.widget.CheckBox".into();
    let mut toggle_on = toggle.clone();
    toggle_on.checked = true;
    let settings = screen(
        "settings",
        "SettingsActivity",
        PKG,
        vec![toggle, row("settings_back", "Back", 1)],
    );
    let settings_on = screen(
        "settings_on",
        "SettingsActivity",
        PKG,
        vec![toggle_on, row("settings_back", "Back", 1)],
    );
    let list = screen(
        "list",
        "MainActivity",
        PKG,
        vec![row("note_item", "Groceries", 0), row("new_note", "New", 1)],
    );
    let detail = screen(
        "detail",
        "DetailActivity",
        PKG,
        vec![row("delete_btn", "Delete", 0), row("edit_btn", "Edit", 1)],
    );
    let mut version = Widget::new("version", "android.widget.TextView");
    version.text = "1.0".into();
    let about = screen(
        "about",
        "AboutActivity",
        PKG,
        vec![version, row("about_close", "Close", 1)],
    );
    let browser = screen(
        "browser",
        "BrowserActivity",
        "com.android.browser",
        vec![row("url_bar", "https://example.com", 0)],
    );

    let mut app = SimulatedApp::new(home);
    app.add_screen(settings)
        .add_screen(settings_on)
        .add_screen(list)
        .add_screen(detail)
        .add_screen(about)
        .add_screen(browser);

    app.on_click("home", "settings_btn", Transition::Goto(StateId::new("settings")))
        .on_click("home", "list_btn", Transition::Goto(StateId::new("list")))
        .on_click(
            "home",
            "crash_btn",
            Transition::Crash(
                "java.lang.NullPointerException: sync token\n\tat MainActivity.onSync".into(),
            ),
        )
        .on_click("home", "share_btn", Transition::Outbound(StateId::new("browser")))
        .on_click("settings", "dark_mode", Transition::Goto(StateId::new("settings_on")))
        .on_click("settings_on", "dark_mode", Transition::Goto(StateId::new("settings")))
        .on_click("settings", "settings_back", Transition::Goto(StateId::new("home")))
        .on_click("settings_on", "settings_back", Transition::Goto(StateId::new("home")))
        .on_click("list", "note_item", Transition::Goto(StateId::new("detail")))
        .on_click(
            "detail",
            "delete_btn",
            Transition::Crash(
                "java.lang.IllegalStateException: note already deleted\n\tat DetailActivity.onDelete"
                    .into(),
            ),
        )
        .on_click("about", "about_close", Transition::Goto(StateId::new("home")));

    app.on_back("settings", "home")
        .on_back("settings_on", "home")
        .on_back("list", "home")
        .on_back("detail", "list")
        .on_back("about", "home");

    app.launchable("MainActivity", "home")
        .launchable("SettingsActivity", "settings")
        .launchable("AboutActivity", "about");

    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::PrimitiveAction;

    fn click(app: &mut SimulatedApp, widget: &str) -> Result<ActionResult, ExecutionError> {
        let state = app.current_state();
        let action = state
            .actions
            .iter()
            .find(|a| matches!(a, Action::Widget(w) if w.widget.id == widget))
            .cloned()
            .unwrap();
        app.execute(&action)
    }

    #[test]
    fn test_new_state_reported_once() {
        let mut app = sample_app();
        assert_eq!(click(&mut app, "settings_btn").unwrap(), ActionResult::SuccessNewState);
        assert_eq!(click(&mut app, "settings_back").unwrap(), ActionResult::Success);
        assert_eq!(click(&mut app, "settings_btn").unwrap(), ActionResult::Success);
    }

    #[test]
    fn test_crash_restarts_app() {
        let mut app = sample_app();
        click(&mut app, "settings_btn").unwrap();
        click(&mut app, "settings_back").unwrap();
        let err = click(&mut app, "crash_btn").unwrap_err();
        assert!(matches!(err, ExecutionError::Crash { stack_trace: Some(_) }));
        assert_eq!(app.current_id().as_str(), "home");
        assert_eq!(app.stats().crashes, 1);
    }

    #[test]
    fn test_primitive_click_hits_widget() {
        let mut app = sample_app();
        let tap = Action::Primitive(PrimitiveAction::new(PrimitiveKind::Click, 500, 250));
        assert_eq!(app.execute(&tap).unwrap(), ActionResult::SuccessNewState);
        assert_eq!(app.current_id().as_str(), "list");

        let back = Action::Primitive(PrimitiveAction::new(PrimitiveKind::Back, 0, 0));
        app.execute(&back).unwrap();
        assert_eq!(app.current_id().as_str(), "home");
    }

    #[test]
    fn test_launch_only_launchable_activities() {
        let mut app = sample_app();
        assert!(app.launch_activity("AboutActivity"));
        assert_eq!(app.current_state().activity, "AboutActivity");
        assert!(!app.launch_activity("DetailActivity"));
        assert_eq!(app.stats().launches, 2);
    }

    #[test]
    fn test_outbound_leaves_package() {
        let mut app = sample_app();
        assert_eq!(click(&mut app, "share_btn").unwrap(), ActionResult::SuccessOutbound);
        assert_ne!(app.current_state().package, app.package());
    }
}
