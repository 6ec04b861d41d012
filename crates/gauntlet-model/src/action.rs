use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::Widget;

/// One step a test case can take against the app under test.
///
/// Actions are immutable values compared structurally; an episode owns
/// its actions and nothing points back at the episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Action {
    Widget(WidgetAction),
    Primitive(PrimitiveAction),
    Intent(IntentAction),
    System(SystemAction),
}

impl Action {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Widget(_) => "widget",
            Self::Primitive(_) => "primitive",
            Self::Intent(_) => "intent",
            Self::System(_) => "system",
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Widget(a) => write!(f, "{:?}({})", a.kind, a.widget.id),
            Self::Primitive(a) => write!(f, "{:?}@({},{})", a.kind, a.x, a.y),
            Self::Intent(a) => write!(f, "intent {} -> {}", a.action, a.component),
            Self::System(a) => write!(f, "system {} -> {}", a.event, a.receiver),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetActionKind {
    Click,
    LongClick,
    TypeText,
    ClearText,
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,
}

/// An action bound to a described UI element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetAction {
    pub kind: WidgetActionKind,
    pub widget: Widget,
}

impl WidgetAction {
    pub fn new(kind: WidgetActionKind, widget: Widget) -> Self {
        Self { kind, widget }
    }

    pub fn click(widget: Widget) -> Action {
        Action::Widget(Self::new(WidgetActionKind::Click, widget))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Click,
    LongClick,
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,
    Back,
    Menu,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        Self::Click,
        Self::LongClick,
        Self::SwipeUp,
        Self::SwipeDown,
        Self::SwipeLeft,
        Self::SwipeRight,
        Self::Back,
        Self::Menu,
    ];
}

/// A coordinate or key event that does not depend on the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimitiveAction {
    pub kind: PrimitiveKind,
    pub x: u32,
    pub y: u32,
}

impl PrimitiveAction {
    pub fn new(kind: PrimitiveKind, x: u32, y: u32) -> Self {
        Self { kind, x, y }
    }

    /// Sample a primitive event uniformly within the given screen size.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, width: u32, height: u32) -> Self {
        let kind = PrimitiveKind::ALL[rng.gen_range(0..PrimitiveKind::ALL.len())];
        let x = rng.gen_range(0..width.max(1));
        let y = rng.gen_range(0..height.max(1));
        Self { kind, x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Activity,
    Service,
    BroadcastReceiver,
}

/// Invocation of an app component through the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentAction {
    pub component: String,
    pub component_type: ComponentType,
    pub action: String,
    pub data_uri: Option<String>,
}

/// A simulated system event delivered to a receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemAction {
    pub receiver: String,
    pub event: String,
}

/// Outcome of executing a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    Success,
    SuccessNewState,
    /// The app left its own package boundary.
    SuccessOutbound,
    FailureCrash,
    FailureUnknown,
}

impl ActionResult {
    /// Whether an episode may keep going after this outcome.
    pub fn should_continue(self) -> bool {
        matches!(self, Self::Success | Self::SuccessNewState)
    }

    pub fn is_crash(self) -> bool {
        self == Self::FailureCrash
    }
}
