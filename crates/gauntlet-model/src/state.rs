use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Opaque identity of an abstract screen state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub String);

impl StateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Screen rectangle of a widget, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Bounds {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// A UI element as reported by the screen state provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub class: String,
    pub resource_id: String,
    pub text: String,
    pub enabled: bool,
    pub checked: bool,
    pub clickable: bool,
    pub bounds: Bounds,
}

/// Semantic identity of a widget, ignoring its mutable attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidgetTrait<'a> {
    pub class: &'a str,
    pub resource_id: &'a str,
}

impl Widget {
    pub fn new(id: impl Into<String>, class: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            resource_id: id.clone(),
            id,
            class: class.into(),
            text: String::new(),
            enabled: true,
            checked: false,
            clickable: false,
            bounds: Bounds::default(),
        }
    }

    /// A clickable button occupying `(left, top, right, bottom)`.
    pub fn button(id: &str, text: &str, bounds: (u32, u32, u32, u32)) -> Self {
        let mut widget = Self::new(id, "android.widget.Button");
        widget.text = text.to_string();
        widget.clickable = true;
        widget.bounds = Bounds {
            left: bounds.0,
            top: bounds.1,
            right: bounds.2,
            bottom: bounds.3,
        };
        widget
    }

    pub fn trait_key(&self) -> WidgetTrait<'_> {
        WidgetTrait {
            class: &self.class,
            resource_id: &self.resource_id,
        }
    }

    /// Number of observable attributes that differ from `other`.
    pub fn attribute_difference(&self, other: &Widget) -> usize {
        [
            self.text != other.text,
            self.enabled != other.enabled,
            self.checked != other.checked,
            self.clickable != other.clickable,
            self.bounds != other.bounds,
        ]
        .iter()
        .filter(|differs| **differs)
        .count()
    }
}

/// Abstract view of the screen after an action.
///
/// Produced by the [`ScreenStateProvider`](crate::device::ScreenStateProvider);
/// search code only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenState {
    pub id: StateId,
    pub activity: String,
    pub package: String,
    pub actions: Vec<Action>,
    pub widgets: Vec<Widget>,
}

impl ScreenState {
    /// Whether `action` may be executed from this state.
    ///
    /// Only widget actions are bound to a screen; the other variants are
    /// always accepted and the executor reports their outcome.
    pub fn can_execute(&self, action: &Action) -> bool {
        match action {
            Action::Widget(_) => self.actions.contains(action),
            Action::Primitive(_) | Action::Intent(_) | Action::System(_) => true,
        }
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }
}
