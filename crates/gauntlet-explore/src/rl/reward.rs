//! Intermediate reward from an observed screen transition.

use std::collections::HashSet;

use gauntlet_model::ScreenState;

/// Widgets of `pre` whose semantic trait no longer appears in `post`.
pub fn state_difference(pre: &ScreenState, post: &ScreenState) -> usize {
    let remaining: HashSet<_> = post.widgets.iter().map(|w| w.trait_key()).collect();
    pre.widgets
        .iter()
        .filter(|w| !remaining.contains(&w.trait_key()))
        .count()
}

/// Attribute changes summed over widgets present in both states.
pub fn widget_difference(pre: &ScreenState, post: &ScreenState) -> usize {
    pre.widgets
        .iter()
        .filter_map(|old| {
            post.widgets
                .iter()
                .find(|new| new.trait_key() == old.trait_key())
                .map(|new| old.attribute_difference(new))
        })
        .sum()
}

/// Structural plus attribute change, normalised by the post-state size.
///
/// An empty post-state yields the raw difference.
pub fn intermediate_reward(pre: &ScreenState, post: &ScreenState) -> f64 {
    let difference = (state_difference(pre, post) + widget_difference(pre, post)) as f64;
    match post.widget_count() {
        0 => difference,
        count => difference / count as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_model::sim::screen;
    use gauntlet_model::Widget;

    fn button(id: &str) -> Widget {
        Widget::button(id, id, (0, 0, 100, 100))
    }

    #[test]
    fn test_same_screen_has_no_reward() {
        let a = screen("a", "Main", "pkg", vec![button("x"), button("y")]);
        assert_eq!(intermediate_reward(&a, &a), 0.0);
    }

    #[test]
    fn test_disappeared_widgets_count() {
        let pre = screen("a", "Main", "pkg", vec![button("x"), button("y")]);
        let post = screen("b", "Main", "pkg", vec![button("y"), button("z")]);
        assert_eq!(state_difference(&pre, &post), 1);
        assert_eq!(intermediate_reward(&pre, &post), 0.5);
    }

    #[test]
    fn test_attribute_changes_count() {
        let pre = screen("a", "Main", "pkg", vec![button("x")]);
        let mut toggled = button("x");
        toggled.checked = true;
        toggled.text = "on".into();
        let post = screen("b", "Main", "pkg", vec![toggled]);
        assert_eq!(widget_difference(&pre, &post), 2);
        assert_eq!(intermediate_reward(&pre, &post), 2.0);
    }

    #[test]
    fn test_empty_post_state_uses_raw_difference() {
        let pre = screen("a", "Main", "pkg", vec![button("x"), button("y")]);
        let post = screen("b", "Main", "pkg", Vec::new());
        assert_eq!(intermediate_reward(&pre, &post), 2.0);
    }
}
