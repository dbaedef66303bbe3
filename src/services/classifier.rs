//! Transition classification
//!
//! Maps (previous zone, new zone) to the transition it represents, if any.
//! Staying in the same zone or staying outside is not a transition.

use crate::domain::types::{Transition, ZoneId};

/// Classify a zone change. Total and deterministic.
pub fn classify(previous: Option<&ZoneId>, next: Option<&ZoneId>) -> Option<Transition> {
    match (previous, next) {
        (None, None) => None,
        (None, Some(to)) => Some(Transition::Enter { to: to.clone() }),
        (Some(from), None) => Some(Transition::Exit { from: from.clone() }),
        (Some(from), Some(to)) if from == to => None,
        (Some(from), Some(to)) => Some(Transition::Change { from: from.clone(), to: to.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TransitionKind;

    fn id(s: &str) -> ZoneId {
        ZoneId::from(s)
    }

    #[test]
    fn test_outside_to_zone_is_enter() {
        let t = classify(None, Some(&id("a"))).unwrap();
        assert_eq!(t, Transition::Enter { to: id("a") });
        assert_eq!(t.kind(), TransitionKind::Enter);
    }

    #[test]
    fn test_zone_to_outside_is_exit() {
        assert_eq!(classify(Some(&id("a")), None), Some(Transition::Exit { from: id("a") }));
    }

    #[test]
    fn test_zone_to_other_zone_is_change() {
        assert_eq!(
            classify(Some(&id("a")), Some(&id("b"))),
            Some(Transition::Change { from: id("a"), to: id("b") })
        );
    }

    #[test]
    fn test_no_transition_cases() {
        assert_eq!(classify(None, None), None);
        assert_eq!(classify(Some(&id("a")), Some(&id("a"))), None);
    }
}
