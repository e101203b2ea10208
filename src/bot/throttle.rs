use crate::bot::catalog::Trigger;
use crate::bot::state::ConversationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Refuse,
}

/// Caps how many times in a row one clip is sent to the same conversation.
#[derive(Debug, Clone, Copy)]
pub struct ThrottlePolicy {
    limit: u32,
}

impl ThrottlePolicy {
    /// `limit` is the largest allowed streak; values below 1 are raised to 1.
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Decide on a state that already includes the current request.
    pub fn evaluate(&self, updated: &ConversationState) -> Decision {
        decide_count(updated.repeat_count, self.limit)
    }
}

/// Refuse when the prospective streak for `trigger` would exceed `limit`.
pub fn decide(state: &ConversationState, trigger: &Trigger, limit: u32) -> Decision {
    decide_count(state.advance(trigger).repeat_count, limit)
}

fn decide_count(count: u32, limit: u32) -> Decision {
    if count > limit {
        Decision::Refuse
    } else {
        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_always_allowed() {
        let hi = Trigger::new("hi");
        for limit in 1..5 {
            assert_eq!(decide(&ConversationState::default(), &hi, limit), Decision::Allow);
        }
    }

    #[test]
    fn test_uses_prospective_count() {
        let hi = Trigger::new("hi");
        let mut state = ConversationState::default();
        let mut decisions = Vec::new();
        for _ in 0..5 {
            decisions.push(decide(&state, &hi, 3));
            state = state.advance(&hi);
        }
        assert_eq!(
            decisions,
            vec![
                Decision::Allow,
                Decision::Allow,
                Decision::Allow,
                Decision::Refuse,
                Decision::Refuse
            ]
        );
    }

    #[test]
    fn test_different_trigger_is_allowed_after_streak() {
        let hi = Trigger::new("hi");
        let bye = Trigger::new("bye");
        let state = ConversationState {
            last_trigger: Some(hi),
            repeat_count: 10,
        };
        assert_eq!(decide(&state, &bye, 3), Decision::Allow);
    }

    #[test]
    fn test_evaluate_matches_decide() {
        let policy = ThrottlePolicy::new(2);
        let hi = Trigger::new("hi");
        let bye = Trigger::new("bye");
        let mut state = ConversationState::default();
        for trigger in [&hi, &hi, &hi, &bye, &hi, &hi, &hi] {
            let before = decide(&state, trigger, policy.limit());
            state = state.advance(trigger);
            assert_eq!(before, policy.evaluate(&state));
        }
    }

    #[test]
    fn test_zero_limit_clamped() {
        assert_eq!(ThrottlePolicy::new(0).limit(), 1);
    }
}
