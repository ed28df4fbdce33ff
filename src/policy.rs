//! Just-in-time intervention policy
//!
//! Gates break prompts behind a cooldown and a two-consecutive-verdict rule.
//! The policy is cooling down while the last intervention is more recent than
//! `min_interval_sec`; otherwise it records the verdict and evaluates evidence.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::{DecisionReason, InterventionDecision};

/// Default minimum spacing between interventions (30 minutes)
pub const DEFAULT_MIN_INTERVAL_SEC: f64 = 30.0 * 60.0;

/// Number of consecutive fatigued verdicts required to intervene
pub const EVIDENCE_WINDOW: usize = 2;

/// Mutable state owned by one policy instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterventionState {
    /// When the last intervention fired; `None` means never
    pub last_intervention_time: Option<f64>,
    /// Most recent verdicts, oldest first
    pub recent_verdicts: VecDeque<bool>,
}

/// Cooldown plus consecutive-evidence gate for interventions.
///
/// Not synchronized: a single owner (the monitor loop) calls [`decide`](Self::decide).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionPolicy {
    min_interval_sec: f64,
    state: InterventionState,
}

impl Default for InterventionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL_SEC)
    }
}

impl InterventionPolicy {
    pub fn new(min_interval_sec: f64) -> Self {
        Self {
            min_interval_sec,
            state: InterventionState {
                last_intervention_time: None,
                recent_verdicts: VecDeque::with_capacity(EVIDENCE_WINDOW + 1),
            },
        }
    }

    /// Decide whether the latest verdict should trigger an intervention
    pub fn decide(&mut self, is_fatigued: bool, now: f64) -> InterventionDecision {
        if self.is_cooling_down(now) {
            return InterventionDecision::hold(DecisionReason::Cooldown);
        }

        self.state.recent_verdicts.push_back(is_fatigued);
        while self.state.recent_verdicts.len() > EVIDENCE_WINDOW {
            self.state.recent_verdicts.pop_front();
        }

        if self.state.recent_verdicts.len() == EVIDENCE_WINDOW
            && self.state.recent_verdicts.iter().all(|&v| v)
        {
            self.state.last_intervention_time = Some(now);
            return InterventionDecision::triggered();
        }

        InterventionDecision::hold(DecisionReason::NotEnoughEvidence)
    }

    /// Whether `now` falls inside the cooldown after the last intervention.
    ///
    /// A clock reading that went backwards or is NaN counts as cooling down, so
    /// the last intervention time never moves backwards.
    pub fn is_cooling_down(&self, now: f64) -> bool {
        match self.state.last_intervention_time {
            None => now.is_nan(),
            Some(last) => !(now - last >= self.min_interval_sec),
        }
    }

    pub fn min_interval_sec(&self) -> f64 {
        self.min_interval_sec
    }

    pub fn state(&self) -> &InterventionState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn reasons(policy: &mut InterventionPolicy, verdicts: &[bool]) -> Vec<DecisionReason> {
        verdicts
            .iter()
            .enumerate()
            .map(|(i, &v)| policy.decide(v, i as f64).reason)
            .collect()
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(InterventionPolicy::default().min_interval_sec(), 1800.0);
    }

    #[test]
    fn test_first_check_is_never_cooldown() {
        let mut policy = InterventionPolicy::default();
        let decision = policy.decide(true, 0.0);
        assert_eq!(decision.reason, DecisionReason::NotEnoughEvidence);
    }

    #[test]
    fn test_two_consecutive_rule() {
        let mut policy = InterventionPolicy::new(0.0);

        assert_eq!(
            policy.decide(false, 1.0),
            InterventionDecision::hold(DecisionReason::NotEnoughEvidence)
        );
        assert_eq!(
            policy.decide(true, 2.0),
            InterventionDecision::hold(DecisionReason::NotEnoughEvidence)
        );
        assert_eq!(policy.decide(true, 3.0), InterventionDecision::triggered());
    }

    #[test]
    fn test_evidence_is_order_sensitive() {
        let mut policy = InterventionPolicy::new(0.0);
        let outcome = reasons(&mut policy, &[true, false, true]);
        assert!(!outcome.contains(&DecisionReason::Triggered));
        assert_eq!(
            policy.state().recent_verdicts.iter().copied().collect::<Vec<_>>(),
            vec![false, true]
        );

        let mut policy = InterventionPolicy::new(0.0);
        let outcome = reasons(&mut policy, &[false, true, true]);
        assert_eq!(outcome[2], DecisionReason::Triggered);
    }

    #[test]
    fn test_cooldown_after_trigger() {
        let mut policy = InterventionPolicy::new(60.0);
        let t = 10_000.0;
        policy.decide(true, t - 20.0);
        assert!(policy.decide(true, t).trigger);

        assert_eq!(
            policy.decide(true, t + 1.0),
            InterventionDecision::hold(DecisionReason::Cooldown)
        );
    }

    #[test]
    fn test_cooldown_does_not_record_verdicts() {
        let mut policy = InterventionPolicy::new(60.0);
        policy.decide(true, 0.0);
        policy.decide(true, 10.0);
        let before = policy.state().clone();

        policy.decide(false, 20.0);
        policy.decide(false, 30.0);
        assert_eq!(policy.state(), &before);
    }

    #[test]
    fn test_history_survives_trigger() {
        // The buffer is not cleared on trigger, so the first fatigued verdict
        // after the cooldown fires again
        let mut policy = InterventionPolicy::new(60.0);
        policy.decide(true, 0.0);
        assert!(policy.decide(true, 10.0).trigger);
        assert!(policy.decide(true, 70.0).trigger);
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let mut policy = InterventionPolicy::new(60.0);
        policy.decide(true, 0.0);
        assert!(policy.decide(true, 0.0).trigger);

        assert_eq!(policy.decide(true, 59.999).reason, DecisionReason::Cooldown);
        assert_eq!(policy.decide(true, 60.0).reason, DecisionReason::Triggered);
    }

    #[test]
    fn test_backwards_clock_does_not_rewind() {
        let mut policy = InterventionPolicy::new(0.0);
        policy.decide(true, 100.0);
        assert!(policy.decide(true, 100.0).trigger);

        assert_eq!(policy.decide(true, 50.0).reason, DecisionReason::Cooldown);
        assert_eq!(policy.state().last_intervention_time, Some(100.0));
    }

    #[test]
    fn test_nan_clock_never_triggers() {
        let mut policy = InterventionPolicy::new(0.0);
        assert_eq!(policy.decide(true, f64::NAN).reason, DecisionReason::Cooldown);
        assert_eq!(policy.decide(true, f64::NAN).reason, DecisionReason::Cooldown);
        assert!(policy.state().last_intervention_time.is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut policy = InterventionPolicy::new(0.0);
        for i in 0..10 {
            policy.decide(i % 3 == 0, i as f64);
            assert!(policy.state().recent_verdicts.len() <= EVIDENCE_WINDOW);
        }
    }

    #[test]
    fn test_triggers_respect_min_interval() {
        let min_interval = 60.0;
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let mut policy = InterventionPolicy::new(min_interval);
            let mut now = 0.0;
            let mut last_trigger: Option<f64> = None;

            for _ in 0..200 {
                now += rng.gen_range(0.0..25.0);
                let decision = policy.decide(rng.gen_bool(0.7), now);
                if decision.trigger {
                    if let Some(previous) = last_trigger {
                        assert!(now - previous >= min_interval);
                    }
                    last_trigger = Some(now);
                }
            }
        }
    }

}
