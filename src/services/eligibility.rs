use crate::{
    config::EligibilityConfig,
    models::common::{ActivityKind, GateDecision},
};

/// Pure gating policy for timed activities.
///
/// Stateless and side-effect free: callers fetch the balance, this
/// answers whether it clears the per-activity minute threshold.
pub struct EligibilityPolicy {
    config: EligibilityConfig,
}

impl EligibilityPolicy {
    pub fn new(config: &EligibilityConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Minutes a balance is worth at the fixed conversion rate.
    pub fn minutes_for_credits(&self, credits: i32) -> i32 {
        credits.saturating_mul(self.config.minutes_per_credit)
    }

    /// Credits a session of `minutes` costs, rounded up so partial
    /// credits are never given away.
    pub fn credits_for_minutes(&self, minutes: i32) -> i32 {
        let per_credit = self.config.minutes_per_credit.max(1);
        (minutes + per_credit - 1) / per_credit
    }

    /// Minimum minutes required to start the given activity.
    pub fn required_minutes(&self, activity: ActivityKind) -> i32 {
        match activity {
            ActivityKind::GeneralEnglish => self.config.general_english_min_minutes,
            ActivityKind::MockTest => self.config.mock_test_min_minutes,
        }
    }

    /// Whether a balance clears the threshold for the activity.
    pub fn can_start(&self, activity: ActivityKind, credits: i32) -> bool {
        self.minutes_for_credits(credits) >= self.required_minutes(activity)
    }

    /// Full gate decision for a session-start request. An account that
    /// does not exist yet, or has not finished onboarding, routes to
    /// onboarding before any balance question is asked.
    pub fn decide(
        &self,
        activity: ActivityKind,
        account: Option<&entity::accounts::Model>,
    ) -> GateDecision {
        let Some(account) = account else {
            return GateDecision::ProfileIncomplete;
        };
        if account.onboarded_at.is_none() {
            return GateDecision::ProfileIncomplete;
        }
        if self.can_start(activity, account.credits) {
            GateDecision::Eligible
        } else {
            GateDecision::InsufficientBalance
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::sea_orm_active_enums::AccountTier;
    use uuid::Uuid;

    fn policy() -> EligibilityPolicy {
        EligibilityPolicy::new(&EligibilityConfig {
            minutes_per_credit: 1,
            general_english_min_minutes: 5,
            mock_test_min_minutes: 15,
        })
    }

    fn account(credits: i32, onboarded: bool) -> entity::accounts::Model {
        let now = time::OffsetDateTime::now_utc();
        entity::accounts::Model {
            id: Uuid::new_v4(),
            tier: AccountTier::Free,
            credits,
            onboarded_at: onboarded.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn thresholds_are_per_activity() {
        let policy = policy();

        // (activity, credits, expected)
        let cases = [
            (ActivityKind::GeneralEnglish, 0, false),
            (ActivityKind::GeneralEnglish, 4, false),
            (ActivityKind::GeneralEnglish, 5, true),
            (ActivityKind::GeneralEnglish, 6, true),
            (ActivityKind::MockTest, 5, false),
            (ActivityKind::MockTest, 14, false),
            (ActivityKind::MockTest, 15, true),
            (ActivityKind::MockTest, 100, true),
        ];

        for (activity, credits, expected) in cases {
            assert_eq!(
                policy.can_start(activity, credits),
                expected,
                "activity={:?} credits={}",
                activity,
                credits
            );
        }
    }

    #[test]
    fn can_start_is_monotonic_in_credits() {
        let policy = policy();

        for activity in [ActivityKind::GeneralEnglish, ActivityKind::MockTest] {
            let threshold = policy.required_minutes(activity);
            for credits in 0..threshold {
                assert!(!policy.can_start(activity, credits));
            }
            for credits in threshold..(threshold + 30) {
                assert!(policy.can_start(activity, credits));
            }
        }
    }

    #[test]
    fn minutes_conversion_respects_multiplier() {
        let policy = EligibilityPolicy::new(&EligibilityConfig {
            minutes_per_credit: 2,
            general_english_min_minutes: 5,
            mock_test_min_minutes: 15,
        });

        assert_eq!(policy.minutes_for_credits(0), 0);
        assert_eq!(policy.minutes_for_credits(3), 6);
        // 3 credits = 6 minutes, which clears the 5-minute bar
        assert!(policy.can_start(ActivityKind::GeneralEnglish, 3));
        assert!(!policy.can_start(ActivityKind::GeneralEnglish, 2));
    }

    #[test]
    fn credits_for_minutes_rounds_up() {
        let policy = EligibilityPolicy::new(&EligibilityConfig {
            minutes_per_credit: 2,
            general_english_min_minutes: 5,
            mock_test_min_minutes: 15,
        });

        assert_eq!(policy.credits_for_minutes(1), 1);
        assert_eq!(policy.credits_for_minutes(2), 1);
        assert_eq!(policy.credits_for_minutes(3), 2);
        assert_eq!(policy.credits_for_minutes(4), 2);
    }

    #[test]
    fn gate_routes_missing_or_unonboarded_accounts_to_onboarding() {
        let policy = policy();

        assert_eq!(
            policy.decide(ActivityKind::GeneralEnglish, None),
            GateDecision::ProfileIncomplete
        );
        assert_eq!(
            policy.decide(ActivityKind::GeneralEnglish, Some(&account(50, false))),
            GateDecision::ProfileIncomplete
        );
    }

    #[test]
    fn gate_decides_on_balance_once_onboarded() {
        let policy = policy();

        assert_eq!(
            policy.decide(ActivityKind::GeneralEnglish, Some(&account(5, true))),
            GateDecision::Eligible
        );
        assert_eq!(
            policy.decide(ActivityKind::MockTest, Some(&account(5, true))),
            GateDecision::InsufficientBalance
        );
        assert_eq!(
            policy.decide(ActivityKind::MockTest, Some(&account(0, true))),
            GateDecision::InsufficientBalance
        );
    }
}
