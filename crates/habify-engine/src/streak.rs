use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::badge::Badge;

pub const STARTING_COINS: i64 = 100;
pub const BASE_REWARD: i64 = 50;
pub const FAILURE_PENALTY: i64 = 10;
pub const WEEK_LENGTH: u32 = 7;

/// Score submitted for a day. Only 1 and 5 carry meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Failure,
    Success,
    Unscored(i64),
}

impl From<i64> for Activity {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Failure,
            5 => Self::Success,
            other => Self::Unscored(other),
        }
    }
}

impl Activity {
    pub fn is_scored(&self) -> bool {
        !matches!(self, Self::Unscored(_))
    }
}

/// What happens when the same day is submitted more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResubmitPolicy {
    /// A day whose log already holds a scored activity is not scored again;
    /// only the log row is overwritten.
    #[default]
    OncePerDay,
    /// Every call runs the rules again, including same-day repeats.
    Replay,
}

#[derive(Debug, Error)]
#[error("unknown resubmit policy: {0} (expected `once-per-day` or `replay`)")]
pub struct UnknownPolicy(pub String);

impl FromStr for ResubmitPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once-per-day" | "once" => Ok(Self::OncePerDay),
            "replay" => Ok(Self::Replay),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ResubmitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OncePerDay => f.write_str("once-per-day"),
            Self::Replay => f.write_str("replay"),
        }
    }
}

/// The mutable part of a user's record: profile counters plus badge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standing {
    pub coins: i64,
    pub streak: u32,
    pub last_updated: NaiveDate,
    pub badge: Badge,
}

impl Standing {
    /// Standing of a freshly registered user.
    pub fn fresh(registered_on: NaiveDate) -> Self {
        Self {
            coins: STARTING_COINS,
            streak: 0,
            last_updated: registered_on,
            badge: Badge::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Submission {
    pub activity: i64,
    pub today: NaiveDate,
    /// Day log rows the user owns, counting today's row.
    pub total_days: u64,
    /// Activity held by today's row before this submission overwrote it.
    pub previous_activity: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Failure or a detected gap. `penalty` coins were taken.
    Reset { penalty: i64 },
    /// Successful day. `earned` coins were paid out.
    Advance { earned: i64, week_completed: bool },
    /// Activity that carries no score; nothing changed.
    Unscored,
    /// Today was already scored and the policy forbids scoring it twice.
    AlreadyScored,
}

#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    pub standing: Standing,
    pub transition: Transition,
}

impl Outcome {
    pub fn coins_earned(&self) -> i64 {
        match self.transition {
            Transition::Advance { earned, .. } => earned,
            _ => 0,
        }
    }

    /// Whether the profile and badge rows need to be written back.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self.transition,
            Transition::Reset { .. } | Transition::Advance { .. }
        )
    }
}

/// True when the user skipped yesterday. Histories of at most one day are
/// never considered broken. Only yesterday is compared, never a wider range.
pub fn gap_detected(last_updated: NaiveDate, today: NaiveDate, total_days: u64) -> bool {
    let yesterday = today.checked_sub_days(Days::new(1));
    total_days > 1 && yesterday != Some(last_updated)
}

/// Run one day's submission against `standing`.
pub fn apply(mut standing: Standing, submission: &Submission, policy: ResubmitPolicy) -> Outcome {
    let activity = Activity::from(submission.activity);

    let already_scored = submission
        .previous_activity
        .is_some_and(|prev| Activity::from(prev).is_scored());
    if policy == ResubmitPolicy::OncePerDay && already_scored {
        debug!(day = %submission.today, "day already scored; log overwritten only");
        return Outcome {
            standing,
            transition: Transition::AlreadyScored,
        };
    }

    let gap = gap_detected(standing.last_updated, submission.today, submission.total_days);

    let transition = if activity == Activity::Failure || gap {
        let penalty = if activity == Activity::Failure {
            standing.coins.clamp(0, FAILURE_PENALTY)
        } else {
            0
        };
        standing.coins -= penalty;
        standing.streak = 0;
        standing.badge.reset();
        standing.last_updated = submission.today;
        Transition::Reset { penalty }
    } else if activity == Activity::Success {
        standing.streak += 1;
        // Coins are whole; fractional multiplier payouts are truncated.
        let earned = (BASE_REWARD as f64 * standing.badge.multiplier).trunc() as i64;
        standing.coins += earned;
        standing.last_updated = submission.today;

        let week_completed = standing.streak % WEEK_LENGTH == 0;
        if week_completed {
            standing.badge.complete_week();
        }
        Transition::Advance {
            earned,
            week_completed,
        }
    } else {
        Transition::Unscored
    };

    Outcome {
        standing,
        transition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::BadgeColor;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(n))
            .unwrap()
    }

    fn submit(standing: Standing, activity: i64, today: NaiveDate, total_days: u64) -> Outcome {
        let submission = Submission {
            activity,
            today,
            total_days,
            previous_activity: None,
        };
        apply(standing, &submission, ResubmitPolicy::OncePerDay)
    }

    #[test]
    fn first_success_pays_fifty() {
        let outcome = submit(Standing::fresh(day(0)), 5, day(0), 1);
        assert_eq!(outcome.standing.coins, 150);
        assert_eq!(outcome.standing.streak, 1);
        assert_eq!(outcome.standing.badge.weeks, 0);
        assert_eq!(outcome.coins_earned(), 50);
    }

    #[test]
    fn seven_contiguous_successes_earn_grey() {
        let mut standing = Standing::fresh(day(0));
        for n in 0..7 {
            standing = submit(standing, 5, day(n), n + 1).standing;
        }
        assert_eq!(standing.streak, 7);
        assert_eq!(standing.badge.weeks, 1);
        assert_eq!(standing.badge.color, BadgeColor::Grey);
        assert_eq!(standing.badge.multiplier, 1.125);
        assert_eq!(standing.coins, 100 + 7 * 50);

        // Day 8 pays at the new multiplier and leaves the badge alone.
        let outcome = submit(standing, 5, day(7), 8);
        assert_eq!(outcome.coins_earned(), 56);
        assert_eq!(
            outcome.transition,
            Transition::Advance {
                earned: 56,
                week_completed: false
            }
        );
        assert_eq!(outcome.standing.badge.weeks, 1);
    }

    #[test]
    fn failure_costs_at_most_ten_and_resets() {
        let standing = Standing {
            coins: 500,
            streak: 20,
            last_updated: day(9),
            badge: Badge::for_weeks(13),
        };
        let outcome = submit(standing, 1, day(10), 30);
        assert_eq!(outcome.transition, Transition::Reset { penalty: 10 });
        assert_eq!(outcome.standing.coins, 490);
        assert_eq!(outcome.standing.streak, 0);
        assert_eq!(outcome.standing.badge, Badge::new());
        assert_eq!(outcome.standing.last_updated, day(10));
    }

    #[test]
    fn failure_with_few_coins_floors_at_zero() {
        let standing = Standing {
            coins: 4,
            ..Standing::fresh(day(0))
        };
        let outcome = submit(standing, 1, day(0), 1);
        assert_eq!(outcome.transition, Transition::Reset { penalty: 4 });
        assert_eq!(outcome.standing.coins, 0);
    }

    #[test]
    fn gap_resets_without_penalty() {
        let standing = Standing {
            coins: 300,
            streak: 6,
            last_updated: day(2),
            badge: Badge::for_weeks(2),
        };
        let outcome = submit(standing, 5, day(5), 7);
        assert_eq!(outcome.transition, Transition::Reset { penalty: 0 });
        assert_eq!(outcome.standing.coins, 300);
        assert_eq!(outcome.standing.streak, 0);
        assert_eq!(outcome.coins_earned(), 0);
    }

    #[test]
    fn short_history_never_counts_as_gap() {
        assert!(!gap_detected(day(0), day(30), 1));
        assert!(gap_detected(day(0), day(30), 2));
        assert!(!gap_detected(day(29), day(30), 2));
    }

    #[test]
    fn unscored_activity_changes_nothing() {
        let standing = Standing {
            coins: 120,
            streak: 3,
            last_updated: day(3),
            badge: Badge::new(),
        };
        let outcome = submit(standing, 3, day(4), 5);
        assert_eq!(outcome.transition, Transition::Unscored);
        assert_eq!(outcome.standing, standing);
        assert!(!outcome.is_mutation());
    }

    #[test]
    fn third_to_fourth_week_lands_on_yellow() {
        let standing = Standing {
            coins: 1000,
            streak: 27,
            last_updated: day(26),
            badge: Badge::for_weeks(3),
        };
        let outcome = submit(standing, 5, day(27), 28);
        assert_eq!(outcome.coins_earned(), 56);
        assert_eq!(outcome.standing.badge.weeks, 4);
        assert_eq!(outcome.standing.badge.color, BadgeColor::Yellow);
        assert_eq!(outcome.standing.badge.multiplier, 1.25);
    }

    #[test]
    fn once_per_day_ignores_rescored_day() {
        let standing = Standing {
            coins: 150,
            streak: 1,
            last_updated: day(0),
            badge: Badge::new(),
        };
        let submission = Submission {
            activity: 1,
            today: day(0),
            total_days: 2,
            previous_activity: Some(5),
        };
        let outcome = apply(standing, &submission, ResubmitPolicy::OncePerDay);
        assert_eq!(outcome.transition, Transition::AlreadyScored);
        assert_eq!(outcome.standing, standing);
    }

    #[test]
    fn once_per_day_scores_after_unscored_entry() {
        let submission = Submission {
            activity: 5,
            today: day(0),
            total_days: 1,
            previous_activity: Some(3),
        };
        let outcome = apply(Standing::fresh(day(0)), &submission, ResubmitPolicy::OncePerDay);
        assert_eq!(outcome.coins_earned(), 50);
    }

    #[test]
    fn replay_rescores_and_sees_same_day_as_gap() {
        let standing = Standing {
            coins: 150,
            streak: 1,
            last_updated: day(1),
            badge: Badge::new(),
        };
        let submission = Submission {
            activity: 5,
            today: day(1),
            total_days: 2,
            previous_activity: Some(5),
        };
        let outcome = apply(standing, &submission, ResubmitPolicy::Replay);
        assert_eq!(outcome.transition, Transition::Reset { penalty: 0 });
        assert_eq!(outcome.standing.streak, 0);
    }

    #[test]
    fn policy_parses_from_env_strings() {
        assert_eq!("replay".parse::<ResubmitPolicy>().unwrap(), ResubmitPolicy::Replay);
        assert_eq!(
            " Once-Per-Day ".parse::<ResubmitPolicy>().unwrap(),
            ResubmitPolicy::OncePerDay
        );
        assert!("twice".parse::<ResubmitPolicy>().is_err());
    }
}
