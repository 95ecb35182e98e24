use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Badge palette, ordered from the zero state up to the one-year tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    White,
    Grey,
    Yellow,
    Green,
    Blue,
    Purple,
    Orange,
}

impl BadgeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Grey => "grey",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Orange => "orange",
        }
    }
}

impl fmt::Display for BadgeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown badge color: {0}")]
pub struct UnknownColor(pub String);

impl FromStr for BadgeColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Rows written by the first release stored the zero state as a hex code.
            "white" | "#ffffff" => Ok(Self::White),
            "grey" => Ok(Self::Grey),
            "yellow" => Ok(Self::Yellow),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            "purple" => Ok(Self::Purple),
            "orange" => Ok(Self::Orange),
            other => Err(UnknownColor(other.to_string())),
        }
    }
}

/// One rung of the badge ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub min_weeks: u32,
    pub color: BadgeColor,
    pub multiplier: f64,
}

/// Ascending by `min_weeks`; the last satisfied entry wins.
pub const TIERS: [Tier; 6] = [
    Tier { min_weeks: 1, color: BadgeColor::Grey, multiplier: 1.125 },
    Tier { min_weeks: 4, color: BadgeColor::Yellow, multiplier: 1.25 },
    Tier { min_weeks: 13, color: BadgeColor::Green, multiplier: 1.5 },
    Tier { min_weeks: 26, color: BadgeColor::Blue, multiplier: 1.75 },
    Tier { min_weeks: 39, color: BadgeColor::Purple, multiplier: 2.0 },
    Tier { min_weeks: 52, color: BadgeColor::Orange, multiplier: 2.5 },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Badge {
    pub weeks: u32,
    pub color: BadgeColor,
    pub multiplier: f64,
}

impl Badge {
    /// The state every user starts in and falls back to on a reset.
    pub const fn new() -> Self {
        Self {
            weeks: 0,
            color: BadgeColor::White,
            multiplier: 1.0,
        }
    }

    /// Badge whose color and multiplier match `weeks` completed weeks.
    pub fn for_weeks(weeks: u32) -> Self {
        let mut badge = Self::new();
        badge.weeks = weeks;
        badge.retier();
        badge
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record one more completed seven-day cycle.
    pub fn complete_week(&mut self) {
        self.weeks += 1;
        self.retier();
    }

    fn retier(&mut self) {
        self.color = BadgeColor::White;
        self.multiplier = 1.0;
        for tier in TIERS.iter().filter(|t| self.weeks >= t.min_weeks) {
            self.color = tier.color;
            self.multiplier = tier.multiplier;
        }
    }
}

impl Default for Badge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weeks_is_white() {
        let badge = Badge::for_weeks(0);
        assert_eq!(badge.color, BadgeColor::White);
        assert_eq!(badge.multiplier, 1.0);
    }

    #[test]
    fn tier_boundaries() {
        let cases = [
            (1, BadgeColor::Grey, 1.125),
            (3, BadgeColor::Grey, 1.125),
            (4, BadgeColor::Yellow, 1.25),
            (12, BadgeColor::Yellow, 1.25),
            (13, BadgeColor::Green, 1.5),
            (26, BadgeColor::Blue, 1.75),
            (39, BadgeColor::Purple, 2.0),
            (51, BadgeColor::Purple, 2.0),
            (52, BadgeColor::Orange, 2.5),
            (300, BadgeColor::Orange, 2.5),
        ];
        for (weeks, color, multiplier) in cases {
            let badge = Badge::for_weeks(weeks);
            assert_eq!(badge.color, color, "weeks = {weeks}");
            assert_eq!(badge.multiplier, multiplier, "weeks = {weeks}");
        }
    }

    #[test]
    fn fourth_week_overrides_grey() {
        let mut badge = Badge::for_weeks(3);
        assert_eq!(badge.color, BadgeColor::Grey);

        badge.complete_week();
        assert_eq!(badge.weeks, 4);
        assert_eq!(badge.color, BadgeColor::Yellow);
        assert_eq!(badge.multiplier, 1.25);
    }

    #[test]
    fn reset_returns_to_zero_state() {
        let mut badge = Badge::for_weeks(40);
        badge.reset();
        assert_eq!(badge, Badge::new());
    }

    #[test]
    fn color_parses_legacy_hex() {
        assert_eq!("#ffffff".parse::<BadgeColor>().unwrap(), BadgeColor::White);
        assert_eq!("purple".parse::<BadgeColor>().unwrap(), BadgeColor::Purple);
        assert!("teal".parse::<BadgeColor>().is_err());
    }
}
