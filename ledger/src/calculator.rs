use crate::error::{BonusError, Result};
use crate::rules::{rule_for, special_for_slot, Outcome, PayoutRule};

/// Priced result of one event participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bonus {
    pub base: u64,
    pub special: u64,
}

impl Bonus {
    pub fn net(&self) -> u64 {
        self.base + self.special
    }
}

/// Prices one participation from the static rule table.
///
/// Unknown event kinds and outcomes a rule does not recognise pay zero.
/// Negative kill counts and payouts that overflow `u64` are rejected.
pub fn compute_bonus(event_kind: &str, outcome: &str, time_slot: &str, kills: i64) -> Result<Bonus> {
    if kills < 0 {
        return Err(BonusError::InvalidInput(format!(
            "kill count must be non-negative, got {}",
            kills
        )));
    }
    let kills = kills as u64;

    let Some(rule) = rule_for(event_kind) else {
        return Ok(Bonus::default());
    };
    let outcome = Outcome::parse(outcome);

    let per_kill = |rate: u64| {
        kills.checked_mul(rate).ok_or_else(|| {
            BonusError::InvalidInput(format!("payout overflow: {} kills at {}", kills, rate))
        })
    };

    let bonus = match rule {
        PayoutRule::PerKill { win, loss } => {
            let base = match outcome {
                Some(Outcome::Win) => per_kill(win)?,
                Some(Outcome::Loss) => per_kill(loss)?,
                _ => 0,
            };
            Bonus { base, special: 0 }
        }
        PayoutRule::PerKillUniform { rate } => Bonus {
            base: per_kill(rate)?,
            special: 0,
        },
        PayoutRule::FlatOutcome { win, defend } => {
            let base = match outcome {
                Some(Outcome::Win) => win,
                Some(Outcome::Defend) => defend.unwrap_or(0),
                _ => 0,
            };
            Bonus { base, special: 0 }
        }
        PayoutRule::FlatUnconditional { amount } => Bonus {
            base: amount,
            special: 0,
        },
        PayoutRule::TimeSlotSpecial => {
            let special = match outcome {
                Some(Outcome::Win) => special_for_slot(time_slot).unwrap_or(0),
                _ => 0,
            };
            Bonus { base: 0, special }
        }
    };

    Ok(bonus)
}
