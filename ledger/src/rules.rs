//! Static payout rules keyed by lower-cased event kind.
//!
//! Each event kind maps to one [`PayoutRule`] variant; adding a kind means
//! adding one row to [`RULES`].

/// How an event kind pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutRule {
    /// `kills * win` on a win, `kills * loss` on a loss, nothing otherwise.
    PerKill { win: u64, loss: u64 },
    /// `kills * rate` whatever the outcome.
    PerKillUniform { rate: u64 },
    /// Flat amount on a win; `defend` pays the same amount when present.
    FlatOutcome { win: u64, defend: Option<u64> },
    /// Flat amount regardless of outcome.
    FlatUnconditional { amount: u64 },
    /// No base payout; a winning outcome in a listed slot pays from [`SPECIAL_SLOTS`].
    TimeSlotSpecial,
}

/// Match outcome as reported by operators (compared case-insensitively).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Defend,
}

impl Outcome {
    /// Returns `None` for labels no rule recognises; callers treat that as "no rate".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "win" => Some(Outcome::Win),
            "loss" => Some(Outcome::Loss),
            "defend" => Some(Outcome::Defend),
            _ => None,
        }
    }
}

pub const RULES: &[(&str, PayoutRule)] = &[
    ("informal", PayoutRule::PerKill { win: 45_000, loss: 4_000 }),
    ("rpticket", PayoutRule::TimeSlotSpecial),
    ("bizwar", PayoutRule::PerKill { win: 30_000, loss: 3_000 }),
    ("capturefoundry", PayoutRule::PerKill { win: 20_000, loss: 5_000 }),
    ("weaponfactory", PayoutRule::PerKill { win: 10_000, loss: 2_000 }),
    ("hoteltakeover", PayoutRule::PerKill { win: 25_000, loss: 5_000 }),
    ("ratingbattle", PayoutRule::PerKill { win: 30_000, loss: 5_000 }),
    ("sphere", PayoutRule::FlatOutcome { win: 20_000, defend: Some(20_000) }),
    ("famraid", PayoutRule::FlatOutcome { win: 20_000, defend: None }),
    ("robbery", PayoutRule::FlatOutcome { win: 30_000, defend: None }),
    ("shopping", PayoutRule::FlatUnconditional { amount: 100_000 }),
    ("vineyard", PayoutRule::FlatOutcome { win: 30_000, defend: None }),
    // Harbour pays the same per kill on every outcome.
    ("harbour", PayoutRule::PerKillUniform { rate: 20_000 }),
];

/// RP ticket bonus by wall-clock slot (HH:MM). Paid only on a win.
pub const SPECIAL_SLOTS: &[(&str, u64)] = &[
    ("10:30", 300_000),
    ("16:30", 350_000),
    ("22:30", 350_000),
];

/// Looks up the rule for an event kind, ignoring case and surrounding whitespace.
pub fn rule_for(event_kind: &str) -> Option<PayoutRule> {
    let kind = event_kind.trim().to_lowercase();
    RULES
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, rule)| *rule)
}

pub fn special_for_slot(time_slot: &str) -> Option<u64> {
    SPECIAL_SLOTS
        .iter()
        .find(|(slot, _)| *slot == time_slot.trim())
        .map(|(_, amount)| *amount)
}

/// Every event kind with a rule, in table order.
pub fn known_kinds() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|(name, _)| *name)
}
