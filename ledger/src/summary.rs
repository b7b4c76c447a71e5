use std::collections::HashMap;

use crate::error::{BonusError, Result};
use crate::record::BonusRecord;

/// Per-player totals, grouped by player id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub player_id: String,
    /// Name on the first record seen for this id; names may drift between submissions.
    pub player_name: String,
    pub total_kills: u64,
    pub total_base: u64,
    pub total_special: u64,
    pub total_net: u64,
    pub all_paid: bool,
}

fn add(total: u64, amount: u64, what: &str, player_id: &str) -> Result<u64> {
    total
        .checked_add(amount)
        .ok_or_else(|| BonusError::InvalidInput(format!("{} total for player {} overflows", what, player_id)))
}

/// Groups records by player id in first-seen order.
///
/// A total that does not fit in `u64` is `InvalidInput`; nothing is clamped.
pub fn summarize(records: &[BonusRecord]) -> Result<Vec<PlayerSummary>> {
    let mut rows: Vec<PlayerSummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let slot = *index.entry(record.player_id.as_str()).or_insert_with(|| {
            rows.push(PlayerSummary {
                player_id: record.player_id.clone(),
                player_name: record.player_name.clone(),
                total_kills: 0,
                total_base: 0,
                total_special: 0,
                total_net: 0,
                all_paid: true,
            });
            rows.len() - 1
        });

        let row = &mut rows[slot];
        let id = record.player_id.as_str();
        row.total_kills = add(row.total_kills, u64::from(record.kills), "kills", id)?;
        row.total_base = add(row.total_base, record.base_bonus, "base", id)?;
        row.total_special = add(row.total_special, record.special_bonus, "special", id)?;
        row.total_net = add(row.total_net, record.net_bonus, "net", id)?;
        row.all_paid &= record.is_paid();
    }

    Ok(rows)
}

/// Ledger-wide totals across all players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerTotals {
    pub players: usize,
    pub kills: u64,
    pub base: u64,
    pub special: u64,
    pub net: u64,
    /// Net owed to players who still have at least one unpaid record.
    pub outstanding: u64,
}

impl LedgerTotals {
    pub fn from_summaries(rows: &[PlayerSummary]) -> Result<Self> {
        rows.iter().try_fold(
            LedgerTotals {
                players: rows.len(),
                ..Default::default()
            },
            |mut acc, row| {
                let id = row.player_id.as_str();
                acc.kills = add(acc.kills, row.total_kills, "ledger kills", id)?;
                acc.base = add(acc.base, row.total_base, "ledger base", id)?;
                acc.special = add(acc.special, row.total_special, "ledger special", id)?;
                acc.net = add(acc.net, row.total_net, "ledger net", id)?;
                if !row.all_paid {
                    acc.outstanding = add(acc.outstanding, row.total_net, "outstanding", id)?;
                }
                Ok(acc)
            },
        )
    }
}
