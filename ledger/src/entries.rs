//! Parsing of operator-submitted result batches.
//!
//! A batch is newline-separated `Name|ID|Kills` lines. The whole batch is
//! validated and priced before anything is handed to the store.

use chrono::{NaiveDate, NaiveTime};

use crate::calculator::compute_bonus;
use crate::error::{BonusError, Result};
use crate::record::{BonusRecord, EventContext};

/// One parsed `Name|ID|Kills` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLine {
    pub name: String,
    pub player_id: String,
    pub kills: u32,
}

/// Parses a single line; `index` is only used for error reporting.
pub fn parse_line(index: usize, line: &str) -> Result<EntryLine> {
    let parts: Vec<&str> = line.split('|').map(str::trim).collect();
    let [name, id, kills] = parts.as_slice() else {
        return Err(BonusError::format(index, format!("expected 3 fields, found {}", parts.len())));
    };

    if name.is_empty() {
        return Err(BonusError::format(index, "name is empty"));
    }
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(BonusError::format(index, format!("id `{}` is not numeric", id)));
    }
    if kills.is_empty() || !kills.chars().all(|c| c.is_ascii_digit()) {
        return Err(BonusError::format(
            index,
            format!("kills `{}` is not a non-negative integer", kills),
        ));
    }
    let kills: u32 = kills
        .parse()
        .map_err(|_| BonusError::format(index, format!("kills `{}` is too large", kills)))?;

    Ok(EntryLine {
        name: name.to_string(),
        player_id: id.to_string(),
        kills,
    })
}

/// Parses every non-blank line. Indices refer to raw input lines, so blank
/// lines still advance them.
pub fn parse_lines(input: &str) -> Result<Vec<EntryLine>> {
    let mut entries = Vec::new();
    for (index, raw) in input.split('\n').enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        entries.push(parse_line(index, line)?);
    }
    if entries.is_empty() {
        return Err(BonusError::format(0, "no player lines submitted"));
    }
    Ok(entries)
}

/// A submission: one event context plus its player lines.
#[derive(Debug, Clone)]
pub struct EntryBatch<'a> {
    pub event_kind: &'a str,
    pub outcome: &'a str,
    pub time_slot: &'a str,
    pub date: &'a str,
    pub lines: &'a str,
    pub proof_url: Option<&'a str>,
}

impl EntryBatch<'_> {
    fn context(&self) -> Result<EventContext> {
        let time_slot = self.time_slot.trim();
        NaiveTime::parse_from_str(time_slot, "%H:%M").map_err(|_| {
            BonusError::InvalidInput(format!("time slot `{}` is not HH:MM", self.time_slot))
        })?;
        let date = self.date.trim();
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| BonusError::InvalidInput(format!("date `{}` is not YYYY-MM-DD", self.date)))?;

        Ok(EventContext {
            event_kind: self.event_kind.trim().to_string(),
            outcome: self.outcome.trim().to_string(),
            time_slot: time_slot.to_string(),
            date: date.to_string(),
            proof_url: self.proof_url.map(str::to_string),
        })
    }

    /// Validates and prices every line. Returns no records unless all succeed.
    pub fn price(&self) -> Result<Vec<BonusRecord>> {
        let event = self.context()?;
        let lines = parse_lines(self.lines)?;

        lines
            .iter()
            .map(|line| {
                let bonus = compute_bonus(&event.event_kind, &event.outcome, &event.time_slot, line.kills as i64)?;
                Ok(BonusRecord::new(&line.name, &line.player_id, line.kills, &event, bonus))
            })
            .collect()
    }
}
