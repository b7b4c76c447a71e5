use crate::entries::EntryBatch;
use crate::error::Result;
use crate::record::{BonusRecord, PaymentStatus};
use crate::store::LedgerStore;
use crate::summary::{summarize, PlayerSummary};

/// Operator-facing ledger operations over any store.
#[derive(Debug)]
pub struct BonusLedger<S> {
    store: S,
}

impl<S: LedgerStore> BonusLedger<S> {
    pub fn new(store: S) -> Self {
        BonusLedger { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Prices and appends a batch, all or nothing.
    ///
    /// A malformed line is `Format`. A time slot that is not `HH:MM`, a date
    /// that is not `YYYY-MM-DD`, or a kill count whose bonus overflows is
    /// `InvalidInput`. On any error nothing is written.
    pub fn add_entries(&self, batch: &EntryBatch<'_>) -> Result<usize> {
        let records = match batch.price() {
            Ok(records) => records,
            Err(e) => {
                log::warn!("[LEDGER] batch rejected kind:{} error:{}", batch.event_kind, e);
                return Err(e);
            }
        };
        let count = self.store.append_batch(records)?;
        log::info!(
            "[LEDGER] appended count:{} kind:{} outcome:{} date:{} {}",
            count,
            batch.event_kind,
            batch.outcome,
            batch.date,
            batch.time_slot
        );
        Ok(count)
    }

    pub fn summary(&self) -> Result<Vec<PlayerSummary>> {
        summarize(&self.store.all()?)
    }

    pub fn show_all(&self) -> Result<Vec<BonusRecord>> {
        self.store.all()
    }

    /// Sets the payment status on every record of a player. The status is
    /// validated before the store is touched.
    pub fn mark_status(&self, player_id: &str, status: &str) -> Result<usize> {
        let status: PaymentStatus = status.parse()?;
        let count = self.store.update_status_by_player_id(player_id, status)?;
        log::info!("[LEDGER] marked player:{} status:{} records:{}", player_id, status, count);
        Ok(count)
    }

    pub fn clear_player(&self, player_id: &str) -> Result<usize> {
        let count = self.store.remove_by_player_id(player_id)?;
        log::info!("[LEDGER] cleared player:{} records:{}", player_id, count);
        Ok(count)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.store.clear()?;
        log::info!("[LEDGER] cleared all records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BonusError;
    use crate::store::MemoryLedger;

    fn batch<'a>(kind: &'a str, outcome: &'a str, lines: &'a str) -> EntryBatch<'a> {
        EntryBatch {
            event_kind: kind,
            outcome,
            time_slot: "10:30",
            date: "2025-05-01",
            lines,
            proof_url: Some("https://cdn.example/p.png"),
        }
    }

    #[test]
    fn test_add_then_show_all() {
        let ledger = BonusLedger::new(MemoryLedger::new());
        assert_eq!(ledger.add_entries(&batch("rpticket", "win", "Vik|1|2\nAna|2|0")).unwrap(), 2);
        let records = ledger.show_all().unwrap();
        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r.net_bonus, r.base_bonus + r.special_bonus);
            assert_eq!(r.special_bonus, 300_000);
            assert_eq!(r.status, PaymentStatus::Due);
        }
    }

    #[test]
    fn test_bad_line_appends_nothing() {
        let ledger = BonusLedger::new(MemoryLedger::new());
        ledger.add_entries(&batch("bizwar", "win", "Pre|9|1")).unwrap();
        let lines = "A|1|1\nB|2|2\nC|3|3\nD|x|4\nE|5|5\nF|6|6";
        let err = ledger.add_entries(&batch("bizwar", "win", lines)).unwrap_err();
        assert!(matches!(err, BonusError::Format { line: 3, .. }));
        assert_eq!(ledger.show_all().unwrap().len(), 1);
    }

    #[test]
    fn test_bad_slot_or_date_appends_nothing() {
        let ledger = BonusLedger::new(MemoryLedger::new());
        let mut bad_slot = batch("bizwar", "win", "A|1|1");
        bad_slot.time_slot = "8pm";
        assert!(matches!(ledger.add_entries(&bad_slot), Err(BonusError::InvalidInput(_))));

        let mut bad_date = batch("bizwar", "win", "A|1|1");
        bad_date.date = "01/05/2025";
        assert!(matches!(ledger.add_entries(&bad_date), Err(BonusError::InvalidInput(_))));
        assert!(ledger.show_all().unwrap().is_empty());
    }

    #[test]
    fn test_mark_status_rejects_unknown_status() {
        let ledger = BonusLedger::new(MemoryLedger::new());
        ledger.add_entries(&batch("bizwar", "win", "A|1|1")).unwrap();
        assert!(matches!(ledger.mark_status("1", "settled"), Err(BonusError::InvalidStatus(_))));
        assert!(!ledger.show_all().unwrap()[0].is_paid());
    }

    #[test]
    fn test_mark_status_is_idempotent() {
        let ledger = BonusLedger::new(MemoryLedger::new());
        ledger.add_entries(&batch("bizwar", "win", "A|1|1\nB|2|1\nA|1|2")).unwrap();
        assert_eq!(ledger.mark_status("1", "paid").unwrap(), 2);
        let once = ledger.show_all().unwrap();
        assert_eq!(ledger.mark_status("1", "Paid").unwrap(), 2);
        assert_eq!(ledger.show_all().unwrap(), once);
    }

    #[test]
    fn test_clear_player_and_all() {
        let ledger = BonusLedger::new(MemoryLedger::new());
        ledger.add_entries(&batch("bizwar", "win", "A|1|1\nB|2|1\nA|1|2")).unwrap();
        assert_eq!(ledger.clear_player("1").unwrap(), 2);
        assert_eq!(ledger.summary().unwrap().len(), 1);
        ledger.clear_all().unwrap();
        assert!(ledger.show_all().unwrap().is_empty());
    }
}
