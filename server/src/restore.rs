// Bulk import of ledger files for migration and disaster recovery
// Accepts the JSON array layout of the standalone data.json ledger

use spacetimedb::{reducer, ReducerContext, log};
use bonus_ledger::{BonusRecord, LedgerStore};
use crate::{TableLedger, authorized_worker, refresh_player_summary};

/// Check one imported record before it is written
/// (net_bonus consistency is already enforced when the record deserializes)
fn validate_record(i: usize, record: &BonusRecord) -> Result<(), String> {
    if record.player_id.is_empty() || !record.player_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Record {}: id `{}` is not numeric", i, record.player_id));
    }
    if record.player_name.trim().is_empty() {
        return Err(format!("Record {}: missing name", i));
    }
    Ok(())
}

/// Append records from a JSON array to the ledger, after the existing ones
/// Protected by authorization check - only authorized workers can call this
#[reducer]
pub fn bulk_restore_bonus_records(ctx: &ReducerContext, json_data: String) -> Result<(), String> {
    // Authorization check: only authorized workers can restore data
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        log::warn!("Unauthorized bulk_restore_bonus_records attempt by {}", ctx.sender);
        return Err("Unauthorized".to_string());
    }

    let records: Vec<BonusRecord> = serde_json::from_str(&json_data)
        .map_err(|e| format!("Invalid JSON: {}", e))?;

    // Validate everything first; the reducer transaction rolls back on Err anyway
    for (i, record) in records.iter().enumerate() {
        validate_record(i, record)?;
    }

    let count = TableLedger { ctx }
        .append_batch(records)
        .map_err(|e| e.to_string())?;
    refresh_player_summary(ctx)?;

    log::info!("✅ Restored {} bonus records", count);
    Ok(())
}
