use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calculator::Bonus;
use crate::error::BonusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Due,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Due => "Due",
            PaymentStatus::Paid => "Paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = BonusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "due" => Ok(PaymentStatus::Due),
            "paid" => Ok(PaymentStatus::Paid),
            _ => Err(BonusError::InvalidStatus(raw.to_string())),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One priced participation line in the ledger.
///
/// Field names on the wire match the `data.json` layout the ledger has always
/// been stored in, so existing files load as-is. Only `status` changes after
/// construction.
///
/// Deserializing rejects a record with an empty id or whose `net_bonus` is not
/// `base_bonus + special_bonus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct BonusRecord {
    #[serde(rename = "name")]
    pub player_name: String,
    #[serde(rename = "id")]
    pub player_id: String,
    pub kills: u32,
    #[serde(rename = "event_type")]
    pub event_kind: String,
    #[serde(rename = "result")]
    pub outcome: String,
    #[serde(rename = "time")]
    pub time_slot: String,
    pub date: String,
    pub base_bonus: u64,
    pub special_bonus: u64,
    pub net_bonus: u64,
    pub status: PaymentStatus,
    #[serde(rename = "proof")]
    pub proof_url: Option<String>,
}

/// Wire shape of [`BonusRecord`] before validation.
#[derive(Deserialize)]
struct StoredRecord {
    #[serde(rename = "name")]
    player_name: String,
    #[serde(rename = "id")]
    player_id: String,
    kills: u32,
    #[serde(rename = "event_type")]
    event_kind: String,
    #[serde(rename = "result")]
    outcome: String,
    #[serde(rename = "time")]
    time_slot: String,
    date: String,
    base_bonus: u64,
    special_bonus: u64,
    net_bonus: u64,
    status: PaymentStatus,
    #[serde(rename = "proof", default)]
    proof_url: Option<String>,
}

impl TryFrom<StoredRecord> for BonusRecord {
    type Error = String;

    fn try_from(raw: StoredRecord) -> Result<Self, Self::Error> {
        if raw.player_id.trim().is_empty() {
            return Err(format!("record for `{}` has an empty id", raw.player_name));
        }
        let expected = raw
            .base_bonus
            .checked_add(raw.special_bonus)
            .ok_or_else(|| format!("record for id {}: base_bonus + special_bonus overflows", raw.player_id))?;
        if raw.net_bonus != expected {
            return Err(format!(
                "record for id {}: net_bonus {} != base_bonus + special_bonus {}",
                raw.player_id, raw.net_bonus, expected
            ));
        }
        Ok(BonusRecord {
            player_name: raw.player_name,
            player_id: raw.player_id,
            kills: raw.kills,
            event_kind: raw.event_kind,
            outcome: raw.outcome,
            time_slot: raw.time_slot,
            date: raw.date,
            base_bonus: raw.base_bonus,
            special_bonus: raw.special_bonus,
            net_bonus: raw.net_bonus,
            status: raw.status,
            proof_url: raw.proof_url,
        })
    }
}

/// Event context shared by every line of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub event_kind: String,
    pub outcome: String,
    pub time_slot: String,
    pub date: String,
    pub proof_url: Option<String>,
}

impl BonusRecord {
    /// Builds a `Due` record; `net_bonus` is always `base + special`.
    pub fn new(player_name: &str, player_id: &str, kills: u32, event: &EventContext, bonus: Bonus) -> Self {
        BonusRecord {
            player_name: player_name.to_string(),
            player_id: player_id.to_string(),
            kills,
            event_kind: event.event_kind.clone(),
            outcome: event.outcome.clone(),
            time_slot: event.time_slot.clone(),
            date: event.date.clone(),
            base_bonus: bonus.base,
            special_bonus: bonus.special,
            net_bonus: bonus.net(),
            status: PaymentStatus::Due,
            proof_url: event.proof_url.clone(),
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!(" DUE ".parse::<PaymentStatus>().unwrap(), PaymentStatus::Due);
        let err = "refunded".parse::<PaymentStatus>().unwrap_err();
        assert!(matches!(err, BonusError::InvalidStatus(s) if s == "refunded"));
    }

    #[test]
    fn test_reads_legacy_entry() {
        let raw = r#"{
            "name": "Vik", "id": "1042", "kills": 3,
            "event_type": "bizwar", "result": "Win",
            "time": "20:00", "date": "2025-05-01",
            "base_bonus": 90000, "special_bonus": 0, "net_bonus": 90000,
            "status": "Due", "proof": null
        }"#;
        let record: BonusRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.player_id, "1042");
        assert_eq!(record.outcome, "Win");
        assert_eq!(record.status, PaymentStatus::Due);
        assert_eq!(record.proof_url, None);
    }

    #[test]
    fn test_new_record_is_due_with_net_sum() {
        let event = EventContext {
            event_kind: "rpticket".to_string(),
            outcome: "win".to_string(),
            time_slot: "10:30".to_string(),
            date: "2025-05-01".to_string(),
            proof_url: Some("https://cdn.example/proof.png".to_string()),
        };
        let record = BonusRecord::new("Vik", "1042", 2, &event, Bonus { base: 5, special: 300_000 });
        assert_eq!(record.net_bonus, 300_005);
        assert!(!record.is_paid());
        assert_eq!(record.proof_url.as_deref(), Some("https://cdn.example/proof.png"));
    }

    #[test]
    fn test_rejects_inconsistent_net() {
        let raw = r#"{"name": "Vik", "id": "7", "kills": 1, "event_type": "bizwar", "result": "win",
            "time": "20:00", "date": "2025-05-01", "base_bonus": 30000, "special_bonus": 0,
            "net_bonus": 99999, "status": "Due"}"#;
        let err = serde_json::from_str::<BonusRecord>(raw).unwrap_err();
        assert!(err.to_string().contains("net_bonus 99999"));
    }

    #[test]
    fn test_rejects_overflowing_bonus_and_empty_id() {
        let overflow = format!(
            r#"{{"name": "Vik", "id": "7", "kills": 1, "event_type": "bizwar", "result": "win",
            "time": "20:00", "date": "2025-05-01", "base_bonus": {max}, "special_bonus": 1,
            "net_bonus": {max}, "status": "Due"}}"#,
            max = u64::MAX
        );
        assert!(serde_json::from_str::<BonusRecord>(&overflow).is_err());

        let no_id = r#"{"name": "Vik", "id": " ", "kills": 0, "event_type": "bizwar", "result": "win",
            "time": "20:00", "date": "2025-05-01", "base_bonus": 0, "special_bonus": 0,
            "net_bonus": 0, "status": "Due"}"#;
        assert!(serde_json::from_str::<BonusRecord>(no_id).is_err());
    }
}
