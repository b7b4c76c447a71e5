use spacetimedb::{
    ReducerContext, Identity, Table, Timestamp, ScheduleAt,
    table, reducer, SpacetimeType,
};
use chrono::{DateTime, Utc};

use bonus_ledger::{
    Admission, BonusError, BonusLedger, BonusRecord, Config, EntryBatch, LedgerStore,
    LedgerTotals, PaymentStatus, SignupCoordinator, SignupWindow,
    next_window_boundary,
};

// Bulk import of ledger files exported by earlier deployments
mod restore;

// ==================== HELPER FUNCTIONS ====================

fn to_chrono(ts: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.to_micros_since_unix_epoch()).unwrap_or_default()
}

fn to_timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_micros_since_unix_epoch(dt.timestamp_micros())
}

/// Reducers are called by the bot gateway on behalf of chat users; only
/// identities registered in `authorized_worker` may mutate state.
fn require_operator(ctx: &ReducerContext, action: &str) -> Result<(), String> {
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        log::warn!("Unauthorized {} attempt by {}", action, ctx.sender);
        return Err("Unauthorized".to_string());
    }
    Ok(())
}

fn ledger(ctx: &ReducerContext) -> BonusLedger<TableLedger<'_>> {
    BonusLedger::new(TableLedger { ctx })
}

fn describe(err: BonusError) -> String {
    err.to_string()
}

// ==================== TABLES ====================

/// One priced participation line. `id` is auto-incremented, so ordering by
/// it gives ledger (insertion) order.
#[table(name = bonus_record, public)]
#[derive(Clone)]
pub struct BonusRecordRow {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub player_id: String,

    /// Name as submitted on this line (may differ between lines of the same id)
    pub player_name: String,

    pub kills: u32,
    pub event_kind: String,
    pub outcome: String,

    /// HH:MM slot the event ran in
    pub time_slot: String,

    /// YYYY-MM-DD
    pub date: String,

    pub base_bonus: u64,
    pub special_bonus: u64,
    pub net_bonus: u64,
    pub status: BonusStatus,

    /// Screenshot/attachment URL submitted as proof
    pub proof_url: Option<String>,

    /// Gateway identity that submitted the line
    pub submitted_by: Identity,
    pub created_at: Timestamp,
}

#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq)]
pub enum BonusStatus {
    Due,
    Paid,
}

impl From<PaymentStatus> for BonusStatus {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Due => BonusStatus::Due,
            PaymentStatus::Paid => BonusStatus::Paid,
        }
    }
}

impl From<BonusStatus> for PaymentStatus {
    fn from(status: BonusStatus) -> Self {
        match status {
            BonusStatus::Due => PaymentStatus::Due,
            BonusStatus::Paid => PaymentStatus::Paid,
        }
    }
}

impl BonusRecordRow {
    fn into_record(self) -> BonusRecord {
        BonusRecord {
            player_name: self.player_name,
            player_id: self.player_id,
            kills: self.kills,
            event_kind: self.event_kind,
            outcome: self.outcome,
            time_slot: self.time_slot,
            date: self.date,
            base_bonus: self.base_bonus,
            special_bonus: self.special_bonus,
            net_bonus: self.net_bonus,
            status: self.status.into(),
            proof_url: self.proof_url,
        }
    }
}

/// Per-player totals, rebuilt after every ledger mutation
#[table(name = player_summary, public)]
pub struct PlayerSummaryRow {
    #[primary_key]
    pub player_id: String,

    /// First-seen order of the player id in the ledger
    pub position: u32,

    pub player_name: String,
    pub total_kills: u64,
    pub total_base: u64,
    pub total_special: u64,
    pub total_net: u64,
    pub all_paid: bool,
}

/// The active sign-up window. At most one row; replaced wholesale on each tick.
#[table(name = signup_window, public)]
pub struct SignupWindowRow {
    #[primary_key]
    pub window_id: u64,
    pub opened_at: Timestamp,
    pub capacity: u32,
}

/// Members of the active window. `id` order is join order.
#[table(name = signup_member, public)]
pub struct SignupMember {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub window_id: u64,

    /// Chat platform user id
    pub user_id: u64,

    pub joined_at: Timestamp,
}

/// Admission results for the gateway to report back to users
/// (client subscribes and replies "cannot sign up" on refusals)
#[table(name = signup_attempt, public)]
pub struct SignupAttempt {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub window_id: u64,

    pub user_id: u64,
    pub outcome: SignupOutcome,
    pub at: Timestamp,
}

#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq)]
pub enum SignupOutcome {
    Admitted,
    AlreadyMember,
    CapacityReached,
    NotOpen,
}

impl From<Admission> for SignupOutcome {
    fn from(admission: Admission) -> Self {
        match admission {
            Admission::Admitted => SignupOutcome::Admitted,
            Admission::AlreadyMember => SignupOutcome::AlreadyMember,
            Admission::CapacityReached => SignupOutcome::CapacityReached,
            Admission::NotOpen => SignupOutcome::NotOpen,
        }
    }
}

/// Authorized identities (the bot gateway, the module owner) allowed to call reducers
#[table(name = authorized_worker)]
pub struct AuthorizedWorker {
    #[primary_key]
    pub identity: Identity,
}

/// Schedule table for opening the next sign-up window on the local hour
#[table(name = signup_schedule, scheduled(open_scheduled_signup_window))]
pub struct SignupSchedule {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    pub scheduled_at: ScheduleAt,
}

// ==================== LEDGER STORE ====================

/// `LedgerStore` over the `bonus_record` table. Each reducer is one
/// transaction, so a failed batch leaves no rows behind.
pub struct TableLedger<'a> {
    ctx: &'a ReducerContext,
}

impl TableLedger<'_> {
    fn rows_for(&self, player_id: &str) -> Vec<BonusRecordRow> {
        self.ctx.db.bonus_record()
            .player_id()
            .filter(&player_id.to_string())
            .collect()
    }
}

impl LedgerStore for TableLedger<'_> {
    fn append_batch(&self, records: Vec<BonusRecord>) -> bonus_ledger::Result<usize> {
        let count = records.len();
        for record in records {
            self.ctx.db.bonus_record().insert(BonusRecordRow {
                id: 0, // auto_inc
                player_id: record.player_id,
                player_name: record.player_name,
                kills: record.kills,
                event_kind: record.event_kind,
                outcome: record.outcome,
                time_slot: record.time_slot,
                date: record.date,
                base_bonus: record.base_bonus,
                special_bonus: record.special_bonus,
                net_bonus: record.net_bonus,
                status: record.status.into(),
                proof_url: record.proof_url,
                submitted_by: self.ctx.sender,
                created_at: self.ctx.timestamp,
            });
        }
        Ok(count)
    }

    fn all(&self) -> bonus_ledger::Result<Vec<BonusRecord>> {
        let mut rows: Vec<BonusRecordRow> = self.ctx.db.bonus_record().iter().collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows.into_iter().map(BonusRecordRow::into_record).collect())
    }

    fn update_status_by_player_id(&self, player_id: &str, status: PaymentStatus) -> bonus_ledger::Result<usize> {
        let rows = self.rows_for(player_id);
        let count = rows.len();
        for mut row in rows {
            row.status = status.into();
            self.ctx.db.bonus_record().id().update(row);
        }
        Ok(count)
    }

    fn remove_by_player_id(&self, player_id: &str) -> bonus_ledger::Result<usize> {
        let rows = self.rows_for(player_id);
        for row in &rows {
            self.ctx.db.bonus_record().id().delete(&row.id);
        }
        Ok(rows.len())
    }

    fn clear(&self) -> bonus_ledger::Result<()> {
        let ids: Vec<u64> = self.ctx.db.bonus_record().iter().map(|row| row.id).collect();
        for id in ids {
            self.ctx.db.bonus_record().id().delete(&id);
        }
        Ok(())
    }
}

/// Rebuild the player_summary table from the ledger
/// Called after every ledger mutation, not exposed as a reducer
fn refresh_player_summary(ctx: &ReducerContext) -> Result<(), String> {
    let existing: Vec<String> = ctx.db.player_summary().iter().map(|row| row.player_id).collect();
    for player_id in existing {
        ctx.db.player_summary().player_id().delete(&player_id);
    }

    let rows = ledger(ctx).summary().map_err(describe)?;
    for (position, row) in rows.iter().enumerate() {
        ctx.db.player_summary().insert(PlayerSummaryRow {
            player_id: row.player_id.clone(),
            position: position as u32,
            player_name: row.player_name.clone(),
            total_kills: row.total_kills,
            total_base: row.total_base,
            total_special: row.total_special,
            total_net: row.total_net,
            all_paid: row.all_paid,
        });
    }

    let totals = LedgerTotals::from_summaries(&rows).map_err(describe)?;
    log::info!("[SUMMARY] refreshed players:{} net:{} outstanding:{}",
        totals.players, totals.net, totals.outstanding);
    Ok(())
}

// ==================== LEDGER REDUCERS ====================

/// Price and record a batch of `Name|ID|Kills` lines for one event
#[reducer]
pub fn add_entries(
    ctx: &ReducerContext,
    event_kind: String,
    outcome: String,
    time_slot: String,
    date: String,
    player_data: String,
    proof_url: Option<String>,
) -> Result<(), String> {
    require_operator(ctx, "add_entries")?;

    let batch = EntryBatch {
        event_kind: &event_kind,
        outcome: &outcome,
        time_slot: &time_slot,
        date: &date,
        lines: &player_data,
        proof_url: proof_url.as_deref(),
    };
    ledger(ctx).add_entries(&batch).map_err(describe)?;
    refresh_player_summary(ctx)
}

/// Mark every record of a player Paid or Due
#[reducer]
pub fn mark_status(ctx: &ReducerContext, player_id: String, status: String) -> Result<(), String> {
    require_operator(ctx, "mark_status")?;
    ledger(ctx).mark_status(&player_id, &status).map_err(describe)?;
    refresh_player_summary(ctx)
}

#[reducer]
pub fn clear_player(ctx: &ReducerContext, player_id: String) -> Result<(), String> {
    require_operator(ctx, "clear_player")?;
    ledger(ctx).clear_player(&player_id).map_err(describe)?;
    refresh_player_summary(ctx)
}

#[reducer]
pub fn clear_all(ctx: &ReducerContext) -> Result<(), String> {
    require_operator(ctx, "clear_all")?;
    ledger(ctx).clear_all().map_err(describe)?;
    refresh_player_summary(ctx)
}

/// Register another gateway identity
#[reducer]
pub fn grant_operator(ctx: &ReducerContext, identity: Identity) -> Result<(), String> {
    require_operator(ctx, "grant_operator")?;
    if ctx.db.authorized_worker().identity().find(&identity).is_none() {
        ctx.db.authorized_worker().insert(AuthorizedWorker { identity });
        log::info!("[AUTH] granted operator:{} by:{}", identity, ctx.sender);
    }
    Ok(())
}

// ==================== SIGN-UP ====================

/// Rebuild the coordinator from the window tables
fn load_coordinator(ctx: &ReducerContext) -> SignupCoordinator {
    let Some(window) = ctx.db.signup_window().iter().max_by_key(|w| w.window_id) else {
        return SignupCoordinator::new();
    };

    let mut members: Vec<SignupMember> = ctx.db.signup_member()
        .window_id()
        .filter(&window.window_id)
        .collect();
    members.sort_by_key(|m| m.id);

    SignupCoordinator::restore(SignupWindow {
        window_id: window.window_id,
        opened_at: to_chrono(window.opened_at),
        capacity: window.capacity as usize,
        members: members.into_iter().map(|m| m.user_id).collect(),
    })
}

/// Replace the current window (and its members) with an empty one
fn open_window_internal(ctx: &ReducerContext) -> u64 {
    let mut coordinator = load_coordinator(ctx);
    let window_id = coordinator.open_window(to_chrono(ctx.timestamp));
    let capacity = coordinator.window().map(|w| w.capacity).unwrap_or_default();

    let member_ids: Vec<u64> = ctx.db.signup_member().iter().map(|m| m.id).collect();
    for id in member_ids {
        ctx.db.signup_member().id().delete(&id);
    }
    let window_ids: Vec<u64> = ctx.db.signup_window().iter().map(|w| w.window_id).collect();
    for id in window_ids {
        ctx.db.signup_window().window_id().delete(&id);
    }
    // Attempts only matter for the window they were made against
    let attempt_ids: Vec<u64> = ctx.db.signup_attempt().iter().map(|a| a.id).collect();
    for id in attempt_ids {
        ctx.db.signup_attempt().id().delete(&id);
    }

    ctx.db.signup_window().insert(SignupWindowRow {
        window_id,
        opened_at: ctx.timestamp,
        capacity: capacity as u32,
    });
    window_id
}

fn schedule_next_window(ctx: &ReducerContext) {
    let config = Config::default();
    let now = to_chrono(ctx.timestamp);
    let Some(next) = next_window_boundary(now, config.signup_interval, config.utc_offset) else {
        log::error!("[SIGNUP] no window boundary after {} for interval {}s, schedule stopped",
            now, config.signup_interval.as_secs());
        return;
    };
    ctx.db.signup_schedule().insert(SignupSchedule {
        id: 0,
        scheduled_at: ScheduleAt::Time(to_timestamp(next).into()),
    });
    log::info!("[SIGNUP] next window scheduled at:{}", next);
}

/// Open a fresh window now (operator override of the hourly cadence)
#[reducer]
pub fn open_signup_window(ctx: &ReducerContext) -> Result<(), String> {
    require_operator(ctx, "open_signup_window")?;
    open_window_internal(ctx);
    Ok(())
}

/// Forwarded sign-up reaction. `window_id` pins the admission to the window the
/// reaction was made on; `None` targets whichever window is current.
#[reducer]
pub fn admit_signup(ctx: &ReducerContext, user_id: u64, window_id: Option<u64>) -> Result<(), String> {
    require_operator(ctx, "admit_signup")?;

    let mut coordinator = load_coordinator(ctx);
    let admission = match window_id {
        Some(id) => coordinator.admit_to(id, user_id),
        None => coordinator.admit(user_id),
    };
    let current = coordinator.window().map(|w| w.window_id).unwrap_or_default();

    if admission == Admission::Admitted {
        ctx.db.signup_member().insert(SignupMember {
            id: 0,
            window_id: current,
            user_id,
            joined_at: ctx.timestamp,
        });
        log::info!("[SIGNUP] admitted user:{} window:{} remaining:{}",
            user_id, current, coordinator.remaining());
    }

    ctx.db.signup_attempt().insert(SignupAttempt {
        id: 0,
        window_id: window_id.unwrap_or(current),
        user_id,
        outcome: admission.into(),
        at: ctx.timestamp,
    });
    Ok(())
}

/// Empty the current window without starting a new one
#[reducer]
pub fn reset_signups(ctx: &ReducerContext) -> Result<(), String> {
    require_operator(ctx, "reset_signups")?;

    let mut coordinator = load_coordinator(ctx);
    coordinator.reset();
    if let Some(window) = coordinator.window() {
        let member_ids: Vec<u64> = ctx.db.signup_member()
            .window_id()
            .filter(&window.window_id)
            .map(|m| m.id)
            .collect();
        for id in member_ids {
            ctx.db.signup_member().id().delete(&id);
        }
    }
    Ok(())
}

/// Scheduled hourly tick: supersede the window and queue the next tick
#[reducer]
pub fn open_scheduled_signup_window(ctx: &ReducerContext, _schedule: SignupSchedule) {
    // Only allow scheduler to call this, not clients
    if ctx.sender != ctx.identity() {
        log::warn!("Client {} attempted to call open_scheduled_signup_window", ctx.sender);
        return;
    }

    open_window_internal(ctx);
    schedule_next_window(ctx);
}

/// Initialize module - register the owner and schedule the first window
#[reducer(init)]
pub fn init(ctx: &ReducerContext) {
    // In init, ctx.sender is the module owner identity
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        ctx.db.authorized_worker().insert(AuthorizedWorker {
            identity: ctx.sender,
        });
    }

    // Check if scheduler already exists to avoid duplicates on hot-reload
    if ctx.db.signup_schedule().iter().count() == 0 {
        schedule_next_window(ctx);
    }

    log::info!("Bonus ledger module initialized");
}
