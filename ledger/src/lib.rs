//! Event bonus ledger and sign-up roster.
//!
//! Operators submit event results as `Name|ID|Kills` lines; each line is
//! priced from a static rule table and appended to an ordered ledger. The
//! ledger is summarised per player id and tracks whether each player has been
//! paid. Separately, a capacity-limited roster collects sign-ups for the
//! current hourly window.
//!
//! The crate holds no global state: hosts own a [`BonusLedger`] over a
//! [`LedgerStore`] and a [`SignupCoordinator`] (or [`SharedSignup`]) and feed
//! inbound commands into them.

pub mod calculator;
pub mod config;
pub mod entries;
pub mod error;
pub mod ledger;
pub mod record;
pub mod rules;
pub mod schedule;
pub mod signup;
pub mod store;
pub mod summary;

pub use calculator::{compute_bonus, Bonus};
pub use config::Config;
pub use entries::{parse_lines, EntryBatch, EntryLine};
pub use error::{BonusError, Result};
pub use ledger::BonusLedger;
pub use record::{BonusRecord, EventContext, PaymentStatus};
pub use rules::{Outcome, PayoutRule};
pub use schedule::next_window_boundary;
pub use signup::{Admission, SharedSignup, SignupCoordinator, SignupWindow, SIGNUP_CAPACITY};
pub use store::{FileLedger, LedgerStore, MemoryLedger};
pub use summary::{summarize, LedgerTotals, PlayerSummary};
