//! Capacity-limited sign-up roster.
//!
//! One window is active at a time. Opening a window replaces the previous one
//! wholesale; admission is a single check-and-insert.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

/// Members allowed per window (one in-game squad).
pub const SIGNUP_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    AlreadyMember,
    CapacityReached,
    /// No window is open, or the admission targeted a superseded window.
    NotOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupWindow {
    pub window_id: u64,
    pub opened_at: DateTime<Utc>,
    pub capacity: usize,
    /// Unique, kept in admission order.
    pub members: Vec<u64>,
}

impl SignupWindow {
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    pub fn contains(&self, user_id: u64) -> bool {
        self.members.contains(&user_id)
    }
}

#[derive(Debug, Default)]
pub struct SignupCoordinator {
    window: Option<SignupWindow>,
    last_window_id: u64,
}

impl SignupCoordinator {
    /// Starts closed; nothing is admitted until the first `open_window`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a coordinator around a persisted window.
    pub fn restore(window: SignupWindow) -> Self {
        SignupCoordinator {
            last_window_id: window.window_id,
            window: Some(window),
        }
    }

    /// Supersedes the current window with an empty one and returns its id.
    pub fn open_window(&mut self, now: DateTime<Utc>) -> u64 {
        self.last_window_id += 1;
        let previous = self.window.replace(SignupWindow {
            window_id: self.last_window_id,
            opened_at: now,
            capacity: SIGNUP_CAPACITY,
            members: Vec::new(),
        });
        if let Some(prev) = previous {
            log::info!(
                "[SIGNUP] window closed id:{} members:{}/{}",
                prev.window_id,
                prev.members.len(),
                prev.capacity
            );
        }
        log::info!("[SIGNUP] window opened id:{}", self.last_window_id);
        self.last_window_id
    }

    pub fn admit(&mut self, user_id: u64) -> Admission {
        let Some(window) = self.window.as_mut() else {
            return Admission::NotOpen;
        };
        if window.contains(user_id) {
            return Admission::AlreadyMember;
        }
        if window.is_full() {
            log::warn!(
                "[SIGNUP] full window:{} user:{} ({}/{})",
                window.window_id,
                user_id,
                window.members.len(),
                window.capacity
            );
            return Admission::CapacityReached;
        }
        window.members.push(user_id);
        Admission::Admitted
    }

    /// Admission bound to a specific window, e.g. a reaction on an older
    /// sign-up message. Stale ids are refused.
    pub fn admit_to(&mut self, window_id: u64, user_id: u64) -> Admission {
        match &self.window {
            Some(window) if window.window_id == window_id => self.admit(user_id),
            _ => Admission::NotOpen,
        }
    }

    /// Empties the current window in place, keeping its id.
    pub fn reset(&mut self) {
        if let Some(window) = self.window.as_mut() {
            window.members.clear();
            log::info!("[SIGNUP] window reset id:{}", window.window_id);
        }
    }

    pub fn current_members(&self) -> Vec<u64> {
        self.window
            .as_ref()
            .map(|w| w.members.clone())
            .unwrap_or_default()
    }

    pub fn window(&self) -> Option<&SignupWindow> {
        self.window.as_ref()
    }

    pub fn remaining(&self) -> usize {
        self.window
            .as_ref()
            .map(|w| w.capacity.saturating_sub(w.members.len()))
            .unwrap_or(0)
    }
}

/// Coordinator behind a mutex, for hosts that deliver events from several threads.
///
/// Each call takes the lock once, so admission stays a single critical section.
#[derive(Debug, Default)]
pub struct SharedSignup {
    inner: Mutex<SignupCoordinator>,
}

impl SharedSignup {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SignupCoordinator> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn open_window(&self, now: DateTime<Utc>) -> u64 {
        self.lock().open_window(now)
    }

    pub fn admit(&self, user_id: u64) -> Admission {
        self.lock().admit(user_id)
    }

    pub fn admit_to(&self, window_id: u64, user_id: u64) -> Admission {
        self.lock().admit_to(window_id, user_id)
    }

    pub fn reset(&self) {
        self.lock().reset()
    }

    pub fn current_members(&self) -> Vec<u64> {
        self.lock().current_members()
    }

    pub fn current_window_id(&self) -> Option<u64> {
        self.lock().window().map(|w| w.window_id)
    }
}
