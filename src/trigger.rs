//! Trigger dispatcher
//!
//! A run starts either because an operator asked for it or because the
//! monthly slot came around. The two modes differ only in how the run is
//! labelled; the pipeline itself never looks at the trigger.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::fmt;
use tracing::info;

use crate::config::ScheduleConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Explicit request from an operator or `workflow_dispatch`
    Manual,
    /// Monthly slot reached
    Scheduled { slot: DateTime<Utc> },
}

impl Trigger {
    pub fn label(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Scheduled { .. } => "scheduled",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Manual => write!(f, "manual"),
            Trigger::Scheduled { slot } => write!(f, "scheduled ({})", slot.format("%Y-%m-%d %H:%M UTC")),
        }
    }
}

/// Fixed monthly slot, in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlySchedule {
    day: u32,
    hour: u32,
    minute: u32,
}

impl MonthlySchedule {
    /// Day is clamped to 1..=28 so every month has the slot
    pub fn new(day: u32, hour: u32, minute: u32) -> Self {
        Self {
            day: day.clamp(1, 28),
            hour: hour.min(23),
            minute: minute.min(59),
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.day, config.hour, config.minute)
    }

    fn slot_in(&self, year: i32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, self.day, self.hour, self.minute, 0)
            .single()
            .unwrap_or_default()
    }

    /// First slot strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let this_month = self.slot_in(now.year(), now.month());
        if this_month > now {
            return this_month;
        }
        let (year, month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        self.slot_in(year, month)
    }

    /// Most recent slot at or before `now`
    pub fn latest_at_or_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let this_month = self.slot_in(now.year(), now.month());
        if this_month <= now {
            return this_month;
        }
        let (year, month) = if now.month() == 1 {
            (now.year() - 1, 12)
        } else {
            (now.year(), now.month() - 1)
        };
        self.slot_in(year, month)
    }

    /// True when a slot falls in `(last_run, now]`
    pub fn is_due(&self, now: DateTime<Utc>, last_run: Option<DateTime<Utc>>) -> bool {
        match last_run {
            None => true,
            Some(last) => self.latest_at_or_before(now) > last,
        }
    }
}

/// Decides when a run starts
#[derive(Debug, Clone)]
pub struct TriggerDispatcher {
    schedule: MonthlySchedule,
}

impl TriggerDispatcher {
    pub fn new(schedule: MonthlySchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> MonthlySchedule {
        self.schedule
    }

    pub fn manual(&self) -> Trigger {
        Trigger::Manual
    }

    /// Next slot after the current time
    pub fn next_slot(&self) -> DateTime<Utc> {
        self.schedule.next_after(Utc::now())
    }

    /// Sleep until the next slot and yield the scheduled trigger
    pub async fn wait_for_next_slot(&self) -> Trigger {
        let slot = self.next_slot();
        let wait = (slot - Utc::now()).max(Duration::zero());
        info!(
            slot = %slot,
            wait_seconds = wait.num_seconds(),
            "Waiting for next scheduled run"
        );
        tokio::time::sleep(wait.to_std().unwrap_or_default()).await;
        Trigger::Scheduled { slot }
    }
}
