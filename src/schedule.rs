//! Calendar-aware scheduled activation
//!
//! [`next_occurrence`] is a pure function of a schedule and the current time.
//! [`ScheduleEngine`] keeps the live timers armed for each active schedule so
//! they can be cancelled when the schedule is edited, disabled or removed.

use crate::clock::{TimerHandle, TimerQueue, TimerToken};
use crate::error::ConfigError;
use crate::model::{Repeat, ScheduledActivation, Timestamp};
use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use std::collections::HashMap;

/// Which end of a scheduled session a timer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleTimerPhase {
    Start,
    End,
}

/// Next moment strictly after `now` at which `schedule` should activate
///
/// Returns None for inactive schedules, spent one-time schedules, `Never`,
/// and schedules whose recurrence data is missing.
pub fn next_occurrence(schedule: &ScheduledActivation, now: Timestamp) -> Option<Timestamp> {
    if !schedule.active {
        return None;
    }

    let time = schedule.start_time.time();
    match schedule.repeat {
        Repeat::Once => (schedule.start_time > now).then_some(schedule.start_time),
        Repeat::Never => None,
        Repeat::Daily => {
            let today = now.date().and_time(time);
            if today > now {
                Some(today)
            } else {
                Some(now.date().succ_opt()?.and_time(time))
            }
        }
        Repeat::Weekly => next_weekly(&schedule.days_of_week, time, now),
        Repeat::Monthly => next_monthly(schedule.date_of_month?, time, now),
    }
}

fn next_weekly(
    days: &std::collections::BTreeSet<u8>,
    time: NaiveTime,
    now: Timestamp,
) -> Option<Timestamp> {
    let today = now.date().weekday().num_days_from_sunday() as i64;

    days.iter()
        .filter(|&&day| day <= 6)
        .filter_map(|&day| {
            let offset = (day as i64 - today).rem_euclid(7) as u64;
            let candidate = now.date().checked_add_days(Days::new(offset))?.and_time(time);
            if candidate > now {
                Some(candidate)
            } else {
                Some(candidate.date().checked_add_days(Days::new(7))?.and_time(time))
            }
        })
        .min()
}

fn next_monthly(date_of_month: u32, time: NaiveTime, now: Timestamp) -> Option<Timestamp> {
    if !(1..=31).contains(&date_of_month) {
        return None;
    }

    let this_month = clamped_date(now.year(), now.month(), date_of_month)?.and_time(time);
    if this_month > now {
        return Some(this_month);
    }

    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Some(clamped_date(year, month, date_of_month)?.and_time(time))
}

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    Some(
        NaiveDate::from_ymd_opt(next_year, next_month, 1)?
            .pred_opt()?
            .day(),
    )
}

fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.min(days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Reject schedules that could never fire
pub fn validate_schedule(schedule: &ScheduledActivation) -> Result<(), ConfigError> {
    if schedule.id.trim().is_empty() {
        return Err(ConfigError::InvalidSchedule(
            "schedule id must not be empty".to_string(),
        ));
    }

    if let Some(end) = schedule.end_time {
        if end <= schedule.start_time {
            return Err(ConfigError::InvalidSchedule(format!(
                "end time {} must be after start time {}",
                end, schedule.start_time
            )));
        }
    }

    match schedule.repeat {
        Repeat::Weekly => {
            if schedule.days_of_week.is_empty() {
                return Err(ConfigError::InvalidSchedule(
                    "weekly schedule needs at least one day of the week".to_string(),
                ));
            }
            if let Some(day) = schedule.days_of_week.iter().find(|&&d| d > 6) {
                return Err(ConfigError::InvalidSchedule(format!(
                    "day of week {} is out of range (0 = Sunday .. 6 = Saturday)",
                    day
                )));
            }
        }
        Repeat::Monthly => match schedule.date_of_month {
            Some(day) if (1..=31).contains(&day) => {}
            Some(day) => {
                return Err(ConfigError::InvalidSchedule(format!(
                    "date of month {} is out of range (1-31)",
                    day
                )));
            }
            None => {
                return Err(ConfigError::InvalidSchedule(
                    "monthly schedule needs a date of month".to_string(),
                ));
            }
        },
        Repeat::Once | Repeat::Daily | Repeat::Never => {}
    }

    Ok(())
}

#[derive(Debug, Default)]
struct LiveSchedule {
    start: Option<TimerHandle>,
    end: Option<TimerHandle>,
}

/// Live timers for every armed schedule, keyed by schedule id
#[derive(Debug, Default)]
pub struct ScheduleEngine {
    live: HashMap<String, LiveSchedule>,
}

impl ScheduleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)arm the start timer for the next occurrence of `schedule`
    ///
    /// Any previously armed start timer is cancelled first. Returns the
    /// deadline, or None if the schedule has nothing left to fire.
    pub fn arm(
        &mut self,
        timers: &mut TimerQueue,
        schedule: &ScheduledActivation,
        now: Timestamp,
    ) -> Option<Timestamp> {
        self.cancel_start(timers, &schedule.id);

        let next = next_occurrence(schedule, now)?;
        let handle = timers.arm_at(
            next,
            TimerToken::Schedule {
                id: schedule.id.clone(),
                phase: ScheduleTimerPhase::Start,
            },
        );
        self.live.entry(schedule.id.clone()).or_default().start = Some(handle);
        log::debug!("Schedule {} armed for {}", schedule.id, next);
        Some(next)
    }

    /// Arm the end-of-session timer for a schedule that just fired
    pub fn arm_end(&mut self, timers: &mut TimerQueue, id: &str, at: Timestamp) {
        let entry = self.live.entry(id.to_string()).or_default();
        if let Some(old) = entry.end.take() {
            timers.cancel(old);
        }
        entry.end = Some(timers.arm_at(
            at,
            TimerToken::Schedule {
                id: id.to_string(),
                phase: ScheduleTimerPhase::End,
            },
        ));
        log::debug!("Schedule {} will end its session at {}", id, at);
    }

    /// Forget the handle of a timer that has just fired
    pub fn fired(&mut self, id: &str, phase: ScheduleTimerPhase) {
        if let Some(entry) = self.live.get_mut(id) {
            match phase {
                ScheduleTimerPhase::Start => entry.start = None,
                ScheduleTimerPhase::End => entry.end = None,
            }
            if entry.start.is_none() && entry.end.is_none() {
                self.live.remove(id);
            }
        }
    }

    /// Cancel every timer belonging to `id`
    pub fn disarm(&mut self, timers: &mut TimerQueue, id: &str) {
        if let Some(entry) = self.live.remove(id) {
            for handle in [entry.start, entry.end].into_iter().flatten() {
                timers.cancel(handle);
            }
            log::debug!("Schedule {} disarmed", id);
        }
    }

    /// Cancel pending end-of-session timers; start timers stay armed
    pub fn cancel_end_timers(&mut self, timers: &mut TimerQueue) {
        for entry in self.live.values_mut() {
            if let Some(handle) = entry.end.take() {
                timers.cancel(handle);
            }
        }
        self.live.retain(|_, entry| entry.start.is_some());
    }

    /// Deadline of the armed start timer for `id`
    pub fn next_fire(&self, timers: &TimerQueue, id: &str) -> Option<Timestamp> {
        let handle = self.live.get(id)?.start?;
        timers.deadline(handle)
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.live.get(id).is_some_and(|entry| entry.start.is_some())
    }

    /// Number of schedules with an armed start timer
    pub fn armed_count(&self) -> usize {
        self.live.values().filter(|entry| entry.start.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }

    fn cancel_start(&mut self, timers: &mut TimerQueue, id: &str) {
        if let Some(handle) = self.live.get_mut(id).and_then(|entry| entry.start.take()) {
            timers.cancel(handle);
        }
    }
}
