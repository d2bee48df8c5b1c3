//! Time-based rules for booking and changing consultations.
//!
//! Everything here is a pure function of a consultation and a "now" that the
//! caller samples once per decision.

use chrono::{Duration, NaiveDateTime};

use crate::models::{Consultation, ConsultationStatus};

/// Minimum notice, in hours, to book, cancel or reschedule.
pub const DEFAULT_NOTICE_HOURS: i64 = 48;

/// Largest notice accepted: one year.
pub const MAX_NOTICE_HOURS: i64 = 24 * 365;

/// Largest "days out" cutoff accepted for the upcoming list.
pub const MAX_UPCOMING_MIN_DAYS: i64 = 365;

/// Where a consultation belongs on the consultations screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Upcoming,
    Past,
}

/// What a patient may do with a consultation right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllowedActions {
    pub confirm: bool,
    pub cancel: bool,
    pub reschedule: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    notice: Duration,
    upcoming_min_days: Option<i64>,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        SchedulingPolicy::new(DEFAULT_NOTICE_HOURS)
    }
}

impl SchedulingPolicy {
    /// Notice is clamped to `0..=MAX_NOTICE_HOURS`.
    pub fn new(notice_hours: i64) -> Self {
        SchedulingPolicy {
            notice: Duration::hours(notice_hours.clamp(0, MAX_NOTICE_HOURS)),
            upcoming_min_days: None,
        }
    }

    /// Only list consultations at least `days` calendar days out as upcoming.
    ///
    /// Off unless configured; some old screens hid anything sooner than two
    /// days from the upcoming tab.
    pub fn with_upcoming_min_days(mut self, days: Option<i64>) -> Self {
        self.upcoming_min_days = days.map(|d| d.clamp(0, MAX_UPCOMING_MIN_DAYS));
        self
    }

    pub fn notice_hours(&self) -> i64 {
        self.notice.num_hours()
    }

    /// Hours between `now` and the appointment, negative once it has started.
    pub fn hours_remaining(&self, consultation: &Consultation, now: NaiveDateTime) -> f64 {
        hours_between(now, consultation.starts_at())
    }

    /// Whether a slot starting at `starts_at` is far enough ahead to book.
    pub fn is_bookable(&self, starts_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        starts_at - now >= self.notice
    }

    /// Cancel and reschedule share this window: allowed only with at least
    /// the full notice left before the appointment. The boundary is inclusive.
    pub fn is_eligible_for_change(&self, consultation: &Consultation, now: NaiveDateTime) -> bool {
        consultation.starts_at() - now >= self.notice
    }

    pub fn classify_timeframe(&self, consultation: &Consultation, now: NaiveDateTime) -> Timeframe {
        let active = matches!(
            consultation.status,
            ConsultationStatus::Scheduled | ConsultationStatus::Confirmed
        );
        let in_future = consultation.starts_at() > now;
        let past_cutoff = match self.upcoming_min_days {
            Some(days) => now
                .date()
                .checked_add_signed(Duration::days(days))
                .map_or(false, |cutoff| consultation.date >= cutoff),
            None => true,
        };

        if active && in_future && past_cutoff {
            Timeframe::Upcoming
        } else {
            Timeframe::Past
        }
    }

    pub fn allowed_actions(&self, consultation: &Consultation, now: NaiveDateTime) -> AllowedActions {
        let status = consultation.status;
        let in_window = self.is_eligible_for_change(consultation, now);
        AllowedActions {
            confirm: status == ConsultationStatus::Scheduled,
            cancel: status.can_transition_to(ConsultationStatus::Cancelled) && in_window,
            reschedule: !status.is_terminal() && in_window,
        }
    }
}

pub(crate) fn hours_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}
