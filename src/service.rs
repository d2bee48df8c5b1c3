//! Consultation booking and lifecycle.
//!
//! The service keeps the consultation partition in memory, indexed by id, and
//! writes it back to the store on every mutation. A mutation the store refuses
//! is rolled back in memory as well. Each
//! operation samples the clock once, so a single decision never straddles two
//! different "now"s.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ServiceError};
use crate::models::{
    BookingRequest, Consultation, ConsultationStatus, ConsultationType, Session,
};
use crate::policy::{AllowedActions, SchedulingPolicy, Timeframe};
use crate::store::{Collection, KeyValueStore, CONSULTATIONS_KEY};

/// Counts shown at the top of a patient's consultations screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsultationStats {
    pub upcoming: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub total: usize,
}

pub struct ConsultationService<S, C = SystemClock> {
    store: S,
    clock: C,
    policy: SchedulingPolicy,
    consultations: Collection<Consultation>,
}

impl<S: KeyValueStore> ConsultationService<S, SystemClock> {
    pub fn open(store: S, policy: SchedulingPolicy) -> Result<Self> {
        Self::with_clock(store, policy, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> ConsultationService<S, C> {
    pub fn with_clock(store: S, policy: SchedulingPolicy, clock: C) -> Result<Self> {
        let consultations = Collection::load(&store, CONSULTATIONS_KEY)?;
        Ok(ConsultationService {
            store,
            clock,
            policy,
            consultations,
        })
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Book a consultation for the session's patient.
    ///
    /// In-person visits need a full address; online ones drop any address
    /// given. The slot must be at least the policy's notice away.
    pub fn book(&mut self, session: &Session, request: BookingRequest) -> Result<Consultation> {
        let now = self.clock.now();
        validate_request(&request)?;

        let (address, city, state) = match request.consultation_type {
            ConsultationType::InPerson => {
                let (address, city, state) = request
                    .complete_address()
                    .ok_or(ServiceError::IncompleteAddress)?;
                (Some(address), Some(city), Some(state))
            }
            ConsultationType::Online => (None, None, None),
        };

        let starts_at = request.starts_at();
        if !self.policy.is_bookable(starts_at, now) {
            let hours = crate::policy::hours_between(now, starts_at);
            warn!(patient_id = %session.user_id(), hours, "booking refused: too soon");
            return Err(ServiceError::SchedulingTooSoon {
                hours,
                notice_hours: self.policy.notice_hours(),
            });
        }

        let consultation = Consultation {
            id: format!("consultation_{}", Uuid::new_v4().simple()),
            patient_id: session.user_id().to_string(),
            physiotherapist_id: request.physiotherapist_id.trim().to_string(),
            physiotherapist_name: request.physiotherapist_name.trim().to_string(),
            date: request.date,
            time: request.time,
            consultation_type: request.consultation_type,
            specialty: request.specialty.trim().to_string(),
            status: ConsultationStatus::Scheduled,
            address,
            city,
            state,
            notes: request
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            price: request.price,
            created_at: now,
        };

        let booked = self.insert(consultation)?;
        info!(
            consultation_id = %booked.id,
            patient_id = %booked.patient_id,
            starts_at = %booked.starts_at(),
            "booked consultation"
        );
        Ok(booked)
    }

    /// Store a consultation as given, without any policy check.
    pub(crate) fn insert(&mut self, consultation: Consultation) -> Result<Consultation> {
        self.commit(consultation)
    }

    /// All consultations, or one patient's, in booking order.
    pub fn list(&self, patient_id: Option<&str>) -> Vec<Consultation> {
        self.consultations
            .iter()
            .filter(|c| patient_id.map_or(true, |id| c.patient_id == id))
            .cloned()
            .collect()
    }

    pub fn list_for(&self, session: &Session) -> Vec<Consultation> {
        self.list(Some(session.user_id()))
    }

    pub fn get(&self, id: &str) -> Result<&Consultation> {
        self.consultations
            .get(id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Confirm a consultation. No notice is required to confirm.
    pub fn confirm(&mut self, id: &str) -> Result<Consultation> {
        let updated = self.transition(id, ConsultationStatus::Confirmed, None)?;
        info!(consultation_id = %id, "confirmed consultation");
        Ok(updated)
    }

    /// Cancel a consultation while the change window is open. The record is kept.
    pub fn cancel(&mut self, id: &str) -> Result<Consultation> {
        let now = self.clock.now();
        let updated = self.transition(id, ConsultationStatus::Cancelled, Some(now))?;
        info!(consultation_id = %id, "cancelled consultation");
        Ok(updated)
    }

    /// Mark a consultation as held.
    pub fn complete(&mut self, id: &str) -> Result<Consultation> {
        let updated = self.transition(id, ConsultationStatus::Completed, None)?;
        info!(consultation_id = %id, "completed consultation");
        Ok(updated)
    }

    /// Move a consultation to a new date and time.
    ///
    /// The window is checked against the current slot, before anything
    /// changes. Only the date and time are rewritten.
    pub fn reschedule(&mut self, id: &str, date: NaiveDate, time: NaiveTime) -> Result<Consultation> {
        let now = self.clock.now();
        let current = self.get(id)?;
        if current.status.is_terminal() {
            warn!(consultation_id = %id, status = %current.status, "reschedule refused");
            return Err(ServiceError::AlreadyClosed(current.status));
        }
        self.check_window(current, now)?;

        let previous = current.starts_at();
        let mut moved = current.clone();
        moved.date = date;
        moved.time = time;
        let updated = self.commit(moved)?;

        info!(
            consultation_id = %id,
            from = %previous,
            to = %updated.starts_at(),
            "rescheduled consultation"
        );
        Ok(updated)
    }

    pub fn allowed_actions(&self, id: &str) -> Result<AllowedActions> {
        let now = self.clock.now();
        Ok(self.policy.allowed_actions(self.get(id)?, now))
    }

    /// The patient's consultations still to happen, soonest first.
    pub fn upcoming(&self, patient_id: &str) -> Vec<Consultation> {
        let now = self.clock.now();
        let mut upcoming = self.in_timeframe(patient_id, Timeframe::Upcoming, now);
        upcoming.sort_by_key(Consultation::starts_at);
        upcoming
    }

    /// The patient's finished, cancelled or elapsed consultations, latest first.
    pub fn history(&self, patient_id: &str) -> Vec<Consultation> {
        let now = self.clock.now();
        let mut history = self.in_timeframe(patient_id, Timeframe::Past, now);
        history.sort_by_key(|c| std::cmp::Reverse(c.starts_at()));
        history
    }

    pub fn stats(&self, patient_id: &str) -> ConsultationStats {
        let now = self.clock.now();
        self.consultations
            .iter()
            .filter(|c| c.patient_id == patient_id)
            .fold(ConsultationStats::default(), |mut stats, c| {
                stats.total += 1;
                match c.status {
                    ConsultationStatus::Completed => stats.completed += 1,
                    ConsultationStatus::Cancelled => stats.cancelled += 1,
                    _ => {}
                }
                if self.policy.classify_timeframe(c, now) == Timeframe::Upcoming {
                    stats.upcoming += 1;
                }
                stats
            })
    }

    fn in_timeframe(&self, patient_id: &str, timeframe: Timeframe, now: NaiveDateTime) -> Vec<Consultation> {
        self.consultations
            .iter()
            .filter(|c| c.patient_id == patient_id)
            .filter(|c| self.policy.classify_timeframe(c, now) == timeframe)
            .cloned()
            .collect()
    }

    /// Apply a status change, checking the lifecycle and, when `window_at` is
    /// given, the change window at that instant.
    fn transition(
        &mut self,
        id: &str,
        next: ConsultationStatus,
        window_at: Option<NaiveDateTime>,
    ) -> Result<Consultation> {
        let current = self.get(id)?;
        if !current.status.can_transition_to(next) {
            warn!(consultation_id = %id, from = %current.status, to = %next, "status change refused");
            return Err(ServiceError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }
        if let Some(now) = window_at {
            self.check_window(current, now)?;
        }

        let mut updated = current.clone();
        updated.status = next;
        self.commit(updated)
    }

    fn check_window(&self, consultation: &Consultation, now: NaiveDateTime) -> Result<()> {
        if self.policy.is_eligible_for_change(consultation, now) {
            return Ok(());
        }
        let hours = self.policy.hours_remaining(consultation, now);
        warn!(consultation_id = %consultation.id, hours, "change refused: window closed");
        Err(ServiceError::WindowClosed {
            hours,
            notice_hours: self.policy.notice_hours(),
        })
    }

    fn commit(&mut self, consultation: Consultation) -> Result<Consultation> {
        let stored = self
            .consultations
            .commit(&self.store, CONSULTATIONS_KEY, consultation)?
            .clone();
        debug!(count = self.consultations.len(), "saved consultations");
        Ok(stored)
    }
}

fn validate_request(request: &BookingRequest) -> Result<()> {
    if request.physiotherapist_id.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Physiotherapist ID cannot be empty".to_string(),
        ));
    }
    if request.physiotherapist_name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Physiotherapist name cannot be empty".to_string(),
        ));
    }
    if request.specialty.trim().is_empty() {
        return Err(ServiceError::Validation("Specialty cannot be empty".to_string()));
    }
    if !request.price.is_finite() || request.price < 0.0 {
        return Err(ServiceError::Validation(format!(
            "Invalid price: {}",
            request.price
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{parse_date, parse_time, User, UserType};
    use crate::store::{FlakyStore, MemoryStore};
    use chrono::Duration;

    fn start() -> NaiveDateTime {
        parse_date("2025-10-01").unwrap().and_time(parse_time("09:00").unwrap())
    }

    fn session(id: &str) -> Session {
        Session::new(User {
            id: id.into(),
            name: "Maria Silva".into(),
            email: format!("{}@email.com", id),
            phone: String::new(),
            address: String::new(),
            password: "demo123".into(),
            user_type: UserType::Patient,
            created_at: start(),
        })
    }

    fn online_at(at: NaiveDateTime) -> BookingRequest {
        BookingRequest {
            physiotherapist_id: "physio_3".into(),
            physiotherapist_name: "Dr. Pedro Oliveira".into(),
            date: at.date(),
            time: at.time(),
            consultation_type: ConsultationType::Online,
            specialty: "Esportiva".into(),
            price: 100.0,
            address: Some("ignored".into()),
            city: None,
            state: None,
            notes: Some("  ".into()),
        }
    }

    fn service(store: &MemoryStore) -> ConsultationService<MemoryStore, FixedClock> {
        ConsultationService::with_clock(
            store.clone(),
            SchedulingPolicy::default(),
            FixedClock::new(start()),
        )
        .unwrap()
    }

    #[test]
    fn online_booking_drops_address_and_blank_notes() {
        let store = MemoryStore::new();
        let mut consultations = service(&store);
        let booked = consultations
            .book(&session("user_1"), online_at(start() + Duration::hours(72)))
            .unwrap();

        assert_eq!(booked.status, ConsultationStatus::Scheduled);
        assert_eq!(booked.address, None);
        assert_eq!(booked.notes, None);
        assert_eq!(booked.created_at, start());
        assert!(booked.id.starts_with("consultation_"));
    }

    #[test]
    fn invalid_requests_are_rejected_before_storing() {
        let store = MemoryStore::new();
        let mut consultations = service(&store);
        let later = start() + Duration::hours(72);

        let mut request = online_at(later);
        request.physiotherapist_id = " ".into();
        assert!(matches!(
            consultations.book(&session("user_1"), request),
            Err(ServiceError::Validation(_))
        ));

        let mut request = online_at(later);
        request.price = -1.0;
        assert!(matches!(
            consultations.book(&session("user_1"), request),
            Err(ServiceError::Validation(_))
        ));

        assert!(consultations.list(None).is_empty());
    }

    #[test]
    fn list_filters_by_patient_in_booking_order() {
        let store = MemoryStore::new();
        let mut consultations = service(&store);
        let later = start() + Duration::hours(72);

        let a = consultations.book(&session("user_1"), online_at(later + Duration::days(3))).unwrap();
        let b = consultations.book(&session("user_2"), online_at(later)).unwrap();
        let c = consultations.book(&session("user_1"), online_at(later)).unwrap();

        let mine: Vec<String> = consultations.list(Some("user_1")).into_iter().map(|c| c.id).collect();
        assert_eq!(mine, [a.id.clone(), c.id.clone()]);
        assert_eq!(consultations.list(None).len(), 3);
        assert_eq!(consultations.list_for(&session("user_2"))[0].id, b.id);

        let reopened = service(&store);
        assert_eq!(reopened.list(None).len(), 3);
    }

    #[test]
    fn terminal_states_cannot_be_left() {
        let store = MemoryStore::new();
        let mut consultations = service(&store);
        let booked = consultations
            .book(&session("user_1"), online_at(start() + Duration::hours(96)))
            .unwrap();

        consultations.cancel(&booked.id).unwrap();
        assert!(matches!(
            consultations.confirm(&booked.id),
            Err(ServiceError::InvalidTransition { from: ConsultationStatus::Cancelled, .. })
        ));
        assert!(matches!(
            consultations.reschedule(&booked.id, start().date(), start().time()),
            Err(ServiceError::AlreadyClosed(ConsultationStatus::Cancelled))
        ));
        assert!(matches!(
            consultations.complete(&booked.id),
            Err(ServiceError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn complete_needs_no_window() {
        let store = MemoryStore::new();
        let mut consultations = service(&store);
        let booked = consultations
            .book(&session("user_1"), online_at(start() + Duration::hours(50)))
            .unwrap();

        consultations.clock().advance(Duration::hours(51));
        let done = consultations.complete(&booked.id).unwrap();
        assert_eq!(done.status, ConsultationStatus::Completed);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let store = MemoryStore::new();
        let mut consultations = service(&store);
        assert!(matches!(consultations.confirm("missing"), Err(ServiceError::NotFound(id)) if id == "missing"));
        assert!(matches!(consultations.cancel("missing"), Err(ServiceError::NotFound(_))));
        assert!(matches!(consultations.allowed_actions("missing"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn upcoming_history_and_stats() {
        let store = MemoryStore::new();
        let mut consultations = service(&store);
        let me = session("user_1");

        let far = consultations.book(&me, online_at(start() + Duration::days(10))).unwrap();
        let near = consultations.book(&me, online_at(start() + Duration::days(3))).unwrap();
        let dropped = consultations.book(&me, online_at(start() + Duration::days(5))).unwrap();
        consultations.cancel(&dropped.id).unwrap();
        consultations.book(&session("user_2"), online_at(start() + Duration::days(4))).unwrap();

        let upcoming: Vec<String> = consultations.upcoming("user_1").into_iter().map(|c| c.id).collect();
        assert_eq!(upcoming, [near.id.clone(), far.id.clone()]);
        assert_eq!(consultations.history("user_1")[0].id, dropped.id);

        // near elapses and is held; it moves to history
        consultations.clock().advance(Duration::days(3) + Duration::hours(1));
        consultations.complete(&near.id).unwrap();

        let stats = consultations.stats("user_1");
        assert_eq!(
            stats,
            ConsultationStats { upcoming: 1, completed: 1, cancelled: 1, total: 3 }
        );
        let history: Vec<String> = consultations.history("user_1").into_iter().map(|c| c.id).collect();
        assert_eq!(history, [dropped.id, near.id]);
    }

    #[test]
    fn refused_writes_change_nothing() {
        let store = FlakyStore::default();
        let mut consultations = ConsultationService::with_clock(
            store.clone(),
            SchedulingPolicy::default(),
            FixedClock::new(start()),
        )
        .unwrap();
        let me = session("user_1");
        let booked = consultations
            .book(&me, online_at(start() + Duration::hours(96)))
            .unwrap();

        store.fail_writes(true);
        assert!(matches!(
            consultations.book(&me, online_at(start() + Duration::hours(120))),
            Err(ServiceError::Store(_))
        ));
        assert!(consultations.cancel(&booked.id).is_err());
        assert!(consultations.confirm(&booked.id).is_err());
        let later = start() + Duration::days(20);
        assert!(consultations.reschedule(&booked.id, later.date(), later.time()).is_err());

        assert_eq!(consultations.list(None), vec![booked.clone()]);

        // the next good write must not carry the refused changes along
        store.fail_writes(false);
        consultations.complete(&booked.id).unwrap();
        let reopened = ConsultationService::with_clock(
            store,
            SchedulingPolicy::default(),
            FixedClock::new(start()),
        )
        .unwrap();
        let stored = reopened.list(None);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, ConsultationStatus::Completed);
        assert_eq!(stored[0].starts_at(), booked.starts_at());
    }
}
