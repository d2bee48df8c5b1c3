//! Demo accounts and consultations for trying the app out.

use chrono::{Duration, NaiveTime};
use tracing::info;

use crate::auth::AccountService;
use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Consultation, ConsultationStatus, ConsultationType, User, UserType};
use crate::service::ConsultationService;
use crate::store::KeyValueStore;

pub const DEMO_PASSWORD: &str = "demo123";
pub const DEMO_PATIENT_EMAIL: &str = "maria.silva@email.com";
pub const DEMO_PHYSIO_EMAIL: &str = "ana.beatriz@fisiovem.com";

/// Add the demo patient and physiotherapist unless their e-mails exist.
///
/// Returns how many accounts were added.
pub fn seed_demo_users<S: KeyValueStore, C: Clock>(accounts: &mut AccountService<S, C>) -> Result<usize> {
    let demo = [
        (
            "demo_patient",
            "Maria Silva",
            DEMO_PATIENT_EMAIL,
            "(11) 99999-9999",
            "Rua das Flores, 123 - Vila Madalena, São Paulo",
            UserType::Patient,
        ),
        (
            "demo_physio",
            "Ana Beatriz Costa",
            DEMO_PHYSIO_EMAIL,
            "(11) 88888-8888",
            "Av. Paulista, 1000 - Bela Vista, São Paulo",
            UserType::Physiotherapist,
        ),
    ];

    let now = accounts.clock().now();
    let mut added = 0;
    for (id, name, email, phone, address, user_type) in demo {
        if accounts.find_by_email(email).is_some() {
            continue;
        }
        accounts.insert_user(User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            address: address.to_string(),
            password: DEMO_PASSWORD.to_string(),
            user_type,
            created_at: now,
        })?;
        added += 1;
    }
    Ok(added)
}

/// Give a patient with no consultations two sample ones.
///
/// One is in person two days out at 14:00; the other is online tomorrow at
/// 16:00, inside the change window, so it shows a consultation that can no
/// longer be cancelled. Both skip the booking window check.
pub fn seed_demo_consultations<S: KeyValueStore, C: Clock>(
    consultations: &mut ConsultationService<S, C>,
    patient_id: &str,
) -> Result<Vec<Consultation>> {
    if !consultations.list(Some(patient_id)).is_empty() {
        return Ok(Vec::new());
    }

    let now = consultations.clock().now();
    let today = now.date();
    let at = |hour| NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);

    let samples = [
        Consultation {
            id: format!("demo_consultation_1_{}", patient_id),
            patient_id: patient_id.to_string(),
            physiotherapist_id: "demo_physio".to_string(),
            physiotherapist_name: "Ana Beatriz Costa".to_string(),
            date: today + Duration::days(2),
            time: at(14),
            consultation_type: ConsultationType::InPerson,
            specialty: "Ortopedia".to_string(),
            status: ConsultationStatus::Scheduled,
            address: Some("Rua das Flores, 123 - Vila Madalena".to_string()),
            city: Some("São Paulo".to_string()),
            state: Some("SP".to_string()),
            notes: Some("Sample consultation two days ahead".to_string()),
            price: 120.0,
            created_at: now,
        },
        Consultation {
            id: format!("demo_consultation_2_{}", patient_id),
            patient_id: patient_id.to_string(),
            physiotherapist_id: "demo_physio".to_string(),
            physiotherapist_name: "Ana Beatriz Costa".to_string(),
            date: today + Duration::days(1),
            time: at(16),
            consultation_type: ConsultationType::Online,
            specialty: "Neurologia".to_string(),
            status: ConsultationStatus::Scheduled,
            address: None,
            city: None,
            state: None,
            notes: Some("Sample consultation tomorrow; too close to cancel".to_string()),
            price: 100.0,
            created_at: now,
        },
    ];

    let mut seeded = Vec::with_capacity(samples.len());
    for sample in samples {
        seeded.push(consultations.insert(sample)?);
    }
    info!(patient_id, count = seeded.len(), "seeded demo consultations");
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::policy::SchedulingPolicy;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn clock() -> FixedClock {
        FixedClock::new(
            NaiveDate::from_ymd_opt(2025, 9, 30)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn demo_users_are_seeded_once_and_can_log_in() {
        let store = MemoryStore::new();
        let mut accounts = AccountService::with_clock(store.clone(), clock()).unwrap();

        assert_eq!(seed_demo_users(&mut accounts).unwrap(), 2);
        assert_eq!(seed_demo_users(&mut accounts).unwrap(), 0);

        let session = accounts.login(DEMO_PATIENT_EMAIL, DEMO_PASSWORD).unwrap();
        assert_eq!(session.user_id(), "demo_patient");
    }

    #[test]
    fn demo_consultations_show_both_sides_of_the_window() {
        let store = MemoryStore::new();
        let mut consultations =
            ConsultationService::with_clock(store, SchedulingPolicy::default(), clock()).unwrap();

        let seeded = seed_demo_consultations(&mut consultations, "demo_patient").unwrap();
        assert_eq!(seeded.len(), 2);
        assert!(seed_demo_consultations(&mut consultations, "demo_patient")
            .unwrap()
            .is_empty());

        let two_days = consultations.allowed_actions(&seeded[0].id).unwrap();
        assert!(two_days.cancel);
        let tomorrow = consultations.allowed_actions(&seeded[1].id).unwrap();
        assert!(!tomorrow.cancel && !tomorrow.reschedule);
    }
}
