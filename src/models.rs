//! Data models for the consultation booking system.
//!
//! - UserType / User / Session: accounts and the logged-in user
//! - ConsultationType / ConsultationStatus: modality and lifecycle state
//! - Consultation: a booked appointment with a physiotherapist
//! - BookingRequest: what a patient submits to book one

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Patient,
    Physiotherapist,
}

impl UserType {
    pub fn name(&self) -> &str {
        match self {
            UserType::Patient => "patient",
            UserType::Physiotherapist => "physiotherapist",
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().trim() {
            "patient" => Ok(UserType::Patient),
            "physiotherapist" | "physio" => Ok(UserType::Physiotherapist),
            _ => Err(format!(
                "Invalid user type: '{}'. Must be one of: patient, physiotherapist",
                value
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Stored as entered. Accounts here are a local convenience, not security.
    pub password: String,
    pub user_type: UserType,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn email_matches(&self, email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(email)
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The currently authenticated user, handed to services explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
}

impl Session {
    pub fn new(user: User) -> Self {
        Session { user }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsultationType {
    InPerson,
    Online,
}

impl ConsultationType {
    pub fn name(&self) -> &str {
        match self {
            ConsultationType::InPerson => "in-person",
            ConsultationType::Online => "online",
        }
    }
}

impl FromStr for ConsultationType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().trim() {
            "in-person" | "inperson" | "presencial" => Ok(ConsultationType::InPerson),
            "online" => Ok(ConsultationType::Online),
            _ => Err(format!(
                "Invalid consultation type: '{}'. Must be one of: in-person, online",
                value
            )),
        }
    }
}

/// Lifecycle of a consultation.
///
/// Scheduled moves to confirmed, cancelled or completed; confirmed moves to
/// cancelled or completed. Cancelled and completed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    pub fn name(&self) -> &str {
        match self {
            ConsultationStatus::Scheduled => "scheduled",
            ConsultationStatus::Confirmed => "confirmed",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Completed | ConsultationStatus::Cancelled
        )
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Confirming twice is allowed so that a repeated confirm is a no-op.
    pub fn can_transition_to(&self, next: ConsultationStatus) -> bool {
        use ConsultationStatus::*;
        matches!(
            (*self, next),
            (Scheduled, Confirmed)
                | (Confirmed, Confirmed)
                | (Scheduled | Confirmed, Cancelled)
                | (Scheduled | Confirmed, Completed)
        )
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: String,
    pub patient_id: String,
    pub physiotherapist_id: String,
    pub physiotherapist_name: String,
    pub date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub time: NaiveTime,
    #[serde(rename = "type")]
    pub consultation_type: ConsultationType,
    pub specialty: String,
    pub status: ConsultationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub price: f64,
    pub created_at: NaiveDateTime,
}

impl Consultation {
    /// The appointment instant: date and time combined.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn is_in_person(&self) -> bool {
        self.consultation_type == ConsultationType::InPerson
    }

    /// One-line location for display; "online" for remote sessions.
    pub fn location(&self) -> String {
        if !self.is_in_person() {
            return ConsultationType::Online.name().to_string();
        }
        match (&self.address, &self.city, &self.state) {
            (Some(address), Some(city), Some(state)) => {
                format!("{}, {} - {}", address, city, state)
            }
            _ => "address missing".to_string(),
        }
    }
}

/// A patient's request to book a consultation.
///
/// The patient is taken from the session at booking time.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub physiotherapist_id: String,
    pub physiotherapist_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub consultation_type: ConsultationType,
    pub specialty: String,
    pub price: f64,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub notes: Option<String>,
}

impl BookingRequest {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Address, city and state, each trimmed and required to be non-blank.
    pub fn complete_address(&self) -> Option<(String, String, String)> {
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Some((field(&self.address)?, field(&self.city)?, field(&self.state)?))
    }
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: '{}'. Expected YYYY-MM-DD", value))
}

/// Parse an `HH:MM` (or `HH:MM:SS`) wall-clock time.
pub fn parse_time(value: &str) -> Result<NaiveTime, String> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| format!("Invalid time: '{}'. Expected HH:MM", value))
}

/// Times are persisted as `HH:MM`, the way they are entered.
mod wall_clock {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_follow_lifecycle() {
        use ConsultationStatus::*;
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Confirmed));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Scheduled));
        assert!(Cancelled.is_terminal() && Completed.is_terminal());
    }

    #[test]
    fn parses_enum_names() {
        assert_eq!("Presencial".parse(), Ok(ConsultationType::InPerson));
        assert_eq!(" online ".parse(), Ok(ConsultationType::Online));
        assert!("phone".parse::<ConsultationType>().is_err());
        assert_eq!("physio".parse(), Ok(UserType::Physiotherapist));
    }

    #[test]
    fn consultation_json_uses_wall_clock_time() {
        let consultation = Consultation {
            id: "consultation_1".into(),
            patient_id: "user_1".into(),
            physiotherapist_id: "physio_1".into(),
            physiotherapist_name: "Dr. Carlos Silva".into(),
            date: parse_date("2025-10-02").unwrap(),
            time: parse_time("14:00").unwrap(),
            consultation_type: ConsultationType::Online,
            specialty: "Ortopedia".into(),
            status: ConsultationStatus::Scheduled,
            address: None,
            city: None,
            state: None,
            notes: None,
            price: 120.0,
            created_at: parse_date("2025-09-28").unwrap().and_hms_opt(8, 30, 0).unwrap(),
        };

        let json = serde_json::to_value(&consultation).unwrap();
        assert_eq!(json["time"], "14:00");
        assert_eq!(json["date"], "2025-10-02");
        assert_eq!(json["type"], "online");
        assert_eq!(json["status"], "scheduled");
        assert!(json.get("address").is_none());

        let back: Consultation = serde_json::from_value(json).unwrap();
        assert_eq!(back, consultation);
        assert!(!consultation.is_in_person());
        assert_eq!(consultation.location(), "online");
    }

    #[test]
    fn complete_address_rejects_blank_fields() {
        let mut request = BookingRequest {
            physiotherapist_id: "physio_1".into(),
            physiotherapist_name: "Dr. Carlos Silva".into(),
            date: parse_date("2025-10-02").unwrap(),
            time: parse_time("14:00").unwrap(),
            consultation_type: ConsultationType::InPerson,
            specialty: "Ortopedia".into(),
            price: 120.0,
            address: Some("Rua das Flores, 123".into()),
            city: Some("São Paulo".into()),
            state: Some("  ".into()),
            notes: None,
        };
        assert!(request.complete_address().is_none());

        request.state = Some(" SP ".into());
        let (_, _, state) = request.complete_address().unwrap();
        assert_eq!(state, "SP");
    }
}
