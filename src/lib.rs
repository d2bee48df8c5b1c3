//! Booking and lifecycle rules for home physiotherapy consultations.
//!
//! A consultation is booked at least 48 hours ahead, may be confirmed at any
//! time, and may only be cancelled or rescheduled while 48 hours or more
//! remain before it starts. State lives in a key-value store with one JSON
//! document per partition.

pub mod auth;
pub mod catalog;
pub mod clock;
pub mod demo;
pub mod error;
pub mod models;
pub mod policy;
pub mod service;
pub mod store;

pub use auth::{AccountService, NewUser};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, ServiceError, StoreError};
pub use models::{
    BookingRequest, Consultation, ConsultationStatus, ConsultationType, ProfileUpdate, Session,
    User, UserType,
};
pub use policy::{AllowedActions, SchedulingPolicy, Timeframe};
pub use service::{ConsultationService, ConsultationStats};
pub use store::{FileStore, KeyValueStore, MemoryStore};
