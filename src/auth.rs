//! Local accounts and the current session.
//!
//! Credentials are compared as stored. There is no hashing or token: this is
//! the single-device login of the app, not an authentication system.

use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ServiceError};
use crate::models::{normalize_email, ProfileUpdate, Session, User, UserType};
use crate::store::{
    read_json, write_json, Collection, KeyValueStore, CURRENT_USER_KEY, USERS_KEY,
};

/// Registration form.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub password: String,
    pub user_type: UserType,
}

pub struct AccountService<S, C = SystemClock> {
    store: S,
    clock: C,
    users: Collection<User>,
}

impl<S: KeyValueStore> AccountService<S, SystemClock> {
    pub fn open(store: S) -> Result<Self> {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> AccountService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Result<Self> {
        let users = Collection::load(&store, USERS_KEY)?;
        Ok(AccountService {
            store,
            clock,
            users,
        })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email_matches(email))
    }

    /// Create an account. Registering does not log the user in.
    pub fn register(&mut self, form: NewUser) -> Result<User> {
        let name = form.name.trim();
        let email = normalize_email(&form.email);
        if name.is_empty() {
            return Err(ServiceError::Validation("Name cannot be empty".to_string()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation(format!(
                "Invalid e-mail: '{}'",
                form.email
            )));
        }
        if form.password.is_empty() {
            return Err(ServiceError::Validation("Password cannot be empty".to_string()));
        }
        if self.find_by_email(&email).is_some() {
            warn!(email = %email, "registration refused: e-mail taken");
            return Err(ServiceError::EmailTaken(email));
        }

        let user = User {
            id: format!("user_{}", Uuid::new_v4().simple()),
            name: name.to_string(),
            email,
            phone: form.phone.trim().to_string(),
            address: form.address.trim().to_string(),
            password: form.password,
            user_type: form.user_type,
            created_at: self.clock.now(),
        };
        self.insert_user(user)
    }

    /// Store a fully formed user record, e.g. a seeded demo account.
    pub(crate) fn insert_user(&mut self, user: User) -> Result<User> {
        let user = self.users.commit(&self.store, USERS_KEY, user)?.clone();
        info!(user_id = %user.id, user_type = user.user_type.name(), "registered user");
        Ok(user)
    }

    /// Check credentials and make the user the current session.
    pub fn login(&mut self, email: &str, password: &str) -> Result<Session> {
        let user = self
            .users
            .iter()
            .find(|u| u.email_matches(email) && u.password == password)
            .cloned()
            .ok_or_else(|| {
                warn!(email = %normalize_email(email), "login refused");
                ServiceError::InvalidCredentials
            })?;

        let session = Session::new(user);
        write_json(&self.store, CURRENT_USER_KEY, &session.user)?;
        info!(user_id = %session.user_id(), "logged in");
        Ok(session)
    }

    pub fn logout(&mut self) -> Result<()> {
        self.store.remove(CURRENT_USER_KEY)?;
        info!("logged out");
        Ok(())
    }

    pub fn current_session(&self) -> Result<Option<Session>> {
        Ok(read_json::<User, _>(&self.store, CURRENT_USER_KEY)?.map(Session::new))
    }

    pub fn require_session(&self) -> Result<Session> {
        self.current_session()?.ok_or(ServiceError::NotAuthenticated)
    }

    /// Apply profile edits to the session's user and refresh the stored session.
    pub fn update_profile(&mut self, session: &Session, update: ProfileUpdate) -> Result<Session> {
        let previous = self
            .users
            .get(session.user_id())
            .cloned()
            .ok_or(ServiceError::NotAuthenticated)?;

        let mut user = previous.clone();
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ServiceError::Validation("Name cannot be empty".to_string()));
            }
            user.name = name.to_string();
        }
        if let Some(phone) = update.phone {
            user.phone = phone.trim().to_string();
        }
        if let Some(address) = update.address {
            user.address = address.trim().to_string();
        }

        let updated = Session::new(self.users.commit(&self.store, USERS_KEY, user)?.clone());
        if let Err(err) = write_json(&self.store, CURRENT_USER_KEY, &updated.user) {
            self.users.commit(&self.store, USERS_KEY, previous)?;
            return Err(err.into());
        }
        info!(user_id = %updated.user_id(), "updated profile");
        Ok(updated)
    }
}
