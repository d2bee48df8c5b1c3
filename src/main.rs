//! Command-line front end for booking and managing consultations.
//!
//! Each subcommand stands in for one screen of the app: it opens the store,
//! runs one service call with the logged-in session and prints the outcome.

mod config;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use fisiovem::models::{parse_date, parse_time};
use fisiovem::{
    catalog, demo, AccountService, BookingRequest, Clock, Consultation, ConsultationService,
    ConsultationType, FileStore, FixedClock, MemoryStore, NewUser, ProfileUpdate, SchedulingPolicy,
    ServiceError, Session, UserType,
};

#[derive(Parser)]
#[command(name = "fisiovem")]
#[command(about = "Book and manage home physiotherapy consultations")]
#[command(version)]
struct Cli {
    /// Directory holding the stored data (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
        /// patient or physiotherapist
        #[arg(long, default_value = "patient")]
        user_type: UserType,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the current session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Edit the logged-in user's profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Browse physiotherapists
    Physios {
        #[arg(long, conflicts_with = "search")]
        specialty: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Book a consultation with a physiotherapist from the catalog
    Book {
        /// Physiotherapist id, e.g. physio_1
        #[arg(long)]
        physio: String,
        /// YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        /// HH:MM
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
        /// in-person or online
        #[arg(long = "type", default_value = "in-person")]
        consultation_type: ConsultationType,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List consultations
    List {
        /// Every patient's consultations, not just the logged-in user's
        #[arg(long)]
        all: bool,
    },
    /// Consultations still to happen
    Upcoming,
    /// Finished, cancelled and elapsed consultations
    History,
    /// Consultation counts for the logged-in user
    Stats,
    /// Confirm a consultation
    Confirm { id: String },
    /// Cancel a consultation (needs the full notice)
    Cancel { id: String },
    /// Move a consultation (needs the full notice)
    Reschedule {
        id: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
    },
    /// Mark a consultation as held
    Complete { id: String },
    /// Add demo accounts, and demo consultations for the logged-in user
    SeedDemo,
    /// Walk through the booking rules against a throwaway store
    Demo,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fisiovem=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => config.data_dir()?,
    };
    let app = App {
        store: FileStore::new(&data_dir),
        policy: config.scheduling_policy(),
    };

    match cli.command {
        Commands::Register {
            name,
            email,
            password,
            phone,
            address,
            user_type,
        } => app.register(NewUser {
            name,
            email,
            phone,
            address,
            password,
            user_type,
        }),
        Commands::Login { email, password } => app.login(&email, &password),
        Commands::Logout => {
            app.accounts()?.logout()?;
            println!("Logged out");
            Ok(())
        }
        Commands::Whoami => app.whoami(),
        Commands::Profile {
            name,
            phone,
            address,
        } => app.profile(ProfileUpdate {
            name,
            phone,
            address,
        }),
        Commands::Physios { specialty, search } => {
            list_physios(specialty.as_deref(), search.as_deref());
            Ok(())
        }
        Commands::Book {
            physio,
            date,
            time,
            consultation_type,
            address,
            city,
            state,
            notes,
        } => {
            let physio = catalog::find(&physio)
                .with_context(|| format!("No physiotherapist with id '{}'", physio))?;
            app.book(BookingRequest {
                physiotherapist_id: physio.id.to_string(),
                physiotherapist_name: physio.name.to_string(),
                date,
                time,
                consultation_type,
                specialty: physio.specialty.to_string(),
                price: physio.price,
                address,
                city,
                state,
                notes,
            })
        }
        Commands::List { all } => app.list(all),
        Commands::Upcoming => app.upcoming(),
        Commands::History => app.history(),
        Commands::Stats => app.stats(),
        Commands::Confirm { id } => {
            let consultation = app.consultations()?.confirm(&id)?;
            println!("\nConsultation confirmed");
            print_consultation(&consultation);
            Ok(())
        }
        Commands::Cancel { id } => {
            let consultation = app.consultations()?.cancel(&id)?;
            println!("\nConsultation cancelled");
            print_consultation(&consultation);
            Ok(())
        }
        Commands::Reschedule { id, date, time } => {
            let consultation = app.consultations()?.reschedule(&id, date, time)?;
            println!("\nConsultation rescheduled");
            print_consultation(&consultation);
            Ok(())
        }
        Commands::Complete { id } => {
            let consultation = app.consultations()?.complete(&id)?;
            println!("\nConsultation completed");
            print_consultation(&consultation);
            Ok(())
        }
        Commands::SeedDemo => app.seed_demo(),
        Commands::Demo => run_demo(app.policy),
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
                println!("# data directory: {}", data_dir.display());
                Ok(())
            }
            ConfigAction::Path => {
                match &cli.config {
                    Some(path) => println!("{}", path.display()),
                    None => println!("{}", Config::default_path()?.display()),
                }
                Ok(())
            }
        },
    }
}

struct App {
    store: FileStore,
    policy: SchedulingPolicy,
}

impl App {
    fn accounts(&self) -> Result<AccountService<FileStore>> {
        Ok(AccountService::open(self.store.clone())?)
    }

    fn consultations(&self) -> Result<ConsultationService<FileStore>> {
        Ok(ConsultationService::open(self.store.clone(), self.policy)?)
    }

    fn session(&self) -> Result<Session> {
        self.accounts()?
            .require_session()
            .context("Log in first with `fisiovem login`")
    }

    fn register(&self, form: NewUser) -> Result<()> {
        let user = self.accounts()?.register(form)?;
        println!("\nAccount created for {} ({})", user.name, user.user_type.name());
        println!("Log in with: fisiovem login --email {} --password ...", user.email);
        Ok(())
    }

    fn login(&self, email: &str, password: &str) -> Result<()> {
        let session = self.accounts()?.login(email, password)?;
        println!("\nWelcome, {}", session.user.name);
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        match self.accounts()?.current_session()? {
            Some(session) => {
                let user = &session.user;
                println!("{} <{}> ({})", user.name, user.email, user.user_type.name());
                println!("  ID: {}", user.id);
                if !user.phone.is_empty() {
                    println!("  Phone: {}", user.phone);
                }
                if !user.address.is_empty() {
                    println!("  Address: {}", user.address);
                }
            }
            None => println!("Not logged in"),
        }
        Ok(())
    }

    fn profile(&self, update: ProfileUpdate) -> Result<()> {
        let session = self.session()?;
        let updated = self.accounts()?.update_profile(&session, update)?;
        println!("\nProfile updated for {}", updated.user.name);
        Ok(())
    }

    fn book(&self, request: BookingRequest) -> Result<()> {
        let session = self.session()?;
        let consultation = self.consultations()?.book(&session, request)?;
        println!("\nConsultation booked");
        print_consultation(&consultation);
        Ok(())
    }

    fn list(&self, all: bool) -> Result<()> {
        let consultations = self.consultations()?;
        let listed = if all {
            consultations.list(None)
        } else {
            consultations.list_for(&self.session()?)
        };
        print_section("Consultations", &listed);
        Ok(())
    }

    fn upcoming(&self) -> Result<()> {
        let session = self.session()?;
        let consultations = self.consultations()?;
        let upcoming = consultations.upcoming(session.user_id());

        println!("\n--- Upcoming ({}) ---", upcoming.len());
        for consultation in &upcoming {
            print_consultation(consultation);
            let actions = consultations.allowed_actions(&consultation.id)?;
            if !actions.cancel {
                println!(
                    "    Less than {}h away: can no longer be cancelled or rescheduled",
                    consultations.policy().notice_hours()
                );
            }
        }
        Ok(())
    }

    fn history(&self) -> Result<()> {
        let session = self.session()?;
        let history = self.consultations()?.history(session.user_id());
        print_section("History", &history);
        Ok(())
    }

    fn stats(&self) -> Result<()> {
        let session = self.session()?;
        let stats = self.consultations()?.stats(session.user_id());
        println!("\n--- Consultations for {} ---", session.user.name);
        println!("  Upcoming: {}", stats.upcoming);
        println!("  Completed: {}", stats.completed);
        println!("  Cancelled: {}", stats.cancelled);
        println!("  Total: {}", stats.total);
        Ok(())
    }

    fn seed_demo(&self) -> Result<()> {
        let added = demo::seed_demo_users(&mut self.accounts()?)?;
        println!("Added {} demo account(s)", added);
        println!(
            "  Patient: {} / {}",
            demo::DEMO_PATIENT_EMAIL,
            demo::DEMO_PASSWORD
        );

        if let Some(session) = self.accounts()?.current_session()? {
            let seeded =
                demo::seed_demo_consultations(&mut self.consultations()?, session.user_id())?;
            println!(
                "Added {} demo consultation(s) for {}",
                seeded.len(),
                session.user.name
            );
        }
        Ok(())
    }
}

fn list_physios(specialty: Option<&str>, search: Option<&str>) {
    let found = match (specialty, search) {
        (Some(specialty), _) => catalog::by_specialty(specialty),
        (None, Some(query)) => catalog::search(query),
        (None, None) => catalog::all().iter().collect(),
    };

    if found.is_empty() {
        println!("\nNo physiotherapists found");
        println!("Specialties: {}", catalog::specialties().join(", "));
        return;
    }

    println!("\n--- Physiotherapists ({}) ---", found.len());
    for physio in found {
        println!(
            "  {:10} {:22} {:11} {:>2} yrs  ★ {:.1}  R$ {:.2}",
            physio.id,
            physio.name,
            physio.specialty,
            physio.experience_years,
            physio.rating,
            physio.price
        );
    }
}

fn print_section(title: &str, consultations: &[Consultation]) {
    if consultations.is_empty() {
        println!("\nNo consultations");
        return;
    }

    println!("\n--- {} ({}) ---", title, consultations.len());
    let mut current_date = None;
    for consultation in consultations {
        if Some(consultation.date) != current_date {
            current_date = Some(consultation.date);
            println!("\n{}:", consultation.date.format("%A, %Y-%m-%d"));
        }
        print_consultation(consultation);
    }
}

fn print_consultation(consultation: &Consultation) {
    println!(
        "  {} - {} ({}, {}) [{}] R$ {:.2}",
        consultation.starts_at().format("%Y-%m-%d %H:%M"),
        consultation.physiotherapist_name,
        consultation.specialty,
        consultation.location(),
        consultation.status.name().to_uppercase(),
        consultation.price
    );
    if let Some(notes) = &consultation.notes {
        println!("    Notes: {}", notes);
    }
    println!("    ID: {}", consultation.id);
}

/// Run the booking rules end to end against an in-memory store and a clock
/// that the demo moves forward by hand.
fn run_demo(policy: SchedulingPolicy) -> Result<()> {
    println!("\n--- Running Demo ---");

    let store = MemoryStore::new();
    let clock = FixedClock::new(Local::now().naive_local());
    let mut accounts = AccountService::with_clock(store.clone(), &clock)?;
    let mut consultations = ConsultationService::with_clock(store, policy, &clock)?;

    demo::seed_demo_users(&mut accounts)?;
    let session = accounts.login(demo::DEMO_PATIENT_EMAIL, demo::DEMO_PASSWORD)?;
    println!("Logged in as {}", session.user.name);
    println!("Notice required to book, cancel or reschedule: {}h", policy.notice_hours());

    let physio = catalog::find("physio_1").context("demo physiotherapist missing")?;
    let request_at = |hours: i64| {
        let at = clock.now() + Duration::hours(hours);
        BookingRequest {
            physiotherapist_id: physio.id.to_string(),
            physiotherapist_name: physio.name.to_string(),
            date: at.date(),
            time: at.time(),
            consultation_type: ConsultationType::InPerson,
            specialty: physio.specialty.to_string(),
            price: physio.price,
            address: Some("Rua das Flores, 123".to_string()),
            city: Some("São Paulo".to_string()),
            state: Some("SP".to_string()),
            notes: None,
        }
    };

    println!("\n1. Booking 10 hours ahead...");
    report(consultations.book(&session, request_at(10)).map(|_| ()));

    println!("\n2. Booking 72 hours ahead, then cancelling straight away...");
    let first = consultations.book(&session, request_at(72))?;
    println!("   Booked for {}", first.starts_at().format("%Y-%m-%d %H:%M"));
    report(consultations.cancel(&first.id).map(|_| ()));

    println!("\n3. Booking 72 hours ahead and confirming...");
    let second = consultations.book(&session, request_at(72))?;
    report(consultations.confirm(&second.id).map(|_| ()));

    println!("   25 hours pass; 47 hours remain before the consultation");
    clock.advance(Duration::hours(25));
    let new_slot = second.starts_at() + Duration::days(1);
    println!("   Trying to reschedule...");
    report(
        consultations
            .reschedule(&second.id, new_slot.date(), new_slot.time())
            .map(|_| ()),
    );

    let stats = consultations.stats(session.user_id());
    println!("\n--- Demo Results ---");
    println!("  Upcoming: {}", stats.upcoming);
    println!("  Cancelled: {}", stats.cancelled);
    println!("  Total: {}", stats.total);
    for consultation in consultations.list_for(&session) {
        print_consultation(&consultation);
    }
    Ok(())
}

fn report(outcome: std::result::Result<(), ServiceError>) {
    match outcome {
        Ok(()) => println!("   OK"),
        Err(e) => println!("   Refused: {}", e),
    }
}
