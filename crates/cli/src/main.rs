use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use clinia_core::enrich::{appointment_views, NameDirectory};
use clinia_core::scheduling::available_slots;
use clinia_core::scope::scope;
use clinia_core::search::{patient_search, SearchCoordinator};
use clinia_core::session::resolve_viewer;
use clinia_core::store::{
    DataStore, MemoryStore, NewAppointment, NewPatient, NewProfile, NewReferral,
};
use clinia_core::CanonicalSlots;

#[derive(Parser)]
#[command(name = "clinia")]
#[command(about = "clinia clinical-office demo CLI (ephemeral in-memory data)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Say hi
    Hi,
    /// Seed the demo clinic and list what was created
    Seed,
    /// Show open slots for the demo specialist on a date
    Slots {
        /// Date (YYYY-MM-DD)
        date: String,
    },
    /// List appointments as one of the demo identities
    Appointments {
        /// Identity to sign in as: admin, ana or dr-luis
        identity: String,
    },
    /// Search the demo patient register (name first, then document)
    Search {
        /// Query text
        query: String,
    },
}

struct DemoClinic {
    store: MemoryStore,
    specialist_id: uuid::Uuid,
    booked_date: NaiveDate,
}

/// Seeds a small clinic: an administrator, one specialist, two patients and
/// two bookings for the specialist a week out.
async fn seed() -> Result<DemoClinic, Box<dyn std::error::Error>> {
    let store = MemoryStore::new();

    store
        .create_profile(NewProfile {
            identity: "admin".into(),
            name: "Front Desk".into(),
            email: "admin@clinia.local".into(),
            phone: None,
            role: "administrator".into(),
            specialty: None,
        })
        .await?;

    let specialist_profile = store
        .create_profile(NewProfile {
            identity: "dr-luis".into(),
            name: "Luis Prada".into(),
            email: "luis@clinia.local".into(),
            phone: None,
            role: "especialista".into(),
            specialty: Some("optometry".into()),
        })
        .await?;
    let specialist = store
        .lookup_specialist_by_profile(specialist_profile.id)
        .await?
        .ok_or("seed: specialist row missing")?;

    let ana_profile = store
        .create_profile(NewProfile {
            identity: "ana".into(),
            name: "Ana Gomez".into(),
            email: "ana@clinia.local".into(),
            phone: None,
            role: "paciente".into(),
            specialty: None,
        })
        .await?;
    let ana = store
        .create_patient(NewPatient {
            profile_id: Some(ana_profile.id),
            name: "Ana Gomez".into(),
            document: "100200300".into(),
            phone: Some("3001234567".into()),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 14),
        })
        .await?;
    let marta = store
        .create_patient(NewPatient {
            profile_id: None,
            name: "Marta Ruiz".into(),
            document: "400500600".into(),
            phone: None,
            birth_date: None,
        })
        .await?;

    let booked_date = chrono::Utc::now().date_naive() + chrono::Duration::days(7);
    for (patient_id, hour, reason) in [
        (ana.id, 9, "annual checkup"),
        (marta.id, 14, "new lenses"),
    ] {
        store
            .create_appointment(NewAppointment {
                patient_id,
                specialist_id: specialist.id,
                date: booked_date,
                time: chrono::NaiveTime::from_hms_opt(hour, 0, 0)
                    .ok_or("seed: bad slot hour")?,
                reason: Some(reason.into()),
            })
            .await?;
    }

    store
        .create_referral(NewReferral {
            patient_id: ana.id,
            specialist_id: specialist.id,
            date: booked_date,
            reason: "retina check".into(),
        })
        .await?;

    Ok(DemoClinic {
        store,
        specialist_id: specialist.id,
        booked_date,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Hi) => {
            println!("hi");
        }
        Some(Commands::Seed) => {
            let demo = seed().await?;
            let patients = demo.store.list_patients().await?;
            println!("Seeded {} patients:", patients.len());
            for patient in patients {
                println!("  {} ({})", patient.name, patient.document);
            }
            let appointments = demo.store.list_appointments().await?;
            println!("Seeded {} appointments on {}.", appointments.len(), demo.booked_date);
        }
        Some(Commands::Slots { date }) => {
            let demo = seed().await?;
            let date: NaiveDate = date.parse()?;
            let rows = demo.store.list_appointments().await?;
            let open = available_slots(
                &rows,
                Some(demo.specialist_id),
                Some(date),
                &CanonicalSlots::default(),
            );
            if open.is_empty() {
                println!("No open slots on {date}.");
            } else {
                println!(
                    "Open slots on {date} (booked day is {}):",
                    demo.booked_date
                );
                for slot in open {
                    println!("  {}", slot.format("%H:%M"));
                }
            }
        }
        Some(Commands::Appointments { identity }) => {
            let demo = seed().await?;
            let viewer = resolve_viewer(&demo.store, &identity).await?;
            let rows = scope(demo.store.list_appointments().await?, &viewer);

            let patients = demo.store.list_patients().await?;
            let specialists = demo.store.list_specialists().await?;
            let profiles = demo.store.list_profiles().await?;
            let names = NameDirectory::new(&patients, &specialists, &profiles);

            let views = appointment_views(&rows, &names);
            if views.is_empty() {
                println!("No appointments visible to '{identity}'.");
            } else {
                for view in views {
                    println!(
                        "{} {} | {} with {} ({})",
                        view.date,
                        view.time.format("%H:%M"),
                        view.patient_name,
                        view.doctor,
                        view.reason.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Some(Commands::Search { query }) => {
            let demo = seed().await?;
            let coordinator = SearchCoordinator::default();
            match patient_search(&coordinator, &demo.store, &query).await? {
                Some(rows) if !rows.is_empty() => {
                    for patient in rows {
                        println!("{} ({})", patient.name, patient.document);
                    }
                }
                _ => println!("No patients match '{query}'."),
            }
        }
        None => {
            println!("clinia demo CLI; try `clinia --help`");
        }
    }

    Ok(())
}
