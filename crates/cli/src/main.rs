use clap::{Parser, Subcommand};
use simrs_core::antrol::AntrolTaskService;
use simrs_core::config::positive_i64_from_env_value;
use simrs_core::dosage::DosageRegimen;
use simrs_core::ppra::notification::NotificationDispatcher;
use simrs_core::queue::QueueService;
use simrs_core::store::{MySqlStore, SharedStore};
use simrs_core::{system_clock, CoreConfig};
use simrs_messaging::N8nWebhookMessenger;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simrs")]
#[command(about = "SIMRS hospital backend CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Announce new antibiotic prescriptions to the PPRA pharmacists once
    PpraNotify,
    /// Show how a dosage rule is read (e.g. "3x500mg")
    ParseDosage {
        /// Dosage rule as written by the prescriber
        text: String,
    },
    /// Print clinic quotas and registrations for the next seven days
    QueueSummary,
    /// Print the Antrol task times recorded for bookings
    AntrolTasks {
        /// Booking codes or visit numbers
        #[arg(required = true)]
        kodebookings: Vec<String>,
    },
}

async fn connect_store() -> anyhow::Result<SharedStore> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let max_connections = positive_i64_from_env_value(
        "DATABASE_MAX_CONNECTIONS",
        std::env::var("DATABASE_MAX_CONNECTIONS").ok(),
        2,
    )?;
    let store = MySqlStore::connect(&database_url, u32::try_from(max_connections)?).await?;
    Ok(Arc::new(store))
}

fn describe_dosage(text: &str) -> String {
    match DosageRegimen::parse(text) {
        Some(regimen) => format!(
            "frequency: {}/day\ndose: {} {}\ndaily total: {}\n\n{}",
            simrs_core::dosage::format_number(regimen.frequency),
            simrs_core::dosage::format_number(regimen.dose),
            regimen.unit,
            regimen.total_display(),
            regimen.display()
        ),
        None => format!("No dosage recognised, shown as written: {text}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simrs_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::PpraNotify) => {
            let cfg = Arc::new(CoreConfig::from_env()?);
            let store = connect_store().await?;
            let messenger = Arc::new(N8nWebhookMessenger::from_config(&cfg)?);
            let dispatcher = NotificationDispatcher::new(cfg, store, messenger, system_clock());
            let summary = dispatcher.dispatch_new_prescriptions().await?;
            println!(
                "Found {} new antibiotic prescription lines: {} notified, {} failed",
                summary.found, summary.notified, summary.failed
            );
        }
        Some(Commands::ParseDosage { text }) => {
            println!("{}", describe_dosage(&text));
        }
        Some(Commands::QueueSummary) => {
            let store = connect_store().await?;
            let clinics = QueueService::new(store, system_clock()).summary().await?;
            if clinics.is_empty() {
                println!("No active clinics found.");
            }
            for clinic in clinics {
                println!("{} ({})", clinic.nm_poli, clinic.kd_poli);
                for day in clinic.days {
                    println!(
                        "  {} {:<7} kuota {:>3}  terisi {:>3}  tersedia {:>3}",
                        day.tanggal, day.hari, day.kuota, day.terisi, day.tersedia
                    );
                }
            }
        }
        Some(Commands::AntrolTasks { kodebookings }) => {
            let store = connect_store().await?;
            let results = AntrolTaskService::new(store)
                .bulk_task_updates(&kodebookings)
                .await?;
            for sync in results {
                match (&sync.no_rawat, &sync.status) {
                    (Some(no_rawat), _) => println!("{} ({})", sync.kodebooking, no_rawat),
                    (None, status) => println!(
                        "{}: {}",
                        sync.kodebooking,
                        status.as_deref().unwrap_or("-")
                    ),
                }
                for task in sync.tasks {
                    println!("  task {}  waktu {}", task.taskid, task.waktu);
                }
            }
        }
        None => {
            println!("Use 'simrs --help' for commands");
        }
    }

    Ok(())
}
