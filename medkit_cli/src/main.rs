use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use medkit_core::directory::{CsvDirectory, PharmacyDirectory};
use medkit_core::extraction::{PillIdentificationRequest, PrescriptionAnalysisRequest};
use medkit_core::proximity::directions_url;
use medkit_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "medkit")]
#[command(about = "Medicine inventory and dose reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true, hide = true)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's doses (default)
    Today,

    /// Mark a dose as taken
    Take {
        /// Reminder id as shown by `today`
        reminder_id: String,
    },

    /// List medicines and stock levels
    Inventory,

    /// Add the medicines of an analysed prescription
    Import {
        /// Prescription analysis response (JSON)
        response: PathBuf,
    },

    /// Restock a medicine from a pill identification result
    Scan {
        /// Pill identification response (JSON)
        response: PathBuf,

        /// Units to add (defaults to stock.default_refill_amount)
        #[arg(long)]
        amount: Option<u32>,
    },

    /// Add units of a medicine by name
    Restock {
        name: String,
        amount: u32,
    },

    /// Print the request body for the extraction service
    Request {
        #[arg(value_enum)]
        kind: RequestKind,

        /// Image of the prescription or pill package
        image: PathBuf,
    },

    /// Find pharmacies near a location
    Pharmacies {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Search radius in km (defaults to pharmacy.search_radius_km)
        #[arg(long)]
        radius: Option<f64>,

        /// Maximum number of results (defaults to pharmacy.max_results)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RequestKind {
    Prescription,
    Pill,
}

fn main() -> Result<()> {
    // Initialize logging
    medkit_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let inventory_path = data_dir.join("inventory.json");
    tracing::debug!("Using inventory {:?} for {}", inventory_path, today);
    let store = InventoryStore::open(JsonFileRepository::new(inventory_path), today);

    match cli.command {
        Some(Commands::Today) | None => cmd_today(&store),
        Some(Commands::Take { reminder_id }) => cmd_take(store, &reminder_id),
        Some(Commands::Inventory) => cmd_inventory(&store, &config),
        Some(Commands::Import { response }) => cmd_import(store, &response),
        Some(Commands::Scan { response, amount }) => cmd_scan(
            store,
            &response,
            amount.unwrap_or(config.stock.default_refill_amount),
        ),
        Some(Commands::Restock { name, amount }) => cmd_restock(store, &name, amount),
        Some(Commands::Request { kind, image }) => cmd_request(&store, kind, &image),
        Some(Commands::Pharmacies {
            lat,
            lng,
            radius,
            limit,
        }) => cmd_pharmacies(
            &config,
            &data_dir,
            lat,
            lng,
            radius.unwrap_or(config.pharmacy.search_radius_km),
            limit.unwrap_or(config.pharmacy.max_results),
        ),
    }
}

type Store = InventoryStore<JsonFileRepository>;

fn cmd_today(store: &Store) -> Result<()> {
    let reminders = store.reminders();
    if reminders.is_empty() {
        println!("No reminders for today.");
        println!("Import a prescription to get started.");
        return Ok(());
    }

    println!("Today's doses ({})", store.today());
    println!();
    for reminder in reminders {
        let mark = if reminder.taken { "✓" } else { " " };
        println!(
            "  [{}] {:>8}  {} ({})",
            mark,
            reminder.slot.time_label(),
            reminder.medicine_name,
            reminder.dose
        );
        println!("         id: {}", reminder.id);
    }
    Ok(())
}

fn cmd_take(mut store: Store, reminder_id: &str) -> Result<()> {
    if !store.take_dose(reminder_id)? {
        println!("Nothing to do: reminder is unknown or already taken.");
        return Ok(());
    }

    if let Some(reminder) = store.reminders().iter().find(|r| r.id == reminder_id) {
        let remaining = store
            .medicines()
            .iter()
            .find(|m| m.id == reminder.medicine_id)
            .map(|m| m.quantity)
            .unwrap_or(0);
        println!(
            "✓ {} ({}) taken, {} left",
            reminder.medicine_name, reminder.slot, remaining
        );
    }
    Ok(())
}

fn cmd_inventory(store: &Store, config: &Config) -> Result<()> {
    let medicines = store.medicines();
    if medicines.is_empty() {
        println!("Your medicine cabinet is empty.");
        println!("Import a prescription to add medicines.");
        return Ok(());
    }

    let mut refills = Vec::new();
    for medicine in medicines {
        let status = config.stock.status(medicine.quantity);
        println!(
            "  {:<24} {:>5}  {}",
            medicine.name, medicine.quantity, status
        );
        println!("    {} - {}", medicine.dosage, medicine.instructions);
        if status.needs_refill() {
            refills.push(medicine.name.as_str());
        }
    }

    if !refills.is_empty() {
        println!();
        println!("Refill soon: {}", refills.join(", "));
    }
    Ok(())
}

fn cmd_import(mut store: Store, response: &Path) -> Result<()> {
    let json = std::fs::read_to_string(response)?;
    let analysis = match parse_prescription_analysis(&json) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("Could not analyze the prescription. Please try again.");
            return Err(e);
        }
    };

    let added = store.add_from_prescription(&analysis.medicines)?;
    if added.is_empty() {
        println!("All medicines on this prescription are already in your inventory.");
    } else {
        println!("✓ Added {} medicine(s):", added.len());
        for medicine in &added {
            println!("  {} ({}) - {}", medicine.name, medicine.dosage, medicine.instructions);
        }
    }
    println!("  {} reminder(s) scheduled for today", store.reminders().len());
    Ok(())
}

fn cmd_scan(mut store: Store, response: &Path, amount: u32) -> Result<()> {
    let json = std::fs::read_to_string(response)?;
    let pill = match parse_pill_identification(&json) {
        Ok(pill) => pill.reconcile(&store),
        Err(e) => {
            eprintln!("Could not analyze the uploaded image. Please try again.");
            return Err(e);
        }
    };

    if !pill.is_identified() {
        eprintln!("The medicine could not be identified from this image.");
        return Err(Error::Extraction("unidentified medicine".into()));
    }

    println!("{}", pill.medicine_name);
    if !pill.usage.is_empty() {
        println!("  {}", pill.usage);
    }

    if pill.is_new_medicine {
        eprintln!(
            "{} is not in your inventory. Import a prescription for it first.",
            pill.medicine_name
        );
        return Err(Error::MedicineNotFound(pill.medicine_name));
    }

    add_stock(&mut store, &pill.medicine_name, amount)
}

fn cmd_restock(mut store: Store, name: &str, amount: u32) -> Result<()> {
    add_stock(&mut store, name, amount)
}

fn add_stock(store: &mut Store, name: &str, amount: u32) -> Result<()> {
    match store.add_stock(name, amount) {
        Ok(medicine) => {
            println!(
                "✓ {} units of {} added, {} on hand",
                amount, medicine.name, medicine.quantity
            );
            Ok(())
        }
        Err(Error::MedicineNotFound(name)) => {
            eprintln!(
                "Could not find {} in your inventory. Add it from a prescription first.",
                name
            );
            Err(Error::MedicineNotFound(name))
        }
        Err(e) => Err(e),
    }
}

fn cmd_request(store: &Store, kind: RequestKind, image: &Path) -> Result<()> {
    let photo = DataUri::from_path(image)?;
    let body = match kind {
        RequestKind::Prescription => serde_json::to_string_pretty(&PrescriptionAnalysisRequest {
            prescription_image: photo,
        })?,
        RequestKind::Pill => {
            serde_json::to_string_pretty(&PillIdentificationRequest::for_inventory(photo, store))?
        }
    };
    println!("{}", body);
    Ok(())
}

fn cmd_pharmacies(
    config: &Config,
    data_dir: &Path,
    lat: f64,
    lng: f64,
    radius_km: f64,
    limit: usize,
) -> Result<()> {
    let center = Coordinate::new(lat, lng)?;
    let directory = CsvDirectory::new(config.pharmacy.directory_path(data_dir));
    let ranked = rank_by_distance(center, directory.all()?, radius_km);

    if ranked.is_empty() {
        println!("No pharmacies within {:.1} km.", radius_km);
        return Ok(());
    }

    println!("Nearby pharmacies");
    println!();
    for entry in ranked.iter().take(limit) {
        println!("  {:<28} {:>6.1} km", entry.item.name, entry.distance_km);
        println!("    {}", directions_url(center, entry.item.location));
    }
    Ok(())
}
