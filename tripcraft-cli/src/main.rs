//! # tripcraft CLI
//!
//! Command-line front end for the travel planner.
//!
//! Usage:
//!   tripcraft plan --country France --city Paris --arrival 2026-11-01 \
//!       --departure 2026-11-05 --details "Honeymoon" --dining Vegan,Seafood
//!   tripcraft plan --session plan_18f3a2 ...   # resume, skipping finished stages
//!   tripcraft countries
//!   tripcraft cities --country France
//!   tripcraft render generate_hotels_table -i user_input="- City: Paris"
//!   tripcraft sessions

use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tripcraft_agent::{
    AgentCatalog, PlanSession, PlannerTools, Settings, StageReport, TaskCatalog, TaskInputs,
    TravelPlanner, TripRequest, DINING_OPTIONS,
};
use tripcraft_error::Result;
use tripcraft_llm::OpenAIProvider;
use tripcraft_tools::{rating_colors, AirportDirectory};

#[derive(Parser)]
#[command(name = "tripcraft")]
#[command(author, version, about = "tripcraft - hotels, sights and dining for your next trip")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding tasks_config.yml and agents_config.yml
    #[arg(long, global = true)]
    conf_dir: Option<PathBuf>,

    /// Airport reference CSV
    #[arg(long, global = true)]
    airports: Option<PathBuf>,

    /// Where plan sessions are stored
    #[arg(long, global = true)]
    session_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and the final output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a trip: hotels, must-see places and dining
    Plan(PlanArgs),
    /// List the countries with known airports
    Countries,
    /// List the cities of a country with known airports
    Cities {
        #[arg(long)]
        country: String,
    },
    /// Render a task template with the given inputs
    Render {
        task: String,

        /// Template input as key=value (repeatable)
        #[arg(short, long = "input", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
    },
    /// List existing plan sessions
    Sessions,
}

#[derive(Clone, Copy, ValueEnum)]
enum Purpose {
    Leisure,
    Business,
}

impl Purpose {
    fn as_str(self) -> &'static str {
        match self {
            Purpose::Leisure => "leisure",
            Purpose::Business => "business",
        }
    }
}

#[derive(clap::Args)]
struct PlanArgs {
    #[arg(long, value_enum, default_value = "leisure")]
    purpose: Purpose,

    #[arg(long)]
    country: String,

    #[arg(long)]
    city: String,

    /// Arrival date, YYYY-MM-DD
    #[arg(long)]
    arrival: String,

    /// Departure date, YYYY-MM-DD
    #[arg(long)]
    departure: String,

    /// Children travelling
    #[arg(long, default_value_t = 0)]
    children: u32,

    /// Children ages, comma separated
    #[arg(long, default_value = "")]
    children_age: String,

    #[arg(long, default_value_t = 1)]
    guests: u32,

    #[arg(long, default_value_t = 1)]
    rooms: u32,

    /// Anything the planner should take into account
    #[arg(long, default_value = "")]
    details: String,

    /// Food preferences (repeatable or comma separated)
    #[arg(long, value_delimiter = ',', value_parser = PossibleValuesParser::new(DINING_OPTIONS))]
    dining: Vec<String>,

    /// Resume or name a plan session
    #[arg(short, long)]
    session: Option<String>,

    /// Where the hotel CSV and the map are written
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl PlanArgs {
    fn request(&self) -> TripRequest {
        TripRequest {
            travel_purpose: self.purpose.as_str().to_string(),
            country: self.country.clone(),
            city: self.city.clone(),
            arrival_date: self.arrival.clone(),
            departure_date: self.departure.clone(),
            children_qty: self.children,
            children_age: self.children_age.clone(),
            guest_qty: self.guests,
            room_qty: self.rooms,
            additional_considerations: self.details.clone(),
            dining_options: self.dining.clone(),
        }
    }
}

fn parse_input(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_plan(settings: &Settings, args: &PlanArgs, verbose: bool, quiet: bool) -> Result<()> {
    let request = args.request();
    request.validate()?;

    let tasks = TaskCatalog::load(settings.tasks_path())?;
    let agents = AgentCatalog::load(settings.agents_path())?;
    let tools = PlannerTools::from_settings(settings)?;
    let provider = OpenAIProvider::new(settings.provider_config()?)?;

    let session = PlanSession::open(&settings.session_dir, args.session.as_deref())?;
    if !quiet {
        println!("Session: {} (pass --session {} to resume)", session.id(), session.id());
    }

    let planner = TravelPlanner::new(provider, tasks, agents, tools)
        .with_llm(settings.llm_settings())
        .with_summary_model(&settings.summary_model);

    let reports = planner.run(&request, &session).await?;
    for report in &reports {
        print_report(report, verbose, quiet);
    }
    Ok(())
}

fn print_report(report: &StageReport, verbose: bool, quiet: bool) {
    if !quiet {
        println!("\n=== {} ===\n", report.label);
    }
    println!("{}", report.summary);

    if report.stage == 1 {
        println!("\nHotel rating colours:");
        for (rating, color) in rating_colors() {
            println!("  {:<7} {}", color, rating);
        }
        println!("  {:<7} Airport", "red");
    }

    for path in &report.outputs {
        println!("Written: {}", path.display());
    }

    if verbose && !report.manager_history.is_empty() {
        println!("\n--- Group chat ({} messages) ---", report.manager_history.len());
        for turn in &report.manager_history {
            println!("  {}: {}", turn.speaker, truncate(turn.message.text(), 120));
        }
    }

    if !quiet {
        println!(
            "\n({} model calls, {} tokens)",
            report.usage.total_calls,
            report.usage.total_tokens()
        );
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    let line = s.lines().next().unwrap_or("");
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &line[..cut]),
        None if line.len() < s.len() => format!("{}…", line),
        None => line.to_string(),
    }
}

fn list_countries(settings: &Settings) -> Result<()> {
    let directory = AirportDirectory::load(&settings.airports_path)?;
    for country in directory.countries() {
        println!("{}", country);
    }
    Ok(())
}

fn list_cities(settings: &Settings, country: &str) -> Result<()> {
    let directory = AirportDirectory::load(&settings.airports_path)?;
    let cities = directory.cities(country);
    if cities.is_empty() {
        println!("No cities with airports found for {}", country);
    }
    for city in cities {
        println!("{}", city);
    }
    Ok(())
}

fn render_task(settings: &Settings, task: &str, inputs: &[(String, String)]) -> Result<()> {
    let tasks = TaskCatalog::load(settings.tasks_path())?;
    let inputs: TaskInputs = inputs.iter().cloned().collect();
    println!("{}", tasks.render(task, &inputs)?);
    Ok(())
}

fn list_sessions(settings: &Settings) -> Result<()> {
    let sessions = PlanSession::list(&settings.session_dir)?;
    println!("Sessions in {}:", settings.session_dir.display());
    if sessions.is_empty() {
        println!("  (no sessions found)");
    }
    for id in sessions {
        let session = PlanSession::open(&settings.session_dir, Some(&id))?;
        println!("  - {} ({}/3 stages done)", id, session.completed_stages().len());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::from_env();
    if let Some(dir) = cli.conf_dir {
        settings.conf_dir = dir;
    }
    if let Some(path) = cli.airports {
        settings.airports_path = path;
    }
    if let Some(dir) = cli.session_dir {
        settings.session_dir = dir;
    }
    debug!(?settings, "settings loaded");

    match cli.command {
        Commands::Plan(args) => {
            if let Some(dir) = &args.output_dir {
                settings.output_dir = dir.clone();
            }
            run_plan(&settings, &args, cli.verbose, cli.quiet).await
        }
        Commands::Countries => list_countries(&settings),
        Commands::Cities { country } => list_cities(&settings, &country),
        Commands::Render { task, inputs } => render_task(&settings, &task, &inputs),
        Commands::Sessions => list_sessions(&settings),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
