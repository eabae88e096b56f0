//! CLI interface for trip-planner

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use trip_planner::{
    logging, AirLabsClient, AmadeusClient, CalendarGenerator, Config, Coordinates, OpenAiOracle, PlannedTrip,
    TripPlanner, TripRequest,
};

#[derive(Parser)]
#[command(name = "trip-planner")]
#[command(about = "Plan a trip itinerary with flights and export it as a calendar")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan a trip and print the itinerary as JSON
    Plan {
        /// Destination city
        #[arg(short, long)]
        city: String,
        /// Loose date description, e.g. "first week of May"
        #[arg(short, long)]
        dates: String,
        /// Free-text preferences
        #[arg(short, long)]
        preferences: Option<String>,
        /// Traveler latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Traveler longitude
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a planned trip (JSON from `plan`) as an .ics file
    Export {
        /// Planned trip JSON file
        #[arg(short, long)]
        input: PathBuf,
        /// Directory to write the calendar into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    logging::init_logging(config.log_dir.as_deref(), "trip-planner")?;

    match cli.command {
        Commands::Plan {
            city,
            dates,
            preferences,
            lat,
            lng,
            output,
        } => {
            config.validate()?;
            let timeout = config.http_timeout();
            let planner = TripPlanner::new(
                Arc::new(OpenAiOracle::new(&config.oracle, timeout)?),
                Arc::new(AirLabsClient::new(&config.airports, timeout)?),
                Arc::new(AmadeusClient::new(&config.flights, timeout)?),
            );
            let request = TripRequest {
                city,
                dates,
                preferences,
                origin: Coordinates { lat, lng },
            };

            eprintln!("Planning trip...");
            let trip = planner.plan_trip(&request).await?;
            let json = serde_json::to_string_pretty(&trip)?;

            if let Some(output_file) = output {
                fs::write(&output_file, &json)?;
                eprintln!("Itinerary saved to {}", output_file.display());
            } else {
                println!("{}", json);
            }

            eprintln!("\nSummary:");
            eprintln!(
                "Departure airport: {} ({})",
                trip.departure_airport.short_name, trip.departure_airport.iata_code
            );
            eprintln!("Days planned: {}", trip.itinerary.days.len());
            match trip.flights.as_ref().and_then(|f| f.outbound.as_ref()) {
                Some(outbound) => eprintln!("Outbound flight: {} - {}", outbound.airline, outbound.price),
                None => eprintln!("No flight found"),
            }
        }
        Commands::Export { input, output_dir } => {
            let trip: PlannedTrip = serde_json::from_str(&fs::read_to_string(&input)?)?;
            let export = CalendarGenerator::new(config.calendar_tz()?).generate(
                &trip.itinerary,
                &trip.city,
                &trip.dates,
                trip.flights.as_ref(),
            )?;

            fs::create_dir_all(&output_dir)?;
            let path = output_dir.join(&export.filename);
            fs::write(&path, export.ics)?;
            eprintln!("Calendar saved to {}", path.display());
        }
    }

    Ok(())
}
