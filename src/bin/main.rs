use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flight_surety::config::load_params;
use flight_surety::{
    format_ether, parse_amount, FlightSurety, Identity, InMemorySubstrate, Money, OracleSimulator,
    SharedSurety, SimulatorConfig, StatusCode,
};

#[derive(Parser)]
#[command(name = "surety-node")]
#[command(about = "Flight Surety insurance node", long_about = None)]
struct Cli {
    /// TOML parameter file; SURETY_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one insured flight end to end against simulated oracles
    Simulate {
        /// Number of oracles to register
        #[arg(long, default_value_t = flight_surety::simulator::DEFAULT_ORACLE_COUNT)]
        oracles: usize,

        /// Report this status (code or name) instead of random ones
        #[arg(long, value_parser = parse_status)]
        status: Option<StatusCode>,

        /// Premium paid by the passenger
        #[arg(long, default_value = "1 ether", value_parser = parse_amount)]
        premium: Money,

        #[arg(long, default_value = "ND1309")]
        flight: String,

        /// Status requests to issue before giving up
        #[arg(long, default_value_t = 5)]
        rounds: u32,

        /// Seed for the simulated oracles' status picks
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the effective protocol parameters
    Params,

    /// List the recognized status codes
    Codes,
}

fn parse_status(input: &str) -> Result<StatusCode, String> {
    if let Ok(code) = input.parse::<u8>() {
        return StatusCode::from_code(code).ok_or_else(|| format!("unrecognized status code {}", code));
    }
    let wanted = input.to_ascii_uppercase();
    StatusCode::ALL
        .into_iter()
        .find(|status| status.to_string().split('(').next() == Some(wanted.as_str()))
        .ok_or_else(|| format!("unrecognized status {}", input))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { oracles, status, premium, flight, rounds, seed } => {
            let params = load_params(cli.config.as_deref()).context("loading parameters")?;
            let config = SimulatorConfig {
                oracle_count: oracles,
                fixed_status: status,
                seed,
                ..SimulatorConfig::default()
            };
            simulate(params, config, premium, &flight, rounds).await?;
        }
        Commands::Params => {
            let params = load_params(cli.config.as_deref()).context("loading parameters")?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Commands::Codes => {
            for status in StatusCode::ALL {
                let payout = if status.triggers_payout() { "pays out" } else { "" };
                println!("{:<20} {}", status.to_string(), payout);
            }
        }
    }

    Ok(())
}

async fn simulate(
    params: flight_surety::SuretyParams,
    config: SimulatorConfig,
    premium: Money,
    flight_code: &str,
    rounds: u32,
) -> Result<()> {
    let airline = Identity::from("airline-1");
    let passenger = Identity::from("passenger-1");

    let mut substrate = InMemorySubstrate::new("owner");
    substrate.mint(airline.clone(), params.max_airline_fund);
    substrate.mint(passenger.clone(), premium);

    let funding = params.max_airline_fund;
    let mut surety = FlightSurety::deploy(substrate, params, airline.clone())?;
    surety.sign_as(airline.clone()).fund(funding)?;
    let key = surety.open_flight(flight_code, 1_700_000_000)?;
    surety.sign_as(passenger.clone()).buy_policy(&key, premium)?;
    info!("Policy on {} bought for {}", key, format_ether(premium));

    let shared = SharedSurety::new(surety);
    let wait = config.poll_interval * 3;
    let simulator = OracleSimulator::register(shared.clone(), config)?;
    let (handle, stop) = simulator.spawn();

    for round in 1..=rounds {
        let ticket = shared.execute(|s| s.sign_as(passenger.clone()).request_status(&key))?;
        info!(round, index = ticket.index, reissued = ticket.reissued, "status requested");
        tokio::time::sleep(wait).await;
        if !shared.query(|s| s.is_open(&key)) {
            break;
        }
    }

    let _ = stop.send(true);
    let accepted = handle.await?;

    let (status, open, credited) =
        shared.query(|s| (s.flight(&key).map(|f| f.latest_status), s.is_open(&key), s.balance_of(&passenger)));
    println!("Oracle reports accepted: {}", accepted);
    match status {
        Some(status) if !open => println!("Flight {} resolved: {}", key, status),
        _ => {
            warn!("No quorum reached after {} round(s)", rounds);
            println!("Flight {} still open", key);
        }
    }

    if credited > 0 {
        let paid = shared.execute(|s| s.sign_as(passenger.clone()).withdraw())?;
        let external = shared.query(|s| s.substrate().balance_of(&passenger));
        println!("Passenger withdrew {} (external balance {})", format_ether(paid), format_ether(external));
    } else {
        println!("No payout owed to {}", passenger);
    }

    let pool = shared.query(|s| s.pool_balance());
    shared.query(|s| s.verify_solvency())?;
    println!("Pool balance: {}", format_ether(pool));
    Ok(())
}
