use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use servicearea::permission::StaticPermissions;
use servicearea::sensor::FixedSensor;
use servicearea::store::auth::AuthStore;
use servicearea::store::FileStore;
use servicearea::{Config, Coordinate, LocationResolver, ResolvedLocation};

#[derive(Parser)]
#[command(name = "servicearea", version, about = "Check whether a location can be served")]
struct Cli {
    /// Postal code anchoring the service area
    #[arg(long, global = true, env = "SERVICE_POSTAL_CODE")]
    postal_code: Option<String>,

    /// Service radius in kilometers
    #[arg(long, global = true, env = "SERVICE_RADIUS_KM")]
    radius_km: Option<f64>,

    /// Directory holding persisted session state
    #[arg(long, global = true, env = "SERVICEAREA_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a coordinate dropped on the map
    Check {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },
    /// Search by address or postal code
    Search { query: String },
    /// Great-circle distance between two coordinates, no network needed
    Distance {
        #[arg(allow_hyphen_values = true)]
        lat1: f64,
        #[arg(allow_hyphen_values = true)]
        lon1: f64,
        #[arg(allow_hyphen_values = true)]
        lat2: f64,
        #[arg(allow_hyphen_values = true)]
        lon2: f64,
    },
    /// "Use current location" with a simulated device position
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Refuse the location permission prompt
        #[arg(long)]
        deny: bool,
    },
    /// Show or change the persisted session
    Session {
        /// Continue as guest
        #[arg(long, conflicts_with = "logout")]
        guest: bool,
        /// Forget the session
        #[arg(long)]
        logout: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "servicearea=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Check { lat, lon } => {
            let resolver = resolver(&cli, FixedSensor::unavailable(), false)?;
            match resolver.drop_pin(Coordinate::new(*lat, *lon)).await {
                Ok(location) => print_location(&resolver, &location).await,
                Err(e) => println!("{}", e.user_message()),
            }
        }
        Command::Search { query } => {
            let resolver = resolver(&cli, FixedSensor::unavailable(), false)?;
            match resolver.search(query).await {
                Ok(location) => print_location(&resolver, &location).await,
                Err(e) => println!("{}", e.user_message()),
            }
        }
        Command::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            let from = Coordinate::new(*lat1, *lon1);
            let to = Coordinate::new(*lat2, *lon2);
            println!("{:.3} km", from.distance_to(&to));
        }
        Command::Locate { lat, lon, deny } => {
            let sensor = FixedSensor::new(Coordinate::new(*lat, *lon));
            let resolver = resolver(&cli, sensor, *deny)?;
            match resolver.locate().await {
                Ok(location) => print_location(&resolver, &location).await,
                Err(e) => {
                    tracing::debug!(error = %e, "locate failed");
                    println!("{}", e.user_message());
                }
            }
        }
        Command::Session { guest, logout } => {
            let auth = match &cli.state_dir {
                Some(dir) => {
                    let backend = FileStore::open(dir).with_context(|| {
                        format!("Failed to open state directory {}", dir.display())
                    })?;
                    AuthStore::persisted(Arc::new(backend)).context("Failed to load session")?
                }
                None => AuthStore::in_memory(),
            };

            if *logout {
                auth.logout();
            } else if *guest {
                auth.set_guest_mode(true);
            }

            let state = auth.state();
            match (&state.user, state.is_guest) {
                (Some(user), _) => println!("Signed in as {} <{}>", user.name, user.email),
                (None, true) => println!("Guest"),
                (None, false) => println!("Signed out"),
            }
        }
    }

    Ok(())
}

fn resolver(cli: &Cli, sensor: FixedSensor, deny: bool) -> anyhow::Result<LocationResolver> {
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(code) = &cli.postal_code {
        config.postal_code = code.clone();
    }
    if let Some(radius_km) = cli.radius_km {
        anyhow::ensure!(
            radius_km.is_finite() && radius_km > 0.0,
            "radius must be a positive number of kilometers"
        );
        config.radius_km = radius_km;
    }

    let permissions = if deny {
        StaticPermissions::denying()
    } else {
        StaticPermissions::granting()
    };

    LocationResolver::from_config(&config, Arc::new(permissions), Arc::new(sensor))
        .context("Failed to create geocoding client")
}

async fn print_location(resolver: &LocationResolver, location: &ResolvedLocation) {
    println!("{}", location.label());
    println!("  Coords: {}", location.coordinate);
    match resolver.service_area().await {
        Ok(area) => {
            println!(
                "  Distance: {:.2} km (radius {} km)",
                location.coordinate.distance_to(&area.reference),
                area.radius_km
            );
        }
        Err(e) => println!("  Distance: unknown ({})", e.user_message()),
    }
    println!("  Serviceable: {}", location.is_serviceable);
}
