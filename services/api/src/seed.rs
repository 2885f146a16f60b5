use clap::Args;
use hustlr::config::AppConfig;
use hustlr::error::AppError;
use hustlr::marketplace::{generate_fixture, Fixture, MarketplaceError, PasswordHash, SeedOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_SEED_PASSWORD: &str = "Hustlr-demo1!";

#[derive(Args, Debug)]
pub(crate) struct SeedArgs {
    /// Where to write the generated fixture
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// Number of accounts, alternating provider and consumer
    #[arg(long, default_value_t = 10)]
    pub(crate) users: usize,
    /// Number of services spread across the providers
    #[arg(long, default_value_t = 12)]
    pub(crate) services: usize,
    /// Number of service requests spread across the consumers
    #[arg(long, default_value_t = 20)]
    pub(crate) bookings: usize,
    /// RNG seed for reproducible output
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Password shared by every generated account
    #[arg(long, default_value = DEFAULT_SEED_PASSWORD)]
    pub(crate) password: String,
}

pub(crate) fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let fixture = build_fixture(&args, config.security.bcrypt_cost)?;
    write_fixture(&fixture, &args.output)?;

    println!(
        "Wrote {} users, {} services, {} bookings and {} subscriptions to {}",
        fixture.users.len(),
        fixture.services.len(),
        fixture.bookings.len(),
        fixture.subscriptions.len(),
        args.output.display()
    );
    println!("Every generated account signs in with the password you supplied.");
    Ok(())
}

pub(crate) fn build_fixture(args: &SeedArgs, cost: u32) -> Result<Fixture, AppError> {
    let hash = PasswordHash::create(&args.password, cost).map_err(MarketplaceError::from)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let options = SeedOptions {
        users: args.users,
        services: args.services,
        bookings: args.bookings,
    };
    Ok(generate_fixture(options, &hash, &mut rng))
}

fn write_fixture(fixture: &Fixture, path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    fixture.save(path)?;
    tracing::info!(path = %path.display(), "fixture written");
    Ok(())
}
