use crate::infra::load_repository;
use chrono::{Duration, Local, NaiveTime};
use clap::Args;
use hustlr::config::{AppConfig, MIN_BCRYPT_COST};
use hustlr::error::AppError;
use hustlr::marketplace::{
    AccountProfile, AccountRegistration, BookingDraft, Marketplace, MarketplaceError,
    MarketplaceRepository, Rating, RequestStatus, ReviewDraft, Role, Schedule, ServiceDraft,
    ServiceFilter, WalletDraft,
};
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_PASSWORD: &str = "Demo-pass1!";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Start from this fixture instead of an empty marketplace
    #[arg(long)]
    pub(crate) fixture: Option<PathBuf>,
    /// Export the provider's account report as CSV into this directory
    #[arg(long)]
    pub(crate) report_dir: Option<PathBuf>,
    /// Hash demo passwords with the configured bcrypt cost instead of the minimum
    #[arg(long)]
    pub(crate) full_cost: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let cost = if args.full_cost {
        AppConfig::load()?.security.bcrypt_cost
    } else {
        MIN_BCRYPT_COST
    };
    let repository = load_repository(args.fixture.as_deref(), cost)?;
    let marketplace = Marketplace::new(Arc::new(repository), cost);

    println!("Hustlr marketplace demo");
    println!(
        "Starting catalogue: {} services from {} accounts",
        marketplace.list_services(&ServiceFilter::default())?.len(),
        marketplace
            .repository()
            .accounts()
            .map_err(MarketplaceError::from)?
            .len()
    );

    let provider =
        marketplace.register(demo_registration(Role::Provider, "Riley", "riley_sparks"))?;
    let consumer =
        marketplace.register(demo_registration(Role::Consumer, "Morgan", "morgan_home"))?;
    println!(
        "\nRegistered {} ({}) and {} ({})",
        provider.full_name(),
        provider.role(),
        consumer.full_name(),
        consumer.role()
    );

    let wallet = marketplace.attach_wallet(
        provider.id(),
        WalletDraft {
            bsb: "062000".to_string(),
            account_number: "12345678".to_string(),
            abn: Some("51824753556".to_string()),
            ..WalletDraft::default()
        },
    )?;
    println!(
        "  Payout wallet on file (card attached: {})",
        wallet.card_last_four.is_some()
    );

    let service = marketplace.create_service(
        provider.id(),
        ServiceDraft {
            category: "Electrical".to_string(),
            description: "Lighting installs, power points and safety switch testing".to_string(),
            min_price: 95.0,
            max_price: 260.0,
        },
    )?;
    println!(
        "\nPosted {} at ${:.2}-${:.2}",
        service.category(),
        service.price().min(),
        service.price().max()
    );

    let visit = Schedule {
        date: Local::now().date_naive() + Duration::days(3),
        time: NaiveTime::from_hms_opt(10, 30, 0).unwrap_or_default(),
    };
    let booking = marketplace.create_booking(BookingDraft {
        service_id: service.id().clone(),
        consumer_id: consumer.id().clone(),
        provider_id: provider.id().clone(),
        date: visit.date,
        time: visit.time.format("%H:%M").to_string(),
        price: 180.0,
    })?;
    println!(
        "Booked {} for {} at {} (${:.2})",
        booking.id(),
        visit.date,
        visit.time.format("%H:%M"),
        booking.price()
    );

    for status in [RequestStatus::Accepted, RequestStatus::Completed] {
        let updated = marketplace.update_booking_status(booking.id(), status)?;
        println!("  Booking is now {}", updated.status());
    }

    let subscription = marketplace.apply_for_subscription(consumer.id(), service.id(), 120.0)?;
    println!(
        "\nMonthly maintenance subscription {} opened at ${:.2}",
        subscription.transaction_id(),
        subscription.amount()
    );

    let review = marketplace.add_review(
        consumer.id(),
        provider.id(),
        ReviewDraft {
            title: "Tidy and on time".to_string(),
            description: "Swapped every downlight and cleaned up afterwards".to_string(),
            rating: Rating::new(5).map_err(MarketplaceError::from)?,
            service_id: Some(service.id().clone()),
        },
    )?;
    println!(
        "Review left: {} ({} stars)",
        review.title(),
        review.rating().value()
    );

    let provider = marketplace.account(provider.id())?;
    println!(
        "\n{} now holds a community rating of {:.1}",
        provider.full_name(),
        provider.community_rating()
    );

    println!("\nNotifications for {}:", provider.full_name());
    for notification in marketplace.notifications(provider.id())? {
        println!("  - {}: {}", notification.title(), notification.description());
    }
    println!("Notifications for {}:", consumer.full_name());
    for notification in marketplace.notifications(consumer.id())? {
        println!("  - {}: {}", notification.title(), notification.description());
    }

    let report = marketplace.account_report(provider.id())?;
    println!("\n{}", report.render());
    if let Some(dir) = args.report_dir {
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.csv", provider.username()));
        match report.export(&path) {
            Ok(()) => println!("Report exported to {}", path.display()),
            Err(err) => println!("Report export skipped: {err}"),
        }
    }

    Ok(())
}

fn demo_registration(role: Role, first_name: &str, username: &str) -> AccountRegistration {
    AccountRegistration {
        profile: AccountProfile {
            role,
            first_name: first_name.to_string(),
            last_name: "Demo".to_string(),
            date_of_birth: Local::now().date_naive() - Duration::days(30 * 365),
            address: "1 Demo Lane, Sydney".to_string(),
            phone: "0400 000 000".to_string(),
            email: format!("{username}@hustlr.demo"),
            username: username.to_string(),
        },
        password: DEMO_PASSWORD.to_string(),
    }
}
