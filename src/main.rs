use clap::Parser;
use metal_notifier::adapters::{
    HttpStorefrontProbe, JsonFileSubscribers, SendGridMailer, SystemClock, WikiClient,
};
use metal_notifier::config::{Command, LogFormat};
use metal_notifier::core::calendar::MONTHS;
use metal_notifier::utils::error::ErrorSeverity;
use metal_notifier::utils::{logger, validation::Validate};
use metal_notifier::{
    CalendarHandle, CliConfig, DispatchTodaysReleases, JobRunner, LinkEnricher, NotifierConfig,
    RefreshCalendar, Result,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting metal-notifier");
    tracing::debug!("CLI config: {:?}", cli);

    let config = match NotifierConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    if let Err(e) = run(&cli, config).await {
        tracing::error!(
            "metal-notifier failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: &CliConfig, config: NotifierConfig) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let calendar = CalendarHandle::default();
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let refresh = JobRunner::new(
        RefreshCalendar::new(
            WikiClient::new(&config.source)?,
            Arc::clone(&clock),
            calendar.clone(),
        )
        .with_cancellation(cancel.clone()),
    );
    let summary = refresh.run().await?;

    let enricher = Arc::new(LinkEnricher::new(
        HttpStorefrontProbe::new(config.links.probe_timeout())?,
        config.links.link_settings(),
    ));

    match &cli.command {
        Command::Refresh => {
            let snapshot = calendar.snapshot().await;
            println!("✅ {}", summary);
            for month in MONTHS {
                let days = snapshot.month(month);
                let releases: usize = days.values().map(Vec::len).sum();
                println!("{:>10}: {:>3} releases on {:>2} days", month.name(), releases, days.len());
            }
        }
        Command::Dispatch | Command::Run => {
            let mailer = SendGridMailer::new(config.email.clone());
            let dispatch = JobRunner::new(
                DispatchTodaysReleases::new(
                    JsonFileSubscribers::new(&config.subscribers.path),
                    mailer.clone(),
                    enricher,
                    clock,
                    calendar,
                )
                .with_cancellation(cancel),
            );
            let result = dispatch.run().await;
            // Sends and admin reports run in the background; let them finish before exit.
            mailer.flush().await;
            println!("✅ {}", result?);
        }
        Command::Show { month, day } => {
            let snapshot = calendar.snapshot().await;
            let releases = snapshot
                .releases_on_date(MONTHS[*month as usize - 1], *day, &*enricher)
                .await;
            println!("{}", serde_json::to_string_pretty(&releases)?);
        }
    }

    Ok(())
}
