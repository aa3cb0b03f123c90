use mentor_match::config::{LoggingSettings, Settings};
use mentor_match::{MatchStatus, MatchStatusResponse, MatchingEngine, PostgresRepository};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(settings: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.format.clone());

    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Results go to stdout, logs to stderr
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings.logging);

    let mentee_ids: Vec<String> = std::env::args().skip(1).collect();
    if mentee_ids.is_empty() {
        eprintln!("usage: mentor-match <mentee-id>...");
        return ExitCode::from(2);
    }

    let policy = settings.policy();
    info!(?policy, "Configuration loaded successfully");

    let repository = match PostgresRepository::from_settings(&settings.database, policy.max_interests).await {
        Ok(repository) => repository,
        Err(e) => {
            error!("Failed to connect to PostgreSQL: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = repository.health_check().await {
        error!("PostgreSQL health check failed: {}", e);
        return ExitCode::FAILURE;
    }

    let engine = Arc::new(MatchingEngine::new(Arc::new(repository), policy));
    // Batches are flushed by the ticker only
    let ticker = Arc::clone(&engine).spawn();

    let mut handles = Vec::with_capacity(mentee_ids.len());
    for mentee_id in mentee_ids {
        handles.push(engine.submit(mentee_id).await);
    }

    info!("Submitted {} match requests", handles.len());

    let mut failures = 0;
    for handle in &handles {
        let Some(status) = engine.wait_for(handle).await else {
            continue;
        };
        if matches!(status, MatchStatus::Failed { .. }) {
            failures += 1;
        }

        match serde_json::to_string(&MatchStatusResponse::new(handle, &status)) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize result for {}: {}", handle.mentee_id(), e),
        }
    }

    ticker.abort();

    info!("Matched {} mentees ({} failed)", handles.len() - failures, failures);

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
