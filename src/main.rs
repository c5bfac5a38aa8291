use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_sync::cli::{self, USAGE};
use course_sync::config;
use course_sync::portal::IliasPortal;
use course_sync::services::CourseSync;

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "course_sync=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let args = match cli::parse_args(std::env::args().skip(1)) {
    Ok(args) => args,
    Err(e) => {
      eprintln!("{}\n\n{}", e, USAGE);
      return ExitCode::from(2);
    }
  };
  if args.help {
    println!("{}", USAGE);
    return ExitCode::SUCCESS;
  }

  let config = match config::load(args.config.as_deref()) {
    Ok(config) => config,
    Err(e) => {
      tracing::error!("{}", e);
      return ExitCode::FAILURE;
    }
  };
  tracing::info!("{} course(s) configured", config.courses.len());

  let portal = IliasPortal::new(&config.portal, &config.sync);
  let summary = CourseSync::new(&portal, &config)
    .dry_run(args.dry_run)
    .sync_all();

  for outcome in &summary.outcomes {
    println!("{}", outcome);
  }

  if summary.is_success() {
    ExitCode::SUCCESS
  } else {
    tracing::error!("{} course(s) failed", summary.failures().count());
    ExitCode::FAILURE
  }
}
