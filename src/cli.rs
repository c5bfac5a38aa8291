//! Command-line arguments.

use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: course-sync [--config <path>] [--dry-run] [--help]

Downloads new course material from the portal, files numbered sheets into
H<NN> folders and seeds their document skeletons.

Options:
  -c, --config <path>  Configuration file (default: $COURSE_SYNC_CONFIG,
                       then config.toml, config.json, config_public.toml,
                       config_public.json)
  -n, --dry-run        List missing items without fetching or filing
  -h, --help           Show this help

Environment:
  PORTAL_USERNAME, PORTAL_PASSWORD  Override the configured credentials
  RUST_LOG                          Log filter (default: course_sync=info)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    pub help: bool,
}

/// Parse arguments, excluding the program name.
pub fn parse_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args.next().ok_or("Missing value for --config")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "-n" | "--dry-run" => parsed.dry_run = true,
            "-h" | "--help" => parsed.help = true,
            other => match other.strip_prefix("--config=") {
                Some(path) if !path.is_empty() => parsed.config = Some(PathBuf::from(path)),
                _ => return Err(format!("Unknown argument: {}", other)),
            },
        }
    }
    Ok(parsed)
}
