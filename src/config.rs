//! Run configuration.
//!
//! Loaded once at startup with priority: `--config` flag >
//! `COURSE_SYNC_CONFIG` > `config.toml` > `config.json` >
//! `config_public.toml` > `config_public.json`. Credentials from `.env` or
//! the environment override whatever the file holds.
//!
//! Both TOML and the older JSON layout (upper-case keys such as `ILIAS_URL`
//! and `COURSES`) are accepted.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{Category, CourseSpec};
use crate::portal::DuplicatePolicy;
use crate::sync::OrphanPolicy;

// ==================== File Selection ====================

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "COURSE_SYNC_CONFIG";

/// Config files tried in order when no path is given
pub const CONFIG_CANDIDATES: [&str; 4] = [
    "config.toml",
    "config.json",
    "config_public.toml",
    "config_public.json",
];

/// Overrides the configured portal username
pub const USERNAME_ENV_VAR: &str = "PORTAL_USERNAME";

/// Overrides the configured portal password
pub const PASSWORD_ENV_VAR: &str = "PORTAL_PASSWORD";

// ==================== Portal Defaults ====================

pub const DEFAULT_LOGIN_PATH: &str = "/login.php?cmd=force_login";

/// Link elements carrying item titles on an ILIAS container page
pub const DEFAULT_ITEM_SELECTOR: &str = "a.il_ContainerItemTitle";

pub const DEFAULT_USERNAME_FIELD: &str = "login_form/input_3/input_4";
pub const DEFAULT_PASSWORD_FIELD: &str = "login_form/input_3/input_5";

// ==================== Sync Defaults ====================

pub const DEFAULT_DOCUMENT_EXTENSION: &str = "pdf";

/// Substrings marking an item as a solution or hint rather than a sheet
pub const DEFAULT_SOLUTION_KEYWORDS: [&str; 5] =
    ["Lösung", "Loesung", "Hinweis", "Solution", "Hint"];

pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// ==================== Errors ====================

#[derive(Debug)]
pub enum ConfigError {
    /// None of the candidate files exist
    NotFound(Vec<String>),
    /// (path, message)
    Io(String, String),
    /// (path, message)
    Parse(String, String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(tried) => {
                write!(f, "No configuration file found (tried {})", tried.join(", "))
            }
            ConfigError::Io(path, err) => write!(f, "IO error reading {}: {}", path, err),
            ConfigError::Parse(path, err) => write!(f, "Parse error in {}: {}", path, err),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ==================== File Layout ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.json` files are JSON, everything else TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(alias = "ILIAS_URL")]
    base_url: Option<String>,
    #[serde(alias = "LOGIN_URL")]
    login_path: Option<String>,
    #[serde(alias = "USERNAME")]
    username: Option<String>,
    #[serde(alias = "PASSWORD")]
    password: Option<String>,
    #[serde(alias = "STUDENT_NAME")]
    student_name: Option<String>,
    #[serde(alias = "STUDENT_ID")]
    student_id: Option<String>,
    #[serde(default, alias = "COURSES")]
    courses: Vec<RawCourse>,
    #[serde(default)]
    portal: RawPortal,
    #[serde(default)]
    sync: RawSync,
}

#[derive(Debug, Deserialize)]
struct RawCourse {
    #[serde(alias = "COURSE_ID")]
    id: Option<String>,
    #[serde(alias = "COURSE_PROPERTY")]
    category: Option<Category>,
    #[serde(alias = "LOCAL_FOLDER")]
    local_folder: Option<PathBuf>,
    #[serde(alias = "COURSE_NAME")]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPortal {
    item_selector: Option<String>,
    username_field: Option<String>,
    password_field: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSync {
    document_extension: Option<String>,
    solution_keywords: Option<Vec<String>>,
    download_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    #[serde(default)]
    duplicate_names: DuplicatePolicy,
    #[serde(default)]
    orphan_solutions: OrphanPolicy,
    template_path: Option<PathBuf>,
}

// ==================== Validated Config ====================

/// Portal login credentials. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Student details substituted into generated documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentInfo {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    pub login_path: String,
    pub item_selector: String,
    pub username_field: String,
    pub password_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Extension (without the dot) identifying course documents
    pub document_extension: String,
    pub solution_keywords: Vec<String>,
    /// Upper bound for a single download to appear on disk
    pub download_timeout: Duration,
    pub poll_interval: Duration,
    pub duplicate_names: DuplicatePolicy,
    pub orphan_solutions: OrphanPolicy,
    /// Custom document template text, if configured
    pub template: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            document_extension: DEFAULT_DOCUMENT_EXTENSION.to_string(),
            solution_keywords: DEFAULT_SOLUTION_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            duplicate_names: DuplicatePolicy::default(),
            orphan_solutions: OrphanPolicy::default(),
            template: None,
        }
    }
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub portal: PortalConfig,
    pub credentials: Credentials,
    /// Required when any course is a sheet course
    pub student: Option<StudentInfo>,
    pub courses: Vec<CourseSpec>,
    pub sync: SyncSettings,
}

// ==================== Loading ====================

/// Pick the config file: explicit path, env var, then the first candidate present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        tracing::info!("Using config from {}: {}", CONFIG_ENV_VAR, path);
        return Ok(PathBuf::from(path));
    }
    select_candidate(Path::new("."), &CONFIG_CANDIDATES)
}

/// First candidate that exists under `dir`.
pub fn select_candidate(dir: &Path, candidates: &[&str]) -> Result<PathBuf, ConfigError> {
    for (i, name) in candidates.iter().enumerate() {
        let path = dir.join(name);
        if path.is_file() {
            if i > 0 {
                tracing::info!("{} not found, using {} as fallback", candidates[0], name);
            }
            return Ok(path);
        }
    }
    Err(ConfigError::NotFound(
        candidates.iter().map(|c| c.to_string()).collect(),
    ))
}

/// Load `.env`, read the config file, apply environment overrides, validate.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let path = resolve_config_path(explicit)?;
    let contents = fs::read_to_string(&path)
        .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
    tracing::info!("Loaded configuration from {}", path.display());

    parse(&contents, ConfigFormat::from_path(&path), |key| std::env::var(key).ok())
        .map_err(|e| match e {
            ConfigError::Parse(_, msg) => ConfigError::Parse(path.display().to_string(), msg),
            other => other,
        })
}

/// Parse and validate configuration text. `env` supplies overrides.
pub fn parse<F>(contents: &str, format: ConfigFormat, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw: RawConfig = match format {
        ConfigFormat::Toml => toml::from_str(contents)
            .map_err(|e| ConfigError::Parse("<toml>".to_string(), e.to_string()))?,
        ConfigFormat::Json => serde_json::from_str(contents)
            .map_err(|e| ConfigError::Parse("<json>".to_string(), e.to_string()))?,
    };
    validate(raw, env)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate<F>(raw: RawConfig, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let base_url = non_empty(raw.base_url)
        .ok_or_else(|| ConfigError::Invalid("base_url (ILIAS_URL) is required".into()))?;

    let username = non_empty(env(USERNAME_ENV_VAR))
        .or_else(|| non_empty(raw.username))
        .ok_or_else(|| {
            ConfigError::Invalid(format!("username missing (set it or {})", USERNAME_ENV_VAR))
        })?;
    // Passwords are taken verbatim
    let password = env(PASSWORD_ENV_VAR)
        .filter(|p| !p.is_empty())
        .or(raw.password.filter(|p| !p.is_empty()))
        .ok_or_else(|| {
            ConfigError::Invalid(format!("password missing (set it or {})", PASSWORD_ENV_VAR))
        })?;

    if raw.courses.is_empty() {
        return Err(ConfigError::Invalid("no courses configured".into()));
    }

    let mut courses = Vec::with_capacity(raw.courses.len());
    for (i, course) in raw.courses.into_iter().enumerate() {
        let id = non_empty(course.id)
            .ok_or_else(|| ConfigError::Invalid(format!("course #{} has no id", i + 1)))?;
        let category = course
            .category
            .ok_or_else(|| ConfigError::Invalid(format!("course {} has no category", id)))?;
        let local_folder = course
            .local_folder
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ConfigError::Invalid(format!("course {} has no local_folder", id)))?;
        let name = non_empty(course.name).unwrap_or_else(|| id.clone());
        courses.push(CourseSpec {
            id,
            category,
            local_folder,
            name,
        });
    }

    let student = match (non_empty(raw.student_name), non_empty(raw.student_id)) {
        (Some(name), Some(id)) => Some(StudentInfo { name, id }),
        _ => None,
    };
    if student.is_none() {
        if let Some(course) = courses.iter().find(|c| c.category.is_numbered()) {
            return Err(ConfigError::Invalid(format!(
                "course {} is a {} course and needs student_name and student_id",
                course.name, course.category
            )));
        }
    }

    let sync = validate_sync(raw.sync)?;

    Ok(Config {
        portal: PortalConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            login_path: non_empty(raw.login_path).unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
            item_selector: non_empty(raw.portal.item_selector)
                .unwrap_or_else(|| DEFAULT_ITEM_SELECTOR.to_string()),
            username_field: non_empty(raw.portal.username_field)
                .unwrap_or_else(|| DEFAULT_USERNAME_FIELD.to_string()),
            password_field: non_empty(raw.portal.password_field)
                .unwrap_or_else(|| DEFAULT_PASSWORD_FIELD.to_string()),
        },
        credentials: Credentials { username, password },
        student,
        courses,
        sync,
    })
}

fn validate_sync(raw: RawSync) -> Result<SyncSettings, ConfigError> {
    let defaults = SyncSettings::default();

    let document_extension = match raw.document_extension {
        Some(ext) => {
            let ext = ext.trim().trim_start_matches('.').to_string();
            if ext.is_empty() {
                return Err(ConfigError::Invalid("document_extension is empty".into()));
            }
            ext
        }
        None => defaults.document_extension,
    };

    let download_timeout = match raw.download_timeout_secs {
        Some(0) => {
            return Err(ConfigError::Invalid(
                "download_timeout_secs must be positive".into(),
            ));
        }
        Some(secs) => Duration::from_secs(secs),
        None => defaults.download_timeout,
    };
    let poll_interval = match raw.poll_interval_ms {
        Some(0) => return Err(ConfigError::Invalid("poll_interval_ms must be positive".into())),
        Some(ms) => Duration::from_millis(ms),
        None => defaults.poll_interval,
    };

    let template = match raw.template_path {
        Some(path) => Some(fs::read_to_string(&path).map_err(|e| {
            ConfigError::Invalid(format!("template {} unreadable: {}", path.display(), e))
        })?),
        None => None,
    };

    Ok(SyncSettings {
        document_extension,
        solution_keywords: raw.solution_keywords.unwrap_or(defaults.solution_keywords),
        download_timeout,
        poll_interval,
        duplicate_names: raw.duplicate_names,
        orphan_solutions: raw.orphan_solutions,
        template,
    })
}
