//! Per-course pipeline: listing, reconciliation, fetch, filing, seeding.
//!
//! Courses run strictly one after another. A course-level error is recorded
//! in the [`RunSummary`] and the next course still runs.

use std::path::PathBuf;

use crate::config::Config;
use crate::domain::{CourseSpec, RemoteItem};
use crate::portal::{list_remote_items, Portal, PortalSession, SessionGuard};
use crate::sync::filing::{ensure_destination_folders, Filer};
use crate::sync::reconcile::missing_items;
use crate::sync::templates::Seeder;
use crate::sync::{
    Extractor, FiledInventory, FilingReport, FolderInventory, InventorySource, NumberSets,
    SeedReport, SyncError, DEFAULT_TEMPLATE,
};

/// What happened to one course.
#[derive(Debug, Clone, Default)]
pub struct CourseReport {
    pub course: String,
    /// Usable items on the course page
    pub remote_items: usize,
    /// Missing display names, sorted
    pub missing: Vec<String>,
    pub fetched: Vec<String>,
    /// (display name, reason)
    pub failed_fetches: Vec<(String, String)>,
    /// `H{nn}` folders created this run
    pub created_folders: Vec<PathBuf>,
    /// Numbered courses only
    pub filing: Option<FilingReport>,
    /// Numbered courses only
    pub seeding: Option<SeedReport>,
    pub dry_run: bool,
}

impl CourseReport {
    /// Whether any individual file operation failed.
    pub fn has_failures(&self) -> bool {
        !self.failed_fetches.is_empty()
            || self.filing.as_ref().is_some_and(FilingReport::has_failures)
            || self.seeding.as_ref().is_some_and(|s| !s.failures.is_empty())
    }

    /// One-line human readable summary.
    pub fn summary_line(&self) -> String {
        if self.dry_run {
            return format!(
                "{}: {} remote, {} missing (dry run)",
                self.course,
                self.remote_items,
                self.missing.len()
            );
        }

        let mut line = format!(
            "{}: {} remote, {} missing, {} fetched",
            self.course,
            self.remote_items,
            self.missing.len(),
            self.fetched.len()
        );
        if !self.failed_fetches.is_empty() {
            line.push_str(&format!(", {} failed", self.failed_fetches.len()));
        }
        if let Some(filing) = &self.filing {
            line.push_str(&format!(
                ", {} filed, {} deleted",
                filing.moved.len(),
                filing.deleted.len()
            ));
        }
        if let Some(seeding) = &self.seeding {
            line.push_str(&format!(", {} documents", seeding.documents.len()));
        }
        line
    }
}

#[derive(Debug)]
pub struct CourseOutcome {
    pub course: String,
    pub result: Result<CourseReport, SyncError>,
}

impl std::fmt::Display for CourseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(report) if report.has_failures() => {
                write!(f, "{} (with errors)", report.summary_line())
            }
            Ok(report) => f.write_str(&report.summary_line()),
            Err(e) => write!(f, "{}: FAILED: {}", self.course, e),
        }
    }
}

/// Results of a whole run, in configuration order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<CourseOutcome>,
}

impl RunSummary {
    /// True if every course completed.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &CourseOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Runs the pipeline for the configured courses against one portal.
pub struct CourseSync<'a, P: Portal> {
    portal: &'a P,
    config: &'a Config,
    extractor: Extractor,
    dry_run: bool,
}

impl<'a, P: Portal> CourseSync<'a, P> {
    pub fn new(portal: &'a P, config: &'a Config) -> Self {
        Self {
            portal,
            config,
            extractor: Extractor::new(&config.sync.solution_keywords),
            dry_run: false,
        }
    }

    /// List and reconcile only; nothing is fetched, filed or seeded.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sync every configured course.
    pub fn sync_all(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for course in &self.config.courses {
            let span = tracing::info_span!("course", name = %course.name);
            let _enter = span.enter();

            let result = self.sync_course(course);
            if let Err(e) = &result {
                tracing::error!("Course {} failed: {}", course.name, e);
            }
            summary.outcomes.push(CourseOutcome {
                course: course.name.clone(),
                result,
            });
        }
        summary
    }

    /// Run the full pipeline for one course.
    pub fn sync_course(&self, course: &CourseSpec) -> Result<CourseReport, SyncError> {
        let settings = &self.config.sync;
        let extension = settings.document_extension.as_str();
        let folder = course.local_folder.as_path();
        let numbered = course.category.is_numbered();

        tracing::info!("Syncing {} ({}, id {})", course.name, course.category, course.id);

        let inventory = if numbered {
            FiledInventory::new(folder, extension).scan()?
        } else {
            FolderInventory::new(folder, extension).scan()?
        };

        let mut session = SessionGuard::new(self.portal.login(&self.config.credentials, folder)?);
        let page = session.navigate(&course.id)?;
        let listing = list_remote_items(&mut *session, &page, settings.duplicate_names)?;
        let missing = missing_items(&listing, &inventory, extension);

        let mut report = CourseReport {
            course: course.name.clone(),
            remote_items: listing.len(),
            missing: missing.iter().map(|item| item.name.clone()).collect(),
            dry_run: self.dry_run,
            ..CourseReport::default()
        };

        if self.dry_run {
            for name in &report.missing {
                tracing::info!("Not yet downloaded: {}", name);
            }
            return Ok(report);
        }

        let sets = if numbered {
            let sets = NumberSets::from_names(listing.names(), &self.extractor);
            for number in sets.orphan_solutions() {
                tracing::info!("Solution {} is listed without its sheet", number);
            }
            report.created_folders = ensure_destination_folders(folder, &sets)?;
            Some(sets)
        } else {
            None
        };

        if missing.is_empty() {
            tracing::info!("Everything is downloaded");
        }
        for item in &missing {
            match self.fetch_one(&mut *session, item) {
                Ok(path) => {
                    tracing::info!("Fetched '{}' to {}", item.name, path.display());
                    report.fetched.push(item.name.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch '{}': {}", item.name, e);
                    report.failed_fetches.push((item.name.clone(), e.to_string()));
                }
            }
        }
        drop(session);

        let Some(sets) = sets else {
            return Ok(report);
        };

        let filer = Filer::new(folder, extension, &self.extractor, settings.orphan_solutions);
        report.filing = Some(filer.file_documents(&sets)?);

        match &self.config.student {
            Some(student) => {
                let template = settings.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
                report.seeding = Some(Seeder::new(course, student, template).seed()?);
            }
            None => tracing::warn!("No student details configured, skipping document seeding"),
        }

        Ok(report)
    }

    fn fetch_one(
        &self,
        session: &mut P::Session,
        item: &RemoteItem,
    ) -> Result<PathBuf, crate::portal::PortalError> {
        let settings = &self.config.sync;
        let path = session.fetch(item)?;
        session.await_download(&path, settings.download_timeout, settings.poll_interval)?;
        Ok(path)
    }
}
