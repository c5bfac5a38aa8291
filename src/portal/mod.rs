//! Course portal boundary.
//!
//! The sync pipeline only talks to the [`Portal`] / [`PortalSession`] traits.
//! [`ilias::IliasPortal`] is the HTTP implementation; tests use an
//! in-memory fake.

pub mod ilias;
pub mod listing;

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Credentials;
use crate::domain::{ItemTitle, RemoteItem};

pub use ilias::IliasPortal;
pub use listing::{list_remote_items, DuplicatePolicy, RemoteListing};

#[derive(Debug)]
pub enum PortalError {
    /// Transport failure
    Http(String),
    /// Non-success response
    Status { status: u16, url: String },
    /// Login rejected or session expired
    Auth(String),
    /// Page did not have the expected structure
    Parse(String),
    /// (path, message)
    Io(String, String),
    /// Download did not appear in time
    Timeout { path: String, waited_ms: u128 },
}

impl std::fmt::Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortalError::Http(msg) => write!(f, "Network error: {}", msg),
            PortalError::Status { status, url } => write!(f, "HTTP {} for {}", status, url),
            PortalError::Auth(msg) => write!(f, "Login failed: {}", msg),
            PortalError::Parse(msg) => write!(f, "Unexpected page content: {}", msg),
            PortalError::Io(path, msg) => write!(f, "IO error at {}: {}", path, msg),
            PortalError::Timeout { path, waited_ms } => {
                write!(f, "Download of {} did not complete within {}ms", path, waited_ms)
            }
        }
    }
}

impl std::error::Error for PortalError {}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return PortalError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        PortalError::Http(err.to_string())
    }
}

/// Entry point to a course portal.
pub trait Portal {
    type Session: PortalSession;

    /// Authenticate and open a session whose downloads land in `download_dir`.
    fn login(
        &self,
        credentials: &Credentials,
        download_dir: &Path,
    ) -> Result<Self::Session, PortalError>;
}

/// An authenticated portal session bound to one download directory.
pub trait PortalSession {
    /// A loaded course page
    type Page;

    /// Open the page of the course with the given id.
    fn navigate(&mut self, course_id: &str) -> Result<Self::Page, PortalError>;

    /// Raw title elements of every item on the page.
    fn list_items(&mut self, page: &Self::Page) -> Result<Vec<ItemTitle>, PortalError>;

    /// Start downloading `item`; returns the path the file is expected at.
    fn fetch(&mut self, item: &RemoteItem) -> Result<PathBuf, PortalError>;

    /// Block until `expected` is present or `timeout` elapses.
    fn await_download(
        &mut self,
        expected: &Path,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), PortalError> {
        wait_for_file(expected, timeout, poll)
    }

    /// End the session. Called once, also on error paths, via [`SessionGuard`].
    fn close(&mut self) -> Result<(), PortalError>;
}

/// Poll until `path` is a regular file.
pub fn wait_for_file(path: &Path, timeout: Duration, poll: Duration) -> Result<(), PortalError> {
    let start = Instant::now();
    loop {
        if path.is_file() {
            return Ok(());
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(PortalError::Timeout {
                path: path.display().to_string(),
                waited_ms: elapsed.as_millis(),
            });
        }
        thread::sleep(poll.min(timeout - elapsed));
    }
}

/// Owns a session and closes it when dropped.
pub struct SessionGuard<S: PortalSession> {
    session: S,
}

impl<S: PortalSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: PortalSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: PortalSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: PortalSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Err(e) = self.session.close() {
            tracing::warn!("Failed to close portal session: {}", e);
        }
    }
}
