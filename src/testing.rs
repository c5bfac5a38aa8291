//! Test utilities: an in-memory portal and temporary course folders.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

use crate::config::{Config, Credentials, PortalConfig, StudentInfo, SyncSettings};
use crate::domain::{Category, CourseSpec, ItemTitle, RemoteItem};
use crate::portal::ilias::download_file_name;
use crate::portal::{Portal, PortalError, PortalSession};

/// Portal serving scripted course listings.
///
/// Fetched items are written as `{name}.pdf` into the session's folder,
/// except names registered with [`FakePortal::silently_fail`], which never
/// appear (exercising the download timeout).
#[derive(Debug, Default, Clone)]
pub struct FakePortal {
    listings: HashMap<String, Vec<ItemTitle>>,
    silent_failures: HashSet<String>,
    reject_login: bool,
    events: Rc<RefCell<Vec<String>>>,
}

impl FakePortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the items listed on a course page.
    pub fn with_course(mut self, course_id: &str, names: &[&str]) -> Self {
        let titles = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let href = format!("goto.php?target=file_{}", i + 1);
                ItemTitle::new(*name, Some(href.as_str()))
            })
            .collect();
        self.listings.insert(course_id.to_string(), titles);
        self
    }

    /// Script raw title elements, including unusable ones.
    pub fn with_titles(mut self, course_id: &str, titles: Vec<ItemTitle>) -> Self {
        self.listings.insert(course_id.to_string(), titles);
        self
    }

    pub fn silently_fail(mut self, name: &str) -> Self {
        self.silent_failures.insert(name.to_string());
        self
    }

    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    /// Calls made so far, e.g. `login`, `navigate:42`, `fetch:Blatt01`, `close`.
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Names fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix("fetch:").map(String::from))
            .collect()
    }
}

impl Portal for FakePortal {
    type Session = FakeSession;

    fn login(
        &self,
        _credentials: &Credentials,
        download_dir: &Path,
    ) -> Result<FakeSession, PortalError> {
        if self.reject_login {
            return Err(PortalError::Auth("rejected by fake portal".into()));
        }
        self.events.borrow_mut().push("login".into());
        Ok(FakeSession {
            listings: self.listings.clone(),
            silent_failures: self.silent_failures.clone(),
            download_dir: download_dir.to_path_buf(),
            events: Rc::clone(&self.events),
        })
    }
}

pub struct FakeSession {
    listings: HashMap<String, Vec<ItemTitle>>,
    silent_failures: HashSet<String>,
    download_dir: PathBuf,
    events: Rc<RefCell<Vec<String>>>,
}

impl PortalSession for FakeSession {
    type Page = Vec<ItemTitle>;

    fn navigate(&mut self, course_id: &str) -> Result<Vec<ItemTitle>, PortalError> {
        self.events.borrow_mut().push(format!("navigate:{}", course_id));
        self.listings
            .get(course_id)
            .cloned()
            .ok_or_else(|| PortalError::Status {
                status: 404,
                url: format!("fake://{}", course_id),
            })
    }

    fn list_items(&mut self, page: &Vec<ItemTitle>) -> Result<Vec<ItemTitle>, PortalError> {
        Ok(page.clone())
    }

    fn fetch(&mut self, item: &RemoteItem) -> Result<PathBuf, PortalError> {
        self.events.borrow_mut().push(format!("fetch:{}", item.name));
        let path = self.download_dir.join(download_file_name(&item.name, "pdf"));
        if !self.silent_failures.contains(&item.name) {
            fs::write(&path, format!("%PDF {}", item.locator))
                .map_err(|e| PortalError::Io(path.display().to_string(), e.to_string()))?;
        }
        Ok(path)
    }

    fn close(&mut self) -> Result<(), PortalError> {
        self.events.borrow_mut().push("close".into());
        Ok(())
    }
}

/// Temporary root for course folders plus a matching [`Config`].
pub struct TestEnv {
    /// Kept alive so the folders persist for the test
    pub temp: TempDir,
    pub courses: Vec<CourseSpec>,
    pub sync: SyncSettings,
}

impl TestEnv {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp: TempDir::new()?,
            courses: Vec::new(),
            sync: SyncSettings {
                download_timeout: Duration::from_millis(50),
                poll_interval: Duration::from_millis(5),
                ..SyncSettings::default()
            },
        })
    }

    /// Add a course whose folder is `<temp>/<name>` (not created).
    pub fn with_course(mut self, id: &str, category: Category, name: &str) -> Self {
        self.courses.push(CourseSpec {
            id: id.to_string(),
            category,
            local_folder: self.temp.path().join(name),
            name: name.to_string(),
        });
        self
    }

    pub fn course_dir(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    pub fn config(&self) -> Config {
        Config {
            portal: PortalConfig {
                base_url: "https://ilias.example".into(),
                login_path: "/login.php".into(),
                item_selector: "a.il_ContainerItemTitle".into(),
                username_field: "user".into(),
                password_field: "pass".into(),
            },
            credentials: Credentials {
                username: "student".into(),
                password: "secret".into(),
            },
            student: Some(StudentInfo {
                name: "Erika Mustermann".into(),
                id: "1234567".into(),
            }),
            courses: self.courses.clone(),
            sync: self.sync.clone(),
        }
    }
}
