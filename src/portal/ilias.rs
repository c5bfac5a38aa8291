//! ILIAS portal over HTTP.
//!
//! Login posts the standard login form, course pages are parsed with
//! `scraper`, and item links are downloaded straight into the session's
//! download directory.

use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};
use scraper::{ElementRef, Html, Selector};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Portal, PortalError, PortalSession};
use crate::config::{Credentials, PortalConfig, SyncSettings};
use crate::domain::{ItemTitle, RemoteItem};
use crate::sync::inventory::{has_extension, sanitize_file_name};

/// Suffix of a download still being written
pub const PARTIAL_SUFFIX: &str = ".part";

const LOGOUT_PATH: &str = "/logout.php";

#[derive(Debug, Clone)]
pub struct IliasPortal {
    config: PortalConfig,
    request_timeout: Duration,
    default_extension: String,
}

impl IliasPortal {
    pub fn new(config: &PortalConfig, settings: &SyncSettings) -> Self {
        Self {
            config: config.clone(),
            request_timeout: settings.download_timeout,
            default_extension: settings.document_extension.clone(),
        }
    }

    pub fn login_url(&self) -> String {
        join_base(&self.config.base_url, &self.config.login_path)
    }

    fn build_client(&self) -> Result<Client, PortalError> {
        Ok(Client::builder()
            .cookie_store(true)
            .timeout(self.request_timeout)
            .build()?)
    }
}

impl Portal for IliasPortal {
    type Session = IliasSession;

    fn login(
        &self,
        credentials: &Credentials,
        download_dir: &Path,
    ) -> Result<IliasSession, PortalError> {
        let client = self.build_client()?;
        let login_url = parse_url(&self.login_url())?;

        let (form_page_url, form_page) = get_page(&client, login_url.as_str())?;
        let action = find_login_action(&form_page, &self.config.username_field).ok_or_else(|| {
            PortalError::Parse(format!("no login form on {}", form_page_url))
        })?;
        let action_url = form_page_url
            .join(&action)
            .map_err(|e| PortalError::Parse(format!("bad form action '{}': {}", action, e)))?;

        tracing::debug!("Submitting login form to {}", action_url);
        let response = client
            .post(action_url)
            .form(&[
                (self.config.username_field.as_str(), credentials.username.as_str()),
                (self.config.password_field.as_str(), credentials.password.as_str()),
            ])
            .send()?;
        let response = check_status(response)?;
        let body = response.text()?;

        if find_login_action(&body, &self.config.username_field).is_some() {
            return Err(PortalError::Auth(format!(
                "portal rejected credentials for {}",
                credentials.username
            )));
        }
        tracing::info!("Logged in to {} as {}", self.config.base_url, credentials.username);

        Ok(IliasSession {
            client,
            base_url: self.config.base_url.clone(),
            item_selector: self.config.item_selector.clone(),
            username_field: self.config.username_field.clone(),
            default_extension: self.default_extension.clone(),
            download_dir: download_dir.to_path_buf(),
            closed: false,
        })
    }
}

/// A loaded course page.
#[derive(Debug, Clone)]
pub struct IliasPage {
    pub url: Url,
    pub body: String,
}

pub struct IliasSession {
    client: Client,
    base_url: String,
    item_selector: String,
    username_field: String,
    default_extension: String,
    download_dir: PathBuf,
    closed: bool,
}

impl IliasSession {
    fn resolve(&self, href: &str) -> Result<Url, PortalError> {
        let base = parse_url(&format!("{}/", self.base_url))?;
        base.join(href)
            .map_err(|e| PortalError::Parse(format!("bad link '{}': {}", href, e)))
    }
}

impl PortalSession for IliasSession {
    type Page = IliasPage;

    fn navigate(&mut self, course_id: &str) -> Result<IliasPage, PortalError> {
        let url = course_url(&self.base_url, course_id);
        let (url, body) = get_page(&self.client, &url)?;
        if find_login_action(&body, &self.username_field).is_some() {
            return Err(PortalError::Auth(format!(
                "redirected to login while opening course {}",
                course_id
            )));
        }
        tracing::debug!("Opened course page {}", url);
        Ok(IliasPage { url, body })
    }

    fn list_items(&mut self, page: &IliasPage) -> Result<Vec<ItemTitle>, PortalError> {
        extract_titles(&page.body, &self.item_selector, &page.url)
    }

    fn fetch(&mut self, item: &RemoteItem) -> Result<PathBuf, PortalError> {
        let url = self.resolve(item.locator.as_str())?;
        let mut response = check_status(self.client.get(url).send()?)?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let disposition = header(CONTENT_DISPOSITION);
        let content_type = header(CONTENT_TYPE);
        let extension = document_extension(
            disposition.as_deref(),
            content_type.as_deref(),
            &self.default_extension,
        )
        .ok_or_else(|| {
            PortalError::Parse(format!(
                "'{}' is not a document ({})",
                item.name,
                content_type.as_deref().unwrap_or("no content type")
            ))
        })?;
        let target = self.download_dir.join(download_file_name(&item.name, &extension));
        let partial = partial_path(&target);

        let io_err = |path: &Path, e: std::io::Error| {
            PortalError::Io(path.display().to_string(), e.to_string())
        };
        let mut file = File::create(&partial).map_err(|e| io_err(&partial, e))?;
        let written = response.copy_to(&mut file);
        drop(file);
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        fs::rename(&partial, &target).map_err(|e| io_err(&target, e))?;

        tracing::debug!("Downloaded '{}' to {}", item.name, target.display());
        Ok(target)
    }

    fn close(&mut self) -> Result<(), PortalError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let url = join_base(&self.base_url, LOGOUT_PATH);
        check_status(self.client.get(&url).send()?)?;
        tracing::debug!("Logged out of {}", self.base_url);
        Ok(())
    }
}

// ==================== Helpers ====================

fn parse_url(url: &str) -> Result<Url, PortalError> {
    Url::parse(url).map_err(|e| PortalError::Parse(format!("bad url '{}': {}", url, e)))
}

fn join_base(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub fn course_url(base_url: &str, course_id: &str) -> String {
    join_base(
        base_url,
        &format!(
            "ilias.php?baseClass=ilrepositorygui&ref_id={}",
            urlencoding::encode(course_id)
        ),
    )
}

fn check_status(response: Response) -> Result<Response, PortalError> {
    let status = response.status();
    if !status.is_success() {
        return Err(PortalError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }
    Ok(response)
}

/// GET a page; returns the final URL (after redirects) and the body.
fn get_page(client: &Client, url: &str) -> Result<(Url, String), PortalError> {
    let response = check_status(client.get(url).send()?)?;
    let final_url = response.url().clone();
    let body = response.text()?;
    Ok((final_url, body))
}

fn selector(css: &str) -> Result<Selector, PortalError> {
    Selector::parse(css)
        .map_err(|e| PortalError::Parse(format!("invalid selector '{}': {:?}", css, e)))
}

fn has_input_named(form: &ElementRef<'_>, inputs: &Selector, name: &str) -> bool {
    form.select(inputs).any(|input| input.value().attr("name") == Some(name))
}

/// Action of the form containing an input named `username_field`.
pub fn find_login_action(html: &str, username_field: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let forms = selector("form").ok()?;
    let inputs = selector("input").ok()?;

    document
        .select(&forms)
        .find(|form| has_input_named(form, &inputs, username_field))
        .map(|form| form.value().attr("action").unwrap_or("").to_string())
}

/// Title elements matching `css`, with links resolved against `page_url`.
pub fn extract_titles(
    html: &str,
    css: &str,
    page_url: &Url,
) -> Result<Vec<ItemTitle>, PortalError> {
    let document = Html::parse_document(html);
    let titles = selector(css)?;

    Ok(document
        .select(&titles)
        .map(|el| {
            let text: String = el.text().collect();
            let href = el
                .value()
                .attr("href")
                .and_then(|h| page_url.join(h).ok())
                .map(|u| u.to_string());
            ItemTitle::new(text.trim(), href.as_deref())
        })
        .collect())
}

/// File extension from a `Content-Disposition` header, if it names one.
pub fn disposition_extension(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for part in header.split(';').map(str::trim) {
        if let Some(value) = part.strip_prefix("filename*=") {
            // RFC 5987: charset'lang'percent-encoded
            let encoded = value.rsplit('\'').next().unwrap_or(value);
            extended = urlencoding::decode(encoded).ok().map(|s| s.into_owned());
        } else if let Some(value) = part.strip_prefix("filename=") {
            plain = Some(value.trim_matches('"').to_string());
        }
    }

    let name = extended.or(plain)?;
    Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

/// Extension to save a response under, or `None` when it is not a document.
///
/// A response is a document if it is sent as an attachment or its content
/// type is anything but HTML. Folder, link and forum items are HTML pages.
/// An extension equal to `configured` apart from case becomes `configured`.
pub fn document_extension(
    disposition: Option<&str>,
    content_type: Option<&str>,
    configured: &str,
) -> Option<String> {
    let attachment = disposition.is_some_and(|d| {
        d.trim_start()
            .get(..10)
            .is_some_and(|kind| kind.eq_ignore_ascii_case("attachment"))
    });
    let html = content_type.is_none_or(|t| {
        let mime = t.split(';').next().unwrap_or("").trim();
        mime.eq_ignore_ascii_case("text/html")
            || mime.eq_ignore_ascii_case("application/xhtml+xml")
    });
    if !attachment && html {
        return None;
    }

    let extension = match disposition.and_then(disposition_extension) {
        Some(ext) if !ext.eq_ignore_ascii_case(configured) => ext,
        _ => configured.to_string(),
    };
    Some(extension)
}

/// File name for a downloaded item: `{display name}.{extension}`.
///
/// A display name already ending in `.{extension}` is used as is.
pub fn download_file_name(display_name: &str, extension: &str) -> String {
    let name = sanitize_file_name(display_name.trim());
    if has_extension(&name, extension) {
        name
    } else {
        format!("{}.{}", name, extension)
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
