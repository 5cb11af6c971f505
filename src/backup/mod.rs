//! SQL dump download through the phpMyAdmin web interface.
//!
//! [`download_sql_backup`] runs the whole pipeline in order:
//!
//! 1. fetch the login page and submit the login form
//! 2. check the landing page for a logged-in marker
//! 3. open the content frame of legacy (phpMyAdmin 3) framesets
//! 4. follow the `server_export.php` link in the top menu
//! 5. submit the export form with the selected databases and compression
//! 6. name the file after `Content-Disposition` and save the body
//!
//! Every step depends on the previous one; the first failure ends the run.
//!
//! # Example
//!
//! ```no_run
//! use pma_backup::{BackupRequest, download_sql_backup};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut request = BackupRequest::new("https://db.example.com/phpmyadmin/", "backup", "secret");
//! request.prepend_date = true;
//! let path = download_sql_backup(&request).await?;
//! println!("saved {}", path.display());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod filename;
mod session;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::Response;
use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use error::{BackupError, LoginCheckFailed};
pub use session::{Page, Session, content_disposition};

use crate::config::BackupRequest;
use crate::html::{Document, Form, HtmlDocument};

const USERNAME_FIELD_ID: &str = "input_username";
const PASSWORD_FIELD_ID: &str = "input_password";
const SERVER_NAME_FIELD_ID: &str = "input_servername";
const FRAME_CONTENT_ID: &str = "frame_content";
const TOP_MENU_ID: &str = "topmenu";
const EXPORT_LINK_NEEDLE: &str = "server_export.php";
const DB_SELECT_FIELD: &str = "db_select[]";
const COMPRESSION_FIELD: &str = "compression";

/// Substrings of which one must appear on the page served after logging in.
const LOGIN_MARKERS: &[&str] = &[EXPORT_LINK_NEEDLE, FRAME_CONTENT_ID];

/// Splits a comma-separated exclusion list into database names.
///
/// Names are trimmed and empty entries dropped, so `""` excludes nothing.
#[must_use]
pub fn parse_excluded_dbs(input: &str) -> HashSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Available databases minus the excluded ones, in server order.
#[must_use]
pub fn dbs_to_dump<S>(available: &[String], excluded: &HashSet<String, S>) -> Vec<String>
where
    S: std::hash::BuildHasher,
{
    available
        .iter()
        .filter(|name| !excluded.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Downloads one SQL dump as described by `request`.
///
/// Returns the path the dump was saved to; in dry-run mode, the path it
/// would have been saved to.
///
/// # Errors
///
/// Returns [`BackupError`] for the first step that fails. Nothing is written
/// unless every step before saving succeeded.
pub async fn download_sql_backup(request: &BackupRequest) -> Result<PathBuf, BackupError> {
    download_sql_backup_at(request, Utc::now()).await
}

/// Same as [`download_sql_backup`], using `now` for the date prefix.
///
/// # Errors
///
/// See [`download_sql_backup`].
#[instrument(skip(request, now), fields(url = %request.url, dry_run = request.dry_run))]
pub async fn download_sql_backup_at(
    request: &BackupRequest,
    now: DateTime<Utc>,
) -> Result<PathBuf, BackupError> {
    let prefix = if request.prepend_date {
        Some(filename::date_prefix(&request.prefix_format, now)?)
    } else {
        None
    };
    let login_url =
        Url::parse(&request.url).map_err(|_| BackupError::invalid_url(request.url.clone()))?;

    let session = Session::new(
        Duration::from_secs(request.timeout_secs),
        request.compression,
        request.http_auth.clone(),
    )?;

    let landing = login(&session, request, &login_url).await?;
    let main_page = open_content_frame(&session, landing).await?;
    let export_page = open_export_page(&session, &main_page).await?;
    let response = submit_export(&session, &export_page, request).await?;

    let header = content_disposition(&response);
    let detected = filename::detect_filename(header.as_deref())?;
    let mut name = filename::apply_basename(&detected, request.basename.as_deref());
    if let Some(prefix) = prefix {
        name.insert_str(0, &prefix);
    }
    debug!(detected = %detected, name = %name, "derived dump filename");

    let path =
        filename::resolve_output_path(&request.output_directory, &name, request.overwrite_existing);

    if request.dry_run {
        info!(path = %path.display(), "dry run, dump not saved");
        return Ok(path);
    }

    save_response(response, &path, request.overwrite_existing).await?;
    Ok(path)
}

#[instrument(level = "debug", skip_all, fields(user = %request.user))]
async fn login(
    session: &Session,
    request: &BackupRequest,
    login_url: &Url,
) -> Result<Page, BackupError> {
    let login_page = session.get_page(login_url).await?;

    let Some(form) = prepare_login_form(&login_page, request)? else {
        // auth_type "config" or "http": no login form, already in.
        info!("no login form, session already authenticated");
        return Ok(login_page);
    };

    let landing = session.submit_for_page(&form, &login_page.url).await?;
    if !is_logged_in(&landing.document()) {
        return Err(BackupError::login_failed(
            login_url.as_str(),
            landing.url.as_str(),
            LOGIN_MARKERS,
        ));
    }
    info!("logged in");
    Ok(landing)
}

/// The filled-in login form, or `None` when the page is already past login.
fn prepare_login_form(page: &Page, request: &BackupRequest) -> Result<Option<Form>, BackupError> {
    let document = page.document();
    let Some(mut form) = document.form_containing_field(USERNAME_FIELD_ID) else {
        if is_logged_in(&document) {
            return Ok(None);
        }
        return Err(BackupError::FormNotFound {
            url: page.url.to_string(),
            field: USERNAME_FIELD_ID.to_string(),
        });
    };

    fill_field(&mut form, &document, &page.url, USERNAME_FIELD_ID, &request.user)?;
    fill_field(&mut form, &document, &page.url, PASSWORD_FIELD_ID, &request.password)?;
    if let Some(server_name) = request.server_name.as_deref() {
        fill_field(&mut form, &document, &page.url, SERVER_NAME_FIELD_ID, server_name)?;
    }
    Ok(Some(form))
}

fn is_logged_in(document: &Document) -> bool {
    LOGIN_MARKERS
        .iter()
        .any(|marker| document.contains_text(marker))
}

fn fill_field(
    form: &mut Form,
    document: &Document,
    url: &Url,
    id: &str,
    value: &str,
) -> Result<(), BackupError> {
    let name = document
        .find_field_by_id(id)
        .and_then(|field| field.name)
        .ok_or_else(|| BackupError::FieldNotFound {
            url: url.to_string(),
            id: id.to_string(),
        })?;
    form.set_field(&name, value);
    Ok(())
}

async fn open_content_frame(session: &Session, page: Page) -> Result<Page, BackupError> {
    let src = page.document().attribute_by_id(FRAME_CONTENT_ID, "src");
    let Some(src) = src else {
        return Ok(page);
    };
    let frame_url = join_url(&page.url, &src)?;
    debug!(frame = %frame_url, "opening content frame");
    session.get_page(&frame_url).await
}

async fn open_export_page(session: &Session, page: &Page) -> Result<Page, BackupError> {
    let href = page
        .document()
        .find_link_containing(TOP_MENU_ID, EXPORT_LINK_NEEDLE)
        .ok_or_else(|| BackupError::ExportLinkNotFound {
            url: page.url.to_string(),
            container: TOP_MENU_ID,
            needle: EXPORT_LINK_NEEDLE,
        })?;
    let export_url = join_url(&page.url, &href)?;
    debug!(export = %export_url, "opening export page");
    session.get_page(&export_url).await
}

async fn submit_export(
    session: &Session,
    page: &Page,
    request: &BackupRequest,
) -> Result<Response, BackupError> {
    let form = prepare_export_form(page, request)?;
    session.submit_form(&form, &page.url).await
}

/// The export form with the database selection and compression filled in.
fn prepare_export_form(page: &Page, request: &BackupRequest) -> Result<Form, BackupError> {
    let document = page.document();
    let mut form = document
        .form_containing_field(DB_SELECT_FIELD)
        .ok_or_else(|| BackupError::FormNotFound {
            url: page.url.to_string(),
            field: DB_SELECT_FIELD.to_string(),
        })?;

    let available = document.read_multiselect_options(DB_SELECT_FIELD);
    let selected = dbs_to_dump(&available, &request.exclude_dbs);
    if selected.is_empty() {
        warn!(
            "no databases to dump (databases available: \"{}\")",
            available.join("\", \"")
        );
    }

    form.remove_field(DB_SELECT_FIELD);
    for name in &selected {
        form.push_field(DB_SELECT_FIELD, name);
    }
    form.remove_field(COMPRESSION_FIELD);
    form.push_field(COMPRESSION_FIELD, request.compression.as_str());

    info!(
        databases = ?selected,
        compression = %request.compression,
        "requesting export"
    );
    Ok(form)
}

fn join_url(base: &Url, reference: &str) -> Result<Url, BackupError> {
    base.join(reference)
        .map_err(|_| BackupError::invalid_url(reference.to_string()))
}

/// Writes the export body to `path`.
///
/// The body is streamed into a temp file in the target directory and only
/// moved onto `path` once complete, so a failed transfer leaves any existing
/// dump untouched. Without `overwrite`, the move fails instead of replacing a
/// file that appeared after path resolution.
async fn save_response(response: Response, path: &Path, overwrite: bool) -> Result<u64, BackupError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| BackupError::io(&dir, e))?;

    let temp = NamedTempFile::new_in(&dir).map_err(|e| BackupError::io(&dir, e))?;
    let handle = temp
        .as_file()
        .try_clone()
        .map_err(|e| BackupError::io(temp.path(), e))?;
    let mut file = File::from_std(handle);

    let url = response.url().to_string();
    let bytes = match stream_to_file(&mut file, response, &url, temp.path()).await {
        Ok(bytes) => bytes,
        Err(error) => {
            debug!(path = %path.display(), "discarding partial download");
            return Err(error);
        }
    };
    drop(file);

    let persisted = if overwrite {
        temp.persist(path)
    } else {
        temp.persist_noclobber(path)
    };
    persisted.map_err(|e| BackupError::io(path, e.error))?;

    info!(path = %path.display(), bytes, "dump saved");
    Ok(bytes)
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, BackupError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| BackupError::request(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| BackupError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| BackupError::io(file_path, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    /// Answers one request on localhost with `raw`, then closes the socket.
    async fn serve_once(raw: &'static [u8]) -> Option<String> {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            eprintln!("cannot bind localhost socket; skipping");
            return None;
        };
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket.write_all(raw).await.unwrap();
            socket.shutdown().await.ok();
        });
        Some(format!("http://{addr}/export.php"))
    }

    /// Declares more body than it sends, so the stream fails mid-transfer.
    const TRUNCATED_BODY: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\npartial";
    const COMPLETE_BODY: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnew dump";

    async fn fetch(url: &str) -> Response {
        reqwest::Client::new().get(url).send().await.unwrap()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_save_response_failed_overwrite_keeps_previous_dump() {
        let Some(url) = serve_once(TRUNCATED_BODY).await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("localhost.sql");
        std::fs::write(&path, b"previous good backup").unwrap();

        let result = save_response(fetch(&url).await, &path, true).await;

        assert!(result.is_err(), "truncated body must fail: {result:?}");
        assert_eq!(std::fs::read(&path).unwrap(), b"previous good backup");
        assert_eq!(entries(temp_dir.path()), 1, "temp file left behind");
    }

    #[tokio::test]
    async fn test_save_response_failed_stream_creates_nothing() {
        let Some(url) = serve_once(TRUNCATED_BODY).await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("localhost.sql");

        assert!(save_response(fetch(&url).await, &path, false).await.is_err());
        assert_eq!(entries(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_save_response_overwrite_replaces_complete_dump() {
        let Some(url) = serve_once(COMPLETE_BODY).await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("localhost.sql");
        std::fs::write(&path, b"previous good backup").unwrap();

        let bytes = save_response(fetch(&url).await, &path, true).await.unwrap();

        assert_eq!(bytes, 8);
        assert_eq!(std::fs::read(&path).unwrap(), b"new dump");
        assert_eq!(entries(temp_dir.path()), 1);
    }

    #[tokio::test]
    async fn test_save_response_without_overwrite_never_clobbers() {
        let Some(url) = serve_once(COMPLETE_BODY).await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("localhost.sql");
        std::fs::write(&path, b"appeared meanwhile").unwrap();

        let error = save_response(fetch(&url).await, &path, false).await.unwrap_err();

        assert!(matches!(error, BackupError::Io { .. }), "{error:?}");
        assert_eq!(std::fs::read(&path).unwrap(), b"appeared meanwhile");
        assert_eq!(entries(temp_dir.path()), 1);
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_excluded_dbs_empty_input_excludes_nothing() {
        assert!(parse_excluded_dbs("").is_empty());
    }

    #[test]
    fn test_parse_excluded_dbs_trims_and_drops_blanks() {
        let excluded = parse_excluded_dbs(" logs_db, ,information_schema,");
        assert_eq!(excluded.len(), 2);
        assert!(excluded.contains("logs_db"));
        assert!(excluded.contains("information_schema"));
    }

    #[test]
    fn test_dbs_to_dump_preserves_server_order() {
        let available = names(&["app_db", "logs_db", "mysql", "shop"]);
        let excluded = parse_excluded_dbs("mysql,logs_db");
        assert_eq!(dbs_to_dump(&available, &excluded), names(&["app_db", "shop"]));
    }

    #[test]
    fn test_dbs_to_dump_empty_exclusion_keeps_all() {
        let available = names(&["app_db", "logs_db"]);
        assert_eq!(
            dbs_to_dump(&available, &parse_excluded_dbs("")),
            names(&["app_db", "logs_db"])
        );
    }

    #[test]
    fn test_dbs_to_dump_everything_excluded() {
        let available = names(&["app_db"]);
        assert!(dbs_to_dump(&available, &parse_excluded_dbs("app_db")).is_empty());
    }

    #[test]
    fn test_join_url_resolves_relative_links() {
        let base = Url::parse("https://db.example.com/pma/index.php?token=a").unwrap();
        assert_eq!(
            join_url(&base, "server_export.php?token=a").unwrap().as_str(),
            "https://db.example.com/pma/server_export.php?token=a"
        );
    }
}
