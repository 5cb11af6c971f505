//! Backup request configuration and defaults.
//!
//! Every default the workflow relies on lives here as an explicit constant or
//! as a field initialized by [`BackupRequest::new`].

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::backup::BackupError;

/// Default strftime pattern for `--prepend-date`, e.g. `2016-03-12--14-05-09-UTC_`.
pub const DEFAULT_PREFIX_FORMAT: &str = "%Y-%m-%d--%H-%M-%S-UTC_";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Compression method requested from the export form.
///
/// The server must support the chosen method; the value is sent verbatim as
/// the `compression` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Plain SQL.
    #[default]
    None,
    /// Zip archive.
    Zip,
    /// Gzip stream. Transport decompression is disabled in this mode.
    Gzip,
    /// Bzip2 stream.
    Bzip2,
}

impl Compression {
    /// Value of the `compression` form field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zip => "zip",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
        }
    }

    /// Whether the HTTP client may transparently decode gzip responses.
    ///
    /// Must be `false` for [`Compression::Gzip`], otherwise the dump would be
    /// written decompressed under a `.gz` name.
    #[must_use]
    pub fn allows_transport_decompression(self) -> bool {
        !matches!(self, Self::Gzip)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "zip" => Ok(Self::Zip),
            "gzip" => Ok(Self::Gzip),
            "bzip2" => Ok(Self::Bzip2),
            other => Err(format!(
                "unknown compression '{other}' (expected none, zip, gzip or bzip2)"
            )),
        }
    }
}

/// HTTP basic-auth credentials, sent with every request of the session.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpAuth {
    /// Basic-auth user name.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
}

impl HttpAuth {
    /// Parses a `username:password` pair, splitting at the first `:`.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::InvalidHttpAuth`] when the value has no `:` or
    /// the user name is empty.
    pub fn parse(value: &str) -> Result<Self, BackupError> {
        match value.split_once(':') {
            Some((username, password)) if !username.is_empty() => Ok(Self {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Err(BackupError::InvalidHttpAuth),
        }
    }
}

impl fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything one backup run needs.
#[derive(Clone)]
pub struct BackupRequest {
    /// phpMyAdmin login page URL.
    pub url: String,
    /// Login form user name.
    pub user: String,
    /// Login form password.
    pub password: String,
    /// Compute the output path without writing anything.
    pub dry_run: bool,
    /// Replace an existing file instead of picking a numbered alternative.
    pub overwrite_existing: bool,
    /// Prefix the filename with the current UTC time.
    pub prepend_date: bool,
    /// Replacement for the server-suggested name, keeping its extension.
    pub basename: Option<String>,
    /// Directory the dump is saved to.
    pub output_directory: PathBuf,
    /// Databases left out of the export.
    pub exclude_dbs: HashSet<String>,
    /// Compression requested from the server.
    pub compression: Compression,
    /// strftime pattern used when `prepend_date` is set.
    pub prefix_format: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional HTTP basic-auth credentials.
    pub http_auth: Option<HttpAuth>,
    /// Server host name for login pages that expose a server field.
    pub server_name: Option<String>,
}

impl BackupRequest {
    /// Creates a request with default options for the given login page and credentials.
    pub fn new(url: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            dry_run: false,
            overwrite_existing: false,
            prepend_date: false,
            basename: None,
            output_directory: PathBuf::from("."),
            exclude_dbs: HashSet::new(),
            compression: Compression::None,
            prefix_format: DEFAULT_PREFIX_FORMAT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            http_auth: None,
            server_name: None,
        }
    }
}

impl fmt::Debug for BackupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupRequest")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("dry_run", &self.dry_run)
            .field("overwrite_existing", &self.overwrite_existing)
            .field("prepend_date", &self.prepend_date)
            .field("basename", &self.basename)
            .field("output_directory", &self.output_directory)
            .field("exclude_dbs", &self.exclude_dbs)
            .field("compression", &self.compression)
            .field("prefix_format", &self.prefix_format)
            .field("timeout_secs", &self.timeout_secs)
            .field("http_auth", &self.http_auth)
            .field("server_name", &self.server_name)
            .finish()
    }
}
