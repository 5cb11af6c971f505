//! Error types for the backup workflow.
//!
//! Every variant is fatal to the run; nothing is retried.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a SQL dump.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The post-login page did not look like a logged-in phpMyAdmin session.
    #[error("could not log in at {url} - did you provide the correct username / password?")]
    LoginFailed {
        /// The login page URL.
        url: String,
        /// Why the login was judged unsuccessful.
        #[source]
        source: LoginCheckFailed,
    },

    /// No export link was found in the top menu.
    #[error("no link containing '{needle}' found in element '#{container}' of {url}")]
    ExportLinkNotFound {
        /// The page that was searched.
        url: String,
        /// Id of the navigation element.
        container: &'static str,
        /// Substring the link `href` must contain.
        needle: &'static str,
    },

    /// The page has no form holding the expected control.
    #[error("no form containing field '{field}' found on {url}")]
    FormNotFound {
        /// The page that was searched.
        url: String,
        /// Name or id of the control used to locate the form.
        field: String,
    },

    /// The form lacks a control the workflow needs to fill in.
    #[error("field with id '{id}' not found in form on {url}")]
    FieldNotFound {
        /// The page holding the form.
        url: String,
        /// Id of the missing control.
        id: String,
    },

    /// The export response carried no usable `Content-Disposition` filename.
    #[error("could not determine SQL backup filename from Content-Disposition {}", describe_header(.header))]
    FilenameDetectionFailed {
        /// The raw header value, when present.
        header: Option<String>,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request did not complete within the configured timeout.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The web server (or a proxy) demands HTTP-level credentials.
    #[error("[AUTH] HTTP {status} requesting {url}\n  Suggestion: {suggestion}")]
    AuthRequired {
        /// The URL that requires authentication.
        url: String,
        /// 401 or 407.
        status: u16,
        /// User-facing hint.
        suggestion: &'static str,
    },

    /// A URL could not be parsed or joined onto the current page.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },

    /// The date prefix format contains an unsupported strftime specifier.
    #[error("invalid prefix format '{format}'")]
    InvalidPrefixFormat {
        /// The rejected format string.
        format: String,
    },

    /// `--http-auth` was not of the form `username:password`.
    #[error("invalid HTTP auth value, expected \"username:password\"")]
    InvalidHttpAuth,

    /// File system error while saving the dump.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },
}

/// Cause attached to [`BackupError::LoginFailed`].
#[derive(Debug, Error)]
#[error("none of the markers {markers:?} found in the response from {page}")]
pub struct LoginCheckFailed {
    /// Page that was inspected after submitting the login form.
    pub page: String,
    /// Substrings of which at least one was expected.
    pub markers: &'static [&'static str],
}

fn describe_header(header: &Option<String>) -> String {
    match header {
        Some(value) => format!("header \"{value}\""),
        None => "header (missing)".to_string(),
    }
}

impl BackupError {
    /// Creates a login failure with its marker check cause.
    pub fn login_failed(
        url: impl Into<String>,
        page: impl Into<String>,
        markers: &'static [&'static str],
    ) -> Self {
        Self::LoginFailed {
            url: url.into(),
            source: LoginCheckFailed {
                page: page.into(),
                markers,
            },
        }
    }

    /// Creates a network error from a reqwest error, classifying timeouts.
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error, promoting 401/407 to [`BackupError::AuthRequired`].
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        match status {
            401 => Self::AuthRequired {
                url: url.into(),
                status,
                suggestion: "Pass web server credentials with --http-auth username:password.",
            },
            407 => Self::AuthRequired {
                url: url.into(),
                status,
                suggestion: "Configure your HTTP proxy settings or check proxy credentials.",
            },
            _ => Self::HttpStatus {
                url: url.into(),
                status,
            },
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a filename detection error.
    pub fn filename_detection(header: Option<&str>) -> Self {
        Self::FilenameDetectionFailed {
            header: header.map(str::to_string),
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// URL or path that the source error does not carry.
