//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use pma_backup::{BackupRequest, Compression, DEFAULT_PREFIX_FORMAT, HttpAuth, parse_excluded_dbs};

/// Automates the download of SQL dump backups via a phpMyAdmin web interface.
#[derive(Parser, Debug)]
#[command(name = "pma-backup")]
#[command(author, version, about)]
pub struct Args {
    /// phpMyAdmin login page url
    #[arg(value_name = "URL")]
    pub url: String,

    /// phpMyAdmin login username
    #[arg(value_name = "USERNAME")]
    pub user: String,

    /// phpMyAdmin login password
    #[arg(value_name = "PASSWORD")]
    pub password: String,

    /// Output directory for the SQL dump file (default: the current working directory)
    #[arg(short = 'o', long, default_value = ".")]
    pub output_directory: PathBuf,

    /// Prepend current UTC date & time to the filename; see --prefix-format for custom formatting
    #[arg(short = 'p', long)]
    pub prepend_date: bool,

    /// Comma-separated list of database names to exclude from the dump
    #[arg(short = 'e', long, default_value = "")]
    pub exclude_dbs: String,

    /// MySQL server hostname to supply if enabled as field on the login page
    #[arg(short = 's', long)]
    pub server_name: Option<String>,

    /// Compression method for the output file - must be supported by the server
    #[arg(long, value_enum, default_value_t = CompressionArg::None)]
    pub compression: CompressionArg,

    /// The desired basename (without extension) of the SQL dump file (default: the name given by phpMyAdmin)
    #[arg(long)]
    pub basename: Option<String>,

    /// Timeout in seconds for the requests
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Overwrite existing SQL dump files (instead of appending a number to the name)
    #[arg(long)]
    pub overwrite_existing: bool,

    /// strftime prefix format for --prepend-date (default: "%Y-%m-%d--%H-%M-%S-UTC_")
    #[arg(long, requires = "prepend_date")]
    pub prefix_format: Option<String>,

    /// Dry run, do not actually download any file
    #[arg(long)]
    pub dry_run: bool,

    /// Basic HTTP authentication, using format "username:password"
    #[arg(long, value_name = "USERNAME:PASSWORD", value_parser = parse_http_auth)]
    pub http_auth: Option<HttpAuth>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Compression choices accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompressionArg {
    None,
    Zip,
    Gzip,
    Bzip2,
}

impl From<CompressionArg> for Compression {
    fn from(value: CompressionArg) -> Self {
        match value {
            CompressionArg::None => Self::None,
            CompressionArg::Zip => Self::Zip,
            CompressionArg::Gzip => Self::Gzip,
            CompressionArg::Bzip2 => Self::Bzip2,
        }
    }
}

fn parse_http_auth(value: &str) -> Result<HttpAuth, String> {
    HttpAuth::parse(value).map_err(|e| e.to_string())
}

impl Args {
    /// Default tracing level; `RUST_LOG` still takes precedence.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Builds the library request from parsed arguments.
    pub fn into_request(self) -> BackupRequest {
        let mut request = BackupRequest::new(self.url, self.user, self.password);
        request.dry_run = self.dry_run;
        request.overwrite_existing = self.overwrite_existing;
        request.prepend_date = self.prepend_date;
        request.basename = self.basename;
        request.output_directory = self.output_directory;
        request.exclude_dbs = parse_excluded_dbs(&self.exclude_dbs);
        request.compression = self.compression.into();
        request.prefix_format = self
            .prefix_format
            .filter(|format| !format.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX_FORMAT.to_string());
        request.timeout_secs = self.timeout;
        request.http_auth = self.http_auth;
        request.server_name = self.server_name;
        request
    }
}
