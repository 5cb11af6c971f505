//! User-Agent string sent with every request of a backup session.

/// Product token of the User-Agent.
const PRODUCT: &str = "pma-backup";

/// Default User-Agent identifying the tool and its version.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (sql-dump-tool)")
}
