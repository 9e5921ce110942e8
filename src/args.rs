//! These structs provide the CLI interface for the finances CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// finances: Upload and read monthly financial amounts per user and year.
///
/// Spreadsheets (.xlsx) with a `Month` and an `Amount` column are validated and stored in a local
/// SQLite database. Each upload replaces everything previously stored for that user and year.
/// The data can be read back in calendar order over HTTP (`finances serve`) or from the command
/// line (`finances show`).
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and the database.
    ///
    /// This is the first command you should run. By default the data directory is
    /// $HOME/finances; pass --finances-home or set FINANCES_HOME to put it somewhere else.
    ///
    /// The users table is created empty. Users are expected to be added by whatever system owns
    /// them; uploads for a user_id that is not in the table are rejected.
    Init(InitArgs),
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Upload a local .xlsx file, replacing the stored records for a user and year.
    Upload(UploadArgs),
    /// Print the stored records for a user and year in calendar order.
    Show(ShowArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where data and configuration is held. Defaults to ~/finances
    #[arg(long, env = "FINANCES_HOME", default_value_t = default_finances_home())]
    finances_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, finances_home: PathBuf) -> Self {
        Self {
            log_level,
            finances_home: finances_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn finances_home(&self) -> &DisplayPath {
        &self.finances_home
    }
}

/// (Not shown): Args for the `finances init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The largest upload the server accepts, in megabytes.
    #[arg(long, default_value_t = crate::config::DEFAULT_MAX_UPLOAD_MB)]
    max_upload_mb: f64,

    /// The address the server listens on.
    #[arg(long, default_value = crate::config::DEFAULT_BIND)]
    bind: SocketAddr,
}

impl InitArgs {
    pub fn new(max_upload_mb: f64, bind: SocketAddr) -> Self {
        Self {
            max_upload_mb,
            bind,
        }
    }

    pub fn max_upload_mb(&self) -> f64 {
        self.max_upload_mb
    }

    pub fn bind(&self) -> SocketAddr {
        self.bind
    }
}

/// (Not shown): Args for the `finances serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// Listen on this address instead of the one in config.json.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

impl ServeArgs {
    pub fn new(bind: Option<SocketAddr>) -> Self {
        Self { bind }
    }

    pub fn bind(&self) -> Option<SocketAddr> {
        self.bind
    }
}

/// (Not shown): Args for the `finances upload` command.
#[derive(Debug, Parser, Clone)]
pub struct UploadArgs {
    /// The user the records belong to. Must already exist in the users table.
    #[arg(long)]
    user_id: i64,

    /// The year the records belong to.
    #[arg(long)]
    year: i64,

    /// The .xlsx file to upload.
    #[arg(long)]
    file: PathBuf,
}

impl UploadArgs {
    pub fn new(user_id: i64, year: i64, file: impl Into<PathBuf>) -> Self {
        Self {
            user_id,
            year,
            file: file.into(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// (Not shown): Args for the `finances show` command.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    #[arg(long)]
    user_id: i64,

    #[arg(long)]
    year: i64,

    /// Print the records as JSON to stdout instead of a table to the log.
    #[arg(long)]
    json: bool,
}

impl ShowArgs {
    pub fn new(user_id: i64, year: i64, json: bool) -> Self {
        Self {
            user_id,
            year,
            json,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn json(&self) -> bool {
        self.json
    }
}

fn default_finances_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("finances"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --finances-home or FINANCES_HOME instead of relying on the \
                default directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("finances")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
