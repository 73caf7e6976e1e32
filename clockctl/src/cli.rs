use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use libclock::core::query::SortOrder;
use std::path::PathBuf;

/// Default position used for clock events: the front door of the test store
pub(crate) const DEFAULT_LATITUDE: f64 = 36.15398;
pub(crate) const DEFAULT_LONGITUDE: f64 = -95.99277;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(
        short,
        long,
        global = true,
        env = "CLOCKCTL_DATABASE",
        help = "Path to the attendance database"
    )]
    pub database: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct OutputOptions {
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Output format"
    )]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct PositionArgs {
    #[arg(long = "lat", allow_negative_numbers = true, default_value_t = DEFAULT_LATITUDE)]
    pub latitude: f64,
    #[arg(long = "lng", allow_negative_numbers = true, default_value_t = DEFAULT_LONGITUDE)]
    pub longitude: f64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Save default settings for clockctl")]
    Configure {
        #[arg(long, help = "Database to use when none is given on the command line")]
        database: Option<PathBuf>,
        #[arg(long, help = "Base URL of the clockweb server")]
        server: Option<String>,
    },
    #[command(about = "Manage the attendance database")]
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },
    #[command(about = "Manage employees")]
    Employees {
        #[command(subcommand)]
        command: EmployeeCommands,
    },
    #[command(about = "Manage stores")]
    Stores {
        #[command(subcommand)]
        command: StoreCommands,
    },
    #[command(about = "Inspect shifts")]
    Shifts {
        #[command(subcommand)]
        command: ShiftCommands,
    },
    #[command(about = "Clock an employee in directly in the database")]
    ClockIn {
        qr_code: String,
        #[command(flatten)]
        position: PositionArgs,
        #[arg(long, help = "Token of the store QR code")]
        store_token: Option<String>,
        #[arg(long, help = "Accept positions outside of the store geofence")]
        no_geofence: bool,
    },
    #[command(about = "Clock an employee out directly in the database")]
    ClockOut {
        qr_code: String,
        #[command(flatten)]
        position: PositionArgs,
        #[arg(long, help = "Accept positions outside of the store geofence")]
        no_geofence: bool,
    },
    #[command(about = "Run the clock-in/clock-out test sequence against a running server")]
    Harness {
        #[arg(long, help = "Base URL of the clockweb server")]
        server: Option<String>,
        #[arg(long, default_value = "ALICE123")]
        qr_code: String,
        #[arg(long, default_value = "BOB123")]
        second_qr_code: String,
        #[command(flatten)]
        position: PositionArgs,
        #[arg(long, help = "Wait for confirmation after each request")]
        pause: bool,
    },
    #[command(about = "Simulate a full shift with location pings against a running server")]
    Simulate {
        #[arg(long, help = "Base URL of the clockweb server")]
        server: Option<String>,
        #[arg(long, default_value = "ALICE123")]
        qr_code: String,
        #[arg(long)]
        store_token: Option<String>,
        #[command(flatten)]
        position: PositionArgs,
        #[arg(long, default_value_t = 5)]
        pings: u32,
        #[arg(long, default_value_t = 1, help = "Seconds between pings")]
        interval: u64,
    },
    #[command(about = "Generate shell completions")]
    Completions { shell: Shell },
}

#[derive(Subcommand, Debug)]
pub enum DatabaseCommands {
    #[command(about = "Create a new database, or upgrade the schema of an existing one")]
    Init,
    #[command(about = "Reset the database and fill it with a test store and employees")]
    Seed {
        #[arg(short, long, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Remove all data from the database")]
    Reset {
        #[arg(short, long, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "List the tables in the database")]
    Tables,
}

#[derive(Subcommand, Debug)]
pub enum EmployeeCommands {
    #[command(about = "List all employees")]
    List {
        #[arg(
            short,
            long,
            help = "Only show employees whose name contains this text or whose badge matches it"
        )]
        filter: Option<String>,
        #[command(flatten)]
        output: OutputOptions,
    },
    #[command(about = "Show details about an employee")]
    Show {
        id: i64,
        #[command(flatten)]
        output: OutputOptions,
    },
    #[command(about = "Add a new employee to the database")]
    Add {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        qr_code: Option<String>,
    },
    #[command(
        about="Modify properties of an employee",
        group(
            clap::ArgGroup::new("modify")
                .required(true)
                .multiple(true)
                .args(&["name", "qr_code"]),
        ))]
    Modify {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        qr_code: Option<String>,
    },
    #[command(about = "Remove an employee and all of their shifts from the database")]
    Remove { id: i64 },
    #[command(about = "Add employees from a CSV file with 'name' and 'qr_code' columns")]
    Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum StoreCommands {
    #[command(about = "List all stores")]
    List {
        #[arg(long, help = "Only show stores whose name contains this text")]
        name: Option<String>,
        #[arg(long, requires = "name", help = "Match the store name exactly")]
        exact: bool,
        #[command(flatten)]
        output: OutputOptions,
    },
    #[command(about = "Show details about a store")]
    Show {
        id: i64,
        #[command(flatten)]
        output: OutputOptions,
    },
    #[command(about = "Add a new store to the database")]
    Add {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long = "lat", allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long = "lng", allow_negative_numbers = true)]
        longitude: Option<f64>,
        #[arg(long, help = "Geofence radius in meters")]
        radius: Option<u32>,
    },
    #[command(
        about="Modify properties of a store",
        group(
            clap::ArgGroup::new("modify")
                .required(true)
                .multiple(true)
                .args(&["name", "latitude", "longitude", "radius"]),
        ))]
    Modify {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "lat", allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long = "lng", allow_negative_numbers = true)]
        longitude: Option<f64>,
        #[arg(long)]
        radius: Option<u32>,
    },
    #[command(about = "Remove a store from the database")]
    Remove { id: i64 },
    #[command(about = "Replace the QR token of a store")]
    RotateToken {
        id: i64,
        #[arg(help = "The new token. Prompted for if missing")]
        token: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShiftCommands {
    #[command(about = "List shifts, most recent first")]
    List {
        #[arg(long, help = "Only show shifts that are still open")]
        open: bool,
        #[arg(long, help = "Only show shifts of the employee with this ID")]
        employee: Option<i64>,
        #[arg(long, help = "Only show shifts at the store with this ID")]
        store: Option<i64>,
        #[arg(short, long)]
        limit: Option<i32>,
        #[arg(long, help = "Sort by shift ID, 'asc' or 'desc'")]
        sort: Option<SortOrder>,
        #[command(flatten)]
        output: OutputOptions,
    },
    #[command(about = "Show details about a shift")]
    Show {
        id: i64,
        #[command(flatten)]
        output: OutputOptions,
    },
    #[command(about = "List the location pings recorded during a shift")]
    Pings {
        id: i64,
        #[command(flatten)]
        output: OutputOptions,
    },
}
