//! Commands related to the attendance database itself
use crate::{cli::DatabaseCommands, prompt::confirm};
use anyhow::{Context, Result, anyhow};
use libclock::{Database, employee::Employee, store::Store};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The test store and employees created by `clockctl database seed`
pub(crate) const SEED_STORE: (&str, &str, f64, f64, u32) =
    ("Test Store", "reasors_s_ba", 36.15398, -95.99277, 200);
pub(crate) const SEED_EMPLOYEES: [(&str, &str); 2] =
    [("Alice Test", "ALICE123"), ("Bob Test", "BOB123")];

pub(crate) async fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Database::open(path)
        .await
        .with_context(|| format!("Unable to open database '{}'", path.display()))
}

pub(crate) async fn handle_command(dbpath: PathBuf, command: DatabaseCommands) -> Result<()> {
    match command {
        DatabaseCommands::Init => {
            let existed = tokio::fs::try_exists(&dbpath).await?;
            let db = open_database(&dbpath).await?;
            let tables = db.tables().await?;
            match existed {
                true => println!("Updated database '{}'", dbpath.display()),
                false => println!("Created database '{}'", dbpath.display()),
            }
            debug!(?tables, "Database tables");
            Ok(())
        }
        DatabaseCommands::Seed { yes } => {
            let msg = format!(
                "This removes all existing data from '{}'. Continue?",
                dbpath.display()
            );
            if !confirm(&msg, yes)? {
                return Err(anyhow!("Operation canceled"));
            }
            let db = open_database(&dbpath).await?;
            let (store, employees) = seed(&db).await?;
            println!("Seed data created successfully");
            println!("Store: {} (token '{}')", store.name, store.token);
            for emp in employees {
                println!("Employee: {}, QR: {}", emp.name, emp.qr_code);
            }
            Ok(())
        }
        DatabaseCommands::Reset { yes } => {
            let msg = format!(
                "Remove all employees, stores and shifts from '{}'?",
                dbpath.display()
            );
            if !confirm(&msg, yes)? {
                return Err(anyhow!("Operation canceled"));
            }
            let db = open_database(&dbpath).await?;
            db.reset().await?;
            println!("Database reset");
            Ok(())
        }
        DatabaseCommands::Tables => {
            let db = open_database(&dbpath).await?;
            for table in db.tables().await? {
                println!("{table}");
            }
            Ok(())
        }
    }
}

/// Replace the contents of the database with a test store and employees
pub(crate) async fn seed(db: &Database) -> Result<(Store, Vec<Employee>)> {
    debug!("Clearing existing data");
    db.reset().await?;
    let (name, token, latitude, longitude, radius) = SEED_STORE;
    let mut store = Store::new(
        name.to_string(),
        token.to_string(),
        latitude,
        longitude,
        Some(radius),
    );
    store.insert(db).await?;
    let mut employees = Vec::new();
    for (name, qr_code) in SEED_EMPLOYEES {
        let mut emp = Employee::new(name.to_string(), qr_code.to_string());
        emp.insert(db).await?;
        employees.push(emp);
    }
    Ok((store, employees))
}
