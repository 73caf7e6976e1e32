//! Commands related to [Employee]s
use crate::{
    cli::EmployeeCommands,
    output::{self, rows::EmployeeRow},
    prompt::prompt_employee,
};
use anyhow::{Context, Result, anyhow};
use libclock::{
    Database,
    Error::DatabaseError,
    core::{
        loadable::Loadable,
        query::filter::{Cmp, or},
    },
    employee::{self, Employee},
};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Handle the `clockctl employees` command and its subcommands
pub(crate) async fn handle_command(command: EmployeeCommands, db: &Database) -> Result<()> {
    match command {
        EmployeeCommands::List { filter, output } => {
            let filter = filter.map(|f| {
                or()
                    .push(employee::Filter::Name(Cmp::Like, f.clone()))
                    .push(employee::Filter::QrCode(f))
                    .build()
            });
            let employees = Employee::load_all(filter, db).await?;
            let rows = employees.iter().map(EmployeeRow::new);
            println!("{}", output::format_seq(rows, output.format)?);
            Ok(())
        }
        EmployeeCommands::Show { id, output } => match Employee::load(id, db).await {
            Ok(emp) => {
                let str = output::format_one(EmployeeRow::new(&emp), output.format)?;
                println!("{str}");
                Ok(())
            }
            Err(DatabaseError(sqlx::Error::RowNotFound)) => {
                println!("Employee {id} not found");
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        EmployeeCommands::Add { name, qr_code } => {
            let mut emp = match (name, qr_code) {
                (None, None) => prompt_employee()?,
                (Some(name), Some(qr_code)) => Employee::new(name, qr_code),
                _ => return Err(anyhow!("Both a name and a QR code are required")),
            };
            insert_employee(&mut emp, db).await?;
            println!("Added employee {} to database", emp.id);
            Ok(())
        }
        EmployeeCommands::Modify { id, name, qr_code } => {
            let mut emp = Employee::load(id, db).await?;
            if let Some(name) = name {
                emp.name = name;
            }
            if let Some(qr_code) = qr_code {
                emp.qr_code = qr_code;
            }
            emp.update(db).await.map_err(|e| match e.is_unique_violation() {
                true => anyhow!("The QR code '{}' is already in use", emp.qr_code),
                false => e.into(),
            })?;
            println!("Modified employee {id}");
            Ok(())
        }
        EmployeeCommands::Remove { id } => {
            let res = Employee::delete_id(&id, db).await?;
            match res.rows_affected() {
                0 => println!("Employee {id} not found"),
                _ => println!("Removed employee {id} from database"),
            }
            Ok(())
        }
        EmployeeCommands::Import { file } => {
            let (added, skipped) = import_employees(&file, db).await?;
            println!("Imported {added} employees, skipped {skipped}");
            Ok(())
        }
    }
}

async fn insert_employee(emp: &mut Employee, db: &Database) -> Result<()> {
    emp.insert(db).await.map_err(|e| match e.is_unique_violation() {
        true => anyhow!("The QR code '{}' is already in use", emp.qr_code),
        false => e.into(),
    })?;
    Ok(())
}

#[derive(Deserialize, Debug)]
struct ImportRecord {
    name: String,
    qr_code: String,
}

/// Add the employees listed in a CSV file. Rows whose QR code already exists
/// are skipped. Returns the number of added and skipped rows
pub(crate) async fn import_employees(file: &Path, db: &Database) -> Result<(usize, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file)
        .with_context(|| format!("Unable to read '{}'", file.display()))?;
    let mut added = 0;
    let mut skipped = 0;
    for (i, record) in reader.deserialize::<ImportRecord>().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = record.with_context(|| format!("Invalid record on line {line}"))?;
        debug!(?record, "Importing employee");
        let mut emp = Employee::new(record.name, record.qr_code);
        match emp.insert(db).await {
            Ok(_) => added += 1,
            Err(e) if e.is_unique_violation() => {
                warn!("Skipping line {line}: QR code '{}' already exists", emp.qr_code);
                skipped += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to import line {line}")),
        }
    }
    Ok((added, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Pool, Sqlite};
    use test_log::test;

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../../db/fixtures", scripts("employees"))
    ))]
    async fn test_import(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let path = std::env::temp_dir().join(format!("clockctl-import-{}.csv", std::process::id()));
        tokio::fs::write(
            &path,
            "name,qr_code\nDana Test, DANA123\nAlice Again,ALICE123\nEve Test,EVE123\n",
        )
        .await
        .unwrap();
        let res = import_employees(&path, &db).await;
        let _ = tokio::fs::remove_file(&path).await;
        assert_eq!(res.expect("import failed"), (2, 1));

        let dana = Employee::load_by_qr_code("DANA123", &db).await.unwrap();
        assert_eq!(dana.name, "Dana Test");
        assert_eq!(Employee::load_all(None, &db).await.unwrap().len(), 5);
    }
}
