//! Commands related to [Store]s
use crate::{
    cli::StoreCommands,
    output::{self, rows::StoreRow},
    prompt::{prompt_store, prompt_token},
};
use anyhow::{Result, anyhow};
use libclock::{
    Database,
    Error::StoreIdNotFound,
    core::{loadable::Loadable, query::filter::Cmp},
    store::{self, Store},
};

/// Handle the `clockctl stores` command and its subcommands
pub(crate) async fn handle_command(command: StoreCommands, db: &Database) -> Result<()> {
    match command {
        StoreCommands::List {
            name,
            exact,
            output,
        } => {
            let cmp = match exact {
                true => Cmp::Equal,
                false => Cmp::Like,
            };
            let filter = name.map(|n| store::Filter::Name(cmp, n).into());
            let stores = Store::load_all(filter, db).await?;
            let rows = stores.iter().map(StoreRow::new);
            println!("{}", output::format_seq(rows, output.format)?);
            Ok(())
        }
        StoreCommands::Show { id, output } => match Store::load(id, db).await {
            Ok(store) => {
                let str = output::format_one(StoreRow::new(&store), output.format)?;
                println!("{str}");
                Ok(())
            }
            Err(StoreIdNotFound(_)) => {
                println!("Store {id} not found");
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        StoreCommands::Add {
            name,
            token,
            latitude,
            longitude,
            radius,
        } => {
            let mut store = if name.is_none()
                && token.is_none()
                && latitude.is_none()
                && longitude.is_none()
            {
                prompt_store()?
            } else {
                Store::new(
                    name.ok_or_else(|| anyhow!("No name specified"))?,
                    token.ok_or_else(|| anyhow!("No token specified"))?,
                    latitude.ok_or_else(|| anyhow!("No latitude specified"))?,
                    longitude.ok_or_else(|| anyhow!("No longitude specified"))?,
                    radius,
                )
            };
            store.insert(db).await.map_err(|e| match e.is_unique_violation() {
                true => anyhow!("The token '{}' is already in use", store.token),
                false => e.into(),
            })?;
            println!("Added store {} to database", store.id);
            Ok(())
        }
        StoreCommands::Modify {
            id,
            name,
            latitude,
            longitude,
            radius,
        } => {
            let mut store = Store::load(id, db).await?;
            if let Some(name) = name {
                store.name = name;
            }
            if let Some(latitude) = latitude {
                store.latitude = latitude;
            }
            if let Some(longitude) = longitude {
                store.longitude = longitude;
            }
            if let Some(radius) = radius {
                store.radius_meters = radius;
            }
            store.update(db).await?;
            println!("Modified store {id}");
            Ok(())
        }
        StoreCommands::Remove { id } => {
            let res = Store::delete_id(&id, db).await?;
            match res.rows_affected() {
                0 => println!("Store {id} not found"),
                _ => println!("Removed store {id} from database"),
            }
            Ok(())
        }
        StoreCommands::RotateToken { id, token } => {
            let token = match token {
                Some(t) => t,
                None => prompt_token("New store QR token:")?,
            };
            match Store::rotate_token(id, &token, db).await {
                Ok(()) => {
                    println!("Updated store {id} to token: {token}");
                    Ok(())
                }
                Err(StoreIdNotFound(_)) => Err(anyhow!("No store with id {id}")),
                Err(e) if e.is_unique_violation() => {
                    Err(anyhow!("The token '{token}' is already in use"))
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}
