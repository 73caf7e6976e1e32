//! Commands for inspecting [Shift]s
use crate::{
    cli::ShiftCommands,
    output::{
        self,
        rows::{PingRow, ShiftRow, ShiftRowDetails},
    },
};
use anyhow::Result;
use libclock::{
    Database,
    Error::ShiftNotFound,
    core::{
        loadable::Loadable,
        query::{LimitSpec, filter::and},
    },
    shift::{self, Shift, ShiftStatus},
};

/// Handle the `clockctl shifts` command and its subcommands
pub(crate) async fn handle_command(command: ShiftCommands, db: &Database) -> Result<()> {
    match command {
        ShiftCommands::List {
            open,
            employee,
            store,
            limit,
            sort,
            output,
        } => {
            let mut filter = and();
            if open {
                filter = filter.push(shift::Filter::Status(ShiftStatus::Open));
            }
            if let Some(id) = employee {
                filter = filter.push(shift::Filter::EmployeeId(id));
            }
            if let Some(id) = store {
                filter = filter.push(shift::Filter::StoreId(id));
            }
            let filter = match filter.is_empty() {
                true => None,
                false => Some(filter.build()),
            };
            let shifts = Shift::load_all(filter, sort, limit.map(LimitSpec::from), db).await?;
            let rows = shifts.iter().map(ShiftRow::new);
            println!("{}", output::format_seq(rows, output.format)?);
            Ok(())
        }
        ShiftCommands::Show { id, output } => match Shift::load(id, db).await {
            Ok(shift) => {
                let pings = shift.pings(db).await?;
                let str = output::format_one(ShiftRowDetails::new(&shift, &pings), output.format)?;
                println!("{str}");
                Ok(())
            }
            Err(ShiftNotFound(_)) => {
                println!("Shift {id} not found");
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        ShiftCommands::Pings { id, output } => {
            let shift = Shift::load(id, db).await?;
            let pings = shift.pings(db).await?;
            let rows = pings.iter().map(PingRow::new);
            println!("{}", output::format_seq(rows, output.format)?);
            Ok(())
        }
    }
}
