use tabled::{Table, settings::Style};

/// Applies the standard clockctl look to a table
pub(crate) trait ClockctlTable {
    fn styled(&mut self) -> &mut Self;
}

impl ClockctlTable for Table {
    fn styled(&mut self) -> &mut Self {
        self.with(Style::psql())
    }
}
