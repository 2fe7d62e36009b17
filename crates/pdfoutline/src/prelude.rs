pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, OptionExt, Result};
pub use std::format as f;

/// A borderless table with one header row of `titles`.
pub fn new_table(titles: &[&str]) -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .padding(1, 1)
        .separators(
            &[prettytable::format::LinePosition::Title],
            prettytable::format::LineSeparator::new('-', ' ', ' ', ' '),
        )
        .build();

    table.set_format(format);
    table.set_titles(prettytable::Row::new(
        titles.iter().map(|t| prettytable::Cell::new(t)).collect(),
    ));

    table
}
