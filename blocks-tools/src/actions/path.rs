use std::path::Path;

use blocks::{datafile::DataFile, event::ObjectId};

use super::{format_timestamp, open_table};
use crate::err::ToolErr;

/// Строки с событиями объекта
pub fn path_lines(table: &DataFile, object_id: ObjectId) -> Result<Vec<String>, ToolErr> {
    Ok(table
        .read_path(object_id)?
        .iter()
        .map(|ev| {
            format!(
                "{ts} {date} action={action} size={size}",
                ts = ev.timestamp.value(),
                date = format_timestamp(ev.timestamp.value()),
                action = ev.action_id.value(),
                size = ev.data.len()
            )
        })
        .collect())
}

/// Просмотр событий объекта
pub fn view_path<P: AsRef<Path>>(table_dir: P, block_size: u32, object_id: ObjectId) -> Result<(), ToolErr> {
    let table = open_table(table_dir, block_size, false)?;
    let lines = path_lines(&table, object_id)?;
    println!("object {object_id}, events {}", lines.len());
    for line in lines {
        println!("{line}");
    }
    Ok(())
}
