use std::{fs::OpenOptions, io::prelude::*, path::Path};

use blocks::event::{ActionId, Event, ObjectId, Timestamp};
use log::{debug, info};

use super::open_table;
use crate::err::ToolErr;

/// Чтение данных события из файла
fn read_payload<P: AsRef<Path>>(payload_file: P) -> Result<Vec<u8>, ToolErr> {
    let mut file = OpenOptions::new()
        .read(true)
        .create(false)
        .write(false)
        .open(payload_file)?;

    let file_size = file.metadata()?.len();
    if file_size > u32::MAX as u64 {
        return Err(ToolErr::FileSizeToBig);
    }

    let mut data = Vec::with_capacity(file_size as usize);
    file.read_to_end(&mut data)?;
    Ok(data)
}

/// Добавление события в таблицу
///
/// Возвращает позицию блока, в который попало событие
pub fn append_event<P: AsRef<Path>>(
    table_dir: P,
    block_size: u32,
    object_id: ObjectId,
    timestamp: Timestamp,
    action_id: ActionId,
    payload_file: Option<&Path>,
) -> Result<usize, ToolErr> {
    let data = match payload_file {
        Some(file) => read_payload(file)?,
        None => Vec::new(),
    };

    let mut table = open_table(table_dir, block_size, true)?;
    let event = Event::new(object_id, timestamp, action_id, data);
    let pos = table.add_event(&event)?;

    info!(
        "event {object_id}/{timestamp} ({} bytes) written to block at position {pos}",
        event.packed_size()
    );
    debug!("counters:\n{}", table.counters);
    debug!("{}", table.tracker);
    Ok(pos)
}
