use std::{fs, path::Path};

use blocks::datafile::{DataFile, DataFileConf};
use chrono::{SecondsFormat, TimeZone, Utc};

use crate::err::ToolErr;

pub mod append;
pub mod path;
pub mod viewheaders;

/// Открытие таблицы в каталоге
///
/// `create` - создать каталог и файлы, если их нет
pub fn open_table<P: AsRef<Path>>(dir: P, block_size: u32, create: bool) -> Result<DataFile, ToolErr> {
    let conf = DataFileConf::in_dir(dir.as_ref()).with_block_size(block_size);
    if create {
        fs::create_dir_all(dir.as_ref())?;
    } else if !conf.header_file.is_file() {
        return Err(ToolErr::TableNotFound(dir.as_ref().to_string_lossy().to_string()));
    }
    Ok(DataFile::open(conf)?)
}

/// Время в микросекундах от начала эпохи как дата UTC
pub fn format_timestamp(micros: i64) -> String {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
    match Utc.timestamp_opt(secs, nanos).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Micros, true),
        None => "-".to_string(),
    }
}

#[test]
fn test_format_timestamp() {
    assert_eq!(format_timestamp(0), "1970-01-01T00:00:00.000000Z");
    assert_eq!(format_timestamp(1_500_000), "1970-01-01T00:00:01.500000Z");
    assert_eq!(format_timestamp(-1), "1969-12-31T23:59:59.999999Z");
}
