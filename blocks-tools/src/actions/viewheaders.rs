use std::path::Path;

use blocks::datafile::DataFile;
use sha2::{Digest, Sha256};

use super::{format_timestamp, open_table};
use crate::err::ToolErr;

/// Строки описания блоков в логическом порядке
pub fn header_lines(table: &DataFile, sha256: bool) -> Result<Vec<String>, ToolErr> {
    let mut lines = Vec::with_capacity(table.block_count());
    for pos in 0..table.block_count() {
        let view = table.block(pos)?;
        let block = view.block()?;
        let data_length = view.data_length()?;

        let mut line = format!(
            "{pos:0>6} {index:0>6} {min_id:>10}..{max_id:<10} {min_ts}..{max_ts} ({min_date}..{max_date}) {spanned} {span:>3} {data_length:0>8}",
            index = block.index,
            min_id = block.min_object_id.value(),
            max_id = block.max_object_id.value(),
            min_ts = block.min_timestamp.value(),
            max_ts = block.max_timestamp.value(),
            min_date = format_timestamp(block.min_timestamp.value()),
            max_date = format_timestamp(block.max_timestamp.value()),
            spanned = if block.spanned { "S" } else { "-" },
            span = view.span_count()?,
        );

        if sha256 {
            let data = view.data()?;
            let mut hasher = Sha256::new();
            hasher.update(&data[..data_length]);
            let hash = hasher.finalize();
            let hash = hex::encode(hash);
            line.push_str(&format!(" {hash}"));
        }

        lines.push(line);
    }
    Ok(lines)
}

/// Просмотр заголовков блоков
pub fn view_headers<P: AsRef<Path>>(table_dir: P, block_size: u32, sha256: bool) -> Result<(), ToolErr> {
    let table = open_table(table_dir, block_size, false)?;
    println!("block size {}, blocks {}", table.block_size(), table.block_count());
    for line in header_lines(&table, sha256)? {
        println!("{line}");
    }
    Ok(())
}
