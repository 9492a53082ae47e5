//! Файл данных таблицы
//!
//! Таблица хранится в двух файлах
//!
//! - файл данных - блоки фиксированного размера, отображается в память целиком
//! - файл заголовков - префикс (версия, размер блока) и записи [Block] по одной на блок
//!
//! Физический порядок блоков (index) совпадает с порядком создания,
//! логический порядок (по object_id, затем по времени) хранится в [DataFile::blocks]
//! и восстанавливается при открытии по содержимому блоков.
use std::{
    fs::{self, File, OpenOptions},
    io::{Seek, SeekFrom, Write},
};

use log::{debug, info, warn};
use memmap2::MmapMut;
use once_cell::sync::Lazy;

use crate::{
    bbuff::streambuff::{ByteBuff, ByteReader, ByteSlice, ByteWriter},
    block::{
        Block, BlockErr, BlockMut, BlockView, BLOCK_HEADER_SIZE, HEADER_FILE_HDR_SIZE,
        HEADER_FILE_VERSION,
    },
    cursor::Cursor,
    event::{Event, ObjectId, Timestamp},
    path::PATH_HEADER_SIZE,
    path_iter::PathIterator,
    perf::{Counters, Metrics, Tracker},
};

mod conf;
pub use conf::*;

#[cfg(test)]
mod test;

/// Размер страницы ОС
static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
    #[cfg(unix)]
    {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    4096
});

/// Файл данных
pub struct DataFile {
    conf: DataFileConf,

    /// Размер блока, из файла заголовков
    block_size: u32,

    file: File,

    /// Отображение файла данных, отсутствует пока в файле нет блоков
    data: Option<MmapMut>,

    /// Блоки в логическом порядке
    blocks: Vec<Block>,

    /// Счетчики операций записи
    pub counters: Counters,

    /// Время выполнения операций
    pub tracker: Tracker,
}

impl DataFile {
    /// Открытие или создание таблицы
    pub fn open(conf: DataFileConf) -> Result<Self, BlockErr> {
        if conf.block_size == 0 {
            return Err(BlockErr::ZeroBlockSize);
        }

        let block_size = Self::open_header_file(&conf)?;
        let blocks = Self::load_headers(&conf, block_size)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&conf.data_file)?;

        let expected = blocks.len() as u64 * block_size as u64;
        let actual = file.metadata()?.len();
        if actual != expected {
            return Err(BlockErr::header_file(format!(
                "data file {} has {actual} bytes, expect {expected} ({} blocks of {block_size})",
                conf.data_file.to_string_lossy(),
                blocks.len()
            )));
        }

        let data = if actual > 0 {
            Some(unsafe { MmapMut::map_mut(&file)? })
        } else {
            None
        };

        let mut data_file = Self {
            conf: conf,
            block_size: block_size,
            file: file,
            data: data,
            blocks: blocks,
            counters: Counters::new(),
            tracker: Tracker::new(),
        };

        data_file.restore_order()?;
        data_file.refresh_spans();

        info!(
            "open data file {}, {} blocks of {} bytes",
            data_file.conf.data_file.to_string_lossy(),
            data_file.blocks.len(),
            data_file.block_size
        );
        Ok(data_file)
    }

    /// Создает файл заголовков или проверяет его префикс
    ///
    /// Возвращает размер блока таблицы
    fn open_header_file(conf: &DataFileConf) -> Result<u32, BlockErr> {
        let exists = match fs::metadata(&conf.header_file) {
            Ok(meta) => meta.len() > 0,
            Err(_) => false,
        };

        if !exists {
            let mut bbuf = ByteBuff::with_capacity(HEADER_FILE_HDR_SIZE);
            bbuf.write(HEADER_FILE_VERSION);
            bbuf.write(conf.block_size);

            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&conf.header_file)?;
            file.write_all(&bbuf.buff)?;
            file.sync_data()?;

            debug!(
                "created header file {}, block size {}",
                conf.header_file.to_string_lossy(),
                conf.block_size
            );
            return Ok(conf.block_size);
        }

        let bytes = fs::read(&conf.header_file)?;
        let mut reader = ByteSlice::new(&bytes);
        let mut version = 0u32;
        let mut block_size = 0u32;
        reader
            .read(&mut version)
            .and_then(|_| reader.read(&mut block_size))
            .map_err(|err| BlockErr::header_file(format!("can't read header file prefix: {err}")))?;

        if version != HEADER_FILE_VERSION {
            return Err(BlockErr::header_file(format!(
                "unsupported header file version {version}, expect {HEADER_FILE_VERSION}"
            )));
        }
        if block_size == 0 {
            return Err(BlockErr::ZeroBlockSize);
        }
        if block_size != conf.block_size {
            warn!(
                "block size {} of {} differs from configured {}, using {}",
                block_size,
                conf.header_file.to_string_lossy(),
                conf.block_size,
                block_size
            );
        }
        Ok(block_size)
    }

    /// Чтение записей заголовков блоков, порядок физический
    fn load_headers(conf: &DataFileConf, block_size: u32) -> Result<Vec<Block>, BlockErr> {
        let bytes = fs::read(&conf.header_file)?;
        let records = &bytes[HEADER_FILE_HDR_SIZE.min(bytes.len())..];
        if records.len() % BLOCK_HEADER_SIZE != 0 {
            return Err(BlockErr::header_file(format!(
                "header file {} has partial record: {} bytes after prefix",
                conf.header_file.to_string_lossy(),
                records.len()
            )));
        }

        let mut blocks = Vec::with_capacity(records.len() / BLOCK_HEADER_SIZE);
        for (index, record) in records.chunks(BLOCK_HEADER_SIZE).enumerate() {
            let mut block = Block::new(index as u32);
            block.unpack(record)?;
            blocks.push(block);
        }

        debug!(
            "loaded {} block headers, block size {block_size}",
            blocks.len()
        );
        Ok(blocks)
    }

    /// Восстановление логического порядка блоков
    ///
    /// Ключ: пустые в конце, object_id первого пути, время первого и последнего
    /// события этого пути, index.
    ///
    /// Сегменты одного пути с равным первым временем различает последнее время:
    /// сегмент, в котором все события с первым временем, идет раньше
    fn restore_order(&mut self) -> Result<(), BlockErr> {
        let mut keyed = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.iter() {
            let key = self.first_entry(block.index)?;
            keyed.push((key.is_none(), key.unwrap_or_default(), block.index, block.clone()));
        }
        keyed.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
        self.blocks = keyed.into_iter().map(|(_, _, _, block)| block).collect();
        Ok(())
    }

    /// Объект первого пути блока, время первого и последнего события этого пути
    fn first_entry(&self, index: u32) -> Result<Option<(ObjectId, Timestamp, Timestamp)>, BlockErr> {
        let region = self.region(index)?;
        let itr = PathIterator::new(region)?;
        if itr.eof {
            return Ok(None);
        }

        let mut cursor = Cursor::new();
        cursor.set_path(itr.current_path()?)?;
        let mut first = None;
        let mut last = Timestamp::default();
        while !cursor.eof {
            last = cursor.timestamp()?;
            first.get_or_insert(last);
            cursor.next()?;
        }
        Ok(Some((itr.current_object_id, first.unwrap_or_default(), last)))
    }

    /// Пересчет признака spanned
    ///
    /// Блок spanned, если в нем путь одного объекта
    /// и следующий блок начинается с этого же объекта
    pub(crate) fn refresh_spans(&mut self) {
        let count = self.blocks.len();
        for pos in 0..count {
            let spanned = {
                let block = &self.blocks[pos];
                !block.is_empty()
                    && block.min_object_id == block.max_object_id
                    && pos + 1 < count
                    && self.blocks[pos + 1].min_object_id == block.min_object_id
            };
            self.blocks[pos].spanned = spanned;
        }
    }

    pub fn conf(&self) -> &DataFileConf {
        &self.conf
    }

    /// Размер блока
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Кол-во блоков
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Блоки в логическом порядке
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Описание блока по логической позиции
    pub(crate) fn block_at(&self, pos: usize) -> Result<&Block, BlockErr> {
        self.blocks.get(pos).ok_or(BlockErr::BlockNotFound {
            position: pos,
            block_count: self.blocks.len(),
        })
    }

    pub(crate) fn block_at_mut(&mut self, pos: usize) -> Result<&mut Block, BlockErr> {
        let count = self.blocks.len();
        self.blocks.get_mut(pos).ok_or(BlockErr::BlockNotFound {
            position: pos,
            block_count: count,
        })
    }

    /// Блок для чтения
    pub fn block(&self, pos: usize) -> Result<BlockView<'_>, BlockErr> {
        self.block_at(pos)?;
        Ok(BlockView { file: self, pos: pos })
    }

    /// Блок для изменения
    pub fn block_mut(&mut self, pos: usize) -> Result<BlockMut<'_>, BlockErr> {
        self.block_at(pos)?;
        Ok(BlockMut { file: self, pos: pos })
    }

    fn region_bounds(&self, index: u32, mapped: usize) -> Result<(usize, usize), BlockErr> {
        let block_size = self.block_size as usize;
        let offset = Block::new(index).offset(self.block_size)?;
        if offset + block_size > mapped {
            return Err(BlockErr::out_of_bounds(offset, block_size, mapped));
        }
        Ok((offset, offset + block_size))
    }

    /// Байты блока с физическим номером `index`
    pub(crate) fn region(&self, index: u32) -> Result<&[u8], BlockErr> {
        let map = self.data.as_ref().ok_or(BlockErr::Unmapped)?;
        let (from, to) = self.region_bounds(index, map.len())?;
        Ok(&map[from..to])
    }

    pub(crate) fn region_mut(&mut self, index: u32) -> Result<&mut [u8], BlockErr> {
        let mapped = self.data.as_ref().ok_or(BlockErr::Unmapped)?.len();
        let (from, to) = self.region_bounds(index, mapped)?;
        let map = self.data.as_mut().ok_or(BlockErr::Unmapped)?;
        Ok(&mut map[from..to])
    }

    /// Синхронный сброс блока на диск
    ///
    /// Начало выравнивается вниз, размер вверх по размеру страницы
    pub(crate) fn flush_block(&mut self, index: u32) -> Result<(), BlockErr> {
        let map = self.data.as_ref().ok_or(BlockErr::Unmapped)?;
        let (from, to) = self.region_bounds(index, map.len())?;

        let page = *PAGE_SIZE;
        let start = from - from % page;
        let mut length = to - start;
        if length % page != 0 {
            length += page - length % page;
        }
        let length = length.min(map.len() - start);

        map.flush_range(start, length)?;
        self.counters.inc("block.save");
        Ok(())
    }

    /// Запись заголовка блока в файл заголовков
    pub(crate) fn write_header(&mut self, block: &Block) -> Result<(), BlockErr> {
        let mut buff = [0u8; BLOCK_HEADER_SIZE];
        block.pack(&mut buff)?;

        let mut file = OpenOptions::new().write(true).open(&self.conf.header_file)?;
        file.seek(SeekFrom::Start(block.header_offset()))?;
        file.write_all(&buff)?;
        file.sync_data()?;

        self.counters.inc("header.write");
        debug!(
            "header of block {} written: object {}..{} time {}..{}",
            block.index,
            block.min_object_id,
            block.max_object_id,
            block.min_timestamp,
            block.max_timestamp
        );
        Ok(())
    }

    /// Создание пустого блока в логической позиции `pos`
    ///
    /// Файл данных увеличивается на один блок и отображается заново.
    /// Возвращает логическую позицию нового блока.
    pub fn create_block(&mut self, pos: usize) -> Result<usize, BlockErr> {
        let index = self.blocks.len() as u32;
        let new_len = (index as u64 + 1) * self.block_size as u64;

        let old_len = index as u64 * self.block_size as u64;
        if let Some(map) = self.data.as_ref() {
            map.flush()?;
        }
        self.file.set_len(new_len)?;

        // старое отображение остается, пока новое не создано
        match unsafe { MmapMut::map_mut(&self.file) } {
            Ok(map) => self.data = Some(map),
            Err(err) => {
                if let Err(trunc_err) = self.file.set_len(old_len) {
                    warn!("can't restore data file length {old_len}: {trunc_err}");
                }
                return Err(err.into());
            }
        }

        let block = Block::new(index);
        self.write_header(&block)?;

        let pos = pos.min(self.blocks.len());
        self.blocks.insert(pos, block);
        self.counters.inc("block.create");
        debug!("created block {index} at position {pos}");
        Ok(pos)
    }

    /// Добавление события в таблицу
    ///
    /// Возвращает логическую позицию блока, в который попало событие
    pub fn add_event(&mut self, event: &Event) -> Result<usize, BlockErr> {
        if event.object_id.is_zero() {
            return Err(BlockErr::ZeroObjectId);
        }

        // проверка до выбора блока: route может добавить блок
        let event_size = event.packed_size();
        if event_size + PATH_HEADER_SIZE >= self.block_size as usize {
            return Err(BlockErr::EventTooLarge {
                object_id: event.object_id,
                event_size: event_size,
                block_size: self.block_size,
            });
        }

        let pos = match self.route(event)? {
            Some(pos) => pos,
            None => self.create_block(0)?,
        };
        self.block_mut(pos)?.add_event(event)
    }

    /// Выбор блока для события
    fn route(&mut self, event: &Event) -> Result<Option<usize>, BlockErr> {
        if self.blocks.is_empty() {
            return Ok(None);
        }

        let object_id = event.object_id;
        let owners: Vec<usize> = (0..self.blocks.len())
            .filter(|pos| self.blocks[*pos].contains_object(object_id))
            .collect();

        if let Some(first) = owners.first().copied() {
            let mut chosen = first;
            if owners.len() > 1 {
                for pos in owners {
                    if let Some(ts) = self.block(pos)?.first_timestamp(object_id)? {
                        if ts <= event.timestamp {
                            chosen = pos;
                        }
                    }
                }
            }
            return Ok(Some(chosen));
        }

        let below = (0..self.blocks.len()).rev().find(|pos| {
            let block = &self.blocks[*pos];
            !block.is_empty() && block.max_object_id < object_id
        });
        if let Some(pos) = below {
            return Ok(Some(pos));
        }

        // объект меньше всех в таблице
        if self.blocks[0].spanned {
            return Ok(Some(self.create_block(0)?));
        }
        Ok(Some(0))
    }

    /// Все события объекта, в том числе из нескольких блоков
    pub fn read_path(&self, object_id: ObjectId) -> Result<Vec<Event>, BlockErr> {
        let start = match self.blocks.iter().position(|b| b.contains_object(object_id)) {
            Some(pos) => pos,
            None => return Ok(Vec::new()),
        };

        let count = self.block(start)?.span_count()? as usize;
        let mut segments = Vec::with_capacity(count);
        for pos in start..start + count {
            if let Some(path) = self.block(pos)?.path_of(object_id)? {
                segments.push(path);
            }
        }

        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let mut cursor = Cursor::new();
        cursor.set_paths(segments)?;
        cursor.collect_events()
    }

    /// Проверка содержимого всех блоков
    ///
    /// - пути по возрастанию object_id, одинаковый object_id
    ///   в соседних блоках только после блока с признаком spanned
    /// - события пути по неубыванию времени, в том числе между сегментами
    /// - диапазоны блоков соответствуют содержимому
    pub fn verify(&self) -> Result<(), BlockErr> {
        let mut last: Option<(ObjectId, Option<Timestamp>)> = None;

        for pos in 0..self.blocks.len() {
            let view = self.block(pos)?;
            let block = view.block()?;
            let prev_spanned = pos > 0 && self.blocks[pos - 1].spanned;

            let mut itr = view.paths()?;
            let mut first = true;
            while !itr.eof {
                let object_id = itr.current_object_id;
                let mut last_ts = None;
                if let Some((prev_id, prev_ts)) = last {
                    if object_id == prev_id && first && prev_spanned {
                        last_ts = prev_ts;
                    } else if object_id <= prev_id {
                        return Err(BlockErr::corrupted(
                            Some(block.index),
                            format!("path {object_id} after path {prev_id}"),
                        ));
                    }
                }

                let mut cursor = Cursor::new();
                cursor.set_path(itr.current_path()?)?;
                while !cursor.eof {
                    let ts = cursor.timestamp()?;
                    if let Some(prev) = last_ts {
                        if ts < prev {
                            return Err(BlockErr::corrupted(
                                Some(block.index),
                                format!("path {object_id}: event at {ts} after {prev}"),
                            ));
                        }
                    }
                    last_ts = Some(ts);
                    cursor.next()?;
                }

                last = Some((object_id, last_ts));
                first = false;
                itr.advance()?;
            }

            let ranges = view.compute_ranges()?;
            if ranges.min_object_id != block.min_object_id
                || ranges.max_object_id != block.max_object_id
                || ranges.min_timestamp != block.min_timestamp
                || ranges.max_timestamp != block.max_timestamp
            {
                return Err(BlockErr::corrupted(
                    Some(block.index),
                    format!("stored ranges {block:?} differ from content {ranges:?}"),
                ));
            }
        }
        Ok(())
    }
}
