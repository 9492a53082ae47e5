use crate::{
    bbuff::streambuff::{ByteBuff, ByteReader, ByteSlice, ByteWriter},
    event::{ObjectId, Timestamp},
};

use super::BlockErr;

/// Размер записи заголовка блока в файле заголовков:
/// min_object_id, max_object_id (u32), min_timestamp, max_timestamp (i64)
pub const BLOCK_HEADER_SIZE: usize = 4 + 4 + 8 + 8;

/// Размер префикса файла заголовков: версия (u32) + размер блока (u32)
pub const HEADER_FILE_HDR_SIZE: usize = 4 + 4;

/// Версия формата файла заголовков
pub const HEADER_FILE_VERSION: u32 = 1;

/// Блок файла данных
///
/// Блок не владеет байтами, это описание участка
/// `[index * block_size, (index + 1) * block_size)` отображенного файла
/// и диапазонов object_id / timestamp его содержимого.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    /// Номер блока в файле данных (физический)
    pub index: u32,

    pub min_object_id: ObjectId,
    pub max_object_id: ObjectId,
    pub min_timestamp: Timestamp,
    pub max_timestamp: Timestamp,

    /// Блок не последний в последовательности блоков одного пути
    pub spanned: bool,
}

impl Block {
    /// Создание блока с пустыми диапазонами
    pub fn new(index: u32) -> Self {
        Self {
            index: index,
            ..Default::default()
        }
    }

    /// Блок не содержит данных: min = max = 0 по object_id
    pub fn is_empty(&self) -> bool {
        self.min_object_id.is_zero() && self.max_object_id.is_zero()
    }

    /// Объект попадает в диапазон блока
    pub fn contains_object(&self, object_id: ObjectId) -> bool {
        !self.is_empty() && self.min_object_id <= object_id && object_id <= self.max_object_id
    }

    /// Сброс диапазонов
    pub fn reset_ranges(&mut self) {
        self.min_object_id = ObjectId::default();
        self.max_object_id = ObjectId::default();
        self.min_timestamp = Timestamp::default();
        self.max_timestamp = Timestamp::default();
    }

    /// Расширяет диапазоны блока, чтобы они включали пару (object_id, timestamp)
    ///
    /// Возвращает true если диапазоны изменились
    pub fn widen(&mut self, object_id: ObjectId, timestamp: Timestamp) -> bool {
        let is_empty = self.is_empty();
        let object_id_changed = object_id < self.min_object_id || object_id > self.max_object_id;
        let timestamp_changed = timestamp < self.min_timestamp || timestamp > self.max_timestamp;

        if !(is_empty || object_id_changed || timestamp_changed) {
            return false;
        }

        if is_empty || object_id < self.min_object_id {
            self.min_object_id = object_id;
        }
        if is_empty || object_id > self.max_object_id {
            self.max_object_id = object_id;
        }
        if is_empty || timestamp < self.min_timestamp {
            self.min_timestamp = timestamp;
        }
        if is_empty || timestamp > self.max_timestamp {
            self.max_timestamp = timestamp;
        }
        true
    }

    /// Упаковка заголовка блока
    ///
    /// `target` должен вмещать [BLOCK_HEADER_SIZE] байт, возвращает кол-во записанных байт
    pub fn pack(&self, target: &mut [u8]) -> Result<usize, BlockErr> {
        if target.len() < BLOCK_HEADER_SIZE {
            return Err(BlockErr::out_of_bounds(0, BLOCK_HEADER_SIZE, target.len()));
        }

        let mut bbuf = ByteBuff::with_capacity(BLOCK_HEADER_SIZE);
        bbuf.write(self.min_object_id);
        bbuf.write(self.max_object_id);
        bbuf.write(self.min_timestamp);
        bbuf.write(self.max_timestamp);

        target[..BLOCK_HEADER_SIZE].copy_from_slice(&bbuf.buff);
        Ok(BLOCK_HEADER_SIZE)
    }

    /// Распаковка заголовка блока
    ///
    /// Возвращает кол-во прочитанных байт; при ошибке блок не меняется
    pub fn unpack(&mut self, source: &[u8]) -> Result<usize, BlockErr> {
        if source.len() < BLOCK_HEADER_SIZE {
            return Err(BlockErr::out_of_bounds(0, BLOCK_HEADER_SIZE, source.len()));
        }

        let mut reader = ByteSlice::new(&source[..BLOCK_HEADER_SIZE]);
        let mut min_object_id = ObjectId::default();
        let mut max_object_id = ObjectId::default();
        let mut min_timestamp = Timestamp::default();
        let mut max_timestamp = Timestamp::default();
        reader.read(&mut min_object_id)?;
        reader.read(&mut max_object_id)?;
        reader.read(&mut min_timestamp)?;
        reader.read(&mut max_timestamp)?;

        self.min_object_id = min_object_id;
        self.max_object_id = max_object_id;
        self.min_timestamp = min_timestamp;
        self.max_timestamp = max_timestamp;
        Ok(reader.position)
    }

    /// Смещение записи блока в файле заголовков
    pub fn header_offset(&self) -> u64 {
        HEADER_FILE_HDR_SIZE as u64 + (self.index as u64) * (BLOCK_HEADER_SIZE as u64)
    }

    /// Смещение блока в файле данных
    pub fn offset(&self, block_size: u32) -> Result<usize, BlockErr> {
        if block_size == 0 {
            return Err(BlockErr::ZeroBlockSize);
        }
        Ok(block_size as usize * self.index as usize)
    }
}

#[test]
fn header_pack_unpack() {
    let samples = vec![
        Block::new(0),
        Block {
            index: 3,
            min_object_id: ObjectId::new(1),
            max_object_id: ObjectId::new(u32::MAX),
            min_timestamp: Timestamp::new(i64::MIN),
            max_timestamp: Timestamp::new(i64::MAX),
            spanned: false,
        },
        Block {
            index: 7,
            min_object_id: ObjectId::new(20),
            max_object_id: ObjectId::new(30),
            min_timestamp: Timestamp::new(-5),
            max_timestamp: Timestamp::new(1_000_000),
            spanned: false,
        },
    ];

    for block in samples {
        let mut buff = [0u8; BLOCK_HEADER_SIZE];
        assert_eq!(block.pack(&mut buff).unwrap(), BLOCK_HEADER_SIZE);

        let mut restored = Block::new(block.index);
        assert_eq!(restored.unpack(&buff).unwrap(), BLOCK_HEADER_SIZE);
        assert_eq!(restored, block);
    }
}

#[test]
fn header_unpack_short_input() {
    let mut block = Block::new(0);
    block.min_object_id = ObjectId::new(9);
    let res = block.unpack(&[0u8; BLOCK_HEADER_SIZE - 1]);
    assert!(res.is_err());
    assert_eq!(block.min_object_id, ObjectId::new(9));
}

#[test]
fn offsets() {
    let block = Block::new(3);
    assert_eq!(block.header_offset(), (HEADER_FILE_HDR_SIZE + 3 * BLOCK_HEADER_SIZE) as u64);
    assert_eq!(block.offset(128).unwrap(), 384);
    assert!(matches!(block.offset(0), Err(BlockErr::ZeroBlockSize)));
}

#[test]
fn widen_ranges() {
    let mut block = Block::new(0);
    assert!(block.is_empty());

    assert!(block.widen(ObjectId::new(5), Timestamp::new(100)));
    assert_eq!(block.min_object_id, ObjectId::new(5));
    assert_eq!(block.max_object_id, ObjectId::new(5));
    assert_eq!(block.min_timestamp, Timestamp::new(100));
    assert_eq!(block.max_timestamp, Timestamp::new(100));

    assert!(!block.widen(ObjectId::new(5), Timestamp::new(100)));
    assert!(block.widen(ObjectId::new(2), Timestamp::new(150)));
    assert!(!block.widen(ObjectId::new(4), Timestamp::new(120)));
    assert_eq!(block.min_object_id, ObjectId::new(2));
    assert_eq!(block.max_timestamp, Timestamp::new(150));
    assert!(block.contains_object(ObjectId::new(3)));
    assert!(!block.contains_object(ObjectId::new(6)));
}
