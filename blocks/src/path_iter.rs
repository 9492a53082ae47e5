//! Итератор по путям внутри блока
//!
//! Пути лежат в блоке подряд, по возрастанию object_id.
//! Неиспользуемый хвост блока заполнен нулями, поэтому
//! заголовок с object_id = 0 означает конец данных.
use crate::{
    block::BlockErr,
    event::ObjectId,
    path::{PathHeader, PATH_HEADER_SIZE},
};

/// Итератор по путям блока
#[derive(Debug, Clone)]
pub struct PathIterator<'a> {
    /// Данные блока
    data: &'a [u8],

    /// Смещение текущего пути от начала блока
    position: usize,

    /// Размер текущего пути вместе с заголовком
    path_size: usize,

    /// Достигнут конец данных
    pub eof: bool,

    /// Объект текущего пути
    pub current_object_id: ObjectId,

    /// Кол-во байт занятых путями, которые уже просмотрены (включая текущий).
    /// После достижения eof - размер всех данных блока.
    pub block_data_length: usize,
}

impl<'a> PathIterator<'a> {
    /// Создает итератор и читает первый путь блока
    pub fn new(data: &'a [u8]) -> Result<Self, BlockErr> {
        let mut itr = Self {
            data: data,
            position: 0,
            path_size: 0,
            eof: false,
            current_object_id: ObjectId::default(),
            block_data_length: 0,
        };
        itr.load()?;
        Ok(itr)
    }

    /// Чтение заголовка пути в текущей позиции
    fn load(&mut self) -> Result<(), BlockErr> {
        if self.data.len().saturating_sub(self.position) < PATH_HEADER_SIZE {
            return self.finish();
        }

        let (hdr, _) = PathHeader::unpack(&self.data[self.position..])?;
        if hdr.object_id.is_zero() {
            return self.finish();
        }

        let path_size = hdr.path_size();
        if self.position + path_size > self.data.len() {
            return Err(BlockErr::corrupted(
                None,
                format!(
                    "path {} at {} declares {} bytes, block has {}",
                    hdr.object_id,
                    self.position,
                    path_size,
                    self.data.len()
                ),
            ));
        }

        self.current_object_id = hdr.object_id;
        self.path_size = path_size;
        self.block_data_length = self.position + path_size;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BlockErr> {
        self.eof = true;
        self.current_object_id = ObjectId::default();
        self.path_size = 0;
        self.block_data_length = self.position;
        Ok(())
    }

    /// Переход к следующему пути
    pub fn advance(&mut self) -> Result<(), BlockErr> {
        if self.eof {
            return Ok(());
        }
        self.position += self.path_size;
        self.load()
    }

    /// Смещение текущего пути от начала блока
    pub fn offset(&self) -> usize {
        self.position
    }

    /// Размер текущего пути вместе с заголовком
    pub fn path_size(&self) -> usize {
        self.path_size
    }

    /// Упакованные байты текущего пути
    pub fn current_path(&self) -> Result<&'a [u8], BlockErr> {
        if self.eof {
            return Err(BlockErr::codec("path iterator at eof"));
        }
        Ok(&self.data[self.position..self.position + self.path_size])
    }

    /// Досчитывает до конца и возвращает размер данных блока
    pub fn data_length(mut self) -> Result<usize, BlockErr> {
        while !self.eof {
            self.advance()?;
        }
        Ok(self.block_data_length)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::Event;
    use crate::path::Path;

    fn block_with(ids: &[u32], block_size: usize) -> (Vec<u8>, usize) {
        let mut data = vec![0u8; block_size];
        let mut position = 0usize;
        for id in ids {
            let oid = ObjectId::new(*id);
            let bytes = Path::new(oid, vec![Event::new(oid, *id as i64, 1u16, vec![0; *id as usize])])
                .to_bytes()
                .unwrap();
            data[position..position + bytes.len()].copy_from_slice(&bytes);
            position += bytes.len();
        }
        (data, position)
    }

    #[test]
    fn iterate_paths() {
        let (data, used) = block_with(&[1, 3, 8], 256);
        let mut itr = PathIterator::new(&data).unwrap();

        let mut ids = Vec::new();
        let mut offsets = Vec::new();
        while !itr.eof {
            ids.push(itr.current_object_id.value());
            offsets.push(itr.offset());
            assert_eq!(itr.current_path().unwrap().len(), itr.path_size());
            itr.advance().unwrap();
        }

        assert_eq!(ids, vec![1, 3, 8]);
        assert_eq!(offsets[0], 0);
        assert_eq!(itr.block_data_length, used);
        assert!(itr.current_path().is_err());
    }

    #[test]
    fn empty_block() {
        let data = vec![0u8; 128];
        let itr = PathIterator::new(&data).unwrap();
        assert!(itr.eof);
        assert_eq!(itr.block_data_length, 0);
    }

    #[test]
    fn full_block_without_tail() {
        let (_, used) = block_with(&[2, 4], 256);
        let (data, _) = block_with(&[2, 4], used);
        assert_eq!(data.len(), used);
        assert_eq!(PathIterator::new(&data).unwrap().data_length().unwrap(), used);
    }

    #[test]
    fn truncated_path_is_corruption() {
        let (mut data, _) = block_with(&[5], 64);
        data[4..8].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(PathIterator::new(&data), Err(BlockErr::Corrupted { .. })));
    }
}
