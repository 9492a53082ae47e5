//! Путь - все события одного объекта
//!
//! Структура упакованного пути
//!
//! | Поле              | Тип/размер | Описание |
//! |-------------------|------------|----------|
//! | object_id         | u32        | Идентификатор объекта |
//! | event_data_length | u32        | Размер последовательности событий в байтах |
//! | events            | [Event]    | События, по возрастанию времени |
use crate::{
    bbuff::streambuff::{ByteBuff, ByteReader, ByteSlice, ByteWriter},
    block::BlockErr,
    event::{Event, ObjectId},
};

/// Размер заголовка пути: object_id + event_data_length
pub const PATH_HEADER_SIZE: usize = 4 + 4;

/// Смещение поля event_data_length внутри заголовка пути
pub const PATH_EVENT_LENGTH_OFFSET: usize = 4;

/// Заголовок пути
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathHeader {
    /// Идентификатор объекта
    pub object_id: ObjectId,

    /// Размер событий пути в байтах
    pub event_data_length: u32,
}

impl PathHeader {
    pub fn new(object_id: ObjectId, event_data_length: u32) -> Self {
        Self {
            object_id: object_id,
            event_data_length: event_data_length,
        }
    }

    /// Упаковка заголовка в начало `target`
    pub fn pack(&self, target: &mut [u8]) -> Result<usize, BlockErr> {
        if target.len() < PATH_HEADER_SIZE {
            return Err(BlockErr::out_of_bounds(0, PATH_HEADER_SIZE, target.len()));
        }

        let mut bbuf = ByteBuff::with_capacity(PATH_HEADER_SIZE);
        bbuf.write(self.object_id);
        bbuf.write(self.event_data_length);
        target[..PATH_HEADER_SIZE].copy_from_slice(&bbuf.buff);
        Ok(PATH_HEADER_SIZE)
    }

    /// Чтение заголовка
    pub fn unpack(source: &[u8]) -> Result<(Self, usize), BlockErr> {
        let mut reader = ByteSlice::new(source);
        let mut hdr = Self::default();
        reader.read(&mut hdr.object_id)?;
        reader.read(&mut hdr.event_data_length)?;
        Ok((hdr, reader.position))
    }

    /// Полный размер пути вместе с заголовком
    pub fn path_size(&self) -> usize {
        PATH_HEADER_SIZE + self.event_data_length as usize
    }

    /// Размер упакованного пути, который начинается в `path`
    pub fn sizeof_raw(path: &[u8]) -> Result<usize, BlockErr> {
        let (hdr, _) = Self::unpack(path)?;
        Ok(hdr.path_size())
    }

    /// Меняет длину событий в уже упакованном заголовке, не трогая object_id
    pub fn patch_event_data_length(path: &mut [u8], event_data_length: u32) -> Result<(), BlockErr> {
        let end = PATH_EVENT_LENGTH_OFFSET + 4;
        if path.len() < end {
            return Err(BlockErr::out_of_bounds(PATH_EVENT_LENGTH_OFFSET, 4, path.len()));
        }
        path[PATH_EVENT_LENGTH_OFFSET..end].copy_from_slice(&event_data_length.to_le_bytes());
        Ok(())
    }
}

/// Путь целиком
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    pub object_id: ObjectId,
    pub events: Vec<Event>,
}

impl Path {
    pub fn new(object_id: ObjectId, events: Vec<Event>) -> Self {
        Self {
            object_id: object_id,
            events: events,
        }
    }

    /// Размер событий в упакованном виде
    pub fn event_data_length(&self) -> usize {
        self.events.iter().map(|e| e.packed_size()).sum()
    }

    /// Размер пути в упакованном виде
    pub fn packed_size(&self) -> usize {
        PATH_HEADER_SIZE + self.event_data_length()
    }

    /// Упаковка пути
    pub fn to_bytes(&self) -> Result<Vec<u8>, BlockErr> {
        let length = self.event_data_length();
        if length > u32::MAX as usize {
            return Err(BlockErr::codec(format!("path too big: {length} bytes")));
        }

        let mut bbuf = ByteBuff::with_capacity(PATH_HEADER_SIZE + length);
        bbuf.write(self.object_id);
        bbuf.write(length as u32);
        for ev in self.events.iter() {
            ev.write_to(&mut bbuf)?;
        }
        Ok(bbuf.buff)
    }

    /// Распаковка пути
    ///
    /// Возвращает путь и кол-во прочитанных байт
    pub fn from_bytes(source: &[u8]) -> Result<(Self, usize), BlockErr> {
        let (hdr, hdr_size) = PathHeader::unpack(source)?;
        let end = hdr.path_size();
        if source.len() < end {
            return Err(BlockErr::out_of_bounds(0, end, source.len()));
        }

        let mut events = Vec::new();
        let mut position = hdr_size;
        while position < end {
            let (ev, sz) = Event::unpack(hdr.object_id, &source[position..end])?;
            position += sz;
            events.push(ev);
        }

        Ok((Self::new(hdr.object_id, events), end))
    }
}

#[test]
fn path_header_pack_unpack() {
    let hdr = PathHeader::new(ObjectId::new(10), 300);
    let mut buff = [0u8; 16];
    assert_eq!(hdr.pack(&mut buff).unwrap(), PATH_HEADER_SIZE);

    let (hdr2, sz) = PathHeader::unpack(&buff).unwrap();
    assert_eq!(sz, PATH_HEADER_SIZE);
    assert_eq!(hdr2, hdr);
    assert_eq!(PathHeader::sizeof_raw(&buff).unwrap(), PATH_HEADER_SIZE + 300);

    PathHeader::patch_event_data_length(&mut buff, 12).unwrap();
    let (hdr3, _) = PathHeader::unpack(&buff).unwrap();
    assert_eq!(hdr3.object_id, ObjectId::new(10));
    assert_eq!(hdr3.event_data_length, 12);
}

#[test]
fn path_bytes() {
    let oid = ObjectId::new(3);
    let path = Path::new(
        oid,
        vec![
            Event::new(oid, 1i64, 1u16, vec![]),
            Event::new(oid, 2i64, 2u16, vec![5, 6, 7]),
        ],
    );

    let bytes = path.to_bytes().unwrap();
    assert_eq!(bytes.len(), path.packed_size());

    let (path2, sz) = Path::from_bytes(&bytes).unwrap();
    assert_eq!(sz, bytes.len());
    assert_eq!(path2, path);
}
