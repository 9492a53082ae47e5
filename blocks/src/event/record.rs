use crate::{
    bbuff::streambuff::{ByteArrayRead, ByteBuff, ByteReader, ByteSlice, ByteWriter},
    block::BlockErr,
};

use super::{ActionId, ObjectId, Timestamp};

/// Размер заголовка события: timestamp + action_id + data_length
pub const EVENT_HEADER_SIZE: usize = 8 + 2 + 4;

/// Событие
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    /// Объект к которому относится событие, в упакованном виде хранится в заголовке пути
    pub object_id: ObjectId,

    /// Время
    pub timestamp: Timestamp,

    /// Действие
    pub action_id: ActionId,

    /// Данные события
    pub data: Vec<u8>,
}

/// Заголовок упакованного события
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventHeader {
    pub timestamp: Timestamp,
    pub action_id: ActionId,
    pub data_length: u32,
}

impl EventHeader {
    /// Чтение заголовка события
    ///
    /// Возвращает заголовок и кол-во прочитанных байт
    pub fn unpack(source: &[u8]) -> Result<(Self, usize), BlockErr> {
        let mut reader = ByteSlice::new(source);
        let mut hdr = Self::default();
        reader.read(&mut hdr.timestamp)?;
        reader.read(&mut hdr.action_id)?;
        reader.read(&mut hdr.data_length)?;
        Ok((hdr, reader.position))
    }

    /// Полный размер упакованного события
    pub fn event_size(&self) -> usize {
        EVENT_HEADER_SIZE + self.data_length as usize
    }
}

impl Event {
    pub fn new<O, T, A>(object_id: O, timestamp: T, action_id: A, data: Vec<u8>) -> Self
    where
        O: Into<ObjectId>,
        T: Into<Timestamp>,
        A: Into<ActionId>,
    {
        Self {
            object_id: object_id.into(),
            timestamp: timestamp.into(),
            action_id: action_id.into(),
            data: data,
        }
    }

    /// Размер события в упакованном виде
    pub fn packed_size(&self) -> usize {
        EVENT_HEADER_SIZE + self.data.len()
    }

    /// Заголовок события
    pub fn header(&self) -> EventHeader {
        EventHeader {
            timestamp: self.timestamp,
            action_id: self.action_id,
            data_length: self.data.len() as u32,
        }
    }

    /// Запись события в буфер
    pub fn write_to(&self, bbuf: &mut ByteBuff) -> Result<(), BlockErr> {
        if self.data.len() > u32::MAX as usize {
            return Err(BlockErr::codec(format!(
                "event data too big: {} bytes",
                self.data.len()
            )));
        }

        bbuf.write(self.timestamp);
        bbuf.write(self.action_id);
        bbuf.write(self.data.len() as u32);
        bbuf.write(&self.data[..]);
        Ok(())
    }

    /// Упаковка события в начало `target`
    ///
    /// Возвращает кол-во записанных байт
    pub fn pack(&self, target: &mut [u8]) -> Result<usize, BlockErr> {
        let size = self.packed_size();
        if target.len() < size {
            return Err(BlockErr::out_of_bounds(0, size, target.len()));
        }

        let mut bbuf = ByteBuff::with_capacity(size);
        self.write_to(&mut bbuf)?;
        target[..size].copy_from_slice(&bbuf.buff);
        Ok(size)
    }

    /// Распаковка события
    ///
    /// Возвращает событие и кол-во прочитанных байт
    pub fn unpack(object_id: ObjectId, source: &[u8]) -> Result<(Self, usize), BlockErr> {
        let mut reader = ByteSlice::new(source);
        let mut hdr = EventHeader::default();
        reader.read(&mut hdr.timestamp)?;
        reader.read(&mut hdr.action_id)?;
        reader.read(&mut hdr.data_length)?;

        let mut data = ByteArrayRead {
            data: Vec::new(),
            expect_size: hdr.data_length,
        };
        reader.read(&mut data)?;

        Ok((
            Self {
                object_id: object_id,
                timestamp: hdr.timestamp,
                action_id: hdr.action_id,
                data: data.data,
            },
            reader.position,
        ))
    }
}

#[test]
fn pack_unpack_event() {
    let ev = Event::new(5u32, 100i64, 3u16, vec![1, 2, 3, 4]);
    assert_eq!(ev.packed_size(), EVENT_HEADER_SIZE + 4);

    let mut buff = vec![0u8; 64];
    let sz = ev.pack(&mut buff).unwrap();
    assert_eq!(sz, ev.packed_size());

    let (hdr, hdr_sz) = EventHeader::unpack(&buff).unwrap();
    assert_eq!(hdr_sz, EVENT_HEADER_SIZE);
    assert_eq!(hdr.timestamp, Timestamp::new(100));
    assert_eq!(hdr.action_id, ActionId::new(3));
    assert_eq!(hdr.event_size(), sz);

    let (ev2, read_sz) = Event::unpack(ObjectId::new(5), &buff).unwrap();
    assert_eq!(read_sz, sz);
    assert_eq!(ev2, ev);
}

#[test]
fn pack_into_short_buffer_fails() {
    let ev = Event::new(1u32, 1i64, 1u16, vec![0; 10]);
    let mut buff = vec![0u8; EVENT_HEADER_SIZE];
    assert!(ev.pack(&mut buff).is_err());
    assert!(buff.iter().all(|b| *b == 0));
}

#[test]
fn unpack_truncated_event_fails() {
    let ev = Event::new(1u32, 1i64, 1u16, vec![7; 10]);
    let mut buff = vec![0u8; ev.packed_size()];
    ev.pack(&mut buff).unwrap();

    let res = Event::unpack(ObjectId::new(1), &buff[..buff.len() - 1]);
    assert!(matches!(res, Err(BlockErr::Codec { .. })));
}
