//! Курсор по событиям пути
//!
//! Курсор не изменяет данные, он только перемещается по упакованным событиям.
//! Если путь разбит на несколько блоков (span), курсор проходит
//! по всем сегментам пути подряд, см. [Cursor::set_paths].
use crate::{
    block::BlockErr,
    event::{ActionId, Event, EventHeader, Timestamp, EVENT_HEADER_SIZE},
    path::PathHeader,
};

/// Курсор по событиям
#[derive(Debug, Clone, Default)]
pub struct Cursor<'a> {
    /// Сегменты пути, каждый начинается с заголовка пути
    paths: Vec<&'a [u8]>,

    /// Индекс текущего сегмента
    pub path_index: usize,

    /// Индекс текущего события внутри сегмента
    pub event_index: usize,

    /// Смещение текущего события от начала сегмента
    position: usize,

    /// Конец событий текущего сегмента
    end: usize,

    /// Достигнут конец данных
    pub eof: bool,
}

impl<'a> Cursor<'a> {
    pub fn new() -> Self {
        Self {
            eof: true,
            ..Default::default()
        }
    }

    /// Устанавливает путь, `path` начинается с заголовка пути
    pub fn set_path(&mut self, path: &'a [u8]) -> Result<(), BlockErr> {
        self.set_paths(vec![path])
    }

    /// Устанавливает последовательность сегментов одного пути
    pub fn set_paths(&mut self, paths: Vec<&'a [u8]>) -> Result<(), BlockErr> {
        self.paths = paths;
        self.path_index = 0;
        self.event_index = 0;
        self.eof = false;
        self.open_path(0)
    }

    /// Переход к сегменту `index`, пропуская пустые сегменты
    fn open_path(&mut self, index: usize) -> Result<(), BlockErr> {
        let mut index = index;
        loop {
            if index >= self.paths.len() {
                self.finish();
                return Ok(());
            }

            let path = self.paths[index];
            let (hdr, hdr_size) = PathHeader::unpack(path)?;
            let end = hdr.path_size();
            if end > path.len() {
                return Err(BlockErr::corrupted(
                    None,
                    format!(
                        "path {} declares {} bytes, available {}",
                        hdr.object_id,
                        end,
                        path.len()
                    ),
                ));
            }

            if hdr_size < end {
                self.path_index = index;
                self.event_index = 0;
                self.position = hdr_size;
                self.end = end;
                return self.check_current();
            }

            index += 1;
        }
    }

    fn finish(&mut self) {
        self.eof = true;
        self.path_index = 0;
        self.event_index = 0;
        self.position = 0;
        self.end = 0;
    }

    /// Проверка что текущее событие целиком лежит внутри сегмента
    fn check_current(&self) -> Result<(), BlockErr> {
        let hdr = self.event_header()?;
        if self.position + hdr.event_size() > self.end {
            return Err(BlockErr::corrupted(
                None,
                format!(
                    "event at {} declares {} bytes, path ends at {}",
                    self.position,
                    hdr.event_size(),
                    self.end
                ),
            ));
        }
        Ok(())
    }

    /// Переход к следующему событию
    pub fn next(&mut self) -> Result<(), BlockErr> {
        if self.eof {
            return Ok(());
        }

        let hdr = self.event_header()?;
        self.position += hdr.event_size();

        if self.position < self.end {
            self.event_index += 1;
            self.check_current()
        } else {
            self.open_path(self.path_index + 1)
        }
    }

    /// Смещение текущего события от начала текущего сегмента
    pub fn offset(&self) -> usize {
        self.position
    }

    /// Упакованные байты текущего события
    pub fn current_bytes(&self) -> Result<&'a [u8], BlockErr> {
        if self.eof {
            return Err(BlockErr::codec("cursor at eof"));
        }
        let path = self.paths[self.path_index];
        let (hdr, _) = EventHeader::unpack(&path[self.position..self.end])?;
        Ok(&path[self.position..self.position + hdr.event_size()])
    }

    /// Заголовок текущего события
    pub fn event_header(&self) -> Result<EventHeader, BlockErr> {
        if self.eof {
            return Err(BlockErr::codec("cursor at eof"));
        }
        let path = self.paths[self.path_index];
        if self.position + EVENT_HEADER_SIZE > self.end {
            return Err(BlockErr::corrupted(
                None,
                format!("event header at {} crosses path end {}", self.position, self.end),
            ));
        }
        let (hdr, _) = EventHeader::unpack(&path[self.position..self.end])?;
        Ok(hdr)
    }

    /// Время текущего события
    pub fn timestamp(&self) -> Result<Timestamp, BlockErr> {
        Ok(self.event_header()?.timestamp)
    }

    /// Действие текущего события
    pub fn action_id(&self) -> Result<ActionId, BlockErr> {
        Ok(self.event_header()?.action_id)
    }

    /// Текущее событие целиком
    pub fn event(&self) -> Result<Event, BlockErr> {
        if self.eof {
            return Err(BlockErr::codec("cursor at eof"));
        }
        let path = self.paths[self.path_index];
        let (hdr, _) = PathHeader::unpack(path)?;
        let (ev, _) = Event::unpack(hdr.object_id, &path[self.position..self.end])?;
        Ok(ev)
    }

    /// Чтение всех оставшихся событий
    pub fn collect_events(&mut self) -> Result<Vec<Event>, BlockErr> {
        let mut events = Vec::new();
        while !self.eof {
            events.push(self.event()?);
            self.next()?;
        }
        Ok(events)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::ObjectId;
    use crate::path::{Path, PATH_HEADER_SIZE};

    fn sample_path() -> Vec<u8> {
        let oid = ObjectId::new(1);
        Path::new(
            oid,
            vec![
                Event::new(oid, 0i64, 0u16, vec![]),
                Event::new(oid, 1000000i64, 1u16, vec![1, 2, 3, 4]),
                Event::new(oid, 2000000i64, 2u16, vec![9]),
            ],
        )
        .to_bytes()
        .unwrap()
    }

    #[test]
    fn cursor_next() {
        let data = sample_path();
        let mut cursor = Cursor::new();
        assert!(cursor.eof);

        // Event 1
        cursor.set_path(&data).unwrap();
        assert_eq!(cursor.path_index, 0);
        assert_eq!(cursor.event_index, 0);
        assert_eq!(cursor.offset(), PATH_HEADER_SIZE);
        assert!(!cursor.eof);
        assert_eq!(cursor.timestamp().unwrap(), Timestamp::new(0));

        // Event 2
        cursor.next().unwrap();
        assert_eq!(cursor.event_index, 1);
        assert_eq!(cursor.offset(), PATH_HEADER_SIZE + EVENT_HEADER_SIZE);
        assert_eq!(cursor.action_id().unwrap(), ActionId::new(1));
        assert_eq!(cursor.event().unwrap().data, vec![1, 2, 3, 4]);

        // Event 3
        cursor.next().unwrap();
        assert_eq!(cursor.event_index, 2);
        assert_eq!(cursor.offset(), PATH_HEADER_SIZE + EVENT_HEADER_SIZE * 2 + 4);
        assert_eq!(cursor.current_bytes().unwrap().len(), EVENT_HEADER_SIZE + 1);

        // EOF
        cursor.next().unwrap();
        assert_eq!(cursor.path_index, 0);
        assert_eq!(cursor.event_index, 0);
        assert!(cursor.eof);
        assert!(cursor.timestamp().is_err());

        // next on eof is a no-op
        cursor.next().unwrap();
        assert!(cursor.eof);
    }

    #[test]
    fn cursor_over_empty_path() {
        let data = Path::new(ObjectId::new(7), vec![]).to_bytes().unwrap();
        let mut cursor = Cursor::new();
        cursor.set_path(&data).unwrap();
        assert!(cursor.eof);
    }

    #[test]
    fn cursor_over_segments() {
        let oid = ObjectId::new(4);
        let seg1 = Path::new(oid, vec![Event::new(oid, 1i64, 0u16, vec![]), Event::new(oid, 2i64, 0u16, vec![])])
            .to_bytes()
            .unwrap();
        let seg2 = Path::new(oid, vec![]).to_bytes().unwrap();
        let seg3 = Path::new(oid, vec![Event::new(oid, 3i64, 0u16, vec![1])])
            .to_bytes()
            .unwrap();

        let mut cursor = Cursor::new();
        cursor.set_paths(vec![&seg1, &seg2, &seg3]).unwrap();

        let mut timestamps = Vec::new();
        while !cursor.eof {
            timestamps.push(cursor.timestamp().unwrap().value());
            if timestamps.len() == 3 {
                assert_eq!(cursor.path_index, 2);
                assert_eq!(cursor.event_index, 0);
            }
            cursor.next().unwrap();
        }
        assert_eq!(timestamps, vec![1, 2, 3]);
    }

    #[test]
    fn cursor_detects_truncated_event() {
        let mut data = sample_path();
        // path header claims the whole stream, but the last event's data length is bumped past the end
        let last = data.len() - (EVENT_HEADER_SIZE + 1);
        data[last + 10..last + 14].copy_from_slice(&100u32.to_le_bytes());

        let mut cursor = Cursor::new();
        cursor.set_path(&data).unwrap();
        cursor.next().unwrap();
        let res = cursor.next();
        assert!(matches!(res, Err(BlockErr::Corrupted { .. })));
    }
}
