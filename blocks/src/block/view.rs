use crate::{
    cursor::Cursor,
    datafile::DataFile,
    event::{Event, ObjectId, Timestamp},
    path_iter::PathIterator,
};

use super::{Block, BlockErr};

/// Место вставки события в блок
///
/// Смещения отсчитываются от начала блока
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertionInfo {
    /// Начало пути, в который вставляется событие,
    /// либо место для нового пути.
    /// `None` - новый путь пишется в конец данных блока
    pub path_offset: Option<usize>,

    /// Место вставки события в существующий путь.
    /// `None` - пути для объекта нет, перед событием нужно записать заголовок пути
    pub event_offset: Option<usize>,

    /// Кол-во байт занятых данными блока
    pub block_data_length: usize,
}

impl InsertionInfo {
    /// Путь для объекта уже есть в блоке
    pub fn path_exists(&self) -> bool {
        self.event_offset.is_some()
    }
}

/// Блок только для чтения
pub struct BlockView<'a> {
    pub(crate) file: &'a DataFile,
    pub(crate) pos: usize,
}

impl<'a> BlockView<'a> {
    /// Логическая позиция блока в файле данных
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Описание блока
    pub fn block(&self) -> Result<&'a Block, BlockErr> {
        self.file.block_at(self.pos)
    }

    /// Все байты блока
    pub fn data(&self) -> Result<&'a [u8], BlockErr> {
        let index = self.block()?.index;
        self.file.region(index)
    }

    /// Итератор по путям блока
    pub fn paths(&self) -> Result<PathIterator<'a>, BlockErr> {
        PathIterator::new(self.data()?)
    }

    /// Кол-во байт занятых данными
    pub fn data_length(&self) -> Result<usize, BlockErr> {
        self.paths()?.data_length()
    }

    /// Упакованный путь объекта, если он есть в блоке
    pub fn path_of(&self, object_id: ObjectId) -> Result<Option<&'a [u8]>, BlockErr> {
        let mut itr = self.paths()?;
        while !itr.eof {
            if itr.current_object_id == object_id {
                return Ok(Some(itr.current_path()?));
            }
            if itr.current_object_id > object_id {
                break;
            }
            itr.advance()?;
        }
        Ok(None)
    }

    /// Время первого события объекта в этом блоке
    pub fn first_timestamp(&self, object_id: ObjectId) -> Result<Option<Timestamp>, BlockErr> {
        let path = match self.path_of(object_id)? {
            Some(path) => path,
            None => return Ok(None),
        };

        let mut cursor = Cursor::new();
        cursor.set_path(path)?;
        if cursor.eof {
            return Ok(None);
        }
        Ok(Some(cursor.timestamp()?))
    }

    /// Диапазоны по фактическому содержимому блока
    ///
    /// Возвращает копию описания блока с пересчитанными диапазонами
    pub fn compute_ranges(&self) -> Result<Block, BlockErr> {
        let mut block = self.block()?.clone();
        block.reset_ranges();

        let mut objects_seen = false;
        let mut events_seen = false;
        let mut itr = self.paths()?;
        while !itr.eof {
            let object_id = itr.current_object_id;
            if !objects_seen || object_id < block.min_object_id {
                block.min_object_id = object_id;
            }
            if !objects_seen || object_id > block.max_object_id {
                block.max_object_id = object_id;
            }
            objects_seen = true;

            let mut cursor = Cursor::new();
            cursor.set_path(itr.current_path()?)?;
            while !cursor.eof {
                let ts = cursor.timestamp()?;
                if !events_seen || ts < block.min_timestamp {
                    block.min_timestamp = ts;
                }
                if !events_seen || ts > block.max_timestamp {
                    block.max_timestamp = ts;
                }
                events_seen = true;
                cursor.next()?;
            }

            itr.advance()?;
        }

        Ok(block)
    }

    /// Кол-во блоков, которые занимает путь первого объекта этого блока
    ///
    /// Имеет смысл только для первого блока последовательности.
    /// Для блока без признака `spanned` всегда 1.
    pub fn span_count(&self) -> Result<u32, BlockErr> {
        let block = self.block()?;
        if !block.spanned {
            return Ok(1);
        }

        let blocks = self.file.blocks();
        let object_id = block.min_object_id;
        let mut pos = self.pos;
        loop {
            pos += 1;
            if pos >= blocks.len() || blocks[pos].min_object_id != object_id {
                break;
            }
        }

        Ok((pos - self.pos) as u32)
    }

    /// Определение места вставки события, блок не изменяется
    ///
    /// 1. пути просматриваются по возрастанию object_id
    /// 2. если найден путь объекта - внутри него ищется первое событие
    ///    с timestamp >= timestamp нового события, если такого нет - конец пути
    /// 3. если путь не найден - место перед первым путем с большим object_id
    /// 4. просмотр идет до конца, чтобы узнать размер данных блока
    pub fn insertion_info(&self, event: &Event) -> Result<InsertionInfo, BlockErr> {
        let mut info = InsertionInfo::default();
        let mut itr = self.paths()?;

        while !itr.eof {
            if event.object_id == itr.current_object_id {
                let path_offset = itr.offset();
                info.path_offset = Some(path_offset);

                let path = itr.current_path()?;
                let mut cursor = Cursor::new();
                cursor.set_path(path)?;
                while !cursor.eof {
                    if cursor.timestamp()? >= event.timestamp {
                        info.event_offset = Some(path_offset + cursor.offset());
                        break;
                    }
                    cursor.next()?;
                }

                if info.event_offset.is_none() {
                    info.event_offset = Some(path_offset + itr.path_size());
                }
            } else if info.path_offset.is_none() && itr.current_object_id > event.object_id {
                info.path_offset = Some(itr.offset());
            }

            itr.advance()?;
        }

        info.block_data_length = itr.block_data_length;
        Ok(info)
    }
}
