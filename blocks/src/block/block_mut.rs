use crate::{
    datafile::DataFile,
    event::{ObjectId, Timestamp},
};

use super::{Block, BlockErr, BlockView};

/// Блок для изменения
///
/// Держит эксклюзивную ссылку на файл данных,
/// пока он жив - других читателей и писателей нет.
pub struct BlockMut<'a> {
    pub(crate) file: &'a mut DataFile,
    pub(crate) pos: usize,
}

impl<'a> BlockMut<'a> {
    /// Логическая позиция блока в файле данных
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Представление только для чтения
    pub fn view(&self) -> BlockView<'_> {
        BlockView {
            file: &*self.file,
            pos: self.pos,
        }
    }

    /// Описание блока
    pub fn block(&self) -> Result<&Block, BlockErr> {
        self.file.block_at(self.pos)
    }

    /// Сброс страниц блока на диск
    pub fn save(&mut self) -> Result<(), BlockErr> {
        let index = self.block()?.index;
        self.file.flush_block(index)
    }

    /// Запись заголовка блока в файл заголовков
    pub fn save_header(&mut self) -> Result<(), BlockErr> {
        let block = self.block()?.clone();
        self.file.write_header(&block)
    }

    /// Расширение диапазонов блока под событие
    ///
    /// Заголовок пишется на диск только если диапазоны изменились
    pub fn update(&mut self, object_id: ObjectId, timestamp: Timestamp) -> Result<(), BlockErr> {
        if object_id.is_zero() {
            return Err(BlockErr::ZeroObjectId);
        }

        if self.file.block_at_mut(self.pos)?.widen(object_id, timestamp) {
            self.save_header()?;
        }
        Ok(())
    }

    /// Пересчет диапазонов по всему содержимому блока и запись заголовка
    pub fn full_update(&mut self) -> Result<(), BlockErr> {
        let ranges = self.view().compute_ranges()?;

        let block = self.file.block_at_mut(self.pos)?;
        block.min_object_id = ranges.min_object_id;
        block.max_object_id = ranges.max_object_id;
        block.min_timestamp = ranges.min_timestamp;
        block.max_timestamp = ranges.max_timestamp;

        self.save_header()
    }
}
