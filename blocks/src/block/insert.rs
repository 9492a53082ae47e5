use log::trace;

use crate::{
    event::Event,
    path::{PathHeader, PATH_HEADER_SIZE},
};

use super::{BlockErr, BlockMut};

impl<'a> BlockMut<'a> {
    /// Добавление события в блок
    ///
    /// Если событие не помещается, блок разделяется ([BlockMut::split_with_event])
    /// и событие пишется в тот блок, которому после разделения принадлежит объект.
    ///
    /// Возвращает логическую позицию блока, в который записано событие
    pub fn add_event(&mut self, event: &Event) -> Result<usize, BlockErr> {
        let tracker = self.file.tracker.clone();
        tracker.track("add_event", || self.add_event_with(event, true))
    }

    pub(crate) fn add_event_with(&mut self, event: &Event, allow_split: bool) -> Result<usize, BlockErr> {
        if event.object_id.is_zero() {
            return Err(BlockErr::ZeroObjectId);
        }

        let block_size = self.file.block_size();
        if block_size == 0 {
            return Err(BlockErr::ZeroBlockSize);
        }
        let block_size = block_size as usize;

        let event_length = event.packed_size();
        if event_length + PATH_HEADER_SIZE >= block_size {
            return Err(BlockErr::EventTooLarge {
                object_id: event.object_id,
                event_size: event_length,
                block_size: block_size as u32,
            });
        }

        let info = self.view().insertion_info(event)?;
        let path_exists = info.path_exists();
        let required = event_length + if path_exists { 0 } else { PATH_HEADER_SIZE };

        if info.block_data_length + required >= block_size {
            if !allow_split {
                return Err(BlockErr::SplitFailed {
                    object_id: event.object_id,
                    message: format!(
                        "block has {} bytes, event needs {required} of {block_size}",
                        info.block_data_length
                    ),
                });
            }

            let target = self.split_with_event(event)?;
            let mut target_block = BlockMut {
                file: &mut *self.file,
                pos: target,
            };
            let pos = target_block.add_event_with(event, false)?;
            self.file.refresh_spans();
            return Ok(pos);
        }

        let path_offset = info.path_offset.unwrap_or(info.block_data_length);
        let insert_at = info.event_offset.unwrap_or(path_offset);
        let live_end = info.block_data_length;
        let new_end = live_end + required;

        if insert_at < path_offset || insert_at > live_end {
            return Err(BlockErr::corrupted(
                Some(self.block()?.index),
                format!("insertion point {insert_at} outside of {path_offset}..{live_end}"),
            ));
        }

        // изменяемый участок: от начала пути до нового конца данных
        let index = self.block()?.index;
        let staged = {
            let data = self.file.region(index)?;
            if new_end > data.len() {
                return Err(BlockErr::out_of_bounds(path_offset, new_end - path_offset, data.len()));
            }

            let mut staged = Vec::with_capacity(new_end - path_offset);
            staged.extend_from_slice(&data[path_offset..insert_at]);
            let gap = staged.len();
            staged.resize(gap + required, 0);
            staged.extend_from_slice(&data[insert_at..live_end]);

            if path_exists {
                let (hdr, _) = PathHeader::unpack(&staged)?;
                let length = hdr.event_data_length as usize + event_length;
                if length > u32::MAX as usize {
                    return Err(BlockErr::codec(format!("path {} too big: {length} bytes", hdr.object_id)));
                }
                PathHeader::patch_event_data_length(&mut staged, length as u32)?;
                event.pack(&mut staged[gap..gap + event_length])?;
            } else {
                PathHeader::new(event.object_id, event_length as u32).pack(&mut staged[gap..])?;
                event.pack(&mut staged[gap + PATH_HEADER_SIZE..gap + required])?;
            }
            staged
        };

        let region = self.file.region_mut(index)?;
        region[path_offset..new_end].copy_from_slice(&staged);

        trace!(
            "block {index}: event {}/{} written at {insert_at}, data {live_end} -> {new_end}",
            event.object_id,
            event.timestamp
        );

        self.save()?;
        self.update(event.object_id, event.timestamp)?;
        Ok(self.pos)
    }
}
