use log::debug;

use crate::{
    cursor::Cursor,
    event::{Event, ObjectId},
    path::{PathHeader, PATH_HEADER_SIZE},
    perf::Metrics,
};

use super::{BlockErr, BlockMut};

/// Часть содержимого блока, которая целиком переезжает в один блок:
/// путь или сегмент пути
#[derive(Debug, Clone)]
struct Piece {
    object_id: ObjectId,

    /// Упакованные байты без ожидающего события.
    /// Пусто для нового пути, который появится только после записи события.
    bytes: Vec<u8>,

    /// Размер с учетом ожидающего события, если оно попадает сюда
    size: usize,

    /// Сюда попадет ожидающее событие
    target: bool,

    /// Сегмент пути, который не помещается в один блок
    segment: bool,

    /// Последний сегмент такого пути
    last_segment: bool,
}

impl Piece {
    fn whole(object_id: ObjectId, bytes: &[u8], pending: usize) -> Self {
        Self {
            object_id: object_id,
            bytes: bytes.to_vec(),
            size: bytes.len() + pending,
            target: pending > 0,
            segment: false,
            last_segment: false,
        }
    }

    fn new_path(event: &Event) -> Self {
        Self {
            object_id: event.object_id,
            bytes: Vec::new(),
            size: PATH_HEADER_SIZE + event.packed_size(),
            target: true,
            segment: false,
            last_segment: false,
        }
    }
}

/// Событие внутри разрезаемого пути
enum Slot {
    /// Уже записанное событие: смещение и размер внутри пути
    Stored(usize, usize),

    /// Место для ожидающего события
    Pending,
}

/// Разрезка пути, который вместе с событием не помещается в блок
///
/// Резать можно только по границам событий. Сегмент набирает события,
/// пока `PATH_HEADER_SIZE + байты сегмента < block_size`.
/// Каждый сегмент - полноценный путь со своим заголовком.
fn cut_segments(
    object_id: ObjectId,
    path: &[u8],
    event: &Event,
    block_size: usize,
) -> Result<Vec<Piece>, BlockErr> {
    let event_length = event.packed_size();

    let mut slots = Vec::new();
    let mut pending_placed = false;
    let mut cursor = Cursor::new();
    cursor.set_path(path)?;
    while !cursor.eof {
        if !pending_placed && cursor.timestamp()? >= event.timestamp {
            slots.push(Slot::Pending);
            pending_placed = true;
        }
        slots.push(Slot::Stored(cursor.offset(), cursor.current_bytes()?.len()));
        cursor.next()?;
    }
    if !pending_placed {
        slots.push(Slot::Pending);
    }

    let mut segments: Vec<Piece> = Vec::new();
    let mut events: Vec<u8> = Vec::new();
    let mut slot_count = 0usize;
    let mut target = false;

    let close = |events: &mut Vec<u8>, target: bool| -> Result<Piece, BlockErr> {
        if events.is_empty() {
            return Ok(Piece::new_path(event));
        }
        let mut bytes = vec![0u8; PATH_HEADER_SIZE];
        PathHeader::new(object_id, events.len() as u32).pack(&mut bytes)?;
        bytes.append(events);
        Ok(Piece {
            object_id: object_id,
            size: bytes.len() + if target { event_length } else { 0 },
            bytes: bytes,
            target: target,
            segment: true,
            last_segment: false,
        })
    };

    for slot in slots {
        let slot_size = match slot {
            Slot::Stored(_, size) => size,
            Slot::Pending => event_length,
        };

        let used = PATH_HEADER_SIZE + events.len() + if target { event_length } else { 0 };
        if slot_count > 0 && used + slot_size >= block_size {
            let mut piece = close(&mut events, target)?;
            piece.segment = true;
            segments.push(piece);
            slot_count = 0;
            target = false;
        }

        match slot {
            Slot::Stored(offset, size) => events.extend_from_slice(&path[offset..offset + size]),
            Slot::Pending => target = true,
        }
        slot_count += 1;
    }

    let mut piece = close(&mut events, target)?;
    piece.segment = true;
    piece.last_segment = true;
    segments.push(piece);

    Ok(segments)
}

/// Первая часть группы (но не самая первая), на которой
/// накопленный размер достигает `target_size` - начало следующего блока
fn checkpoint(pieces: &[Piece], target_size: usize) -> Option<usize> {
    let mut acc = 0usize;
    for (i, piece) in pieces.iter().enumerate() {
        acc += piece.size;
        if i > 0 && acc >= target_size {
            return Some(i);
        }
    }
    None
}

fn group_size(pieces: &[Piece]) -> usize {
    pieces.iter().map(|p| p.size).sum()
}

/// Разбивка частей на группы, каждая группа - содержимое одного блока
///
/// - сегмент всегда начинает новую группу
/// - после сегмента, кроме последнего, группа закрывается
/// - если очередная часть не влезает в блок, группа режется по checkpoint,
///   а если его нет - закрывается целиком
fn group_pieces(pieces: Vec<Piece>, block_size: usize) -> Vec<Vec<Piece>> {
    let target_size = block_size / 2;
    let mut groups: Vec<Vec<Piece>> = Vec::new();
    let mut current: Vec<Piece> = Vec::new();
    let mut sealed = false;

    for piece in pieces {
        if !current.is_empty() && (sealed || piece.segment) {
            groups.push(std::mem::take(&mut current));
        }

        while !current.is_empty() && group_size(&current) + piece.size >= block_size {
            match checkpoint(&current, target_size) {
                Some(at) => {
                    let tail = current.split_off(at);
                    groups.push(std::mem::replace(&mut current, tail));
                }
                None => groups.push(std::mem::take(&mut current)),
            }
        }

        sealed = piece.segment && !piece.last_segment;
        current.push(piece);
    }

    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

impl<'a> BlockMut<'a> {
    #[cfg_attr(doc, aquamarine::aquamarine)]
    /// Разделение блока, в который не помещается событие
    ///
    /// Содержимое блока вместе с будущим событием раскладывается
    /// по группам размером около `block_size / 2`.
    /// Первая группа остается в этом блоке, остальные переезжают
    /// в новые блоки, которые встают сразу за ним.
    ///
    /// ```mermaid
    /// flowchart LR
    /// subgraph before [блок, переполнен]
    ///   p1[путь 1] --- p2[путь 2] --- p3[путь 3] --- e((событие))
    /// end
    /// subgraph after0 [блок]
    ///   q1[путь 1] --- q2[путь 2]
    /// end
    /// subgraph after1 [новый блок]
    ///   q3[путь 3] --- qe((событие))
    /// end
    /// before --> after0
    /// before --> after1
    /// ```
    ///
    /// Путь, который вместе с событием больше блока, режется
    /// по границам событий на несколько блоков (span).
    ///
    /// Блок не изменяется, пока образы всех групп не собраны.
    /// Все затронутые блоки пересчитываются через `full_update` и сохраняются.
    ///
    /// Возвращает логическую позицию блока, в который нужно писать событие
    pub fn split_with_event(&mut self, event: &Event) -> Result<usize, BlockErr> {
        let tracker = self.file.tracker.clone();
        tracker.track("split_with_event", || self.split(event))
    }

    fn split(&mut self, event: &Event) -> Result<usize, BlockErr> {
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

        let index = self.block()?.index;
        let pieces = self.collect_pieces(event, block_size)?;
        let groups = group_pieces(pieces, block_size);
        if groups.len() < 2 {
            debug!("block {index}: nothing to split for event {}", event.object_id);
            return Ok(self.pos);
        }

        let mut images = Vec::with_capacity(groups.len());
        let mut target_group = None;
        for (i, group) in groups.iter().enumerate() {
            let size = group_size(group);
            if size >= block_size {
                return Err(BlockErr::SplitFailed {
                    object_id: event.object_id,
                    message: format!("group {i} needs {size} bytes of {block_size}"),
                });
            }
            if group.iter().any(|p| p.target) {
                target_group = Some(i);
            }
            let image: Vec<u8> = group.iter().flat_map(|p| p.bytes.iter().copied()).collect();
            images.push(image);
        }

        let target_group = target_group.ok_or_else(|| BlockErr::SplitFailed {
            object_id: event.object_id,
            message: "no group for pending event".to_string(),
        })?;

        let mut positions = Vec::with_capacity(images.len());
        positions.push(self.pos);
        for k in 1..images.len() {
            positions.push(self.file.create_block(self.pos + k)?);
        }

        for (k, image) in images.iter().enumerate() {
            let block_index = self.file.block_at(positions[k])?.index;
            let region = self.file.region_mut(block_index)?;
            region[..image.len()].copy_from_slice(image);
            region[image.len()..].fill(0);
        }
        self.file.counters.inc("block.split");

        for pos in positions.iter() {
            let mut block = BlockMut {
                file: &mut *self.file,
                pos: *pos,
            };
            block.full_update()?;
            block.save()?;
        }
        self.file.refresh_spans();

        debug!(
            "block {index} split into {} blocks ({}), event {}/{} goes to position {}",
            images.len(),
            groups
                .iter()
                .map(|g| format!(
                    "{}..{}",
                    g.first().map(|p| p.object_id.value()).unwrap_or(0),
                    g.last().map(|p| p.object_id.value()).unwrap_or(0)
                ))
                .collect::<Vec<_>>()
                .join(", "),
            event.object_id,
            event.timestamp,
            positions[target_group]
        );

        Ok(positions[target_group])
    }

    /// Разбор блока на части с учетом будущего события
    fn collect_pieces(&self, event: &Event, block_size: usize) -> Result<Vec<Piece>, BlockErr> {
        let view = self.view();
        let event_length = event.packed_size();

        let mut pieces = Vec::new();
        let mut pending_placed = false;
        let mut itr = view.paths()?;
        while !itr.eof {
            let object_id = itr.current_object_id;
            let path = itr.current_path()?;

            if !pending_placed && object_id > event.object_id {
                pieces.push(Piece::new_path(event));
                pending_placed = true;
            }

            if object_id == event.object_id {
                pending_placed = true;
                if path.len() + event_length >= block_size {
                    pieces.extend(cut_segments(object_id, path, event, block_size)?);
                } else {
                    pieces.push(Piece::whole(object_id, path, event_length));
                }
            } else {
                pieces.push(Piece::whole(object_id, path, 0));
            }

            itr.advance()?;
        }

        if !pending_placed {
            pieces.push(Piece::new_path(event));
        }
        Ok(pieces)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::Path;

    fn piece(id: u32, size: usize) -> Piece {
        Piece {
            object_id: ObjectId::new(id),
            bytes: vec![0; size],
            size: size,
            target: false,
            segment: false,
            last_segment: false,
        }
    }

    fn ids(groups: &[Vec<Piece>]) -> Vec<Vec<u32>> {
        groups
            .iter()
            .map(|g| g.iter().map(|p| p.object_id.value()).collect())
            .collect()
    }

    #[test]
    fn checkpoint_skips_first_piece() {
        let pieces = vec![piece(1, 60), piece(2, 10), piece(3, 10)];
        assert_eq!(checkpoint(&pieces, 50), Some(1));
        assert_eq!(checkpoint(&pieces[..1], 50), None);

        let pieces = vec![piece(1, 10), piece(2, 10), piece(3, 40)];
        assert_eq!(checkpoint(&pieces, 50), Some(2));
    }

    #[test]
    fn group_by_half_block() {
        let pieces = vec![piece(1, 30), piece(2, 30), piece(3, 30), piece(4, 20)];
        let groups = group_pieces(pieces, 100);
        assert_eq!(ids(&groups), vec![vec![1], vec![2, 3, 4]]);
        for g in groups.iter() {
            assert!(group_size(g) < 100);
        }
    }

    #[test]
    fn group_without_checkpoint() {
        let pieces = vec![piece(1, 70), piece(2, 40)];
        let groups = group_pieces(pieces, 100);
        assert_eq!(ids(&groups), vec![vec![1], vec![2]]);
    }

    #[test]
    fn segments_break_groups() {
        let mut s1 = piece(2, 90);
        s1.segment = true;
        let mut s2 = piece(2, 20);
        s2.segment = true;
        s2.last_segment = true;

        let pieces = vec![piece(1, 10), s1, s2, piece(3, 10)];
        let groups = group_pieces(pieces, 100);
        assert_eq!(ids(&groups), vec![vec![1], vec![2], vec![2, 3]]);
    }

    #[test]
    fn cut_long_path() {
        let oid = ObjectId::new(7);
        let events: Vec<Event> = (0..10)
            .map(|i| Event::new(oid, (i * 10) as i64, 1u16, vec![i as u8; 16]))
            .collect();
        let event_size = events[0].packed_size();
        let path = Path::new(oid, events.clone()).to_bytes().unwrap();

        let block_size = PATH_HEADER_SIZE + event_size * 4;
        let pending = Event::new(oid, 35i64, 2u16, vec![0; 16]);
        let segments = cut_segments(oid, &path, &pending, block_size).unwrap();

        // 11 событий, не больше 3 в сегменте: 3 + 3 + 3 + 2
        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| s.segment && s.size < block_size));
        assert!(segments.last().unwrap().last_segment);
        assert_eq!(segments.iter().filter(|s| s.target).count(), 1);

        // событие с t=35 встает после t=30, во второй сегмент
        assert!(segments[1].target);
        let (second, _) = Path::from_bytes(&segments[1].bytes).unwrap();
        let times: Vec<i64> = second.events.iter().map(|e| e.timestamp.value()).collect();
        assert_eq!(times, vec![30, 40]);

        // все сохраненные события на месте и по порядку
        let mut restored = Vec::new();
        for s in segments.iter() {
            let (p, _) = Path::from_bytes(&s.bytes).unwrap();
            restored.extend(p.events);
        }
        assert_eq!(restored, events);
    }
}
