use std::{
    collections::HashMap,
    fs::{create_dir_all, remove_dir_all, OpenOptions},
    path::PathBuf,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;
use crate::block::BlockErr;
use crate::event::ActionId;

fn test_dir(name: &str) -> PathBuf {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::max())
        .is_test(true)
        .try_init();

    let test_dir = PathBuf::from(format!("./target/test/{name}"));
    if test_dir.is_dir() {
        remove_dir_all(&test_dir).unwrap();
    }
    create_dir_all(&test_dir).unwrap();
    test_dir
}

fn open(dir: &PathBuf, block_size: u32) -> DataFile {
    DataFile::open(DataFileConf::in_dir(dir).with_block_size(block_size)).unwrap()
}

fn path_ids(df: &DataFile, pos: usize) -> Vec<u32> {
    let view = df.block(pos).unwrap();
    let mut itr = view.paths().unwrap();
    let mut ids = Vec::new();
    while !itr.eof {
        ids.push(itr.current_object_id.value());
        itr.advance().unwrap();
    }
    ids
}

fn timestamps(events: &[Event]) -> Vec<i64> {
    events.iter().map(|e| e.timestamp.value()).collect()
}

#[test]
fn insert_into_empty_block() {
    let dir = test_dir("insert_into_empty_block");
    let mut df = open(&dir, 4096);
    assert_eq!(df.block_count(), 0);

    let event = Event::new(5u32, 100i64, 1u16, vec![1, 2, 3]);
    assert_eq!(df.add_event(&event).unwrap(), 0);

    assert_eq!(df.block_count(), 1);
    let block = &df.blocks()[0];
    assert_eq!(block.min_object_id, ObjectId::new(5));
    assert_eq!(block.max_object_id, ObjectId::new(5));
    assert_eq!(block.min_timestamp, Timestamp::new(100));
    assert_eq!(block.max_timestamp, Timestamp::new(100));
    assert!(!block.spanned);

    assert_eq!(path_ids(&df, 0), vec![5]);
    assert_eq!(df.read_path(ObjectId::new(5)).unwrap(), vec![event.clone()]);
    assert_eq!(
        df.block(0).unwrap().data_length().unwrap(),
        crate::path::PATH_HEADER_SIZE + event.packed_size()
    );
    assert_eq!(df.counters.get("block.create"), 1);
    df.verify().unwrap();
}

#[test]
fn insert_between_events() {
    let dir = test_dir("insert_between_events");
    let mut df = open(&dir, 4096);

    df.add_event(&Event::new(5u32, 100i64, 1u16, vec![])).unwrap();
    df.add_event(&Event::new(5u32, 300i64, 3u16, vec![3])).unwrap();
    df.add_event(&Event::new(5u32, 200i64, 2u16, vec![2, 2])).unwrap();

    assert_eq!(path_ids(&df, 0), vec![5]);
    let events = df.read_path(ObjectId::new(5)).unwrap();
    assert_eq!(timestamps(&events), vec![100, 200, 300]);
    assert_eq!(events[1].action_id, ActionId::new(2));
    assert_eq!(events[1].data, vec![2, 2]);
    df.verify().unwrap();
}

#[test]
fn insert_paths_in_order() {
    let dir = test_dir("insert_paths_in_order");
    let mut df = open(&dir, 4096);

    for id in [7u32, 3, 9, 1, 5] {
        df.add_event(&Event::new(id, id as i64, 0u16, vec![])).unwrap();
    }

    assert_eq!(path_ids(&df, 0), vec![1, 3, 5, 7, 9]);
    let block = &df.blocks()[0];
    assert_eq!(block.min_object_id, ObjectId::new(1));
    assert_eq!(block.max_object_id, ObjectId::new(9));
    df.verify().unwrap();
}

#[test]
fn split_for_new_highest_object() {
    let dir = test_dir("split_for_new_highest_object");
    let mut df = open(&dir, 256);

    // путь 1: 8 + 4 * 54 = 224 байта
    for i in 0..4 {
        df.add_event(&Event::new(1u32, i as i64, 0u16, vec![0; 40])).unwrap();
    }
    assert_eq!(df.block_count(), 1);
    assert_eq!(df.counters.get("block.split"), 0);

    let event = Event::new(2u32, 10i64, 0u16, vec![0; 40]);
    let pos = df.add_event(&event).unwrap();

    assert_eq!(df.counters.get("block.split"), 1);
    assert_eq!(df.block_count(), 2);
    assert_eq!(pos, 1);
    assert_eq!(df.blocks()[1].min_object_id, ObjectId::new(2));
    assert_eq!(df.blocks()[0].max_object_id, ObjectId::new(1));
    assert_eq!(path_ids(&df, 0), vec![1]);
    assert_eq!(path_ids(&df, 1), vec![2]);
    assert_eq!(df.read_path(ObjectId::new(2)).unwrap(), vec![event]);
    df.verify().unwrap();
}

#[test]
fn split_preserves_other_paths() {
    let dir = test_dir("split_preserves_other_paths");
    let mut df = open(&dir, 512);

    // 6 путей по 8 + 2 * 34 = 76 байт
    for id in 1u32..=6 {
        for t in 0..2 {
            df.add_event(&Event::new(id, (id * 10 + t) as i64, 0u16, vec![id as u8; 20]))
                .unwrap();
        }
    }
    assert_eq!(df.block_count(), 1);

    let mut before = HashMap::new();
    for id in 1u32..=6 {
        let path = df.block(0).unwrap().path_of(ObjectId::new(id)).unwrap().unwrap();
        before.insert(id, path.to_vec());
    }

    let event = Event::new(3u32, 35i64, 0u16, vec![0; 60]);
    df.add_event(&event).unwrap();
    assert_eq!(df.counters.get("block.split"), 1);
    assert!(df.block_count() >= 2);

    for id in 1u32..=6 {
        let holders: Vec<usize> = (0..df.block_count())
            .filter(|pos| {
                df.block(*pos)
                    .unwrap()
                    .path_of(ObjectId::new(id))
                    .unwrap()
                    .is_some()
            })
            .collect();
        assert_eq!(holders.len(), 1, "object {id} in {holders:?}");

        if id != 3 {
            let path = df.block(holders[0]).unwrap().path_of(ObjectId::new(id)).unwrap().unwrap();
            assert_eq!(path, &before[&id][..]);
        }
    }

    assert_eq!(timestamps(&df.read_path(ObjectId::new(3)).unwrap()), vec![30, 31, 35]);
    df.verify().unwrap();
}

#[test]
fn span_long_path() {
    let dir = test_dir("span_long_path");
    let mut df = open(&dir, 256);

    // событие 44 байта, в блок помещается не больше 5 событий одного пути
    let oid = ObjectId::new(9);
    for i in 1..=20 {
        df.add_event(&Event::new(oid, (i * 10) as i64, 0u16, vec![i as u8; 30])).unwrap();
    }

    let count = df.block_count();
    assert_eq!(count, 4);
    for (pos, block) in df.blocks().iter().enumerate() {
        assert_eq!(block.min_object_id, oid);
        assert_eq!(block.max_object_id, oid);
        assert_eq!(block.spanned, pos + 1 < count);
    }

    assert_eq!(df.block(0).unwrap().span_count().unwrap(), count as u32);
    assert_eq!(df.block(count - 1).unwrap().span_count().unwrap(), 1);

    let expect: Vec<i64> = (1..=20).map(|i| i * 10).collect();
    assert_eq!(timestamps(&df.read_path(oid).unwrap()), expect);

    // событие раньше всех попадает в первый сегмент
    df.add_event(&Event::new(oid, 0i64, 0u16, vec![0; 30])).unwrap();
    let events = df.read_path(oid).unwrap();
    assert_eq!(events.len(), 21);
    assert_eq!(events[0].timestamp, Timestamp::new(0));
    assert_eq!(timestamps(&events)[1..], expect[..]);
    df.verify().unwrap();

    // объект меньше начала span получает отдельный блок перед ним
    df.add_event(&Event::new(2u32, 5i64, 0u16, vec![])).unwrap();
    assert_eq!(path_ids(&df, 0), vec![2]);
    assert!(df.blocks()[1].spanned);
    df.verify().unwrap();

    // объект больше - в последний сегмент
    df.add_event(&Event::new(12u32, 5i64, 0u16, vec![])).unwrap();
    let last = df.block_count() - 1;
    assert_eq!(path_ids(&df, last), vec![9, 12]);
    assert!(!df.blocks()[last].spanned);
    assert_eq!(df.read_path(oid).unwrap().len(), 21);
    df.verify().unwrap();
}

#[test]
fn update_without_change_is_free() {
    let dir = test_dir("update_without_change_is_free");
    let mut df = open(&dir, 4096);

    df.add_event(&Event::new(5u32, 100i64, 0u16, vec![])).unwrap();
    df.add_event(&Event::new(8u32, 300i64, 0u16, vec![])).unwrap();
    let writes = df.counters.get("header.write");

    {
        let mut block = df.block_mut(0).unwrap();
        block.update(ObjectId::new(6), Timestamp::new(200)).unwrap();
        block.update(ObjectId::new(5), Timestamp::new(100)).unwrap();
    }
    assert_eq!(df.counters.get("header.write"), writes);

    // событие внутри диапазонов не пишет заголовок
    df.add_event(&Event::new(5u32, 150i64, 0u16, vec![])).unwrap();
    assert_eq!(df.counters.get("header.write"), writes);

    df.block_mut(0).unwrap().update(ObjectId::new(5), Timestamp::new(50)).unwrap();
    assert_eq!(df.counters.get("header.write"), writes + 1);
    assert_eq!(df.blocks()[0].min_timestamp, Timestamp::new(50));

    let res = df.block_mut(0).unwrap().update(ObjectId::new(0), Timestamp::new(1));
    assert!(matches!(res, Err(BlockErr::ZeroObjectId)));
}

#[test]
fn incremental_and_full_ranges_match() {
    let dir = test_dir("incremental_and_full_ranges_match");
    let mut df = open(&dir, 0x10000);
    let mut rnd = StdRng::seed_from_u64(42);

    for _ in 0..300 {
        let id: u32 = rnd.gen_range(1..=40);
        let ts: i64 = rnd.gen_range(-1000..1000);
        let size: usize = rnd.gen_range(0..16);
        df.add_event(&Event::new(id, ts, 1u16, vec![7; size])).unwrap();
    }
    assert_eq!(df.block_count(), 1);

    let incremental = df.blocks()[0].clone();
    let writes = df.counters.get("header.write");
    df.block_mut(0).unwrap().full_update().unwrap();
    assert_eq!(df.blocks()[0], incremental);
    assert_eq!(df.counters.get("header.write"), writes + 1);
    df.verify().unwrap();
}

#[test]
fn random_inserts_keep_order() {
    let dir = test_dir("random_inserts_keep_order");
    let mut df = open(&dir, 512);
    let mut rnd = StdRng::seed_from_u64(7);
    let mut expect: HashMap<u32, Vec<i64>> = HashMap::new();

    for _ in 0..600 {
        let id: u32 = rnd.gen_range(1..=30);
        let ts: i64 = rnd.gen_range(0..1000);
        let size: usize = rnd.gen_range(0..24);
        df.add_event(&Event::new(id, ts, 0u16, vec![id as u8; size])).unwrap();
        expect.entry(id).or_default().push(ts);
    }

    assert!(df.counters.get("block.split") > 0);
    df.verify().unwrap();

    for (id, times) in expect.iter_mut() {
        times.sort();
        let events = df.read_path(ObjectId::new(*id)).unwrap();
        assert_eq!(&timestamps(&events), times, "object {id}");
        assert!(events.iter().all(|e| e.data.iter().all(|b| *b == *id as u8)));
    }
}

#[test]
fn reopen_restores_blocks() {
    let dir = test_dir("reopen_restores_blocks");
    let mut rnd = StdRng::seed_from_u64(11);

    let (blocks, paths) = {
        let mut df = open(&dir, 512);
        for i in 0..200 {
            let id: u32 = rnd.gen_range(1..=12);
            df.add_event(&Event::new(id, i as i64, 0u16, vec![0; 20])).unwrap();
        }
        assert!(df.block_count() > 1);

        let paths: Vec<Vec<Event>> = (1u32..=12)
            .map(|id| df.read_path(ObjectId::new(id)).unwrap())
            .collect();
        (df.blocks().to_vec(), paths)
    };

    let df = open(&dir, 512);
    assert_eq!(df.blocks(), &blocks[..]);
    for id in 1u32..=12 {
        assert_eq!(df.read_path(ObjectId::new(id)).unwrap(), paths[id as usize - 1]);
    }
    df.verify().unwrap();
}

#[test]
fn reopen_spans_with_equal_timestamps() {
    let dir = test_dir("reopen_spans_with_equal_timestamps");
    let mut rnd = StdRng::seed_from_u64(0);

    let mut expect: HashMap<u32, Vec<i64>> = HashMap::new();
    let blocks = {
        let mut df = open(&dir, 256);
        for _ in 0..400 {
            let id: u32 = rnd.gen_range(1..=4);
            let ts: i64 = rnd.gen_range(0..50);
            let len: usize = rnd.gen_range(0..40);
            df.add_event(&Event::new(id, ts, 0u16, vec![id as u8; len])).unwrap();
            expect.entry(id).or_default().push(ts);
        }
        df.verify().unwrap();
        df.blocks().to_vec()
    };
    assert!(blocks.iter().any(|b| b.spanned));

    let df = open(&dir, 256);
    assert_eq!(df.block_count(), blocks.len());
    assert_eq!(
        df.blocks().iter().filter(|b| b.spanned).count(),
        blocks.iter().filter(|b| b.spanned).count()
    );
    df.verify().unwrap();

    for (id, times) in expect.iter_mut() {
        times.sort();
        let events = df.read_path(ObjectId::new(*id)).unwrap();
        assert_eq!(&timestamps(&events), times, "object {id}");
    }
}

#[test]
fn create_block_keeps_mapping_on_error() {
    let dir = test_dir("create_block_keeps_mapping_on_error");
    let mut df = open(&dir, 512);
    let event = Event::new(1u32, 1i64, 0u16, vec![1, 2]);
    df.add_event(&event).unwrap();

    // только чтение: set_len завершится ошибкой
    df.file = std::fs::File::open(&df.conf.data_file).unwrap();
    assert!(df.create_block(1).is_err());
    assert_eq!(df.block_count(), 1);
    assert_eq!(std::fs::metadata(&df.conf.data_file).unwrap().len(), 512);

    assert_eq!(df.read_path(ObjectId::new(1)).unwrap(), vec![event]);
    df.add_event(&Event::new(1u32, 2i64, 0u16, vec![])).unwrap();
    assert_eq!(timestamps(&df.read_path(ObjectId::new(1)).unwrap()), vec![1, 2]);
}

#[test]
fn block_size_from_header_file() {
    let dir = test_dir("block_size_from_header_file");
    {
        let mut df = open(&dir, 512);
        df.add_event(&Event::new(1u32, 1i64, 0u16, vec![])).unwrap();
    }

    let df = open(&dir, 1024);
    assert_eq!(df.block_size(), 512);
    assert_eq!(df.block_count(), 1);
}

#[test]
fn data_file_length_mismatch() {
    let dir = test_dir("data_file_length_mismatch");
    let conf = DataFileConf::in_dir(&dir).with_block_size(512);
    {
        let mut df = DataFile::open(conf.clone()).unwrap();
        df.add_event(&Event::new(1u32, 1i64, 0u16, vec![])).unwrap();
    }

    OpenOptions::new()
        .write(true)
        .open(&conf.data_file)
        .unwrap()
        .set_len(100)
        .unwrap();

    assert!(matches!(DataFile::open(conf), Err(BlockErr::HeaderFile { .. })));
}

#[test]
fn rejected_events() {
    let dir = test_dir("rejected_events");
    let mut df = open(&dir, 64);

    let res = df.add_event(&Event::new(0u32, 1i64, 0u16, vec![]));
    assert!(matches!(res, Err(BlockErr::ZeroObjectId)));

    let res = df.add_event(&Event::new(1u32, 1i64, 0u16, vec![0; 60]));
    match res {
        Err(err) => assert!(err.is_structural()),
        Ok(_) => panic!("event bigger than block accepted"),
    }
    assert_eq!(df.read_path(ObjectId::new(1)).unwrap(), vec![]);
    assert_eq!(df.block_count(), 0);
    assert_eq!(df.counters.get("block.create"), 0);
    assert_eq!(std::fs::metadata(&df.conf().data_file).unwrap().len(), 0);

    assert!(matches!(
        DataFile::open(DataFileConf::in_dir(&dir).with_block_size(0)),
        Err(BlockErr::ZeroBlockSize)
    ));
}

#[test]
fn insertion_info_offsets() {
    let dir = test_dir("insertion_info_offsets");
    let mut df = open(&dir, 4096);

    df.add_event(&Event::new(3u32, 10i64, 0u16, vec![])).unwrap();
    df.add_event(&Event::new(5u32, 100i64, 0u16, vec![])).unwrap();
    df.add_event(&Event::new(5u32, 300i64, 0u16, vec![])).unwrap();
    df.add_event(&Event::new(8u32, 1i64, 0u16, vec![])).unwrap();

    // путь 3: 0..22, путь 5: 22..58, путь 8: 58..80
    let view = df.block(0).unwrap();

    let info = view.insertion_info(&Event::new(5u32, 200i64, 0u16, vec![])).unwrap();
    assert_eq!(info.path_offset, Some(22));
    assert_eq!(info.event_offset, Some(44));
    assert_eq!(info.block_data_length, 80);
    assert!(info.path_exists());

    let info = view.insertion_info(&Event::new(5u32, 500i64, 0u16, vec![])).unwrap();
    assert_eq!(info.event_offset, Some(58));

    let info = view.insertion_info(&Event::new(4u32, 0i64, 0u16, vec![])).unwrap();
    assert_eq!(info.path_offset, Some(22));
    assert_eq!(info.event_offset, None);

    let info = view.insertion_info(&Event::new(9u32, 0i64, 0u16, vec![])).unwrap();
    assert_eq!(info.path_offset, None);
    assert_eq!(info.event_offset, None);
    assert_eq!(info.block_data_length, 80);
}
