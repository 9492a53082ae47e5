use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

/// Суммарное время и кол-во вызовов `add_event` и `split_with_event`
///
/// Клоны разделяют одну таблицу замеров
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    pub tracks: Arc<RwLock<HashMap<String, (u64, Duration)>>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            tracks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Выполняет функцию и учитывает время ее работы под именем `name`
    pub fn track<F, R>(&self, name: &str, tracked: F) -> R
    where
        F: FnOnce() -> R,
    {
        let t0 = Instant::now();
        let res = tracked();
        self.add(name, Instant::now().duration_since(t0));
        res
    }

    pub fn add(&self, name: &str, dur: Duration) {
        if let Ok(mut tracks) = self.tracks.write() {
            let v = match tracks.get(name) {
                Some((c, d)) => (c + 1, *d + dur),
                None => (1u64, dur),
            };
            tracks.insert(name.to_string(), v);
        }
    }

    /// Кол-во замеров по имени
    pub fn count(&self, name: &str) -> u64 {
        match self.tracks.read() {
            Ok(tracks) => tracks.get(name).map(|(c, _)| *c).unwrap_or(0),
            Err(_) => 0,
        }
    }
}

impl Display for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tracks.read() {
            Err(err) => write!(f, "tracks can't display {}", err.to_string()),
            Ok(tracks) => {
                writeln!(f, "tracks:")?;

                let mut keys: Vec<&String> = tracks.keys().collect();
                keys.sort();
                for key in keys {
                    if let Some((cnt, dur)) = tracks.get(key) {
                        let avg = Duration::from_nanos((dur.as_nanos() / (*cnt as u128)) as u64);
                        writeln!(f, "{key} cnt={cnt} dur.sum={dur:?} dur.avg={avg:?}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[test]
fn test_tracker() {
    let tracker = Tracker::new();
    let shared = tracker.clone();
    let pos = shared.track("add_event", || 3usize);
    tracker.add("add_event", Duration::from_millis(2));

    assert_eq!(pos, 3);
    assert_eq!(tracker.count("add_event"), 2);
    assert_eq!(tracker.count("split_with_event"), 0);
    assert!(tracker.to_string().contains("add_event cnt=2"));
}
