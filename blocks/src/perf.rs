use std::{collections::HashMap, fmt::Display};

mod tracks;
pub use tracks::*;

/// Счетчики операций с файлом данных
///
/// | Имя            | Когда увеличивается                 |
/// |----------------|-------------------------------------|
/// | `header.write` | запись заголовка блока в файл       |
/// | `block.save`   | сброс данных блока на диск          |
/// | `block.split`  | разделение блока                    |
/// | `block.create` | добавление блока в файл данных      |
pub trait Metrics {
    fn inc(&mut self, name: &str);

    /// Значение, 0 для неизвестного имени
    fn get(&self, name: &str) -> u64;
}

/// Счетчики в памяти процесса
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub map: HashMap<String, u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// Имена по алфавиту
    pub fn names(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Metrics for Counters {
    fn inc(&mut self, name: &str) {
        *self.map.entry(name.to_string()).or_insert(0) += 1;
    }

    fn get(&self, name: &str) -> u64 {
        self.map.get(name).copied().unwrap_or(0)
    }
}

impl Display for Counters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for name in self.names() {
            writeln!(f, "{name} {cnt}", cnt = self.get(&name))?;
        }
        Ok(())
    }
}

#[test]
fn test_counters() {
    let mut counters = Counters::new();
    assert_eq!(counters.get("block.save"), 0);

    counters.inc("header.write");
    counters.inc("block.save");
    counters.inc("header.write");

    assert_eq!(counters.get("header.write"), 2);
    assert_eq!(counters.names(), vec!["block.save".to_string(), "header.write".to_string()]);
    assert_eq!(counters.to_string(), "block.save 1\nheader.write 2\n");
}
