use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Размер блока по умолчанию, 64 Кб
pub const DEFAULT_BLOCK_SIZE: u32 = 0x10000;

/// Имя файла данных внутри каталога таблицы
pub const DATA_FILE_NAME: &str = "data";

/// Имя файла заголовков внутри каталога таблицы
pub const HEADER_FILE_NAME: &str = "header";

fn default_block_size() -> u32 {
    DEFAULT_BLOCK_SIZE
}

/// Настройки файла данных таблицы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFileConf {
    /// Файл с блоками
    pub data_file: PathBuf,

    /// Файл заголовков блоков
    pub header_file: PathBuf,

    /// Размер блока в байтах.
    /// Для существующей таблицы используется значение из файла заголовков.
    #[serde(default = "default_block_size")]
    pub block_size: u32,
}

impl Default for DataFileConf {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

impl DataFileConf {
    /// Файлы `data` и `header` в каталоге таблицы
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            data_file: dir.join(DATA_FILE_NAME),
            header_file: dir.join(HEADER_FILE_NAME),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(self, block_size: u32) -> Self {
        Self {
            block_size: block_size,
            ..self
        }
    }
}

#[test]
fn conf_json() {
    let conf = DataFileConf::in_dir("/tmp/table").with_block_size(4096);
    let json = serde_json::to_string_pretty(&conf).unwrap();
    let conf2: DataFileConf = serde_json::from_str(&json).unwrap();
    assert_eq!(conf, conf2);

    let conf3: DataFileConf =
        serde_json::from_str(r#"{ "data_file": "a/data", "header_file": "a/header" }"#).unwrap();
    assert_eq!(conf3.block_size, DEFAULT_BLOCK_SIZE);
}
