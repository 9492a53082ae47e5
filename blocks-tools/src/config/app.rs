use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, str::FromStr};

use crate::{bytesize::ByteSize, err::ToolErr};

/// Имя файла настроек
pub const CONFIG_FILE_NAME: &str = "blocks.json";

/// Настройки приложения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Размер блока для новых таблиц: `65536`, `64kb`, ...
    pub block_size: String,

    /// Уровень логирования: `off`, `error`, `warn`, `info`, `debug`, `trace`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            block_size: "64kb".to_string(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    fn work_dir() -> PathBuf {
        env::current_dir().unwrap_or(PathBuf::from("."))
    }

    fn find_file_up(from: PathBuf, name: &str) -> Option<PathBuf> {
        let mut dir = from;
        loop {
            let file = dir.join(name);
            if file.exists() {
                return Some(file);
            }

            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break None,
            }
        }
    }

    /// Поиск файла настроек в текущем и родительских каталогах
    ///
    /// Логирование еще не настроено, поэтому сообщения идут в stderr
    pub fn find_or_default() -> Self {
        match Self::find_file_up(Self::work_dir(), CONFIG_FILE_NAME).and_then(|file| {
            eprintln!("found config file {:?}", &file);
            match fs::read_to_string(file) {
                Ok(str) => match serde_json::from_str(&str) {
                    Ok(conf) => Some(conf),
                    Err(err) => {
                        eprintln!("can't read json from config file: {}", err.to_string());
                        None
                    }
                },
                Err(err) => {
                    eprintln!("can't read file {}", err.to_string());
                    None
                }
            }
        }) {
            Some(value) => value,
            None => Self::default(),
        }
    }

    /// Размер блока в байтах
    pub fn block_size(&self) -> Result<u32, ToolErr> {
        let size = ByteSize::parse(&self.block_size).map_err(ToolErr::args)?;
        if size.0 == 0 || size.0 > u32::MAX as usize {
            return Err(ToolErr::args(format!("block size {} out of range", self.block_size)));
        }
        Ok(size.0 as u32)
    }

    /// Уровень логирования
    pub fn log_level(&self) -> Result<LevelFilter, ToolErr> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ToolErr::args(format!("unknown log level {}", self.log_level)))
    }
}

#[test]
fn test_conf() {
    AppConfig::find_or_default();
}

#[test]
fn test_json() {
    let s = serde_json::to_string_pretty(&AppConfig::default()).unwrap();
    let conf: AppConfig = serde_json::from_str(&s).unwrap();
    assert_eq!(conf, AppConfig::default());
    assert_eq!(conf.block_size().unwrap(), 0x10000);
    assert_eq!(conf.log_level().unwrap(), LevelFilter::Warn);

    let conf: AppConfig = serde_json::from_str(r#"{ "block_size": "4k" }"#).unwrap();
    assert_eq!(conf.block_size().unwrap(), 4096);
    assert_eq!(conf.log_level, "warn");
}
