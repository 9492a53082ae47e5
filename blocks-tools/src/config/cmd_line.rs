use super::AppConfig;

/// Параметры коммандной строки
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CmdLineParams {
    /// `-bs` _size_ - Переопределить размер блока
    pub block_size: Option<String>,

    /// `-log` _level_ - Переопределить уровень логирования
    pub log_level: Option<String>,
}

impl CmdLineParams {
    /// Флаги с значением, которые относятся к настройкам
    pub const FLAGS: [&'static str; 2] = ["-bs", "-log"];

    /// Парсинг коммандной строки
    pub fn from_args(args: &[String]) -> Self {
        let cmdl = CmdLineParams::default();
        args.iter()
            .fold((cmdl, "state"), |(cmdl, state), arg| match state {
                "state" => match arg.as_str() {
                    "-bs" => (cmdl, "-bs"),
                    "-log" => (cmdl, "-log"),
                    _ => (cmdl, state),
                },
                "-bs" => (
                    CmdLineParams {
                        block_size: Some(arg.clone()),
                        ..cmdl
                    },
                    "state",
                ),
                "-log" => (
                    CmdLineParams {
                        log_level: Some(arg.clone()),
                        ..cmdl
                    },
                    "state",
                ),
                _ => (cmdl, state),
            })
            .0
    }

    /// Переопределить параметры
    pub fn apply(&self, conf: AppConfig) -> AppConfig {
        AppConfig {
            block_size: self.block_size.clone().unwrap_or(conf.block_size),
            log_level: self.log_level.clone().unwrap_or(conf.log_level),
        }
    }
}

#[test]
fn test_cmd_line() {
    let args: Vec<String> = ["tool", "-bs", "4kb", "v", "dir", "-log", "debug"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let cmdl = CmdLineParams::from_args(&args);
    assert_eq!(cmdl.block_size, Some("4kb".to_string()));
    assert_eq!(cmdl.log_level, Some("debug".to_string()));

    let conf = cmdl.apply(AppConfig::default());
    assert_eq!(conf.block_size().unwrap(), 4096);
    assert_eq!(conf.log_level, "debug");

    let conf = CmdLineParams::default().apply(AppConfig::default());
    assert_eq!(conf, AppConfig::default());
}
