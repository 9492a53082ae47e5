//! Утилита для работы с таблицей блоков
//!
//! - `a <каталог> <object_id> <timestamp> <action_id> [файл]` - добавить событие,
//!   данные события берутся из файла
//! - `v <каталог> [-sha256]` - заголовки блоков в логическом порядке
//! - `p <каталог> <object_id>` - события объекта
//!
//! Настройки: `blocks.json` в текущем или родительском каталоге,
//! переопределяются флагами `-bs <размер блока>` и `-log <уровень>`

mod actions;
mod bytesize;
mod config;
mod err;

use blocks::event::{ActionId, ObjectId, Timestamp};
use config::{AppConfig, CmdLineParams};
use err::ToolErr;
use log::error;
use std::{env, path::PathBuf, process, str::FromStr};

fn main() {
    let args: Vec<String> = env::args().collect();
    let conf = CmdLineParams::from_args(&args).apply(AppConfig::find_or_default());

    let level = match conf.log_level() {
        Ok(level) => level,
        Err(err) => {
            eprintln!("{err:?}");
            process::exit(2);
        }
    };
    env_logger::builder().filter_level(level).init();

    let block_size = match conf.block_size() {
        Ok(size) => size,
        Err(err) => {
            error!("{err:?}");
            process::exit(2);
        }
    };

    let actions = match parse_args(&args) {
        Ok(actions) => actions,
        Err(err) => {
            error!("{err:?}");
            process::exit(2);
        }
    };

    let mut failed = false;
    for action in actions.into_iter() {
        if let Err(err) = action.execute(block_size) {
            error!("execute {act:?} failed with {err:?}", act = action, err = err);
            failed = true;
        }
    }

    if failed {
        process::exit(1);
    }
}

fn number<N: FromStr>(arg: &str, what: &str) -> Result<N, ToolErr> {
    arg.parse::<N>()
        .map_err(|_| ToolErr::args(format!("expect {what}, got {arg}")))
}

fn is_command(arg: &str) -> bool {
    matches!(arg, "a" | "v" | "p") || CmdLineParams::FLAGS.contains(&arg)
}

fn parse_args(args: &[String]) -> Result<Vec<Action>, ToolErr> {
    let mut actions = Vec::<Action>::new();

    let mut state = "state";
    let mut table_dir = String::new();
    let mut object_id = 0u32;
    let mut timestamp = 0i64;
    let mut action_id = 0u16;

    // 0 - exe
    let mut i = 1usize;
    while i < args.len() {
        let arg = &args[i];
        match state {
            "state" => {
                state = match arg.as_str() {
                    "a" => "append",
                    "v" => "view",
                    "p" => "path",
                    "-bs" | "-log" => "skip",
                    _ => return Err(ToolErr::args(format!("undefined arg {arg}"))),
                }
            }
            "skip" => state = "state",
            "append" => {
                table_dir = arg.clone();
                state = "append_oid"
            }
            "append_oid" => {
                object_id = number(arg, "object id")?;
                state = "append_ts"
            }
            "append_ts" => {
                timestamp = number(arg, "timestamp")?;
                state = "append_action"
            }
            "append_action" => {
                action_id = number(arg, "action id")?;
                state = "append_payload"
            }
            "append_payload" => {
                state = "state";
                if is_command(arg) {
                    actions.push(Action::append(&table_dir, object_id, timestamp, action_id, None));
                    continue;
                }
                actions.push(Action::append(
                    &table_dir,
                    object_id,
                    timestamp,
                    action_id,
                    Some(arg.clone()),
                ));
            }
            "view" => {
                table_dir = arg.clone();
                state = "view_flags"
            }
            "view_flags" => {
                state = "state";
                let sha256 = arg == "-sha256";
                actions.push(Action::ViewHeads {
                    table_dir: table_dir.clone(),
                    sha256: sha256,
                });
                if !sha256 {
                    continue;
                }
            }
            "path" => {
                table_dir = arg.clone();
                state = "path_oid"
            }
            "path_oid" => {
                state = "state";
                actions.push(Action::ViewPath {
                    table_dir: table_dir.clone(),
                    object_id: number(arg, "object id")?,
                });
            }
            _ => {}
        }
        i += 1;
    }

    match state {
        "state" | "skip" => {}
        "append_payload" => actions.push(Action::append(&table_dir, object_id, timestamp, action_id, None)),
        "view_flags" => actions.push(Action::ViewHeads {
            table_dir: table_dir.clone(),
            sha256: false,
        }),
        _ => return Err(ToolErr::args(format!("not enough arguments ({state})"))),
    }

    Ok(actions)
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Append {
        table_dir: String,
        object_id: u32,
        timestamp: i64,
        action_id: u16,
        payload_file: Option<String>,
    },
    ViewHeads {
        table_dir: String,
        sha256: bool,
    },
    ViewPath {
        table_dir: String,
        object_id: u32,
    },
}

impl Action {
    fn append(table_dir: &str, object_id: u32, timestamp: i64, action_id: u16, payload_file: Option<String>) -> Self {
        Action::Append {
            table_dir: table_dir.to_string(),
            object_id: object_id,
            timestamp: timestamp,
            action_id: action_id,
            payload_file: payload_file,
        }
    }

    fn execute(&self, block_size: u32) -> Result<(), ToolErr> {
        match self {
            Action::Append {
                table_dir,
                object_id,
                timestamp,
                action_id,
                payload_file,
            } => {
                let payload = payload_file.as_ref().map(PathBuf::from);
                let pos = actions::append::append_event(
                    table_dir,
                    block_size,
                    ObjectId::new(*object_id),
                    Timestamp::new(*timestamp),
                    ActionId::new(*action_id),
                    payload.as_deref(),
                )?;
                println!("{pos}");
                Ok(())
            }
            Action::ViewHeads { table_dir, sha256 } => {
                actions::viewheaders::view_headers(table_dir, block_size, *sha256)
            }
            Action::ViewPath { table_dir, object_id } => {
                actions::path::view_path(table_dir, block_size, ObjectId::new(*object_id))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_commands() {
        let actions = parse_args(&args("tool -bs 4k a t 5 100 1 v t -sha256 p t 5 a t 6 200 2 data.bin v t")).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::append("t", 5, 100, 1, None),
                Action::ViewHeads {
                    table_dir: "t".to_string(),
                    sha256: true
                },
                Action::ViewPath {
                    table_dir: "t".to_string(),
                    object_id: 5
                },
                Action::append("t", 6, 200, 2, Some("data.bin".to_string())),
                Action::ViewHeads {
                    table_dir: "t".to_string(),
                    sha256: false
                },
            ]
        );
    }

    #[test]
    fn parse_errors() {
        assert!(parse_args(&args("tool x")).is_err());
        assert!(parse_args(&args("tool a t five 100 1")).is_err());
        assert!(parse_args(&args("tool p t")).is_err());
        assert_eq!(parse_args(&args("tool")).unwrap(), vec![]);
    }

    #[test]
    fn append_and_view() {
        let dir = PathBuf::from("./target/test/tool_append_and_view");
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir).unwrap();
        }

        for ts in [300i64, 100, 200] {
            let pos = actions::append::append_event(
                &dir,
                4096,
                ObjectId::new(7),
                Timestamp::new(ts),
                ActionId::new(1),
                None,
            )
            .unwrap();
            assert_eq!(pos, 0);
        }

        let table = actions::open_table(&dir, 4096, false).unwrap();
        let lines = actions::viewheaders::header_lines(&table, true).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("000000 000000"));

        let lines = actions::path::path_lines(&table, ObjectId::new(7)).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("100 1970-01-01T00:00:00.000100Z"));

        assert!(matches!(
            actions::open_table("./target/test/tool_no_table", 4096, false),
            Err(ToolErr::TableNotFound(_))
        ));
    }
}
