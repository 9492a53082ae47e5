//! Событие - запись внутри пути
//!
//! Структура упакованного события
//!
//! | Поле        | Тип/размер | Описание |
//! |-------------|------------|----------|
//! | timestamp   | i64        | Время события |
//! | action_id   | u16        | Идентификатор действия |
//! | data_length | u32        | Размер данных |
//! | data        | [u8]       | Данные (свойства) события |
mod ids;
pub use ids::*;

mod record;
pub use record::*;
