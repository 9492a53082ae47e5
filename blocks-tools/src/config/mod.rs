mod app;
pub use app::*;

/// Обработка параметров коммандой строки
mod cmd_line;
pub use cmd_line::*;
