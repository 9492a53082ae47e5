//! Блок - участок файла данных фиксированного размера
//!
//! Содержимое блока - пути по возрастанию object_id,
//! неиспользуемый хвост заполнен нулями.
//!
//! | Смещение        | Содержимое |
//! |-----------------|------------|
//! | 0               | путь 1 |
//! | size(путь 1)    | путь 2 |
//! | ...             | ... |
//! | data_length     | нули до конца блока |
//!
//! Диапазоны object_id и timestamp каждого блока хранятся
//! отдельно, в файле заголовков, см. [Block::pack].
//!
//! - [BlockView] - чтение блока
//! - [BlockMut] - изменение: вставка события, разделение, пересчет диапазонов
mod err;
pub use err::*;

mod block;
pub use block::*;

mod view;
pub use view::*;

mod block_mut;
pub use block_mut::*;

mod insert;
mod split;
