use crate::event::ObjectId;

/// Ошибка при операциях с блоком
///
/// Классы ошибок
///
/// - нарушение предусловий: [BlockErr::ZeroObjectId], [BlockErr::ZeroBlockSize], [BlockErr::BlockNotFound]
/// - ввод/вывод: [BlockErr::IO], [BlockErr::HeaderFile]
/// - структурная невозможность: [BlockErr::EventTooLarge], [BlockErr::SplitFailed] - повтор не поможет
/// - повреждение данных: [BlockErr::Corrupted], [BlockErr::OutOfBounds], [BlockErr::Codec]
///
/// Ошибка в середине `add_event` / `split_with_event` означает,
/// что блок нужно перепроверить через `full_update` или перечитать файл.
#[derive(Debug, Clone)]
pub enum BlockErr {
    IO {
        message: String,
        os_error: Option<i32>,
    },

    /// Не удалось упаковать/распаковать запись
    Codec {
        message: String,
    },

    /// Идентификатор объекта 0 зарезервирован
    ZeroObjectId,

    /// Размер блока должен быть больше 0
    ZeroBlockSize,

    /// Файл данных не отображен в память
    Unmapped,

    /// Нет блока с такой позицией
    BlockNotFound {
        position: usize,
        block_count: usize,
    },

    /// Обращение за пределы блока
    OutOfBounds {
        offset: usize,
        length: usize,
        limit: usize,
    },

    /// Содержимое блока не соответствует формату
    Corrupted {
        block_index: Option<u32>,
        message: String,
    },

    /// Событие больше чем может вместить блок
    EventTooLarge {
        object_id: ObjectId,
        event_size: usize,
        block_size: u32,
    },

    /// После разделения блока событие все равно не помещается
    SplitFailed {
        object_id: ObjectId,
        message: String,
    },

    /// Файл заголовков блоков не соответствует ожидаемому
    HeaderFile {
        message: String,
    },
}

impl From<std::io::Error> for BlockErr {
    fn from(value: std::io::Error) -> Self {
        Self::IO {
            message: value.to_string(),
            os_error: value.raw_os_error(),
        }
    }
}

impl From<String> for BlockErr {
    fn from(value: String) -> Self {
        Self::Codec { message: value }
    }
}

impl BlockErr {
    pub fn codec<A: Into<String>>(message: A) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    pub fn corrupted<A: Into<String>>(block_index: Option<u32>, message: A) -> Self {
        Self::Corrupted {
            block_index: block_index,
            message: message.into(),
        }
    }

    pub fn header_file<A: Into<String>>(message: A) -> Self {
        Self::HeaderFile {
            message: message.into(),
        }
    }

    pub fn out_of_bounds(offset: usize, length: usize, limit: usize) -> Self {
        Self::OutOfBounds {
            offset: offset,
            length: length,
            limit: limit,
        }
    }

    /// Ошибка связана со структурой данных и не исчезнет при повторе
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::EventTooLarge { .. } | Self::SplitFailed { .. })
    }

    /// Ошибка ввода/вывода, операцию можно повторить после проверки блока
    pub fn is_io(&self) -> bool {
        matches!(self, Self::IO { .. } | Self::HeaderFile { .. })
    }
}

#[test]
fn error_classes() {
    let io: BlockErr = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
    assert!(io.is_io());
    assert!(!io.is_structural());

    let too_large = BlockErr::EventTooLarge {
        object_id: ObjectId::new(1),
        event_size: 100,
        block_size: 64,
    };
    assert!(too_large.is_structural());
    assert!(!too_large.is_io());

    let codec: BlockErr = "no data".to_string().into();
    assert!(matches!(codec, BlockErr::Codec { .. }));
}
