use blocks::block::BlockErr;

#[derive(Debug, Clone)]
pub enum ToolErr {
    Block(BlockErr),
    IOError {
        message: String,
        os_error: Option<i32>,
    },
    /// Не верные аргументы коммандной строки
    Args(String),
    /// В каталоге нет файлов таблицы
    TableNotFound(String),
    FileSizeToBig,
}

impl From<BlockErr> for ToolErr {
    fn from(value: BlockErr) -> Self {
        Self::Block(value.clone())
    }
}

impl From<std::io::Error> for ToolErr {
    fn from(value: std::io::Error) -> Self {
        Self::IOError {
            message: value.to_string(),
            os_error: value.raw_os_error(),
        }
    }
}

impl ToolErr {
    pub fn args<A: Into<String>>(message: A) -> Self {
        Self::Args(message.into())
    }
}
