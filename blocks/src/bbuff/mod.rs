/// Потоковое чтение/запись байтов
pub mod streambuff;
