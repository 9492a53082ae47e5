//! Числа в буфере хранятся в little-endian

/// Запись значения с текущей позиции, позиция сдвигается на размер значения
pub trait ByteWriter<V: Sized> {
    fn write(&mut self, v: V);
}

/// Чтение значения с текущей позиции
pub trait ByteReader<V> {
    fn read(&mut self, target: &mut V) -> Result<(), String>;
}

/// Растущий буфер с позицией чтения/записи
#[derive(Debug, Clone, Default)]
pub struct ByteBuff {
    pub buff: Vec<u8>,
    pub position: usize,
}

impl ByteBuff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Буфер под заголовок известного размера
    pub fn with_capacity(capacity: usize) -> Self {
        ByteBuff {
            buff: Vec::with_capacity(capacity),
            position: 0,
        }
    }

    /// Копирует `data` с позиции, при необходимости удлиняя буфер
    pub fn write_byte_arr(&mut self, data: &[u8]) {
        let end = self.position + data.len();
        if end > self.buff.len() {
            self.buff.resize(end, 0);
        }

        self.buff[self.position..end].copy_from_slice(data);
        self.position = end;
    }

    fn take(&mut self, count: usize) -> Result<&[u8], String> {
        let available = self.buff.len().saturating_sub(self.position);
        if available < count {
            return Err(format!("no data: expect {count} bytes, available {available}"));
        }

        let from = self.position;
        self.position += count;
        Ok(&self.buff[from..from + count])
    }
}

/// Чтение из заимствованного массива байт без копирования
///
/// Используется курсором и итератором путей при чтении отображенной памяти
#[derive(Debug, Clone, Copy)]
pub struct ByteSlice<'a> {
    /// Данные
    pub data: &'a [u8],

    /// Позиция чтения
    pub position: usize,
}

impl<'a> ByteSlice<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data: data, position: 0 }
    }

    /// Кол-во доступных для чтения байт
    pub fn available(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], String> {
        let available = self.available();
        if available < count {
            return Err(format!("no data: expect {count} bytes, available {available}"));
        }

        let from = self.position;
        self.position += count;
        Ok(&self.data[from..from + count])
    }
}

impl ByteWriter<&[u8]> for ByteBuff {
    fn write(&mut self, v: &[u8]) {
        self.write_byte_arr(v);
    }
}

macro_rules! write_le {
    ($num:ty) => {
        impl ByteWriter<$num> for ByteBuff {
            fn write(&mut self, v: $num) {
                self.write_byte_arr(&v.to_le_bytes());
            }
        }
    };
}

write_le!(u8);
write_le!(u16);
write_le!(u32);
write_le!(i64);

// ByteReader для числа из $size байт
macro_rules! read_le {
    ($buff:ty, $num:ty, $size:expr) => {
        impl<'a> ByteReader<$num> for $buff {
            fn read(&mut self, target: &mut $num) -> Result<(), String> {
                let bytes = self.take($size)?;
                let mut bb: [u8; $size] = [0; $size];
                bb.copy_from_slice(bytes);
                *target = <$num>::from_le_bytes(bb);
                Ok(())
            }
        }
    };
}

read_le!(ByteBuff, u8, 1);
read_le!(ByteBuff, u16, 2);
read_le!(ByteBuff, u32, 4);
read_le!(ByteBuff, i64, 8);

read_le!(ByteSlice<'a>, u8, 1);
read_le!(ByteSlice<'a>, u16, 2);
read_le!(ByteSlice<'a>, u32, 4);
read_le!(ByteSlice<'a>, i64, 8);

/// Приемник для чтения `expect_size` байт подряд
pub struct ByteArrayRead {
    pub data: Vec<u8>,
    pub expect_size: u32,
}

impl ByteReader<ByteArrayRead> for ByteBuff {
    fn read(&mut self, target: &mut ByteArrayRead) -> Result<(), String> {
        let bytes = self.take(target.expect_size as usize)?;
        target.data.clear();
        target.data.extend_from_slice(bytes);
        Ok(())
    }
}

impl<'a> ByteReader<ByteArrayRead> for ByteSlice<'a> {
    fn read(&mut self, target: &mut ByteArrayRead) -> Result<(), String> {
        let bytes = self.take(target.expect_size as usize)?;
        target.data.clear();
        target.data.extend_from_slice(bytes);
        Ok(())
    }
}

#[test]
fn numbers_in_order() -> Result<(), String> {
    let mut bb = ByteBuff::new();
    bb.write(0xABu8);
    bb.write(0xBEEFu16);
    bb.write(0xDEAD_BEEFu32);
    bb.write(i64::MIN + 1);
    assert_eq!(bb.buff.len(), 15);
    bb.position = 0;

    let (mut b1, mut b2, mut b4, mut b8) = (0u8, 0u16, 0u32, 0i64);
    bb.read(&mut b1)?;
    bb.read(&mut b2)?;
    bb.read(&mut b4)?;
    bb.read(&mut b8)?;
    assert_eq!((b1, b2, b4, b8), (0xAB, 0xBEEF, 0xDEAD_BEEF, i64::MIN + 1));
    assert_eq!(bb.buff[1..3], [0xEF, 0xBE]);
    Ok(())
}

#[test]
fn slice_read_test() {
    let mut bb = ByteBuff::new();
    bb.write(0x0102u16);
    bb.write(&[9u8, 8, 7][..]);

    let mut slice = ByteSlice::new(&bb.buff);
    let mut num: u16 = 0;
    slice.read(&mut num).unwrap();
    assert_eq!(num, 0x0102);
    assert_eq!(slice.available(), 3);

    let mut arr = ByteArrayRead { data: Vec::new(), expect_size: 3 };
    slice.read(&mut arr).unwrap();
    assert_eq!(arr.data, vec![9u8, 8, 7]);

    let mut tail: u8 = 0;
    assert!(slice.read(&mut tail).is_err());
}

#[test]
fn overwrite_keeps_length() {
    let mut bb = ByteBuff::new();
    bb.write(1u32);
    bb.write(2u32);
    bb.position = 0;
    bb.write(7u32);
    assert_eq!(bb.buff.len(), 8);
    assert_eq!(&bb.buff[0..4], &7u32.to_le_bytes());
}
