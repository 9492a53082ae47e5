use std::fmt;

use crate::bbuff::streambuff::{ByteBuff, ByteReader, ByteSlice, ByteWriter};

/// Идентификатор объекта
///
/// Значение 0 зарезервировано - "нет объекта"
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ObjectId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Время события, микросекунды от начала эпохи
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Идентификатор действия
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(u16);

impl ActionId {
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for ActionId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl ByteWriter<ObjectId> for ByteBuff {
    fn write(&mut self, v: ObjectId) {
        self.write(v.0)
    }
}

impl ByteWriter<Timestamp> for ByteBuff {
    fn write(&mut self, v: Timestamp) {
        self.write(v.0)
    }
}

impl ByteWriter<ActionId> for ByteBuff {
    fn write(&mut self, v: ActionId) {
        self.write(v.0)
    }
}

impl ByteReader<ObjectId> for ByteBuff {
    fn read(&mut self, target: &mut ObjectId) -> Result<(), String> {
        self.read(&mut target.0)
    }
}

impl ByteReader<Timestamp> for ByteBuff {
    fn read(&mut self, target: &mut Timestamp) -> Result<(), String> {
        self.read(&mut target.0)
    }
}

impl<'a> ByteReader<ObjectId> for ByteSlice<'a> {
    fn read(&mut self, target: &mut ObjectId) -> Result<(), String> {
        self.read(&mut target.0)
    }
}

impl<'a> ByteReader<Timestamp> for ByteSlice<'a> {
    fn read(&mut self, target: &mut Timestamp) -> Result<(), String> {
        self.read(&mut target.0)
    }
}

impl<'a> ByteReader<ActionId> for ByteSlice<'a> {
    fn read(&mut self, target: &mut ActionId) -> Result<(), String> {
        self.read(&mut target.0)
    }
}
