//! Hybrid timestamp and its 12-byte key suffix
//! 混合时间戳及其 12 字节键后缀

use std::fmt;

use zerocopy::{
  FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
  byteorder::big_endian::{U32, U64},
};

/// Encoded timestamp suffix length
/// 时间戳后缀编码长度
pub const TS_SUFFIX_SIZE: usize = 12;

/// Wall time plus logical counter; empty means "metadata key"
/// 墙钟时间加逻辑计数；空值表示元数据键
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
  pub wall: u64,
  pub logical: u32,
}

impl Timestamp {
  pub const EMPTY: Self = Self::new(0, 0);
  pub const MAX: Self = Self::new(u64::MAX, u32::MAX);

  #[inline]
  pub const fn new(wall: u64, logical: u32) -> Self {
    Self { wall, logical }
  }

  #[inline]
  pub const fn is_empty(self) -> bool {
    self.wall == 0 && self.logical == 0
  }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:010}", self.wall, self.logical)
  }
}

/// Bitwise-inverted big-endian suffix, newer versions sort first
/// 按位取反的大端后缀，新版本排在前面
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct TsSuffix {
  wall: U64,
  logical: U32,
}

impl TsSuffix {
  #[inline(always)]
  pub fn new(ts: Timestamp) -> Self {
    Self {
      wall: U64::new(!ts.wall),
      logical: U32::new(!ts.logical),
    }
  }

  #[inline(always)]
  pub fn ts(&self) -> Timestamp {
    Timestamp::new(!self.wall.get(), !self.logical.get())
  }
}

const _: () = assert!(size_of::<TsSuffix>() == TS_SUFFIX_SIZE);
