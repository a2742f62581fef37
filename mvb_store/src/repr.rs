//! Mutation log ("repr") format
//! 变更日志（repr）格式
//!
//! ```text
//! header: seq u64 LE | count u32 LE                     (12 B)
//! record: kind u8 | len u32 LE | key [| len u32 LE | val]
//! ```
//!
//! Delete kinds and log data carry one field; the rest carry two.
//! 删除类与日志数据只有一个字段；其余有两个。

use zerocopy::{
  FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
  byteorder::little_endian::{U32, U64},
};

use crate::{Error, Result};

pub const HEADER_SIZE: usize = 12;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct Header {
  pub seq: U64,
  pub count: U32,
}

const _: () = assert!(size_of::<Header>() == HEADER_SIZE);

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
  Del = 0,
  Set = 1,
  Merge = 2,
  LogData = 3,
  SingleDel = 7,
  RangeDel = 15,
}

impl Kind {
  #[inline]
  pub const fn from_u8(v: u8) -> Option<Self> {
    Some(match v {
      0 => Self::Del,
      1 => Self::Set,
      2 => Self::Merge,
      3 => Self::LogData,
      7 => Self::SingleDel,
      15 => Self::RangeDel,
      _ => return None,
    })
  }

  #[inline]
  const fn has_val(self) -> bool {
    matches!(self, Self::Set | Self::Merge | Self::RangeDel)
  }
}

/// One record borrowed from a repr
/// 借用自 repr 的单条记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op<'a> {
  Set(&'a [u8], &'a [u8]),
  Del(&'a [u8]),
  SingleDel(&'a [u8]),
  Merge(&'a [u8], &'a [u8]),
  /// `[start, end)`
  RangeDel(&'a [u8], &'a [u8]),
  LogData(&'a [u8]),
}

impl<'a> Op<'a> {
  #[inline]
  pub const fn kind(&self) -> Kind {
    match self {
      Op::Set(..) => Kind::Set,
      Op::Del(_) => Kind::Del,
      Op::SingleDel(_) => Kind::SingleDel,
      Op::Merge(..) => Kind::Merge,
      Op::RangeDel(..) => Kind::RangeDel,
      Op::LogData(_) => Kind::LogData,
    }
  }

  #[inline]
  fn fields(&self) -> (&'a [u8], Option<&'a [u8]>) {
    match *self {
      Op::Set(k, v) | Op::Merge(k, v) | Op::RangeDel(k, v) => (k, Some(v)),
      Op::Del(k) | Op::SingleDel(k) | Op::LogData(k) => (k, None),
    }
  }

  fn from_fields(kind: Kind, a: &'a [u8], b: &'a [u8]) -> Self {
    match kind {
      Kind::Set => Op::Set(a, b),
      Kind::Merge => Op::Merge(a, b),
      Kind::RangeDel => Op::RangeDel(a, b),
      Kind::Del => Op::Del(a),
      Kind::SingleDel => Op::SingleDel(a),
      Kind::LogData => Op::LogData(a),
    }
  }
}

/// Fresh repr holding only a zeroed header
/// 仅含零值头部的新 repr
#[inline]
pub fn empty() -> Vec<u8> {
  Header::default().as_bytes().to_vec()
}

/// Reset `repr` to an empty header, keeping capacity
/// 将 `repr` 重置为空头部，保留容量
#[inline]
pub fn reset(repr: &mut Vec<u8>) {
  repr.clear();
  repr.extend_from_slice(Header::default().as_bytes());
}

#[inline]
fn put_field(repr: &mut Vec<u8>, field: &[u8]) {
  repr.extend_from_slice(U32::new(field.len() as u32).as_bytes());
  repr.extend_from_slice(field);
}

/// Append one record and bump the header count
/// 追加一条记录并递增头部计数
pub fn append(repr: &mut Vec<u8>, op: Op<'_>) {
  debug_assert!(repr.len() >= HEADER_SIZE);
  let (a, b) = op.fields();
  repr.push(op.kind() as u8);
  put_field(repr, a);
  if let Some(b) = b {
    put_field(repr, b);
  }
  let n = count(repr) + 1;
  set_count(repr, n);
}

#[inline]
fn header_mut(repr: &mut [u8]) -> &mut Header {
  // Callers only pass reprs that start with a header
  // 调用方只传入以头部开头的 repr
  Header::mut_from_bytes(&mut repr[..HEADER_SIZE]).unwrap_or_else(|_| unreachable!())
}

#[inline]
pub fn count(repr: &[u8]) -> u32 {
  Header::ref_from_prefix(repr)
    .map(|(h, _)| h.count.get())
    .unwrap_or_default()
}

#[inline]
fn set_count(repr: &mut [u8], n: u32) {
  header_mut(repr).count = U32::new(n);
}

#[inline]
pub fn seq(repr: &[u8]) -> u64 {
  Header::ref_from_prefix(repr)
    .map(|(h, _)| h.seq.get())
    .unwrap_or_default()
}

#[inline]
pub fn set_seq(repr: &mut [u8], seq: u64) {
  header_mut(repr).seq = U64::new(seq);
}

/// Parse header and return the record iterator
/// 解析头部并返回记录迭代器
pub fn parse(repr: &[u8]) -> Result<Ops<'_>> {
  if repr.len() < HEADER_SIZE {
    return Err(Error::CorruptLog("short header"));
  }
  Ok(Ops {
    rest: &repr[HEADER_SIZE..],
    left: count(repr),
  })
}

/// Walk the whole repr once, checking records and count
/// 完整遍历一次 repr，校验记录与计数
pub fn validate(repr: &[u8]) -> Result<u32> {
  let ops = parse(repr)?;
  let n = ops.left;
  for op in ops {
    op?;
  }
  Ok(n)
}

/// Record iterator; stops after the first error
/// 记录迭代器；遇到首个错误后停止
pub struct Ops<'a> {
  rest: &'a [u8],
  left: u32,
}

impl<'a> Ops<'a> {
  fn field(&mut self) -> Result<&'a [u8]> {
    let Some((len, rest)) = self.rest.split_first_chunk::<4>() else {
      return Err(Error::CorruptLog("truncated length"));
    };
    let len = u32::from_le_bytes(*len) as usize;
    if rest.len() < len {
      return Err(Error::CorruptLog("truncated field"));
    }
    let (field, rest) = rest.split_at(len);
    self.rest = rest;
    Ok(field)
  }

  fn read(&mut self) -> Result<Op<'a>> {
    let Some((&kind, rest)) = self.rest.split_first() else {
      return Err(Error::CorruptLog("count exceeds records"));
    };
    let kind = Kind::from_u8(kind).ok_or(Error::CorruptLog("unknown kind"))?;
    self.rest = rest;
    let a = self.field()?;
    let b = if kind.has_val() { self.field()? } else { &[] };
    Ok(Op::from_fields(kind, a, b))
  }
}

impl<'a> Iterator for Ops<'a> {
  type Item = Result<Op<'a>>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.left == 0 {
      if self.rest.is_empty() {
        return None;
      }
      self.rest = &[];
      return Some(Err(Error::CorruptLog("trailing bytes")));
    }
    self.left -= 1;
    let r = self.read();
    if r.is_err() {
      self.left = 0;
      self.rest = &[];
    }
    Some(r)
  }
}
