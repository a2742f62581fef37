//! Versioned (MVCC) key
//! 版本（MVCC）键

use std::cmp::Ordering;

use zerocopy::{FromBytes, IntoBytes};

use crate::{
  Error, Result, Timestamp,
  escape::{escape_to, unescape_to},
  ts::{TS_SUFFIX_SIZE, TsSuffix},
};

/// Namespace tag of versioned keys
/// 版本键命名空间标签
pub const NS_VERSIONED: u8 = b'm';

/// Lowest / past-the-end raw bound of the versioned namespace
/// 版本命名空间的最小 / 越界原始边界
pub const VERSIONED_LOWER: &[u8] = &[NS_VERSIONED];
pub const VERSIONED_UPPER: &[u8] = &[NS_VERSIONED + 1];

/// User key plus optional timestamp
/// 用户键加可选时间戳
///
/// Order: user key ascending, metadata (empty timestamp) first, then
/// timestamp descending.
/// 排序：用户键升序，元数据（空时间戳）在前，然后时间戳降序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionedKey<'a> {
  pub key: &'a [u8],
  pub ts: Timestamp,
}

impl<'a> VersionedKey<'a> {
  #[inline]
  pub const fn new(key: &'a [u8], ts: Timestamp) -> Self {
    Self { key, ts }
  }

  /// Metadata key (no timestamp)
  /// 元数据键（无时间戳）
  #[inline]
  pub const fn meta(key: &'a [u8]) -> Self {
    Self::new(key, Timestamp::EMPTY)
  }

  #[inline]
  pub const fn is_meta(&self) -> bool {
    self.ts.is_empty()
  }

  /// Append encoding to `buf`
  /// 追加编码到 `buf`
  pub fn append_to(&self, buf: &mut Vec<u8>) {
    buf.push(NS_VERSIONED);
    escape_to(buf, self.key);
    if !self.ts.is_empty() {
      buf.extend_from_slice(TsSuffix::new(self.ts).as_bytes());
    }
  }

  /// Encode into `buf`, reusing its capacity
  /// 编码到 `buf`，复用其容量
  #[inline]
  pub fn encode_to(&self, buf: &mut Vec<u8>) {
    buf.clear();
    self.append_to(buf);
  }

  #[inline]
  pub fn encode(&self) -> Vec<u8> {
    let mut buf = Vec::with_capacity(self.key.len() + 3 + TS_SUFFIX_SIZE);
    self.append_to(&mut buf);
    buf
  }
}

impl Ord for VersionedKey<'_> {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .key
      .cmp(other.key)
      .then_with(|| match (self.ts.is_empty(), other.ts.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => other.ts.cmp(&self.ts),
      })
  }
}

impl PartialOrd for VersionedKey<'_> {
  #[inline]
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Decode user key into `key_out`, return timestamp
/// 解码用户键到 `key_out`，返回时间戳
pub fn decode_versioned_to(raw: &[u8], key_out: &mut Vec<u8>) -> Result<Timestamp> {
  match raw.first() {
    Some(&NS_VERSIONED) => {}
    Some(_) => return Err(Error::MalformedKey("not a versioned key")),
    None => return Err(Error::MalformedKey("empty")),
  }
  let n = 1 + unescape_to(&raw[1..], key_out)?;
  let suffix = &raw[n..];
  match suffix.len() {
    0 => Ok(Timestamp::EMPTY),
    TS_SUFFIX_SIZE => {
      let ts = TsSuffix::read_from_bytes(suffix)
        .map_err(|_| Error::MalformedKey("timestamp suffix"))?
        .ts();
      // The empty timestamp is only encoded as "no suffix"
      // 空时间戳只能编码为无后缀
      if ts.is_empty() {
        return Err(Error::MalformedKey("non-canonical timestamp"));
      }
      Ok(ts)
    }
    _ => Err(Error::MalformedKey("timestamp suffix length")),
  }
}

#[inline]
pub fn decode_versioned(raw: &[u8]) -> Result<(Vec<u8>, Timestamp)> {
  let mut key = Vec::new();
  let ts = decode_versioned_to(raw, &mut key)?;
  Ok((key, ts))
}
