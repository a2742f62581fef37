//! Engine key: user key plus opaque version
//! 引擎键：用户键加不透明版本
//!
//! Keys order by user key, the bare key first. Versions of one user key
//! order bytewise only among versions of equal length.
//! 键按用户键排序，无版本键在前。同一用户键的版本仅在长度相同时按字节排序。

use crate::{
  Error, Result,
  escape::{escape_to, unescape_to},
};

/// Namespace tag of engine keys
/// 引擎键命名空间标签
pub const NS_ENGINE: u8 = b'e';

pub const ENGINE_LOWER: &[u8] = &[NS_ENGINE];
pub const ENGINE_UPPER: &[u8] = &[NS_ENGINE + 1];

/// Version length must fit the trailing length byte
/// 版本长度必须能放入末尾的长度字节
pub const MAX_VERSION_LEN: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineKey<'a> {
  pub key: &'a [u8],
  pub version: &'a [u8],
}

impl<'a> EngineKey<'a> {
  #[inline]
  pub const fn new(key: &'a [u8], version: &'a [u8]) -> Self {
    Self { key, version }
  }

  /// Version must fit the trailing length byte
  /// 版本须能放入末尾的长度字节
  #[inline]
  pub fn check(&self) -> Result<()> {
    if self.version.len() > MAX_VERSION_LEN {
      return Err(Error::MalformedKey("version length"));
    }
    Ok(())
  }

  /// Append encoding to `buf`. Panics when `check` fails.
  /// 追加编码到 `buf`。`check` 失败时 panic。
  pub fn append_to(&self, buf: &mut Vec<u8>) {
    assert!(
      self.version.len() <= MAX_VERSION_LEN,
      "engine key version longer than {MAX_VERSION_LEN}"
    );
    buf.push(NS_ENGINE);
    escape_to(buf, self.key);
    if !self.version.is_empty() {
      buf.extend_from_slice(self.version);
      buf.push(self.version.len() as u8);
    }
  }

  #[inline]
  pub fn encode_to(&self, buf: &mut Vec<u8>) {
    buf.clear();
    self.append_to(buf);
  }

  #[inline]
  pub fn encode(&self) -> Vec<u8> {
    let mut buf = Vec::with_capacity(self.key.len() + self.version.len() + 4);
    self.append_to(&mut buf);
    buf
  }
}

/// Decode user key into `key_out`, return version borrowed from `raw`
/// 解码用户键到 `key_out`，返回借用自 `raw` 的版本
pub fn decode_engine_to<'r>(raw: &'r [u8], key_out: &mut Vec<u8>) -> Result<&'r [u8]> {
  match raw.first() {
    Some(&NS_ENGINE) => {}
    Some(_) => return Err(Error::MalformedKey("not an engine key")),
    None => return Err(Error::MalformedKey("empty")),
  }
  let n = 1 + unescape_to(&raw[1..], key_out)?;
  let rest = &raw[n..];
  let Some((&len, version)) = rest.split_last() else {
    return Ok(&[]);
  };
  if version.is_empty() || len as usize != version.len() {
    return Err(Error::MalformedKey("version length"));
  }
  Ok(version)
}

#[inline]
pub fn decode_engine(raw: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
  let mut key = Vec::new();
  let version = decode_engine_to(raw, &mut key)?.to_vec();
  Ok((key, version))
}
