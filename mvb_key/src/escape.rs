//! User key escaping
//! 用户键转义

use memchr::memchr;

use crate::{Error, Result};

/// Byte written after a literal zero
/// 字面量 0 之后写入的转义字节
const ESC: u8 = 0xff;

/// Terminator after the escaped user key, sorts below every escaped byte pair
/// 转义用户键之后的结束符，排序低于任何转义字节对
pub const TERM: [u8; 2] = [0x00, 0x01];

/// Append escaped bytes without terminator
/// 追加转义字节（不含结束符）
#[inline]
pub(crate) fn escape_body(buf: &mut Vec<u8>, key: &[u8]) {
  let mut rest = key;
  while let Some(i) = memchr(0, rest) {
    buf.extend_from_slice(&rest[..=i]);
    buf.push(ESC);
    rest = &rest[i + 1..];
  }
  buf.extend_from_slice(rest);
}

/// Append escaped key and terminator
/// 追加转义后的键与结束符
#[inline]
pub(crate) fn escape_to(buf: &mut Vec<u8>, key: &[u8]) {
  buf.reserve(key.len() + TERM.len());
  escape_body(buf, key);
  buf.extend_from_slice(&TERM);
}

/// Unescape into `out`, return consumed length including terminator
/// 反转义到 `out`，返回含结束符的消耗长度
pub(crate) fn unescape_to(raw: &[u8], out: &mut Vec<u8>) -> Result<usize> {
  out.clear();
  let mut pos = 0;
  loop {
    let Some(i) = memchr(0, &raw[pos..]) else {
      return Err(Error::MalformedKey("missing terminator"));
    };
    let at = pos + i;
    out.extend_from_slice(&raw[pos..at]);
    match raw.get(at + 1) {
      Some(&ESC) => {
        out.push(0);
        pos = at + 2;
      }
      Some(&b) if b == TERM[1] => return Ok(at + 2),
      Some(_) => return Err(Error::MalformedKey("invalid escape")),
      None => return Err(Error::MalformedKey("truncated terminator")),
    }
  }
}
