//! Lock table keys for separated intents
//! 分离式意向锁的锁表键
//!
//! A lock table entry is an engine key whose user key is
//! `LOCK_TABLE_PREFIX ++ key` and whose version is `[strength][txn id]`.
//! 锁表条目是引擎键：用户键为 `LOCK_TABLE_PREFIX ++ key`，版本为 `[强度][事务 ID]`。

use std::fmt;

use crate::{
  Error, NS_ENGINE, Result, decode_engine_to,
  escape::{escape_body, escape_to},
};

pub const LOCK_TABLE_PREFIX: &[u8] = b"\x01zk";

/// Raw bounds of the whole lock table; the prefix has no zero byte so it
/// encodes verbatim
/// 整个锁表的原始边界；前缀不含 0 字节，编码后原样保留
pub const LOCK_TABLE_LOWER: &[u8] = b"e\x01zk";
pub const LOCK_TABLE_UPPER: &[u8] = b"e\x01zl";

const _: () = assert!(LOCK_TABLE_LOWER[0] == NS_ENGINE);

/// Strength byte + 16-byte txn id
/// 强度字节 + 16 字节事务 ID
pub const LOCK_VERSION_LEN: usize = 17;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strength {
  Shared = 1,
  Exclusive = 3,
}

impl Strength {
  #[inline]
  pub const fn from_u8(v: u8) -> Option<Self> {
    match v {
      1 => Some(Self::Shared),
      3 => Some(Self::Exclusive),
      _ => None,
    }
  }
}

/// Transaction id
/// 事务 ID
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxnId(pub [u8; 16]);

impl TxnId {
  #[inline]
  pub const fn from_u128(v: u128) -> Self {
    Self(v.to_be_bytes())
  }

  #[inline]
  pub const fn as_bytes(&self) -> &[u8; 16] {
    &self.0
  }
}

impl fmt::Display for TxnId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for b in &self.0 {
      write!(f, "{b:02x}")?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTableKey<'a> {
  pub key: &'a [u8],
  pub strength: Strength,
  pub txn: TxnId,
}

impl<'a> LockTableKey<'a> {
  #[inline]
  pub const fn exclusive(key: &'a [u8], txn: TxnId) -> Self {
    Self {
      key,
      strength: Strength::Exclusive,
      txn,
    }
  }

  /// Encode as physical engine key into `buf`
  /// 编码为物理引擎键写入 `buf`
  pub fn encode_to(&self, buf: &mut Vec<u8>) {
    lock_prefix_to(buf, self.key);
    buf.push(self.strength as u8);
    buf.extend_from_slice(&self.txn.0);
    buf.push(LOCK_VERSION_LEN as u8);
  }

  /// Decode a physical lock table key; user key goes to `key_out`
  /// 解码物理锁表键；用户键写入 `key_out`
  pub fn decode_to(raw: &[u8], key_out: &mut Vec<u8>) -> Result<(Strength, TxnId)> {
    let version = decode_engine_to(raw, key_out)?;
    if !key_out.starts_with(LOCK_TABLE_PREFIX) {
      return Err(Error::MalformedKey("not a lock table key"));
    }
    key_out.drain(..LOCK_TABLE_PREFIX.len());
    let [strength, txn @ ..] = version else {
      return Err(Error::MalformedKey("lock version length"));
    };
    let (Some(strength), Ok(txn)) = (Strength::from_u8(*strength), <[u8; 16]>::try_from(txn))
    else {
      return Err(Error::MalformedKey("lock version"));
    };
    Ok((strength, TxnId(txn)))
  }
}

/// Encoded prefix shared by every lock table entry of `key`; also the lower
/// bound of lock entries for user keys `>= key`
/// `key` 所有锁表条目共享的编码前缀；同时是用户键 `>= key` 的锁条目下界
pub fn lock_prefix_to(buf: &mut Vec<u8>, key: &[u8]) {
  buf.clear();
  buf.push(NS_ENGINE);
  escape_body(buf, LOCK_TABLE_PREFIX);
  escape_to(buf, key);
}
