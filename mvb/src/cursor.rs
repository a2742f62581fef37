//! Re-seeking cursor over a reader
//! 基于读取源重定位的游标
//!
//! A cursor holds no lock between calls. Every step seeks the reader past
//! the current raw key, copying the entry into buffers the cursor owns.
//! Those buffers survive `release` so a pooled cursor rebinds without
//! allocating.
//! 游标在调用之间不持锁。每一步都从当前原始键之后重新定位，并把条目复制到
//! 游标自有缓冲中。缓冲在 `release` 后保留，池化游标重新绑定时无需分配。

use std::{
  mem,
  ops::Bound::{self, Excluded, Included},
  sync::Arc,
};

use log::trace;
use mvb_key::{
  ENGINE_LOWER, ENGINE_UPPER, EngineKey, LOCK_TABLE_LOWER, LOCK_TABLE_UPPER, TS_SUFFIX_SIZE,
  Timestamp, VERSIONED_LOWER, VERSIONED_UPPER, VersionedKey, decode_engine_to,
  decode_versioned_to, lock_prefix_to,
};
use mvb_store::{Db, WriteBuf};
use parking_lot::Mutex;

use crate::{IterOptions, Result, usage::violation};

/// What a read sees: buffer layered over store, or the store alone
/// 读取所见：缓冲叠加存储，或仅存储
#[derive(Debug, Clone)]
pub(crate) enum Source {
  Buf {
    buf: Arc<Mutex<WriteBuf>>,
    db: Arc<Db>,
  },
  Db(Arc<Db>),
}

impl Source {
  /// Copy of the value at `raw`
  /// `raw` 处值的副本
  pub fn get(&self, raw: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(match self {
      Source::Buf { buf, db } => buf.lock().get(db, raw)?,
      Source::Db(db) => db.get(raw),
    })
  }

  pub fn seek(
    &self,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    key: &mut Vec<u8>,
    val: &mut Vec<u8>,
  ) -> Result<bool> {
    Ok(match self {
      Source::Buf { buf, db } => buf.lock().seek(db, lower, upper, key, val)?,
      Source::Db(db) => db.seek(lower, upper, key, val),
    })
  }
}

/// Key namespace a cursor walks
/// 游标遍历的键命名空间
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Ns {
  #[default]
  Versioned,
  Engine,
  /// Engine keys of the lock table; user key keeps the table prefix
  /// 锁表中的引擎键；用户键保留表前缀
  Lock,
}

impl Ns {
  fn bounds(self) -> (&'static [u8], &'static [u8]) {
    match self {
      Ns::Versioned => (VERSIONED_LOWER, VERSIONED_UPPER),
      Ns::Engine => (ENGINE_LOWER, ENGINE_UPPER),
      Ns::Lock => (LOCK_TABLE_LOWER, LOCK_TABLE_UPPER),
    }
  }

  /// Raw key before every entry of user key `key`
  /// 用户键 `key` 所有条目之前的原始键
  fn encode_bound(self, key: &[u8], buf: &mut Vec<u8>) {
    match self {
      Ns::Versioned => VersionedKey::meta(key).encode_to(buf),
      Ns::Engine => EngineKey::new(key, &[]).encode_to(buf),
      Ns::Lock => lock_prefix_to(buf, key),
    }
  }
}

/// Timestamp window of a hinted cursor, inclusive on both ends
/// 带提示游标的时间戳窗口，两端闭区间
pub(crate) type Window = (Timestamp, Timestamp);

#[derive(Debug, Default)]
pub(crate) struct Cursor {
  ns: Ns,
  source: Option<Source>,
  prefix_mode: bool,
  window: Option<Window>,
  lower: Vec<u8>,
  upper: Vec<u8>,
  prefix: Vec<u8>,
  /// Seek target, then the previous position while stepping
  /// 定位目标；步进时为上一位置
  target: Vec<u8>,
  key: Vec<u8>,
  val: Vec<u8>,
  ukey: Vec<u8>,
  ts: Timestamp,
  /// Offset of the engine version inside `key`
  /// 引擎版本在 `key` 中的偏移
  ver: usize,
  valid: bool,
  binds: u64,
}

impl Cursor {
  /// Bind to a reader; option bounds are user keys, absent means the
  /// namespace edge
  /// 绑定到读取源；选项中的边界为用户键，缺省为命名空间边界
  pub fn bind(&mut self, ns: Ns, source: Source, opts: &IterOptions<'_>) {
    self.ns = ns;
    let (ns_lower, ns_upper) = ns.bounds();
    match opts.lower {
      Some(k) => ns.encode_bound(k, &mut self.lower),
      None => {
        self.lower.clear();
        self.lower.extend_from_slice(ns_lower);
      }
    }
    match opts.upper {
      Some(k) => ns.encode_bound(k, &mut self.upper),
      None => {
        self.upper.clear();
        self.upper.extend_from_slice(ns_upper);
      }
    }
    trace!(
      "cursor bind: ns={ns:?} prefix={} rebind={}",
      opts.prefix,
      self.binds > 0
    );
    self.binds += 1;
    self.source = Some(source);
    self.prefix_mode = opts.prefix;
    self.window = opts.window();
    self.valid = false;
  }

  /// Drop the reader, keep buffer capacity
  /// 释放读取源，保留缓冲容量
  pub fn release(&mut self) {
    self.source = None;
    self.window = None;
    self.valid = false;
    for buf in [
      &mut self.lower,
      &mut self.upper,
      &mut self.prefix,
      &mut self.target,
      &mut self.key,
      &mut self.val,
      &mut self.ukey,
    ] {
      buf.clear();
    }
  }

  #[inline]
  pub fn valid(&self) -> bool {
    self.valid
  }

  #[inline]
  pub fn raw_key(&self) -> &[u8] {
    &self.key
  }

  #[inline]
  pub fn value(&self) -> &[u8] {
    &self.val
  }

  /// Decoded user key of the current entry
  /// 当前条目解码后的用户键
  #[inline]
  pub fn user_key(&self) -> &[u8] {
    &self.ukey
  }

  #[inline]
  pub fn versioned_key(&self) -> VersionedKey<'_> {
    VersionedKey::new(&self.ukey, self.ts)
  }

  pub fn engine_key(&self) -> EngineKey<'_> {
    let n = self.key.len();
    let end = if self.ver == n { n } else { n - 1 };
    EngineKey::new(&self.ukey, &self.key[self.ver..end])
  }

  /// Address of the lower bound buffer, stable across rebinds
  /// 下界缓冲地址，重新绑定后保持不变
  #[inline]
  pub fn buf_addr(&self) -> usize {
    self.lower.as_ptr() as usize
  }

  pub fn set_upper_bound(&mut self, key: &[u8]) {
    self.ns.encode_bound(key, &mut self.upper);
    self.valid = false;
  }

  pub fn seek_versioned(&mut self, key: VersionedKey<'_>) -> Result<()> {
    key.encode_to(&mut self.target);
    let suffix = if key.is_meta() { 0 } else { TS_SUFFIX_SIZE };
    self.seek_target(self.target.len() - suffix)
  }

  pub fn seek_engine(&mut self, key: EngineKey<'_>) -> Result<()> {
    key.check()?;
    key.encode_to(&mut self.target);
    let suffix = match key.version.len() {
      0 => 0,
      n => n + 1,
    };
    self.seek_target(self.target.len() - suffix)
  }

  /// First lock entry of a user key `>= key`; in prefix mode only entries of `key`
  /// 用户键 `>= key` 的首个锁条目；前缀模式下仅 `key` 的条目
  pub fn seek_lock(&mut self, key: &[u8]) -> Result<()> {
    lock_prefix_to(&mut self.target, key);
    self.seek_target(self.target.len())
  }

  pub fn next(&mut self) -> Result<()> {
    if !self.valid {
      return Ok(());
    }
    mem::swap(&mut self.key, &mut self.target);
    self.fetch(true)
  }

  fn seek_target(&mut self, prefix_len: usize) -> Result<()> {
    if self.prefix_mode {
      self.prefix.clear();
      self.prefix.extend_from_slice(&self.target[..prefix_len]);
    }
    if self.target < self.lower {
      self.target.clear();
      self.target.extend_from_slice(&self.lower);
    }
    self.fetch(false)
  }

  fn fetch(&mut self, mut after: bool) -> Result<()> {
    loop {
      let Some(source) = &self.source else {
        violation("iterator used after release")
      };
      let lower = if after {
        Excluded(&self.target[..])
      } else {
        Included(&self.target[..])
      };
      self.valid = source.seek(lower, Excluded(&self.upper[..]), &mut self.key, &mut self.val)?;
      if self.valid && self.prefix_mode && !self.key.starts_with(&self.prefix) {
        self.valid = false;
      }
      if !self.valid || self.decode()? {
        return Ok(());
      }
      mem::swap(&mut self.key, &mut self.target);
      after = true;
    }
  }

  /// Decode the current raw key, false when the timestamp window hides it
  /// 解码当前原始键，被时间戳窗口隐藏时返回 false
  fn decode(&mut self) -> Result<bool> {
    match self.ns {
      Ns::Versioned => {
        self.ts = decode_versioned_to(&self.key, &mut self.ukey)?;
        Ok(match self.window {
          Some((min, max)) if !self.ts.is_empty() => self.ts >= min && self.ts <= max,
          _ => true,
        })
      }
      Ns::Engine | Ns::Lock => {
        let n = decode_engine_to(&self.key, &mut self.ukey)?.len();
        self.ver = self.key.len() - n - usize::from(n != 0);
        Ok(true)
      }
    }
  }
}
