//! Versioned iteration with separated intents merged in
//! 合入分离意向的版本迭代
//!
//! A lock table entry surfaces at the metadata position of its user key, so
//! callers see one stream whatever the intent encoding. Both encodings at the
//! same user key is corruption and surfaces as `DuplicateIntent`.
//! 锁表条目出现在其用户键的元数据位置，调用方无论意向编码都只看到一条流。
//! 同一用户键同时存在两种编码属于数据损坏，报告为 `DuplicateIntent`。

use std::{cmp::Ordering, ops::DerefMut};

use mvb_key::{LOCK_TABLE_PREFIX, VersionedKey};

use crate::{Error, MvccIterator, Result, cursor::Cursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cur {
  None,
  Mvcc,
  Lock,
}

#[derive(Debug)]
pub(crate) struct IntentIter<C> {
  mvcc: C,
  locks: C,
  cur: Cur,
}

impl<C: DerefMut<Target = Cursor>> IntentIter<C> {
  pub fn new(mvcc: C, locks: C) -> Self {
    Self {
      mvcc,
      locks,
      cur: Cur::None,
    }
  }

  #[inline]
  pub fn buf_addr(&self) -> usize {
    self.mvcc.buf_addr()
  }

  #[inline]
  fn lock_user_key(&self) -> &[u8] {
    self
      .locks
      .user_key()
      .strip_prefix(LOCK_TABLE_PREFIX)
      .unwrap_or_default()
  }

  fn settle(&mut self) -> Result<()> {
    self.cur = match (self.mvcc.valid(), self.locks.valid()) {
      (false, false) => Cur::None,
      (true, false) => Cur::Mvcc,
      (false, true) => Cur::Lock,
      (true, true) => {
        let mvcc = self.mvcc.versioned_key();
        match VersionedKey::meta(self.lock_user_key()).cmp(&mvcc) {
          Ordering::Less => Cur::Lock,
          Ordering::Greater => Cur::Mvcc,
          Ordering::Equal => {
            self.cur = Cur::None;
            return Err(Error::DuplicateIntent(mvcc.key.into()));
          }
        }
      }
    };
    Ok(())
  }
}

impl<C: DerefMut<Target = Cursor>> MvccIterator for IntentIter<C> {
  fn seek_ge(&mut self, key: VersionedKey<'_>) -> Result<()> {
    self.mvcc.seek_versioned(key)?;
    self.locks.seek_lock(key.key)?;
    // Lock entry sits at the metadata position, already passed
    // 锁条目位于元数据位置，已越过
    if !key.is_meta() {
      while self.locks.valid() && self.lock_user_key() == key.key {
        self.locks.next()?;
      }
    }
    self.settle()
  }

  #[inline]
  fn valid(&self) -> bool {
    self.cur != Cur::None
  }

  fn next(&mut self) -> Result<()> {
    match self.cur {
      Cur::Mvcc => self.mvcc.next()?,
      Cur::Lock => self.locks.next()?,
      Cur::None => return Ok(()),
    }
    self.settle()
  }

  fn key(&self) -> VersionedKey<'_> {
    match self.cur {
      Cur::Lock => VersionedKey::meta(self.lock_user_key()),
      _ => self.mvcc.versioned_key(),
    }
  }

  fn value(&self) -> &[u8] {
    match self.cur {
      Cur::Lock => self.locks.value(),
      _ => self.mvcc.value(),
    }
  }

  fn raw_key(&self) -> &[u8] {
    match self.cur {
      Cur::Lock => self.locks.raw_key(),
      _ => self.mvcc.raw_key(),
    }
  }

  fn set_upper_bound(&mut self, key: &[u8]) {
    self.mvcc.set_upper_bound(key);
    self.locks.set_upper_bound(key);
    self.cur = Cur::None;
  }
}
