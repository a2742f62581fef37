//! Reads shared by batches and the engine
//! 批次与引擎共用的读取

use std::ops::{
  Bound::{Excluded, Included},
  ControlFlow,
};

use mvb_key::{LOCK_TABLE_UPPER, VersionedKey, lock_prefix_to};

use crate::{Error, MvccIterator, Result, cursor::Source};

/// Point read; with `intents` a metadata key also consults the lock table
/// 点查；`intents` 为真时元数据键同时查询锁表
pub(crate) fn get(
  source: &Source,
  intents: bool,
  key: VersionedKey<'_>,
  scratch: &mut Vec<u8>,
) -> Result<Option<Vec<u8>>> {
  if key.key.is_empty() {
    return Err(Error::EmptyKey);
  }
  key.encode_to(scratch);
  let mut val = source.get(scratch)?;
  if intents && key.is_meta() {
    val = match (val, lock_value(source, key.key, scratch)?) {
      (Some(_), Some(_)) => return Err(Error::DuplicateIntent(key.key.into())),
      (v, None) | (None, v) => v,
    };
  }
  // Empty value reads as absent
  // 空值视为不存在
  Ok(val.filter(|v| !v.is_empty()))
}

/// Value of the first lock table entry of `key`
/// `key` 首个锁表条目的值
fn lock_value(source: &Source, key: &[u8], scratch: &mut Vec<u8>) -> Result<Option<Vec<u8>>> {
  lock_prefix_to(scratch, key);
  let (mut raw, mut val) = (Vec::new(), Vec::new());
  let prefix = &scratch[..];
  let found = source.seek(Included(prefix), Excluded(LOCK_TABLE_UPPER), &mut raw, &mut val)?;
  Ok((found && raw.starts_with(prefix)).then_some(val))
}

/// Feed `[start, ..)` of a bounded iterator to `visit` until it breaks
/// 将有界迭代器从 `start` 起的条目交给 `visit`，直到其中断
pub(crate) fn scan<F>(it: &mut dyn MvccIterator, start: &[u8], mut visit: F) -> Result<()>
where
  F: FnMut(VersionedKey<'_>, &[u8]) -> Result<ControlFlow<()>>,
{
  it.seek_ge(VersionedKey::meta(start))?;
  while it.valid() {
    if visit(it.key(), it.value())?.is_break() {
      break;
    }
    it.next()?;
  }
  Ok(())
}
