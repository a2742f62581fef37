//! Batch write operations
//! 批次写操作

use log::debug;
use mvb_key::{EngineKey, Timestamp, TxnId, VersionedKey};
use mvb_store::WriteBuf;

use super::Batch;
use crate::{
  Error, MvccIterator, PrecedingIntentState, Result, intent::Demux, pool::Scratch,
  usage::violation,
};

/// Logical operation kinds observed by change feeds; recorded as no-ops
/// 变更订阅关注的逻辑操作种类；记录为空操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
  WriteValue,
  WriteIntent,
  UpdateIntent,
  CommitIntent,
  AbortIntent,
}

impl Batch {
  /// Run `f` on the locked buffer of an active batch; buffer misuse panics
  /// 在活动批次的已锁缓冲上执行 `f`；缓冲误用直接 panic
  #[track_caller]
  fn stage<F>(&mut self, f: F) -> Result<()>
  where
    F: FnOnce(&mut WriteBuf, &mut Scratch, Option<Demux>) -> Result<()>,
  {
    let state = self.active();
    let Some(buf) = &state.buf else {
      violation("batch has no buffer")
    };
    let mut buf = buf.lock();
    if buf.is_closed() {
      violation("parent batch closed")
    }
    match f(&mut *buf, &mut state.scratch, state.demux) {
      Err(Error::Store(mvb_store::Error::Committed)) => violation("write after commit"),
      r => r,
    }
  }

  /// `stage` for an operation keyed by `key`
  /// 针对 `key` 的 `stage`
  #[track_caller]
  fn stage_key<F>(&mut self, key: &[u8], f: F) -> Result<()>
  where
    F: FnOnce(&mut WriteBuf, &mut Scratch, Option<Demux>) -> Result<()>,
  {
    self.active();
    if key.is_empty() {
      return Err(Error::EmptyKey);
    }
    self.stage(f)
  }

  #[track_caller]
  fn stage_range<F>(&mut self, start: &[u8], end: &[u8], f: F) -> Result<()>
  where
    F: FnOnce(&mut WriteBuf, &mut Scratch, Option<Demux>) -> Result<()>,
  {
    self.active();
    if start.is_empty() || end.is_empty() {
      return Err(Error::EmptyKey);
    }
    self.stage(f)
  }

  /// Stage a timestamped value
  /// 暂存带时间戳的值
  pub fn put_mvcc(&mut self, key: VersionedKey<'_>, val: &[u8]) -> Result<()> {
    if key.is_meta() {
      violation("put_mvcc without a timestamp")
    }
    self.stage_key(key.key, |buf, s, _| {
      key.encode_to(&mut s.key);
      Ok(buf.set(&s.key, val)?)
    })
  }

  /// Stage a metadata value
  /// 暂存元数据值
  pub fn put_unversioned(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
    self.stage_key(key, |buf, s, _| {
      VersionedKey::meta(key).encode_to(&mut s.key);
      Ok(buf.set(&s.key, val)?)
    })
  }

  pub fn put_engine_key(&mut self, key: EngineKey<'_>, val: &[u8]) -> Result<()> {
    self.stage_key(key.key, |buf, s, _| {
      key.check()?;
      key.encode_to(&mut s.key);
      Ok(buf.set(&s.key, val)?)
    })
  }

  /// Stage an intent in the configured encoding, moving it out of the other
  /// one when `state` says it lives there
  /// 以配置的编码暂存意向；若 `state` 表明其位于另一种编码则先迁出
  pub fn put_intent(
    &mut self,
    key: &[u8],
    val: &[u8],
    state: PrecedingIntentState,
    txn_did_not_update_meta: bool,
    txn: TxnId,
  ) -> Result<()> {
    self.stage_key(key, |buf, s, demux| match demux {
      Some(d) => d.put_intent(buf, &mut s.key, key, val, state, txn_did_not_update_meta, txn),
      None => {
        VersionedKey::meta(key).encode_to(&mut s.key);
        Ok(buf.set(&s.key, val)?)
      }
    })
  }

  pub fn clear_mvcc(&mut self, key: VersionedKey<'_>) -> Result<()> {
    if key.is_meta() {
      violation("clear_mvcc without a timestamp")
    }
    self.stage_key(key.key, |buf, s, _| {
      key.encode_to(&mut s.key);
      Ok(buf.del(&s.key)?)
    })
  }

  pub fn clear_unversioned(&mut self, key: &[u8]) -> Result<()> {
    self.stage_key(key, |buf, s, _| {
      VersionedKey::meta(key).encode_to(&mut s.key);
      Ok(buf.del(&s.key)?)
    })
  }

  pub fn clear_engine_key(&mut self, key: EngineKey<'_>) -> Result<()> {
    self.stage_key(key.key, |buf, s, _| {
      key.check()?;
      key.encode_to(&mut s.key);
      Ok(buf.del(&s.key)?)
    })
  }

  /// Delete at most one physical entry; only valid when the key was written
  /// once since its last delete
  /// 最多删除一个物理条目；仅当该键自上次删除后只写过一次时有效
  pub fn single_clear_engine_key(&mut self, key: EngineKey<'_>) -> Result<()> {
    self.stage_key(key.key, |buf, s, _| {
      key.check()?;
      key.encode_to(&mut s.key);
      Ok(buf.single_del(&s.key)?)
    })
  }

  /// Clear the intent wherever `state` says it lives; `Absent` is an error
  /// under a demultiplexer
  /// 按 `state` 所示位置清除意向；有分流器时 `Absent` 为错误
  pub fn clear_intent(
    &mut self,
    key: &[u8],
    state: PrecedingIntentState,
    txn_did_not_update_meta: bool,
    txn: TxnId,
  ) -> Result<()> {
    self.stage_key(key, |buf, s, demux| match demux {
      Some(d) => d.clear_intent(buf, &mut s.key, key, state, txn_did_not_update_meta, txn),
      None => {
        VersionedKey::meta(key).encode_to(&mut s.key);
        Ok(buf.del(&s.key)?)
      }
    })
  }

  /// Range delete of every version of user keys in `[start, end)`
  /// 范围删除用户键在 `[start, end)` 内的全部版本
  pub fn clear_raw_range(&mut self, start: &[u8], end: &[u8]) -> Result<()> {
    self.stage_range(start, end, |buf, s, _| {
      VersionedKey::meta(start).encode_to(&mut s.key);
      VersionedKey::meta(end).encode_to(&mut s.end);
      Ok(buf.del_range(&s.key, &s.end)?)
    })
  }

  /// Range delete between two versioned keys
  /// 在两个版本键之间范围删除
  pub fn clear_mvcc_range(&mut self, start: VersionedKey<'_>, end: VersionedKey<'_>) -> Result<()> {
    self.stage_range(start.key, end.key, |buf, s, _| {
      start.encode_to(&mut s.key);
      end.encode_to(&mut s.end);
      Ok(buf.del_range(&s.key, &s.end)?)
    })
  }

  /// `clear_raw_range` plus separated intents of the same user keys
  /// `clear_raw_range` 并清除相同用户键的分离意向
  pub fn clear_mvcc_range_and_intents(&mut self, start: &[u8], end: &[u8]) -> Result<()> {
    self.stage_range(start, end, |buf, s, demux| {
      VersionedKey::meta(start).encode_to(&mut s.key);
      VersionedKey::meta(end).encode_to(&mut s.end);
      buf.del_range(&s.key, &s.end)?;
      match demux {
        Some(d) => d.clear_range(buf, &mut s.key, &mut s.end, start, end),
        None => Ok(()),
      }
    })
  }

  /// Point-delete every physical key `iter` yields in `[start, end)`. For
  /// keyspaces where a range tombstone is unsafe; cost grows with the entry
  /// count. `iter` must read from an independent reader such as
  /// `Engine::new_mvcc_iter`.
  /// 逐点删除 `iter` 在 `[start, end)` 内产出的每个物理键。用于范围墓碑不安全的
  /// 键空间；代价随条目数增长。`iter` 须来自独立读取源，如 `Engine::new_mvcc_iter`。
  pub fn clear_iter_range(
    &mut self,
    iter: &mut dyn MvccIterator,
    start: &[u8],
    end: &[u8],
  ) -> Result<()> {
    self.active();
    if start.is_empty() || end.is_empty() {
      return Err(Error::EmptyKey);
    }
    iter.set_upper_bound(end);
    iter.seek_ge(VersionedKey::meta(start))?;
    let mut n = 0u64;
    while iter.valid() {
      let raw = iter.raw_key();
      self.stage(|buf, _, _| Ok(buf.del(raw)?))?;
      n += 1;
      iter.next()?;
    }
    debug!("clear_iter_range: {n} keys");
    Ok(())
  }

  /// Stage a merge operand
  /// 暂存合并操作数
  pub fn merge(&mut self, key: VersionedKey<'_>, val: &[u8]) -> Result<()> {
    self.stage_key(key.key, |buf, s, _| {
      key.encode_to(&mut s.key);
      Ok(buf.merge(&s.key, val)?)
    })
  }

  /// Append every record of a mutation log from `repr`; only the log
  /// structure is checked
  /// 追加 `repr` 变更日志的全部记录；只校验日志结构
  pub fn apply_repr(&mut self, repr: &[u8]) -> Result<()> {
    self.stage(|buf, _, _| Ok(buf.apply_repr(repr)?))
  }

  /// Out-of-band log record with no keyspace effect
  /// 无键空间影响的带外日志记录
  pub fn log_data(&mut self, data: &[u8]) -> Result<()> {
    self.stage(|buf, _, _| Ok(buf.log_data(data)?))
  }

  /// Logical ops are not tracked in memory
  /// 内存中不跟踪逻辑操作
  #[inline]
  pub fn log_logical_op(&mut self, _op: LogicalOp, _key: &[u8], _ts: Timestamp) {}
}
