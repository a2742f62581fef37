//! Batch read operations
//! 批次读操作

use std::ops::ControlFlow;

use bitcode::DecodeOwned;
use mvb_key::VersionedKey;

use super::Batch;
use crate::{EngineIter, Error, IterKind, IterOptions, MvccIter, Result, read};

/// Decoded value plus the byte sizes read
/// 解码后的值及读取的字节数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetProto<M> {
  /// `None` when the key is absent
  /// 键不存在时为 `None`
  pub msg: Option<M>,
  pub key_bytes: usize,
  pub val_bytes: usize,
}

impl Batch {
  /// Copy of the value at `key` in buffer-over-store state; absent is `Ok(None)`
  /// 缓冲叠加存储状态下 `key` 处值的副本；不存在返回 `Ok(None)`
  pub fn get(&mut self, key: VersionedKey<'_>) -> Result<Option<Vec<u8>>> {
    let state = self.active();
    let source = state.source();
    read::get(&source, state.demux.is_some(), key, &mut state.scratch.key)
  }

  /// `get` decoded with bitcode
  /// 以 bitcode 解码的 `get`
  pub fn get_proto<M: DecodeOwned>(&mut self, key: VersionedKey<'_>) -> Result<GetProto<M>> {
    let Some(val) = self.get(key)? else {
      return Ok(GetProto {
        msg: None,
        key_bytes: 0,
        val_bytes: 0,
      });
    };
    let msg = bitcode::decode(&val)?;
    let scratch = &mut self.state_mut().scratch.key;
    key.encode_to(scratch);
    Ok(GetProto {
      msg: Some(msg),
      key_bytes: scratch.len(),
      val_bytes: val.len(),
    })
  }

  /// Visit `[start, end)` in logical key order until `visit` breaks
  /// 按逻辑键序遍历 `[start, end)`，直到 `visit` 中断
  pub fn scan<F>(&mut self, start: &[u8], end: &[u8], kind: IterKind, visit: F) -> Result<()>
  where
    F: FnMut(VersionedKey<'_>, &[u8]) -> Result<ControlFlow<()>>,
  {
    self.active();
    if start.is_empty() || end.is_empty() {
      return Err(Error::EmptyKey);
    }
    let mut it = self.new_mvcc_iter(kind, IterOptions::range(start, end));
    read::scan(&mut it, start, visit)
  }

  /// Pooled versioned iterator; timestamp hints give a fresh one instead
  /// 池化版本迭代器；带时间戳提示时改为全新迭代器
  pub fn new_mvcc_iter(&mut self, kind: IterKind, opts: IterOptions<'_>) -> MvccIter<'_> {
    let state = self.active();
    opts.check();
    let source = state.source();
    let intents = kind == IterKind::VersionedAndIntents && state.demux.is_some();
    if opts.window().is_some() {
      return MvccIter::fresh(source, intents, &opts);
    }
    let (mvcc, engine) = if opts.prefix {
      (&mut state.mvcc_prefix, &mut state.engine_prefix)
    } else {
      (&mut state.mvcc_range, &mut state.engine_range)
    };
    if intents {
      MvccIter::pooled_intents(mvcc.acquire(), engine.acquire(), source, &opts)
    } else {
      MvccIter::pooled(mvcc.acquire(), source, &opts)
    }
  }

  /// Pooled engine-key iterator
  /// 池化引擎键迭代器
  pub fn new_engine_iter(&mut self, opts: IterOptions<'_>) -> EngineIter<'_> {
    let state = self.active();
    opts.check();
    let source = state.source();
    let slot = if opts.prefix {
      &mut state.engine_prefix
    } else {
      &mut state.engine_range
    };
    EngineIter::pooled(slot.acquire(), source, &opts)
  }
}
