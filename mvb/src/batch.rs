//! Batch: staged mutations with pooled readers
//! 批次：暂存变更与池化读取器
//!
//! A batch owns one write buffer. Its distinct view shares that buffer
//! through a second handle; while the view is open the parent neither reads
//! nor writes. Misuse (closed batch, double view, commit twice) panics.
//! 批次拥有一个写缓冲。独立视图经第二个句柄共享该缓冲；视图打开期间父批次不读不写。
//! 误用（已关闭批次、重复视图、重复提交）直接 panic。

mod read;
mod write;

use std::sync::{Arc, atomic::Ordering};

use log::{debug, error};
use mvb_store::{Db, SyncMode, WriteBuf};
use parking_lot::Mutex;

pub use read::GetProto;
pub use write::LogicalOp;

use crate::{
  IntentMode,
  intent::Demux,
  pool::{BatchPool, BatchState},
  usage::violation,
};

#[derive(Debug)]
pub struct Batch {
  /// `None` once closed
  /// 关闭后为 `None`
  state: Option<Box<BatchState>>,
  pool: Arc<BatchPool>,
}

impl Batch {
  pub(crate) fn new(pool: Arc<BatchPool>, db: Arc<Db>, buf: WriteBuf, mode: IntentMode) -> Self {
    let mut state = pool.get();
    state.indexed = buf.indexed();
    state.db = Some(db);
    state.buf = Some(Arc::new(Mutex::new(buf)));
    state.demux = Demux::new(mode);
    Self {
      state: Some(state),
      pool,
    }
  }

  #[track_caller]
  fn state(&self) -> &BatchState {
    match self.state.as_deref() {
      Some(state) => state,
      None => violation("batch is closed"),
    }
  }

  #[track_caller]
  fn state_mut(&mut self) -> &mut BatchState {
    match self.state.as_deref_mut() {
      Some(state) => state,
      None => violation("batch is closed"),
    }
  }

  /// Open state with no distinct view in the way
  /// 已打开且未被独立视图占用的状态
  #[track_caller]
  fn active(&mut self) -> &mut BatchState {
    let state = self.state_mut();
    if state.distinct_open() {
      violation("distinct view is open")
    }
    state
  }

  #[inline]
  pub fn is_closed(&self) -> bool {
    self.state.is_none()
  }

  #[inline]
  pub fn is_distinct(&self) -> bool {
    self.state().is_distinct()
  }

  /// Intent strategy in effect
  /// 当前意向策略
  pub fn intent_mode(&self) -> IntentMode {
    Demux::mode(self.state().demux)
  }

  /// Whether a distinct view of this batch is open
  /// 本批次的独立视图是否打开
  #[inline]
  pub fn is_distinct_open(&self) -> bool {
    self.state().distinct_open()
  }

  /// Open the distinct view: a second batch on the same buffer that reads
  /// the store directly when the buffer is write-only
  /// 打开独立视图：共享同一缓冲的第二个批次，缓冲只写时直接读取存储
  pub fn distinct(&mut self) -> Batch {
    let Some(state) = self.state.as_deref() else {
      violation("batch is closed")
    };
    if state.is_distinct() {
      violation("distinct view of a distinct view")
    }
    if state.distinct_open.swap(true, Ordering::AcqRel) {
      violation("distinct view already open")
    }
    let mut view = self.pool.get();
    view.db = state.db.clone();
    view.buf = state.buf.clone();
    view.indexed = state.indexed;
    view.demux = state.demux;
    view.parent = Some(state.distinct_open.clone());
    Batch {
      state: Some(view),
      pool: self.pool.clone(),
    }
  }

  /// Release slots and return the state to the pool. A parent closes the
  /// write buffer; a view only clears the parent's flag.
  /// 释放槽位并把状态归还池。父批次关闭写缓冲；视图只清除父批次标志。
  pub fn close(&mut self) {
    let Some(state) = self.state.take() else {
      violation("batch already closed")
    };
    match &state.parent {
      Some(flag) => flag.store(false, Ordering::Release),
      None => {
        if let Some(buf) = &state.buf {
          buf.lock().close();
        }
      }
    }
    self.pool.put(state);
  }

  /// Apply the buffer atomically; `durable` syncs the store log. Failure to
  /// apply leaves the batch in an unknown state and panics.
  /// 原子应用缓冲；`durable` 同步存储日志。应用失败时批次状态未知，直接 panic。
  pub fn commit(&mut self, durable: bool) {
    let state = self.state();
    if state.is_distinct() {
      violation("commit on a distinct view")
    }
    let (Some(db), Some(buf)) = (&state.db, &state.buf) else {
      violation("commit without a buffer")
    };
    let mut buf = buf.lock();
    if buf.is_committed() {
      violation("batch already committed")
    }
    let sync = if durable {
      SyncMode::Sync
    } else {
      SyncMode::NoSync
    };
    if let Err(e) = db.apply(&mut buf, sync) {
      error!("commit failed: {e}");
      panic!("commit failed: {e} / 提交失败");
    }
    debug!("commit: count={} durable={durable}", buf.count());
  }

  /// No staged records
  /// 无暂存记录
  pub fn is_empty(&self) -> bool {
    self.with_buf(|buf| buf.is_empty())
  }

  /// Byte length of the staged mutation log
  /// 暂存变更日志的字节长度
  pub fn len(&self) -> usize {
    self.with_buf(|buf| buf.len())
  }

  /// Number of staged records
  /// 暂存记录数
  pub fn count(&self) -> u32 {
    self.with_buf(|buf| buf.count())
  }

  /// Independent copy of the staged mutation log
  /// 暂存变更日志的独立副本
  pub fn repr(&self) -> Vec<u8> {
    self.with_buf(|buf| buf.repr().to_vec())
  }

  #[track_caller]
  fn with_buf<T>(&self, f: impl FnOnce(&WriteBuf) -> T) -> T {
    let Some(buf) = &self.state().buf else {
      violation("batch has no buffer")
    };
    let buf = buf.lock();
    // Only a view outlives the buffer: its parent closed it
    // 只有视图会比缓冲活得久：父批次已将其关闭
    if buf.is_closed() {
      violation("parent batch closed")
    }
    f(&buf)
  }
}

impl Drop for Batch {
  fn drop(&mut self) {
    if self.state.is_some() {
      self.close();
    }
  }
}
