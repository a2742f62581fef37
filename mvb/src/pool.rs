//! Batch state pool
//! 批次状态池

use std::sync::{
  Arc,
  atomic::{AtomicBool, AtomicU64, Ordering},
};

use log::trace;
use mvb_store::{Db, WriteBuf};
use parking_lot::Mutex;

use crate::{
  cursor::Source,
  intent::Demux,
  slot::Slot,
  usage::violation,
};

/// Reusable encode buffers, never handed out
/// 可复用的编码缓冲，从不外借
#[derive(Debug, Default)]
pub(crate) struct Scratch {
  pub key: Vec<u8>,
  pub end: Vec<u8>,
}

/// Everything a batch owns; recycled through `BatchPool`
/// 批次拥有的全部状态；经 `BatchPool` 回收复用
#[derive(Debug, Default)]
pub(crate) struct BatchState {
  pub db: Option<Arc<Db>>,
  pub buf: Option<Arc<Mutex<WriteBuf>>>,
  pub indexed: bool,
  pub demux: Option<Demux>,
  pub mvcc_range: Slot,
  pub mvcc_prefix: Slot,
  pub engine_range: Slot,
  pub engine_prefix: Slot,
  /// Set while a distinct view of this batch is open
  /// 本批次的独立视图打开期间置位
  pub distinct_open: Arc<AtomicBool>,
  /// Parent's `distinct_open` when this batch is a distinct view
  /// 本批次为独立视图时指向父批次的 `distinct_open`
  pub parent: Option<Arc<AtomicBool>>,
  pub scratch: Scratch,
}

impl BatchState {
  #[inline]
  pub fn is_distinct(&self) -> bool {
    self.parent.is_some()
  }

  #[inline]
  pub fn distinct_open(&self) -> bool {
    self.distinct_open.load(Ordering::Acquire)
  }

  /// Reader for this batch: buffer over store when indexed, the store alone
  /// for a distinct view of a write-only buffer
  /// 本批次的读取源：有索引时为缓冲叠加存储，只写缓冲的独立视图则仅读存储
  #[track_caller]
  pub fn source(&self) -> Source {
    let (Some(db), Some(buf)) = (&self.db, &self.buf) else {
      violation("batch has no buffer")
    };
    if buf.lock().is_closed() {
      violation("parent batch closed")
    }
    if self.indexed {
      Source::Buf {
        buf: buf.clone(),
        db: db.clone(),
      }
    } else if self.is_distinct() {
      Source::Db(db.clone())
    } else {
      violation("read on a write-only batch")
    }
  }

  /// Restore initial state, keep buffer capacity
  /// 恢复初始状态，保留缓冲容量
  fn reset(&mut self) {
    self.db = None;
    self.buf = None;
    self.indexed = false;
    self.demux = None;
    for slot in [
      &mut self.mvcc_range,
      &mut self.mvcc_prefix,
      &mut self.engine_range,
      &mut self.engine_prefix,
    ] {
      slot.reset();
    }
    // A view that outlived us still holds the old flag
    // 存活更久的视图仍持有旧标志
    match Arc::get_mut(&mut self.distinct_open) {
      Some(flag) => *flag.get_mut() = false,
      None => self.distinct_open = Arc::default(),
    }
    self.parent = None;
    self.scratch.key.clear();
    self.scratch.end.clear();
  }
}

/// Thread-safe free list of batch states
/// 线程安全的批次状态空闲列表
#[derive(Debug)]
pub struct BatchPool {
  free: Mutex<Vec<Box<BatchState>>>,
  cap: usize,
  reused: AtomicU64,
}

impl BatchPool {
  pub fn new(cap: usize) -> Self {
    Self {
      free: Mutex::new(Vec::with_capacity(cap)),
      cap,
      reused: AtomicU64::new(0),
    }
  }

  /// Idle states ready for reuse
  /// 可复用的空闲状态数
  #[inline]
  pub fn len(&self) -> usize {
    self.free.lock().len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  pub fn cap(&self) -> usize {
    self.cap
  }

  /// Acquisitions served from the free list
  /// 由空闲列表满足的获取次数
  #[inline]
  pub fn reused(&self) -> u64 {
    self.reused.load(Ordering::Relaxed)
  }

  pub(crate) fn get(&self) -> Box<BatchState> {
    match self.free.lock().pop() {
      Some(state) => {
        self.reused.fetch_add(1, Ordering::Relaxed);
        trace!("batch pool: reuse");
        state
      }
      None => Box::default(),
    }
  }

  pub(crate) fn put(&self, mut state: Box<BatchState>) {
    state.reset();
    let mut free = self.free.lock();
    if free.len() < self.cap {
      free.push(state);
    }
  }
}
