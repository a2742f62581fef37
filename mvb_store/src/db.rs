//! Ordered store with atomic buffer application
//! 支持原子应用写缓冲的有序存储

use std::{
  collections::BTreeMap,
  fmt,
  ops::Bound::{self, Excluded, Included, Unbounded},
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use log::debug;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::{
  Append, Conf, Error, MergeOperator, ParsedConf, Result, WriteBuf,
  repr::{self, Op},
  wal::Wal,
};

pub(crate) type Map = BTreeMap<Box<[u8]>, Box<[u8]>>;

/// Durability of an apply
/// 应用的持久化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
  /// fsync the durable log before returning
  /// 返回前 fsync 持久日志
  Sync,
  NoSync,
}

pub struct Db {
  data: RwLock<Map>,
  merge: Arc<dyn MergeOperator>,
  wal: Option<Mutex<Wal>>,
  /// Last assigned sequence number
  /// 最后分配的序列号
  seq: AtomicU64,
}

impl fmt::Debug for Db {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Db")
      .field("seq", &self.seq())
      .field("merge", &self.merge)
      .field("durable", &self.wal.is_some())
      .finish()
  }
}

impl Db {
  /// Memory-only store with the default merge operator
  /// 使用默认合并算子的纯内存存储
  pub fn mem() -> Self {
    Self {
      data: RwLock::default(),
      merge: Arc::new(Append),
      wal: None,
      seq: AtomicU64::new(0),
    }
  }

  /// Open, replaying the durable log when `Conf::Dir` is set
  /// 打开存储；设置 `Conf::Dir` 时回放持久日志
  pub fn open(conf: &[Conf]) -> Result<Self> {
    let conf = ParsedConf::parse(conf);
    let mut data = Map::new();
    let mut seq = 0;
    let wal = match &conf.dir {
      Some(dir) => {
        let merge = conf.merge.as_ref();
        let (wal, last) = Wal::open(dir, |r| apply_ops(&mut data, merge, r))?;
        seq = last;
        Some(Mutex::new(wal))
      }
      None => None,
    };
    Ok(Self {
      data: RwLock::new(data),
      merge: conf.merge,
      wal,
      seq: AtomicU64::new(seq),
    })
  }

  /// New indexed (readable) write buffer
  /// 新建带索引（可读）的写缓冲
  #[inline]
  pub fn indexed_buf(&self) -> WriteBuf {
    WriteBuf::new(true, self.merge.clone())
  }

  /// New write-only buffer
  /// 新建只写缓冲
  #[inline]
  pub fn buf(&self) -> WriteBuf {
    WriteBuf::new(false, self.merge.clone())
  }

  #[inline]
  pub fn merge_operator(&self) -> &Arc<dyn MergeOperator> {
    &self.merge
  }

  #[inline]
  pub fn seq(&self) -> u64 {
    self.seq.load(Ordering::Acquire)
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.data.read().len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.read().is_empty()
  }

  #[inline]
  pub(crate) fn read(&self) -> RwLockReadGuard<'_, Map> {
    self.data.read()
  }

  /// Point read; a missing key is `None`, not an error
  /// 点查；键不存在返回 `None` 而非错误
  #[inline]
  pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
    self.data.read().get(key).map(|v| v.to_vec())
  }

  /// First entry within `(lower, upper)`, copied into reusable buffers
  /// `(lower, upper)` 内的首个条目，复制到可复用缓冲
  pub fn seek(
    &self,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    key: &mut Vec<u8>,
    val: &mut Vec<u8>,
  ) -> bool {
    if is_empty_range(lower, upper) {
      return false;
    }
    let data = self.data.read();
    let Some((k, v)) = data.range::<[u8], _>((lower, upper)).next() else {
      return false;
    };
    key.clear();
    key.extend_from_slice(k);
    val.clear();
    val.extend_from_slice(v);
    true
  }

  /// Apply a buffer atomically; the whole log is validated before any change
  /// 原子应用写缓冲；任何修改前先校验整个日志
  pub fn apply(&self, buf: &mut WriteBuf, sync: SyncMode) -> Result<()> {
    if buf.is_closed() {
      return Err(Error::Closed);
    }
    if buf.is_committed() {
      return Err(Error::Committed);
    }
    let n = repr::validate(buf.repr())?;
    let mut data = self.data.write();
    let first = self.seq.fetch_add(n as u64, Ordering::AcqRel) + 1;
    repr::set_seq(buf.repr_mut(), first);
    if let Some(wal) = &self.wal {
      wal.lock().append(buf.repr(), sync)?;
    }
    apply_ops(&mut data, self.merge.as_ref(), buf.repr())?;
    drop(data);
    buf.mark_committed();
    debug!(
      "apply: seq={first} count={n} bytes={} sync={sync:?}",
      buf.len()
    );
    Ok(())
  }
}

/// Replay every record of `repr` onto `data`
/// 将 `repr` 的全部记录回放到 `data`
pub(crate) fn apply_ops(data: &mut Map, merge: &dyn MergeOperator, repr: &[u8]) -> Result<()> {
  for op in repr::parse(repr)? {
    match op? {
      Op::Set(k, v) => {
        data.insert(k.into(), v.into());
      }
      Op::Del(k) | Op::SingleDel(k) => {
        data.remove(k);
      }
      Op::Merge(k, v) => {
        let merged = merge.merge(k, data.get(k).map(|e| &e[..]), v);
        data.insert(k.into(), merged.into());
      }
      Op::RangeDel(s, e) => {
        if s < e {
          let mut tail = data.split_off(s);
          let mut rest = tail.split_off(e);
          data.append(&mut rest);
        }
      }
      Op::LogData(_) => {}
    }
  }
  Ok(())
}

/// True when no key can fall within `(lo, hi)`; `BTreeMap::range` panics on such bounds
/// 当 `(lo, hi)` 不可能包含任何键时为真；`BTreeMap::range` 遇此边界会 panic
pub(crate) fn is_empty_range(lo: Bound<&[u8]>, hi: Bound<&[u8]>) -> bool {
  match (lo, hi) {
    (Unbounded, _) | (_, Unbounded) => false,
    (Included(a), Included(b)) => a > b,
    (Included(a) | Excluded(a), Included(b) | Excluded(b)) => a >= b,
  }
}
