//! Write buffer: the staged mutation log plus an optional read index
//! 写缓冲：暂存的变更日志加可选的读索引

use std::{
  collections::BTreeMap,
  ops::Bound::{self, Excluded, Included},
  sync::Arc,
};

use crate::{
  Db, Error, MergeOperator, Result,
  repr::{self, Op},
};

/// Resolved state of one key inside an indexed buffer
/// 索引缓冲中单个键的解析状态
#[derive(Debug)]
enum Entry {
  Set(Box<[u8]>),
  Del,
  /// Operands still waiting for the store value as base
  /// 仍以存储值为基底的待合并操作数
  Merge(Vec<Box<[u8]>>),
}

#[derive(Debug, Default)]
struct Index {
  points: BTreeMap<Box<[u8]>, Entry>,
  /// Range deletes, hide store keys not present in `points`
  /// 范围删除，遮蔽不在 `points` 中的存储键
  ranges: Vec<(Box<[u8]>, Box<[u8]>)>,
}

impl Index {
  #[inline]
  fn covered(&self, key: &[u8]) -> bool {
    self
      .ranges
      .iter()
      .any(|(s, e)| key >= s.as_ref() && key < e.as_ref())
  }

  fn apply(&mut self, op: Op<'_>, merge: &dyn MergeOperator) {
    match op {
      Op::Set(k, v) => {
        self.points.insert(k.into(), Entry::Set(v.into()));
      }
      Op::Del(k) | Op::SingleDel(k) => {
        self.points.insert(k.into(), Entry::Del);
      }
      Op::Merge(k, v) => {
        let covered = self.covered(k);
        match self.points.get_mut(k) {
          Some(Entry::Set(base)) => *base = merge.merge(k, Some(&base[..]), v).into(),
          Some(Entry::Merge(li)) => li.push(v.into()),
          Some(e @ Entry::Del) => *e = Entry::Set(merge.merge(k, None, v).into()),
          None if covered => {
            self
              .points
              .insert(k.into(), Entry::Set(merge.merge(k, None, v).into()));
          }
          None => {
            self.points.insert(k.into(), Entry::Merge(vec![v.into()]));
          }
        }
      }
      Op::RangeDel(s, e) => {
        if s < e {
          for (_, entry) in self.points.range_mut::<[u8], _>((Included(s), Excluded(e))) {
            *entry = Entry::Del;
          }
          self.ranges.push((s.into(), e.into()));
        }
      }
      Op::LogData(_) => {}
    }
  }

  /// Value of an index entry layered over the store
  /// 索引条目叠加在存储之上的值
  fn resolve(
    entry: &Entry,
    key: &[u8],
    base: Option<&[u8]>,
    merge: &dyn MergeOperator,
    out: &mut Vec<u8>,
  ) -> bool {
    out.clear();
    match entry {
      Entry::Set(v) => out.extend_from_slice(v),
      Entry::Del => return false,
      Entry::Merge(li) => {
        let mut acc = base.map(<[u8]>::to_vec);
        for v in li {
          acc = Some(merge.merge(key, acc.as_deref(), v));
        }
        if let Some(acc) = acc {
          out.extend_from_slice(&acc);
        }
      }
    }
    true
  }
}

/// Mutable write buffer; indexed buffers can be read back
/// 可变写缓冲；带索引的缓冲可回读
#[derive(Debug)]
pub struct WriteBuf {
  repr: Vec<u8>,
  index: Option<Index>,
  merge: Arc<dyn MergeOperator>,
  closed: bool,
  committed: bool,
}

impl WriteBuf {
  pub(crate) fn new(indexed: bool, merge: Arc<dyn MergeOperator>) -> Self {
    Self {
      repr: repr::empty(),
      index: indexed.then(Index::default),
      merge,
      closed: false,
      committed: false,
    }
  }

  #[inline]
  pub fn indexed(&self) -> bool {
    self.index.is_some()
  }

  #[inline]
  pub fn is_closed(&self) -> bool {
    self.closed
  }

  #[inline]
  pub fn is_committed(&self) -> bool {
    self.committed
  }

  #[inline]
  pub(crate) fn mark_committed(&mut self) {
    self.committed = true;
  }

  /// Number of staged records
  /// 暂存记录数
  #[inline]
  pub fn count(&self) -> u32 {
    repr::count(&self.repr)
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.count() == 0
  }

  /// Byte length of the repr
  /// repr 字节长度
  #[inline]
  pub fn len(&self) -> usize {
    self.repr.len()
  }

  /// Borrow the live repr; copy before handing it out
  /// 借用当前 repr；对外交付前须复制
  #[inline]
  pub fn repr(&self) -> &[u8] {
    &self.repr
  }

  #[inline]
  pub(crate) fn repr_mut(&mut self) -> &mut Vec<u8> {
    &mut self.repr
  }

  fn writable(&self) -> Result<()> {
    if self.closed {
      return Err(Error::Closed);
    }
    if self.committed {
      return Err(Error::Committed);
    }
    Ok(())
  }

  fn push(&mut self, op: Op<'_>) -> Result<()> {
    self.writable()?;
    repr::append(&mut self.repr, op);
    if let Some(index) = &mut self.index {
      index.apply(op, self.merge.as_ref());
    }
    Ok(())
  }

  #[inline]
  pub fn set(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
    self.push(Op::Set(key, val))
  }

  #[inline]
  pub fn del(&mut self, key: &[u8]) -> Result<()> {
    self.push(Op::Del(key))
  }

  #[inline]
  pub fn single_del(&mut self, key: &[u8]) -> Result<()> {
    self.push(Op::SingleDel(key))
  }

  /// Delete `[start, end)`
  /// 删除 `[start, end)`
  #[inline]
  pub fn del_range(&mut self, start: &[u8], end: &[u8]) -> Result<()> {
    self.push(Op::RangeDel(start, end))
  }

  #[inline]
  pub fn merge(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
    self.push(Op::Merge(key, val))
  }

  /// Out-of-band record, no effect on the keyspace
  /// 带外记录，对键空间无影响
  #[inline]
  pub fn log_data(&mut self, data: &[u8]) -> Result<()> {
    self.push(Op::LogData(data))
  }

  /// Append every record of another repr
  /// 追加另一个 repr 的全部记录
  pub fn apply_repr(&mut self, other: &[u8]) -> Result<()> {
    self.writable()?;
    repr::validate(other)?;
    for op in repr::parse(other)? {
      self.push(op?)?;
    }
    Ok(())
  }

  /// Drop staged data; the buffer can no longer be used
  /// 丢弃暂存数据；缓冲不可再用
  pub fn close(&mut self) {
    self.closed = true;
    self.repr = repr::empty();
    self.index = None;
  }

  fn index(&self) -> Result<&Index> {
    if self.closed {
      return Err(Error::Closed);
    }
    self.index.as_ref().ok_or(Error::Unindexed)
  }

  /// Point read of buffer over store
  /// 缓冲叠加存储的点查
  pub fn get(&self, db: &Db, key: &[u8]) -> Result<Option<Vec<u8>>> {
    let index = self.index()?;
    let data = db.read();
    let base = data.get(key).map(|v| &v[..]);
    let mut out = Vec::new();
    let found = match index.points.get(key) {
      Some(entry) => Index::resolve(entry, key, base, self.merge.as_ref(), &mut out),
      None if index.covered(key) => false,
      None => match base {
        Some(v) => {
          out.extend_from_slice(v);
          true
        }
        None => false,
      },
    };
    Ok(found.then_some(out))
  }

  /// First visible entry of buffer over store within `(lower, upper)`,
  /// copied into the reusable `key`/`val` buffers
  /// 缓冲叠加存储在 `(lower, upper)` 内的首个可见条目，复制到可复用的 `key`/`val`
  pub fn seek(
    &self,
    db: &Db,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    key: &mut Vec<u8>,
    val: &mut Vec<u8>,
  ) -> Result<bool> {
    let index = self.index()?;
    let data = db.read();
    let merge = self.merge.as_ref();
    // `skip` holds the last hidden key once we move past `lower`
    // 越过 `lower` 后，`skip` 保存最后一个被隐藏的键
    let mut skip: Option<Vec<u8>> = None;
    loop {
      let lo = match &skip {
        Some(k) => Excluded(k.as_slice()),
        None => lower,
      };
      if crate::db::is_empty_range(lo, upper) {
        return Ok(false);
      }
      let mut from_index = index.points.range::<[u8], _>((lo, upper));
      let mut from_db = data
        .range::<[u8], _>((lo, upper))
        .filter(|&(k, _)| !index.points.contains_key::<[u8]>(k) && !index.covered(k));
      let a = from_index.next();
      let b = from_db.next();
      let (k, visible) = match (a, b) {
        (None, None) => return Ok(false),
        (Some((ik, entry)), b) if b.is_none_or(|(dk, _)| ik <= dk) => {
          let base = data.get::<[u8]>(ik).map(|v| &v[..]);
          (&ik[..], Index::resolve(entry, ik, base, merge, val))
        }
        (_, Some((dk, dv))) => {
          val.clear();
          val.extend_from_slice(dv);
          (&dk[..], true)
        }
        (Some(_), None) => unreachable!(),
      };
      if visible {
        key.clear();
        key.extend_from_slice(k);
        return Ok(true);
      }
      let mut next = skip.take().unwrap_or_default();
      next.clear();
      next.extend_from_slice(k);
      skip = Some(next);
    }
  }
}
