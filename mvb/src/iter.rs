//! Iterator kinds, options and handles
//! 迭代器种类、选项与句柄

use mvb_key::{EngineKey, Timestamp, VersionedKey};

use crate::{
  Result,
  cursor::{Cursor, Ns, Source, Window},
  intent::iter::IntentIter,
  slot::SlotGuard,
  usage::violation,
};

/// Cursor over versioned keys
/// 版本键游标
pub trait MvccIterator {
  /// Position at the first entry `>= key`
  /// 定位到首个 `>= key` 的条目
  fn seek_ge(&mut self, key: VersionedKey<'_>) -> Result<()>;

  fn valid(&self) -> bool;

  fn next(&mut self) -> Result<()>;

  /// Only meaningful while `valid()`
  /// 仅在 `valid()` 时有意义
  fn key(&self) -> VersionedKey<'_>;

  fn value(&self) -> &[u8];

  /// Physical key as stored, lock table keys included
  /// 存储中的物理键，包括锁表键
  fn raw_key(&self) -> &[u8];

  /// Exclusive user-key upper bound; reposition with `seek_ge` afterwards
  /// 不含的用户键上界；之后须用 `seek_ge` 重新定位
  fn set_upper_bound(&mut self, key: &[u8]);
}

/// Cursor over engine keys
/// 引擎键游标
pub trait EngineIterator {
  fn seek_ge(&mut self, key: EngineKey<'_>) -> Result<()>;

  fn valid(&self) -> bool;

  fn next(&mut self) -> Result<()>;

  fn key(&self) -> EngineKey<'_>;

  fn value(&self) -> &[u8];

  fn raw_key(&self) -> &[u8];

  fn set_upper_bound(&mut self, key: &[u8]);
}

/// What a versioned iterator yields
/// 版本迭代器产出的内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterKind {
  /// Versioned keyspace only
  /// 仅版本键空间
  Versioned,
  /// Versioned keyspace with separated intents merged in at their
  /// metadata position; same as `Versioned` under `IntentMode::Plain`
  /// 版本键空间并在元数据位置合入分离意向；`IntentMode::Plain` 下等同 `Versioned`
  VersionedAndIntents,
}

/// Iteration scope; at least one of `prefix`, `lower`, `upper` is required
/// 迭代范围；`prefix`、`lower`、`upper` 至少需要其一
#[derive(Debug, Clone, Copy, Default)]
pub struct IterOptions<'a> {
  /// Stay within the user key of the first seek
  /// 限定在首次定位的用户键之内
  pub prefix: bool,
  /// Inclusive user-key lower bound
  /// 包含的用户键下界
  pub lower: Option<&'a [u8]>,
  /// Exclusive user-key upper bound
  /// 不含的用户键上界
  pub upper: Option<&'a [u8]>,
  /// Timestamp hints; either one yields a fresh, unpooled iterator
  /// 时间戳提示；任一存在即返回全新的非池化迭代器
  pub min_ts: Option<Timestamp>,
  pub max_ts: Option<Timestamp>,
}

impl<'a> IterOptions<'a> {
  pub fn prefix() -> Self {
    Self {
      prefix: true,
      ..Self::default()
    }
  }

  pub fn range(lower: &'a [u8], upper: &'a [u8]) -> Self {
    Self {
      lower: Some(lower),
      upper: Some(upper),
      ..Self::default()
    }
  }

  pub fn lower(lower: &'a [u8]) -> Self {
    Self {
      lower: Some(lower),
      ..Self::default()
    }
  }

  pub fn upper(upper: &'a [u8]) -> Self {
    Self {
      upper: Some(upper),
      ..Self::default()
    }
  }

  pub fn with_ts(mut self, min: Timestamp, max: Timestamp) -> Self {
    self.min_ts = Some(min);
    self.max_ts = Some(max);
    self
  }

  pub(crate) fn check(&self) {
    if !self.prefix && self.lower.is_none() && self.upper.is_none() {
      violation("iterator needs prefix mode or a bound")
    }
  }

  pub(crate) fn window(&self) -> Option<Window> {
    if self.min_ts.is_none() && self.max_ts.is_none() {
      return None;
    }
    Some((
      self.min_ts.unwrap_or(Timestamp::EMPTY),
      self.max_ts.unwrap_or(Timestamp::MAX),
    ))
  }
}

impl MvccIterator for Cursor {
  #[inline]
  fn seek_ge(&mut self, key: VersionedKey<'_>) -> Result<()> {
    self.seek_versioned(key)
  }

  #[inline]
  fn valid(&self) -> bool {
    Cursor::valid(self)
  }

  #[inline]
  fn next(&mut self) -> Result<()> {
    Cursor::next(self)
  }

  #[inline]
  fn key(&self) -> VersionedKey<'_> {
    self.versioned_key()
  }

  #[inline]
  fn value(&self) -> &[u8] {
    Cursor::value(self)
  }

  #[inline]
  fn raw_key(&self) -> &[u8] {
    Cursor::raw_key(self)
  }

  #[inline]
  fn set_upper_bound(&mut self, key: &[u8]) {
    Cursor::set_upper_bound(self, key)
  }
}

impl EngineIterator for Cursor {
  #[inline]
  fn seek_ge(&mut self, key: EngineKey<'_>) -> Result<()> {
    self.seek_engine(key)
  }

  #[inline]
  fn valid(&self) -> bool {
    Cursor::valid(self)
  }

  #[inline]
  fn next(&mut self) -> Result<()> {
    Cursor::next(self)
  }

  #[inline]
  fn key(&self) -> EngineKey<'_> {
    self.engine_key()
  }

  #[inline]
  fn value(&self) -> &[u8] {
    Cursor::value(self)
  }

  #[inline]
  fn raw_key(&self) -> &[u8] {
    Cursor::raw_key(self)
  }

  #[inline]
  fn set_upper_bound(&mut self, key: &[u8]) {
    Cursor::set_upper_bound(self, key)
  }
}

#[derive(Debug)]
enum Inner<'b> {
  Slot(SlotGuard<'b>),
  Fresh(Box<Cursor>),
  Intents(IntentIter<SlotGuard<'b>>),
  FreshIntents(IntentIter<Box<Cursor>>),
}

/// Versioned iterator; a pooled handle frees its slot on drop
/// 版本迭代器；池化句柄在释放时归还槽位
#[derive(Debug)]
pub struct MvccIter<'b>(Inner<'b>);

impl<'b> MvccIter<'b> {
  pub(crate) fn pooled(mut cursor: SlotGuard<'b>, source: Source, opts: &IterOptions<'_>) -> Self {
    cursor.bind(Ns::Versioned, source, opts);
    Self(Inner::Slot(cursor))
  }

  pub(crate) fn pooled_intents(
    mut cursor: SlotGuard<'b>,
    mut locks: SlotGuard<'b>,
    source: Source,
    opts: &IterOptions<'_>,
  ) -> Self {
    cursor.bind(Ns::Versioned, source.clone(), opts);
    locks.bind(Ns::Lock, source, opts);
    Self(Inner::Intents(IntentIter::new(cursor, locks)))
  }

  /// Whether this handle occupies a batch slot
  /// 该句柄是否占用批次槽位
  pub fn is_pooled(&self) -> bool {
    matches!(self.0, Inner::Slot(_) | Inner::Intents(_))
  }

  /// Address of the versioned cursor's bound buffer; equal across
  /// acquisitions of the same slot
  /// 版本游标边界缓冲的地址；同一槽位多次获取时相同
  #[doc(hidden)]
  pub fn buf_addr(&self) -> usize {
    match &self.0 {
      Inner::Slot(c) => c.buf_addr(),
      Inner::Fresh(c) => c.buf_addr(),
      Inner::Intents(i) => i.buf_addr(),
      Inner::FreshIntents(i) => i.buf_addr(),
    }
  }

  fn inner(&self) -> &dyn MvccIterator {
    match &self.0 {
      Inner::Slot(c) => &**c,
      Inner::Fresh(c) => &**c,
      Inner::Intents(i) => i,
      Inner::FreshIntents(i) => i,
    }
  }

  fn inner_mut(&mut self) -> &mut dyn MvccIterator {
    match &mut self.0 {
      Inner::Slot(c) => &mut **c,
      Inner::Fresh(c) => &mut **c,
      Inner::Intents(i) => i,
      Inner::FreshIntents(i) => i,
    }
  }
}

impl MvccIter<'static> {
  /// Unpooled iterator; owns its cursors
  /// 非池化迭代器；自有游标
  pub(crate) fn fresh(source: Source, intents: bool, opts: &IterOptions<'_>) -> Self {
    let mut cursor = Box::<Cursor>::default();
    cursor.bind(Ns::Versioned, source.clone(), opts);
    if !intents {
      return Self(Inner::Fresh(cursor));
    }
    let mut locks = Box::<Cursor>::default();
    locks.bind(Ns::Lock, source, opts);
    Self(Inner::FreshIntents(IntentIter::new(cursor, locks)))
  }
}

impl MvccIterator for MvccIter<'_> {
  #[inline]
  fn seek_ge(&mut self, key: VersionedKey<'_>) -> Result<()> {
    self.inner_mut().seek_ge(key)
  }

  #[inline]
  fn valid(&self) -> bool {
    self.inner().valid()
  }

  #[inline]
  fn next(&mut self) -> Result<()> {
    self.inner_mut().next()
  }

  #[inline]
  fn key(&self) -> VersionedKey<'_> {
    self.inner().key()
  }

  #[inline]
  fn value(&self) -> &[u8] {
    self.inner().value()
  }

  #[inline]
  fn raw_key(&self) -> &[u8] {
    self.inner().raw_key()
  }

  #[inline]
  fn set_upper_bound(&mut self, key: &[u8]) {
    self.inner_mut().set_upper_bound(key)
  }
}

/// Pooled engine-key iterator
/// 池化引擎键迭代器
#[derive(Debug)]
pub struct EngineIter<'b>(SlotGuard<'b>);

impl<'b> EngineIter<'b> {
  pub(crate) fn pooled(mut cursor: SlotGuard<'b>, source: Source, opts: &IterOptions<'_>) -> Self {
    cursor.bind(Ns::Engine, source, opts);
    Self(cursor)
  }

  #[doc(hidden)]
  pub fn buf_addr(&self) -> usize {
    self.0.buf_addr()
  }
}

impl EngineIterator for EngineIter<'_> {
  #[inline]
  fn seek_ge(&mut self, key: EngineKey<'_>) -> Result<()> {
    self.0.seek_engine(key)
  }

  #[inline]
  fn valid(&self) -> bool {
    self.0.valid()
  }

  #[inline]
  fn next(&mut self) -> Result<()> {
    self.0.next()
  }

  #[inline]
  fn key(&self) -> EngineKey<'_> {
    self.0.engine_key()
  }

  #[inline]
  fn value(&self) -> &[u8] {
    self.0.value()
  }

  #[inline]
  fn raw_key(&self) -> &[u8] {
    self.0.raw_key()
  }

  #[inline]
  fn set_upper_bound(&mut self, key: &[u8]) {
    self.0.set_upper_bound(key)
  }
}
