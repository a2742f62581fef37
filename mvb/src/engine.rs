//! Engine: store, batch pool and intent strategy
//! 引擎：存储、批次池与意向策略

use std::{ops::ControlFlow, sync::Arc};

use log::debug;
use mvb_key::VersionedKey;
use mvb_store::Db;

use crate::{
  Batch, BatchPool, Conf, Error, IntentMode, IterKind, IterOptions, MvccIter, ParsedConf, Result,
  cursor::Source, read,
};

#[derive(Debug)]
pub struct Engine {
  db: Arc<Db>,
  pool: Arc<BatchPool>,
  intent: IntentMode,
}

impl Engine {
  /// Open with the given configuration; store options pass through `Conf::Store`
  /// 按配置打开；存储选项经 `Conf::Store` 传递
  pub fn open(conf: &[Conf]) -> Result<Self> {
    let conf = ParsedConf::parse(conf);
    let db = Db::open(&conf.store)?;
    debug!(
      "engine open: intent={:?} pool_cap={} seq={}",
      conf.intent,
      conf.pool_cap,
      db.seq()
    );
    Ok(Self {
      db: Arc::new(db),
      pool: Arc::new(BatchPool::new(conf.pool_cap)),
      intent: conf.intent,
    })
  }

  #[inline]
  pub fn db(&self) -> &Arc<Db> {
    &self.db
  }

  #[inline]
  pub fn pool(&self) -> &Arc<BatchPool> {
    &self.pool
  }

  #[inline]
  pub fn intent_mode(&self) -> IntentMode {
    self.intent
  }

  /// Readable batch
  /// 可读批次
  pub fn new_batch(&self) -> Batch {
    Batch::new(
      self.pool.clone(),
      self.db.clone(),
      self.db.indexed_buf(),
      self.intent,
    )
  }

  /// Write-only batch; read it through a distinct view
  /// 只写批次；经独立视图读取
  pub fn new_write_only_batch(&self) -> Batch {
    Batch::new(self.pool.clone(), self.db.clone(), self.db.buf(), self.intent)
  }

  /// Committed value at `key`
  /// `key` 处已提交的值
  pub fn get(&self, key: VersionedKey<'_>) -> Result<Option<Vec<u8>>> {
    let mut scratch = Vec::new();
    read::get(&self.source(), self.intents(), key, &mut scratch)
  }

  pub fn scan<F>(&self, start: &[u8], end: &[u8], kind: IterKind, visit: F) -> Result<()>
  where
    F: FnMut(VersionedKey<'_>, &[u8]) -> Result<ControlFlow<()>>,
  {
    if start.is_empty() || end.is_empty() {
      return Err(Error::EmptyKey);
    }
    let mut it = self.new_mvcc_iter(kind, IterOptions::range(start, end));
    read::scan(&mut it, start, visit)
  }

  /// Fresh, unpooled iterator over committed state
  /// 基于已提交状态的全新非池化迭代器
  pub fn new_mvcc_iter(&self, kind: IterKind, opts: IterOptions<'_>) -> MvccIter<'static> {
    opts.check();
    let intents = kind == IterKind::VersionedAndIntents && self.intents();
    MvccIter::fresh(self.source(), intents, &opts)
  }

  #[inline]
  fn intents(&self) -> bool {
    self.intent != IntentMode::Plain
  }

  #[inline]
  fn source(&self) -> Source {
    Source::Db(self.db.clone())
  }
}
