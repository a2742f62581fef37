//! Engine configuration
//! 引擎配置

use crate::IntentMode;

/// Default number of idle batch states kept by the pool
/// 池中保留的空闲批次状态默认数量
pub const DEFAULT_POOL_CAP: usize = 64;

#[derive(Debug, Clone)]
pub enum Conf {
  /// Intent encoding strategy, default `Plain`
  /// 意向编码策略，默认 `Plain`
  Intent(IntentMode),
  /// Idle batch states kept for reuse
  /// 保留以复用的空闲批次状态数
  PoolCap(usize),
  Store(mvb_store::Conf),
}

#[derive(Debug)]
pub struct ParsedConf {
  pub intent: IntentMode,
  pub pool_cap: usize,
  pub store: Vec<mvb_store::Conf>,
}

impl ParsedConf {
  pub fn parse(conf: &[Conf]) -> Self {
    let mut c = Self {
      intent: IntentMode::Plain,
      pool_cap: DEFAULT_POOL_CAP,
      store: Vec::new(),
    };
    for item in conf {
      match item {
        Conf::Intent(v) => c.intent = *v,
        Conf::PoolCap(v) => c.pool_cap = *v,
        Conf::Store(v) => c.store.push(v.clone()),
      }
    }
    c
  }
}
