//! Store configuration
//! 存储配置

use std::{fmt, path::PathBuf, sync::Arc};

use crate::{Append, MergeOperator};

/// Durable log file name inside `Conf::Dir`
/// `Conf::Dir` 下的持久日志文件名
pub const LOG_NAME: &str = "mvb.log";

#[derive(Clone)]
pub enum Conf {
  /// Directory of the durable log; memory only when absent
  /// 持久日志目录；缺省时仅内存
  Dir(PathBuf),
  /// Merge operator, default `Append`
  /// 合并算子，默认 `Append`
  Merge(Arc<dyn MergeOperator>),
}

impl fmt::Debug for Conf {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Conf::Dir(dir) => f.debug_tuple("Dir").field(dir).finish(),
      Conf::Merge(op) => f.debug_tuple("Merge").field(&op.name()).finish(),
    }
  }
}

pub struct ParsedConf {
  pub dir: Option<PathBuf>,
  pub merge: Arc<dyn MergeOperator>,
}

impl ParsedConf {
  pub fn parse(conf: &[Conf]) -> Self {
    let mut c = Self {
      dir: None,
      merge: Arc::new(Append),
    };
    for item in conf {
      match item {
        Conf::Dir(v) => c.dir = Some(v.clone()),
        Conf::Merge(v) => c.merge = v.clone(),
      }
    }
    c
  }
}
