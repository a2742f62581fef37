//! Merge operator
//! 合并算子

use std::fmt;

/// Combines an existing value with a merge operand
/// 将已有值与合并操作数组合
pub trait MergeOperator: Send + Sync {
  fn name(&self) -> &'static str;

  fn merge(&self, key: &[u8], existing: Option<&[u8]>, operand: &[u8]) -> Vec<u8>;
}

impl fmt::Debug for dyn MergeOperator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Byte append, the default operator
/// 字节追加，默认算子
#[derive(Debug, Clone, Copy, Default)]
pub struct Append;

impl MergeOperator for Append {
  fn name(&self) -> &'static str {
    "append"
  }

  fn merge(&self, _key: &[u8], existing: Option<&[u8]>, operand: &[u8]) -> Vec<u8> {
    let existing = existing.unwrap_or_default();
    let mut out = Vec::with_capacity(existing.len() + operand.len());
    out.extend_from_slice(existing);
    out.extend_from_slice(operand);
    out
  }
}
