use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("corrupt mutation log: {0} / 变更日志损坏")]
  CorruptLog(&'static str),

  #[error("CRC mismatch at offset {0}: expected {1}, got {2}")]
  CrcMismatch(u64, u32, u32),

  #[error("write buffer closed / 写缓冲已关闭")]
  Closed,

  #[error("write buffer already committed / 写缓冲已提交")]
  Committed,

  #[error("write buffer is not indexed / 写缓冲不可读")]
  Unindexed,
}

pub type Result<T> = std::result::Result<T, Error>;
