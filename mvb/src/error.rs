//! Error types
//! 错误类型

use thiserror::Error;

/// Data and IO errors; misuse is never reported here, it panics
/// 数据与 IO 错误；误用不在此报告，而是直接 panic
#[derive(Debug, Error)]
pub enum Error {
  #[error("empty key / 空键")]
  EmptyKey,

  #[error("key: {0}")]
  Key(#[from] mvb_key::Error),

  #[error("store: {0}")]
  Store(#[from] mvb_store::Error),

  #[error("decode: {0} / 解码失败")]
  Decode(#[from] bitcode::Error),

  #[error("intent state absent for clear: {0:?} / 清除意向时前置状态为空")]
  InvalidIntentState(Box<[u8]>),

  #[error("key has both interleaved and separated intents: {0:?} / 键同时存在交错与分离意向")]
  DuplicateIntent(Box<[u8]>),
}

pub type Result<T> = std::result::Result<T, Error>;
