//! Error types
//! 错误类型

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  #[error("malformed key: {0} / 键格式错误")]
  MalformedKey(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
