#![cfg_attr(docsrs, feature(doc_cfg))]

//! mvb_key - Order-preserving key codec
//! 保序键编码
//!
//! Every physical key shares one layout:
//! 所有物理键共享同一布局：
//!
//! | Part       | Bytes                                        |
//! |------------|----------------------------------------------|
//! | namespace  | 1 (`m` versioned / `e` engine)               |
//! | user key   | escaped, `0x00` -> `0x00 0xFF`               |
//! | terminator | `0x00 0x01`                                  |
//! | suffix     | versioned: 0 or 12 (inverted timestamp)      |
//! |            | engine: version bytes + 1 length byte        |
//!
//! Byte order of the encoding equals logical order, so the store needs no
//! custom comparator. Engine versions are opaque: their order is only
//! defined among versions of equal length.
//! 编码的字节序即逻辑序，存储层无需自定义比较器。引擎版本不透明，仅在长度相同时有定义的顺序。

mod engine;
mod error;
mod escape;
mod lock;
mod ts;
mod versioned;

pub use engine::{
  ENGINE_LOWER, ENGINE_UPPER, EngineKey, MAX_VERSION_LEN, NS_ENGINE, decode_engine,
  decode_engine_to,
};
pub use error::{Error, Result};
pub use escape::TERM;
pub use lock::{
  LOCK_TABLE_LOWER, LOCK_TABLE_PREFIX, LOCK_TABLE_UPPER, LOCK_VERSION_LEN, LockTableKey, Strength,
  TxnId, lock_prefix_to,
};
pub use ts::{TS_SUFFIX_SIZE, Timestamp};
pub use versioned::{
  NS_VERSIONED, VERSIONED_LOWER, VERSIONED_UPPER, VersionedKey, decode_versioned,
  decode_versioned_to,
};

