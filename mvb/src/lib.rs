#![cfg_attr(docsrs, feature(doc_cfg))]

//! mvb - MVCC write batches over an ordered store
//! 基于有序存储的 MVCC 写批次
//!
//! - `Batch` stages puts, deletes, range deletes and merges, reads its own
//!   writes through pooled iterators and commits atomically
//! - a distinct view shares the buffer of a write-only batch for reads
//! - intents are written interleaved or separated and always read merged
//! - `BatchPool` recycles batch states and their cursor buffers
//!
//! - `Batch` 暂存写入、删除、范围删除与合并，经池化迭代器读取自身写入并原子提交
//! - 独立视图共享只写批次的缓冲以供读取
//! - 意向以交错或分离方式写入，读取时总是合并
//! - `BatchPool` 回收批次状态及其游标缓冲

mod batch;
mod conf;
mod cursor;
mod engine;
mod error;
mod intent;
mod iter;
mod pool;
mod read;
mod slot;
mod usage;

pub use batch::{Batch, GetProto, LogicalOp};
pub use conf::{Conf, DEFAULT_POOL_CAP, ParsedConf};
pub use engine::Engine;
pub use error::{Error, Result};
pub use intent::{IntentMode, PrecedingIntentState};
pub use iter::{EngineIter, EngineIterator, IterKind, IterOptions, MvccIter, MvccIterator};
pub use mvb_key::{EngineKey, Timestamp, TxnId, VersionedKey};
pub use pool::BatchPool;
