#![cfg_attr(docsrs, feature(doc_cfg))]

//! mvb_store - Ordered store collaborator for the batch layer
//! 批处理层所依赖的有序存储
//!
//! Provides what the batch layer consumes from an LSM store:
//! 提供批处理层需要的 LSM 存储能力：
//!
//! - point reads and bounded seeks / 点查与有界定位
//! - indexed and write-only buffers / 可索引与只写缓冲
//! - atomic apply with sync or no-sync durability / 原子应用，同步或异步持久化
//! - range delete, single delete, merge operator / 范围删除、单删、合并算子

mod buf;
mod conf;
mod db;
mod error;
mod merge;
pub mod repr;
mod wal;

pub use buf::WriteBuf;
pub use conf::{Conf, LOG_NAME, ParsedConf};
pub use db::{Db, SyncMode};
pub use error::{Error, Result};
pub use merge::{Append, MergeOperator};
pub use repr::{HEADER_SIZE, Kind, Op};
