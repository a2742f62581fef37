//! Intent demultiplexing
//! 意向分流
//!
//! An intent lives either interleaved, as the metadata key of its user key,
//! or separated, as an exclusive lock table entry keyed by the writing
//! transaction. The demultiplexer writes the configured encoding and moves
//! or clears whatever encoding the caller reports as already present.
//! 意向或交错存放为用户键的元数据键，或分离存放为按写事务区分的排他锁表条目。
//! 分流器按配置写入编码，并迁移或清除调用方报告的已有编码。

pub(crate) mod iter;

use log::trace;
use mvb_key::{LockTableKey, TxnId, VersionedKey, lock_prefix_to};
use mvb_store::WriteBuf;

use crate::{Error, Result};

/// Intent strategy, chosen once per engine
/// 意向策略，每个引擎选定一次
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntentMode {
  /// No demultiplexer; intents are plain metadata writes
  /// 无分流器；意向即普通元数据写入
  #[default]
  Plain,
  Interleaved,
  Separated,
}

/// Encoding of the intent before this write, as known by the caller
/// 本次写入前意向的编码，由调用方告知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecedingIntentState {
  Absent,
  PresentInterleaved,
  PresentSeparated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Demux {
  separated: bool,
}

impl Demux {
  pub fn new(mode: IntentMode) -> Option<Self> {
    match mode {
      IntentMode::Plain => None,
      IntentMode::Interleaved => Some(Self { separated: false }),
      IntentMode::Separated => Some(Self { separated: true }),
    }
  }

  pub fn mode(demux: Option<Self>) -> IntentMode {
    match demux {
      None => IntentMode::Plain,
      Some(Self { separated: false }) => IntentMode::Interleaved,
      Some(Self { separated: true }) => IntentMode::Separated,
    }
  }

  #[allow(clippy::too_many_arguments)]
  pub fn put_intent(
    self,
    buf: &mut WriteBuf,
    scratch: &mut Vec<u8>,
    key: &[u8],
    val: &[u8],
    state: PrecedingIntentState,
    txn_did_not_update_meta: bool,
    txn: TxnId,
  ) -> Result<()> {
    match (self.separated, state) {
      (true, PrecedingIntentState::PresentInterleaved) => {
        VersionedKey::meta(key).encode_to(scratch);
        clear(buf, scratch, txn_did_not_update_meta)?;
      }
      (false, PrecedingIntentState::PresentSeparated) => {
        LockTableKey::exclusive(key, txn).encode_to(scratch);
        clear(buf, scratch, txn_did_not_update_meta)?;
      }
      _ => {}
    }
    if self.separated {
      LockTableKey::exclusive(key, txn).encode_to(scratch);
    } else {
      VersionedKey::meta(key).encode_to(scratch);
    }
    buf.set(scratch, val)?;
    trace!(
      "put_intent: separated={} state={state:?} txn={txn}",
      self.separated
    );
    Ok(())
  }

  #[allow(clippy::too_many_arguments)]
  pub fn clear_intent(
    self,
    buf: &mut WriteBuf,
    scratch: &mut Vec<u8>,
    key: &[u8],
    state: PrecedingIntentState,
    txn_did_not_update_meta: bool,
    txn: TxnId,
  ) -> Result<()> {
    match state {
      PrecedingIntentState::Absent => return Err(Error::InvalidIntentState(key.into())),
      PrecedingIntentState::PresentInterleaved => {
        VersionedKey::meta(key).encode_to(scratch);
        clear(buf, scratch, txn_did_not_update_meta)?;
        // A separated writer may have moved it to the lock table
        // 分离模式写入方可能已将其迁至锁表
        if self.separated {
          LockTableKey::exclusive(key, txn).encode_to(scratch);
          buf.del(scratch)?;
        }
      }
      PrecedingIntentState::PresentSeparated => {
        LockTableKey::exclusive(key, txn).encode_to(scratch);
        clear(buf, scratch, txn_did_not_update_meta)?;
      }
    }
    trace!(
      "clear_intent: separated={} state={state:?} txn={txn}",
      self.separated
    );
    Ok(())
  }

  /// Range delete of the lock entries of user keys in `[start, end)`
  /// 删除用户键在 `[start, end)` 内的锁条目
  pub fn clear_range(
    self,
    buf: &mut WriteBuf,
    lower: &mut Vec<u8>,
    upper: &mut Vec<u8>,
    start: &[u8],
    end: &[u8],
  ) -> Result<()> {
    lock_prefix_to(lower, start);
    lock_prefix_to(upper, end);
    buf.del_range(lower, upper)?;
    Ok(())
  }
}

/// Single delete is safe only when the txn wrote the key once
/// 仅当事务只写过该键一次时单删才安全
#[inline]
fn clear(buf: &mut WriteBuf, raw: &[u8], single: bool) -> mvb_store::Result<()> {
  if single {
    buf.single_del(raw)
  } else {
    buf.del(raw)
  }
}
