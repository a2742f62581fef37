//! Durable log of applied reprs
//! 已应用 repr 的持久日志
//!
//! ```text
//! record: len u32 LE | crc32 u32 LE | repr
//! ```

use std::{
  fs::{self, File, OpenOptions},
  io::{Read, Write},
  path::{Path, PathBuf},
};

use log::{debug, warn};
use zerocopy::{
  FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, byteorder::little_endian::U32,
};

use crate::{Error, LOG_NAME, Result, SyncMode, repr};

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct RecHead {
  len: U32,
  crc: U32,
}

impl RecHead {
  const SIZE: usize = 8;
}

const _: () = assert!(size_of::<RecHead>() == RecHead::SIZE);

pub(crate) struct Wal {
  file: File,
  path: PathBuf,
}

impl Wal {
  /// Open or create the log, feeding every intact record to `replay`.
  /// Returns the last sequence number seen.
  /// 打开或创建日志，将每条完整记录交给 `replay`，返回见到的最后序列号。
  pub fn open(dir: &Path, mut replay: impl FnMut(&[u8]) -> Result<()>) -> Result<(Self, u64)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOG_NAME);
    let mut file = OpenOptions::new()
      .read(true)
      .append(true)
      .create(true)
      .open(&path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    let mut pos = 0;
    let mut seq = 0;
    while pos < buf.len() {
      let Ok((head, body)) = RecHead::read_from_prefix(&buf[pos..]) else {
        break;
      };
      let len = head.len.get() as usize;
      if body.len() < len {
        break;
      }
      let data = &body[..len];
      let crc = crc32fast::hash(data);
      if crc != head.crc.get() {
        // A bad record at the very end is a torn write
        // 末尾的坏记录是写入中断
        if pos + RecHead::SIZE + len == buf.len() {
          break;
        }
        return Err(Error::CrcMismatch(pos as u64, head.crc.get(), crc));
      }
      replay(data)?;
      let last = (repr::seq(data) + repr::count(data) as u64).saturating_sub(1);
      seq = seq.max(last);
      pos += RecHead::SIZE + len;
    }

    if pos < buf.len() {
      warn!(
        "log torn tail: {path:?}, keep {pos} of {} bytes",
        buf.len()
      );
      file.set_len(pos as u64)?;
    }
    debug!("log replayed: {path:?}, seq={seq}, bytes={pos}");
    Ok((Self { file, path }, seq))
  }

  pub fn append(&mut self, data: &[u8], sync: SyncMode) -> Result<()> {
    let head = RecHead {
      len: U32::new(data.len() as u32),
      crc: U32::new(crc32fast::hash(data)),
    };
    let mut rec = Vec::with_capacity(RecHead::SIZE + data.len());
    rec.extend_from_slice(head.as_bytes());
    rec.extend_from_slice(data);
    self.file.write_all(&rec)?;
    match sync {
      SyncMode::Sync => self.file.sync_data()?,
      SyncMode::NoSync => self.file.flush()?,
    }
    debug!("log append: {:?}, bytes={}, sync={sync:?}", self.path, rec.len());
    Ok(())
  }
}
