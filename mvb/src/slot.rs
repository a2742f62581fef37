//! Pooled iterator slot
//! 池化迭代器槽位

use std::ops::{Deref, DerefMut};

use crate::{cursor::Cursor, usage::violation};

/// One reusable cursor plus its in-use flag
/// 一个可复用游标及其占用标志
#[derive(Debug, Default)]
pub(crate) struct Slot {
  cursor: Box<Cursor>,
  in_use: bool,
}

impl Slot {
  /// Take the slot until the guard drops; a slot still in use is a caller bug
  /// 占用槽位直到守卫释放；槽位仍被占用属于调用方缺陷
  pub fn acquire(&mut self) -> SlotGuard<'_> {
    if self.in_use {
      violation("iterator slot already in use")
    }
    self.in_use = true;
    SlotGuard { slot: self }
  }

  pub fn reset(&mut self) {
    self.in_use = false;
    self.cursor.release();
  }
}

/// Borrowed cursor; dropping it frees the slot
/// 借出的游标；释放时归还槽位
#[derive(Debug)]
pub(crate) struct SlotGuard<'a> {
  slot: &'a mut Slot,
}

impl Deref for SlotGuard<'_> {
  type Target = Cursor;

  #[inline]
  fn deref(&self) -> &Cursor {
    &self.slot.cursor
  }
}

impl DerefMut for SlotGuard<'_> {
  #[inline]
  fn deref_mut(&mut self) -> &mut Cursor {
    &mut self.slot.cursor
  }
}

impl Drop for SlotGuard<'_> {
  fn drop(&mut self) {
    self.slot.reset();
  }
}
