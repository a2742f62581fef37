//! Fatal misuse path
//! 致命误用路径

use log::error;

/// Caller bug: closed batch reuse, slot re-acquire, unbounded iterator and
/// the like. Never returned as a value.
/// 调用方缺陷：复用已关闭批次、重复获取槽位、无界迭代器等。从不作为值返回。
#[cold]
#[track_caller]
pub(crate) fn violation(msg: &str) -> ! {
  error!("usage violation: {msg}");
  panic!("usage violation: {msg} / 用法错误")
}
