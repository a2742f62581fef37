//! Pooled iterator tests
//! 池化迭代器测试

use std::collections::BTreeSet;

use aok::{OK, Void};
use mvb::{
  Batch, Conf, Engine, EngineIterator, EngineKey, Error, IntentMode, IterKind, IterOptions,
  MvccIterator, PrecedingIntentState::Absent, Timestamp, TxnId, VersionedKey,
};
use mvb_key::{LOCK_TABLE_LOWER, LOCK_TABLE_UPPER};

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

fn ts(wall: u64) -> Timestamp {
  Timestamp::new(wall, 0)
}

fn seeded(engine: &Engine) -> mvb::Result<Batch> {
  let mut batch = engine.new_batch();
  for k in [&b"a"[..], b"b", b"c", b"d"] {
    batch.put_unversioned(k, b"meta")?;
    for wall in [1, 5, 9] {
      batch.put_mvcc(VersionedKey::new(k, ts(wall)), b"v")?;
    }
  }
  Ok(batch)
}

fn drain(it: &mut dyn MvccIterator, from: &[u8]) -> mvb::Result<Vec<(Vec<u8>, u64)>> {
  let mut out = Vec::new();
  it.seek_ge(VersionedKey::meta(from))?;
  while it.valid() {
    let k = it.key();
    out.push((k.key.to_vec(), k.ts.wall));
    it.next()?;
  }
  Ok(out)
}

fn user_keys(entries: &[(Vec<u8>, u64)]) -> Vec<Vec<u8>> {
  let mut keys: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
  keys.dedup();
  keys
}

#[test]
fn test_single_bound_is_enough() -> Void {
  let engine = Engine::open(&[])?;
  let mut batch = seeded(&engine)?;

  let mut it = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::lower(b"b"));
  let got = drain(&mut it, b"a")?;
  assert_eq!(user_keys(&got), vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
  drop(it);

  let mut it = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::upper(b"c"));
  let got = drain(&mut it, b"a")?;
  assert_eq!(user_keys(&got), vec![b"a".to_vec(), b"b".to_vec()]);
  drop(it);

  let mut it = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::prefix());
  let got = drain(&mut it, b"c")?;
  assert_eq!(
    got,
    vec![
      (b"c".to_vec(), 0),
      (b"c".to_vec(), 9),
      (b"c".to_vec(), 5),
      (b"c".to_vec(), 1)
    ]
  );
  OK
}

#[test]
fn test_prefix_seek_at_version() -> Void {
  let engine = Engine::open(&[])?;
  let mut batch = seeded(&engine)?;
  let mut it = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::prefix());
  it.seek_ge(VersionedKey::new(b"b", ts(6)))?;
  let mut walls = Vec::new();
  while it.valid() {
    assert_eq!(it.key().key, b"b");
    walls.push(it.key().ts.wall);
    it.next()?;
  }
  assert_eq!(walls, vec![5, 1]);

  // Missing user key yields nothing, not its neighbour
  // 不存在的用户键不产出任何条目，也不产出相邻键
  it.seek_ge(VersionedKey::meta(b"bb"))?;
  assert!(!it.valid());
  OK
}

#[test]
fn test_upper_bound_moves() -> Void {
  let engine = Engine::open(&[])?;
  let mut batch = seeded(&engine)?;
  let mut it = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::range(b"a", b"d"));
  it.set_upper_bound(b"b");
  assert!(!it.valid());
  assert_eq!(user_keys(&drain(&mut it, b"a")?), vec![b"a".to_vec()]);
  OK
}

#[test]
fn test_slot_buffers_reused() -> Void {
  let engine = Engine::open(&[])?;
  let mut batch = seeded(&engine)?;

  let mut it = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::range(b"a", b"c"));
  assert!(it.is_pooled());
  let first = it.buf_addr();
  assert_eq!(user_keys(&drain(&mut it, b"a")?), vec![b"a".to_vec(), b"b".to_vec()]);
  drop(it);

  let mut it = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::range(b"c", b"e"));
  assert_eq!(it.buf_addr(), first);
  // New bounds are in effect
  // 新边界生效
  assert_eq!(user_keys(&drain(&mut it, b"a")?), vec![b"c".to_vec(), b"d".to_vec()]);
  drop(it);

  let it = batch.new_engine_iter(IterOptions::range(b"a", b"c"));
  let engine_first = it.buf_addr();
  drop(it);
  let it = batch.new_engine_iter(IterOptions::range(b"x", b"z"));
  assert_eq!(it.buf_addr(), engine_first);
  OK
}

#[test]
fn test_recycled_batch_keeps_buffers() -> Void {
  let engine = Engine::open(&[])?;
  let mut batch = seeded(&engine)?;
  let first = batch
    .new_mvcc_iter(IterKind::Versioned, IterOptions::range(b"a", b"c"))
    .buf_addr();
  batch.close();
  let reused = engine.pool().reused();

  let mut batch = engine.new_batch();
  assert_eq!(engine.pool().reused(), reused + 1);
  let again = batch
    .new_mvcc_iter(IterKind::Versioned, IterOptions::range(b"c", b"e"))
    .buf_addr();
  assert_eq!(again, first);
  OK
}

#[test]
fn test_ts_hint_gives_fresh_iter() -> Void {
  let engine = Engine::open(&[])?;
  let mut batch = seeded(&engine)?;
  let mut it = batch.new_mvcc_iter(
    IterKind::Versioned,
    IterOptions::range(b"a", b"c").with_ts(ts(2), ts(6)),
  );
  assert!(!it.is_pooled());
  assert_eq!(
    drain(&mut it, b"a")?,
    vec![
      (b"a".to_vec(), 0),
      (b"a".to_vec(), 5),
      (b"b".to_vec(), 0),
      (b"b".to_vec(), 5)
    ]
  );
  OK
}

#[test]
fn test_engine_iter() -> Void {
  let engine = Engine::open(&[])?;
  let mut batch = engine.new_batch();
  batch.put_engine_key(EngineKey::new(b"y", b"\x01"), b"y1")?;
  batch.put_engine_key(EngineKey::new(b"x", b"v1"), b"xv1")?;
  batch.put_engine_key(EngineKey::new(b"x", &[]), b"x")?;
  batch.put_unversioned(b"x", b"versioned side")?;

  let mut it = batch.new_engine_iter(IterOptions::range(b"a", b"z"));
  it.seek_ge(EngineKey::new(b"a", &[]))?;
  let mut got = Vec::new();
  while it.valid() {
    let k = it.key();
    got.push((k.key.to_vec(), k.version.to_vec(), it.value().to_vec()));
    it.next()?;
  }
  assert_eq!(
    got,
    vec![
      (b"x".to_vec(), vec![], b"x".to_vec()),
      (b"x".to_vec(), b"v1".to_vec(), b"xv1".to_vec()),
      (b"y".to_vec(), b"\x01".to_vec(), b"y1".to_vec()),
    ]
  );
  drop(it);

  let mut it = batch.new_engine_iter(IterOptions::prefix());
  it.seek_ge(EngineKey::new(b"x", &[]))?;
  let mut n = 0;
  while it.valid() {
    assert_eq!(it.key().key, b"x");
    n += 1;
    it.next()?;
  }
  assert_eq!(n, 2);
  drop(it);

  batch.single_clear_engine_key(EngineKey::new(b"x", b"v1"))?;
  batch.clear_engine_key(EngineKey::new(b"y", b"\x01"))?;
  let mut it = batch.new_engine_iter(IterOptions::lower(b"a"));
  it.seek_ge(EngineKey::new(b"a", &[]))?;
  assert!(it.valid());
  assert_eq!(it.raw_key(), &EngineKey::new(b"x", &[]).encode()[..]);
  it.next()?;
  assert!(!it.valid());
  OK
}

#[test]
fn test_engine_version_too_long() -> Void {
  let engine = Engine::open(&[])?;
  let mut batch = engine.new_batch();
  let long = [7u8; 300];
  let too_long = |r: mvb::Result<()>| {
    matches!(
      r,
      Err(Error::Key(mvb_key::Error::MalformedKey("version length")))
    )
  };
  assert!(too_long(batch.put_engine_key(EngineKey::new(b"k", &long), b"v")));
  assert!(too_long(batch.clear_engine_key(EngineKey::new(b"k", &long))));
  assert!(too_long(batch.single_clear_engine_key(EngineKey::new(b"k", &long))));
  assert!(batch.is_empty());

  // Longest version that fits still works
  // 可容纳的最长版本仍然可用
  batch.put_engine_key(EngineKey::new(b"k", &long[..255]), b"v")?;
  let mut it = batch.new_engine_iter(IterOptions::prefix());
  assert!(matches!(
    it.seek_ge(EngineKey::new(b"k", &long)),
    Err(Error::Key(_))
  ));
  it.seek_ge(EngineKey::new(b"k", &[]))?;
  assert!(it.valid());
  assert_eq!(it.key().version, &long[..255]);
  OK
}

#[test]
fn test_clear_iter_range() -> Void {
  let engine = Engine::open(&[])?;
  let mut keys = BTreeSet::new();
  let mut batch = engine.new_batch();
  for _ in 0..3000 {
    let k = format!("k{:05}", fastrand::u32(..100_000));
    let wall = fastrand::u64(1..4);
    batch.put_mvcc(VersionedKey::new(k.as_bytes(), ts(wall)), b"v")?;
    if fastrand::bool() {
      batch.put_unversioned(k.as_bytes(), b"m")?;
    }
    keys.insert(k);
  }
  batch.commit(false);
  drop(batch);

  let (start, end) = (&b"k20000"[..], &b"k70000"[..]);
  let mut it = engine.new_mvcc_iter(IterKind::Versioned, IterOptions::lower(b"k"));
  let mut batch = engine.new_batch();
  batch.clear_iter_range(&mut it, start, end)?;
  batch.commit(false);

  let mut it = engine.new_mvcc_iter(IterKind::Versioned, IterOptions::lower(b"k"));
  let left: BTreeSet<Vec<u8>> = user_keys(&drain(&mut it, b"k")?).into_iter().collect();
  let want: BTreeSet<Vec<u8>> = keys
    .iter()
    .map(|k| k.as_bytes().to_vec())
    .filter(|k| &k[..] < start || &k[..] >= end)
    .collect();
  assert_eq!(left, want);
  OK
}

/// Raw lock table keys of the committed store
/// 已提交存储中的锁表原始键
fn lock_keys(engine: &Engine) -> Vec<Vec<u8>> {
  let (mut key, mut val) = (Vec::new(), Vec::new());
  let mut out = Vec::new();
  let mut lower = LOCK_TABLE_LOWER.to_vec();
  while engine.db().seek(
    std::ops::Bound::Excluded(&lower[..]),
    std::ops::Bound::Excluded(LOCK_TABLE_UPPER),
    &mut key,
    &mut val,
  ) {
    out.push(key.clone());
    lower.clone_from(&key);
  }
  out
}

#[test]
fn test_clear_iter_range_intents() -> Void {
  const TXN: TxnId = TxnId::from_u128(11);
  let engine = Engine::open(&[Conf::Intent(IntentMode::Separated)])?;
  let mut batch = engine.new_batch();
  for i in 0..40u32 {
    let k = format!("k{i:03}");
    if i % 3 != 0 {
      batch.put_intent(k.as_bytes(), b"i", Absent, false, TXN)?;
    }
    for wall in 1..=fastrand::u64(1..4) {
      batch.put_mvcc(VersionedKey::new(k.as_bytes(), ts(wall)), b"v")?;
    }
  }
  batch.commit(false);
  drop(batch);
  let locks = lock_keys(&engine).len();
  assert_eq!(locks, (0..40).filter(|i| i % 3 != 0).count());

  let (start, end) = (&b"k010"[..], &b"k030"[..]);
  let mut it = engine.new_mvcc_iter(IterKind::VersionedAndIntents, IterOptions::lower(b"k"));
  let mut batch = engine.new_batch();
  batch.clear_iter_range(&mut it, start, end)?;
  batch.commit(false);
  drop(batch);

  // Lock entries inside the range went with their versions
  // 范围内的锁条目随版本一并删除
  let in_range = (10..30).filter(|i| i % 3 != 0).count();
  assert_eq!(lock_keys(&engine).len(), locks - in_range);

  let mut it = engine.new_mvcc_iter(IterKind::VersionedAndIntents, IterOptions::lower(b"k"));
  let left = drain(&mut it, b"k")?;
  let want: Vec<Vec<u8>> = (0..40u32)
    .map(|i| format!("k{i:03}").into_bytes())
    .filter(|k| &k[..] < start || &k[..] >= end)
    .collect();
  assert_eq!(user_keys(&left), want);
  // Intents outside the range survive
  // 范围外的意向保留
  assert!(left.contains(&(b"k001".to_vec(), 0)));
  assert!(left.contains(&(b"k031".to_vec(), 0)));
  OK
}

#[test]
fn test_clear_iter_all_intents() -> Void {
  const TXN: TxnId = TxnId::from_u128(12);
  let engine = Engine::open(&[Conf::Intent(IntentMode::Separated)])?;
  let mut batch = engine.new_batch();
  for k in [&b"ka"[..], b"kb", b"kc"] {
    batch.put_intent(k, b"i", Absent, false, TXN)?;
    batch.put_mvcc(VersionedKey::new(k, ts(2)), b"v")?;
  }
  batch.commit(false);
  drop(batch);

  let mut it = engine.new_mvcc_iter(IterKind::VersionedAndIntents, IterOptions::lower(b"k"));
  let mut batch = engine.new_batch();
  batch.clear_iter_range(&mut it, b"k", b"l")?;
  batch.commit(false);
  drop(batch);
  // Covering range empties the lock table
  // 覆盖全部的范围清空锁表
  assert!(lock_keys(&engine).is_empty());
  let mut it = engine.new_mvcc_iter(IterKind::VersionedAndIntents, IterOptions::lower(b"k"));
  assert!(drain(&mut it, b"k")?.is_empty());
  OK
}

#[test]
#[should_panic(expected = "iterator needs prefix mode or a bound")]
fn test_unbounded_iter_is_fatal() {
  let engine = Engine::open(&[]).unwrap();
  let mut batch = engine.new_batch();
  let _ = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::default());
}

#[test]
#[should_panic(expected = "iterator slot already in use")]
fn test_leaked_slot_is_fatal() {
  let engine = Engine::open(&[]).unwrap();
  let mut batch = engine.new_batch();
  let it = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::range(b"a", b"b"));
  std::mem::forget(it);
  let _ = batch.new_mvcc_iter(IterKind::Versioned, IterOptions::range(b"a", b"b"));
}
