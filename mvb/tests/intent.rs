//! Intent demultiplexing tests
//! 意向分流测试

use std::ops::ControlFlow;

use aok::{OK, Void};
use mvb::{
  Conf, Engine, Error, IntentMode, IterKind, IterOptions, MvccIterator,
  PrecedingIntentState::{Absent, PresentInterleaved, PresentSeparated},
  Timestamp, TxnId, VersionedKey,
};
use mvb_key::{LOCK_TABLE_LOWER, LOCK_TABLE_UPPER, LockTableKey};

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

const TXN: TxnId = TxnId::from_u128(7);

fn ts(wall: u64) -> Timestamp {
  Timestamp::new(wall, 0)
}

fn open(mode: IntentMode) -> mvb::Result<Engine> {
  Engine::open(&[Conf::Intent(mode)])
}

/// Every raw key in the lock table
/// 锁表中的全部原始键
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

fn scan(engine: &Engine, kind: IterKind) -> mvb::Result<Vec<(Vec<u8>, u64, Vec<u8>)>> {
  let mut out = Vec::new();
  engine.scan(b"a", b"z", kind, |k, v| {
    out.push((k.key.to_vec(), k.ts.wall, v.to_vec()));
    Ok(ControlFlow::Continue(()))
  })?;
  Ok(out)
}

#[test]
fn test_intent_lifecycle() -> Void {
  for mode in [IntentMode::Plain, IntentMode::Interleaved, IntentMode::Separated] {
    let engine = open(mode)?;
    let mut batch = engine.new_batch();
    assert_eq!(batch.intent_mode(), mode);
    batch.put_intent(b"k", b"intent-1", Absent, false, TXN)?;
    batch.put_mvcc(VersionedKey::new(b"k", ts(4)), b"provisional")?;
    assert_eq!(batch.get(VersionedKey::meta(b"k"))?.as_deref(), Some(&b"intent-1"[..]));
    batch.commit(true);
    drop(batch);

    let separated = mode == IntentMode::Separated;
    assert_eq!(lock_keys(&engine).len(), usize::from(separated));
    assert_eq!(engine.get(VersionedKey::meta(b"k"))?.as_deref(), Some(&b"intent-1"[..]));

    let state = if separated {
      PresentSeparated
    } else {
      PresentInterleaved
    };
    let mut batch = engine.new_batch();
    batch.put_intent(b"k", b"intent-2", state, false, TXN)?;
    batch.commit(false);
    drop(batch);
    assert_eq!(engine.get(VersionedKey::meta(b"k"))?.as_deref(), Some(&b"intent-2"[..]));

    let mut batch = engine.new_batch();
    batch.clear_intent(b"k", state, true, TXN)?;
    assert_eq!(batch.get(VersionedKey::meta(b"k"))?, None);
    batch.commit(false);
    drop(batch);

    assert!(lock_keys(&engine).is_empty());
    assert_eq!(
      scan(&engine, IterKind::VersionedAndIntents)?,
      vec![(b"k".to_vec(), 4, b"provisional".to_vec())]
    );
  }
  OK
}

#[test]
fn test_separated_reads_merged() -> Void {
  let engine = open(IntentMode::Separated)?;
  let mut batch = engine.new_batch();
  for k in [&b"a"[..], b"b", b"c", b"d"] {
    batch.put_mvcc(VersionedKey::new(k, ts(5)), b"v5")?;
    batch.put_mvcc(VersionedKey::new(k, ts(2)), b"v2")?;
  }
  batch.put_intent(b"b", b"ib", Absent, false, TXN)?;
  batch.put_intent(b"d", b"id", Absent, false, TXN)?;
  batch.put_unversioned(b"c", b"meta-c")?;

  let want = vec![
    (b"a".to_vec(), 5, b"v5".to_vec()),
    (b"a".to_vec(), 2, b"v2".to_vec()),
    (b"b".to_vec(), 0, b"ib".to_vec()),
    (b"b".to_vec(), 5, b"v5".to_vec()),
    (b"b".to_vec(), 2, b"v2".to_vec()),
    (b"c".to_vec(), 0, b"meta-c".to_vec()),
    (b"c".to_vec(), 5, b"v5".to_vec()),
    (b"c".to_vec(), 2, b"v2".to_vec()),
    (b"d".to_vec(), 0, b"id".to_vec()),
    (b"d".to_vec(), 5, b"v5".to_vec()),
    (b"d".to_vec(), 2, b"v2".to_vec()),
  ];

  // Buffer over store
  // 缓冲叠加存储
  let mut got = Vec::new();
  batch.scan(b"a", b"z", IterKind::VersionedAndIntents, |k, v| {
    got.push((k.key.to_vec(), k.ts.wall, v.to_vec()));
    Ok(ControlFlow::Continue(()))
  })?;
  assert_eq!(got, want);
  batch.commit(false);
  drop(batch);

  assert_eq!(scan(&engine, IterKind::VersionedAndIntents)?, want);
  // Versioned only: no lock table entries
  // 仅版本键：无锁表条目
  let plain: Vec<_> = want
    .iter()
    .filter(|(k, wall, _)| *wall != 0 || k == b"c")
    .cloned()
    .collect();
  assert_eq!(scan(&engine, IterKind::Versioned)?, plain);
  OK
}

#[test]
fn test_separated_prefix_seek() -> Void {
  let engine = open(IntentMode::Separated)?;
  let mut batch = engine.new_batch();
  batch.put_intent(b"b", b"ib", Absent, false, TXN)?;
  batch.put_intent(b"c", b"ic", Absent, false, TXN)?;
  for wall in [2, 6] {
    batch.put_mvcc(VersionedKey::new(b"b", ts(wall)), b"v")?;
  }

  let mut it = batch.new_mvcc_iter(IterKind::VersionedAndIntents, IterOptions::prefix());
  it.seek_ge(VersionedKey::meta(b"b"))?;
  let mut walls = Vec::new();
  while it.valid() {
    assert_eq!(it.key().key, b"b");
    walls.push(it.key().ts.wall);
    it.next()?;
  }
  assert_eq!(walls, vec![0, 6, 2]);

  // A versioned seek starts past the intent
  // 版本定位从意向之后开始
  it.seek_ge(VersionedKey::new(b"b", ts(6)))?;
  assert!(it.valid());
  assert_eq!(it.key().ts, ts(6));
  drop(it);

  let mut it = batch.new_mvcc_iter(IterKind::VersionedAndIntents, IterOptions::range(b"b", b"d"));
  it.seek_ge(VersionedKey::new(b"b", ts(1)))?;
  assert!(it.valid());
  assert_eq!((it.key().key, it.key().ts), (&b"c"[..], Timestamp::EMPTY));
  assert_eq!(it.value(), b"ic");
  let mut raw = Vec::new();
  LockTableKey::exclusive(b"c", TXN).encode_to(&mut raw);
  assert_eq!(it.raw_key(), &raw[..]);
  OK
}

#[test]
fn test_mode_switch_moves_intent() -> Void {
  let dir = tempfile::tempdir()?;
  let store = Conf::Store(mvb_store::Conf::Dir(dir.path().into()));
  {
    let engine = Engine::open(&[Conf::Intent(IntentMode::Interleaved), store.clone()])?;
    let mut batch = engine.new_batch();
    batch.put_intent(b"k", b"old", Absent, false, TXN)?;
    batch.commit(true);
  }
  {
    let engine = Engine::open(&[Conf::Intent(IntentMode::Separated), store.clone()])?;
    assert_eq!(engine.get(VersionedKey::meta(b"k"))?.as_deref(), Some(&b"old"[..]));
    let mut batch = engine.new_batch();
    batch.put_intent(b"k", b"new", PresentInterleaved, false, TXN)?;
    batch.commit(true);
    drop(batch);
    assert_eq!(lock_keys(&engine).len(), 1);
    assert_eq!(engine.db().get(&VersionedKey::meta(b"k").encode()), None);
  }
  let engine = Engine::open(&[Conf::Intent(IntentMode::Interleaved), store])?;
  assert_eq!(engine.get(VersionedKey::meta(b"k"))?.as_deref(), Some(&b"new"[..]));
  let mut batch = engine.new_batch();
  batch.put_intent(b"k", b"back", PresentSeparated, false, TXN)?;
  batch.commit(true);
  drop(batch);
  assert!(lock_keys(&engine).is_empty());
  assert_eq!(engine.get(VersionedKey::meta(b"k"))?.as_deref(), Some(&b"back"[..]));
  OK
}

#[test]
fn test_separated_clear_interleaved() -> Void {
  let engine = open(IntentMode::Separated)?;
  let mut batch = engine.new_batch();
  // Written by an interleaved writer before the switch
  // 切换前由交错模式写入方写入
  batch.put_unversioned(b"k", b"legacy")?;
  batch.clear_intent(b"k", PresentInterleaved, false, TXN)?;
  batch.commit(false);
  assert_eq!(engine.get(VersionedKey::meta(b"k"))?, None);
  assert!(lock_keys(&engine).is_empty());
  OK
}

#[test]
fn test_duplicate_intent() -> Void {
  let engine = open(IntentMode::Separated)?;
  let mut batch = engine.new_batch();
  batch.put_intent(b"k", b"sep", Absent, false, TXN)?;
  batch.put_unversioned(b"k", b"inter")?;
  assert!(matches!(
    batch.get(VersionedKey::meta(b"k")),
    Err(Error::DuplicateIntent(k)) if &*k == b"k"
  ));
  let r = batch.scan(b"a", b"z", IterKind::VersionedAndIntents, |_, _| {
    Ok(ControlFlow::Continue(()))
  });
  assert!(matches!(r, Err(Error::DuplicateIntent(_))));
  // Versioned keys alone are still readable
  // 单独的版本键仍可读取
  assert_eq!(batch.get(VersionedKey::new(b"k", ts(1)))?, None);
  OK
}

#[test]
fn test_clear_absent_intent() -> Void {
  for mode in [IntentMode::Interleaved, IntentMode::Separated] {
    let engine = open(mode)?;
    let mut batch = engine.new_batch();
    assert!(matches!(
      batch.clear_intent(b"k", Absent, false, TXN),
      Err(Error::InvalidIntentState(_))
    ));
    assert!(batch.is_empty());
  }
  let engine = open(IntentMode::Plain)?;
  let mut batch = engine.new_batch();
  batch.clear_intent(b"k", Absent, false, TXN)?;
  assert_eq!(batch.count(), 1);
  OK
}

#[test]
fn test_clear_range_and_intents() -> Void {
  let engine = open(IntentMode::Separated)?;
  let mut batch = engine.new_batch();
  for k in [&b"a"[..], b"b", b"c", b"d"] {
    batch.put_intent(k, b"i", Absent, false, TXN)?;
    batch.put_mvcc(VersionedKey::new(k, ts(3)), b"v")?;
  }
  batch.commit(false);
  drop(batch);

  let mut batch = engine.new_batch();
  batch.clear_mvcc_range_and_intents(b"b", b"d")?;
  batch.commit(false);
  drop(batch);

  let left: Vec<_> = scan(&engine, IterKind::VersionedAndIntents)?
    .into_iter()
    .map(|(k, wall, _)| (k, wall))
    .collect();
  assert_eq!(
    left,
    vec![
      (b"a".to_vec(), 0),
      (b"a".to_vec(), 3),
      (b"d".to_vec(), 0),
      (b"d".to_vec(), 3)
    ]
  );
  assert_eq!(lock_keys(&engine).len(), 2);
  OK
}
