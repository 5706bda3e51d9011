use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use proptest::prelude::*;

use crate::calls::{random, rational};
use crate::lifecycle::{Lifecycle, boot_with};
use crate::{
    Arg, AxisIndex, BridgeError, CallSpec, ExceptionKind, HostValue, Index, IndexFault,
    InitializationError, Interpreter, IterState, Item, ReleaseStatus, ResultTag, RuntimeConf,
    RuntimeState,
};

/// Helper: a private interpreter over the built-in runtime.
fn interpreter() -> Arc<Interpreter> {
    let conf = RuntimeConf {
        seed: Some(7),
        ..RuntimeConf::default()
    };
    Arc::new(boot_with(&conf).expect("built-in runtime boots"))
}

/// Helper: one interpreter shared by property tests.
fn shared() -> &'static Arc<Interpreter> {
    static SHARED: OnceLock<Arc<Interpreter>> = OnceLock::new();
    SHARED.get_or_init(interpreter)
}

fn arange(interp: &Arc<Interpreter>, n: i64) -> crate::ForeignArray<i64> {
    interp
        .call_as::<i64>(&CallSpec::new("arange").arg(n))
        .unwrap()
}

fn engine_boot() -> Result<Interpreter, InitializationError> {
    boot_with(&RuntimeConf::default())
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_acquire_is_idempotent() {
    let lifecycle = Lifecycle::with_boot(engine_boot);
    let first = lifecycle.acquire().unwrap();
    let second = lifecycle.acquire().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(lifecycle.attempts(), 1);
}

#[test]
fn test_concurrent_first_acquire_boots_once() {
    let lifecycle = Lifecycle::with_boot(engine_boot);
    let interpreters: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..8).map(|_| s.spawn(|| lifecycle.acquire())).collect();
        workers.into_iter().map(|w| w.join().unwrap().unwrap()).collect()
    });
    assert!(interpreters.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(lifecycle.attempts(), 1);
}

#[test]
fn test_failure_is_sticky() {
    let boots = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&boots);
    let lifecycle = Lifecycle::with_boot(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(InitializationError::Config("missing runtime".into()))
    });
    for _ in 0..3 {
        assert_eq!(
            lifecycle.acquire().unwrap_err(),
            InitializationError::Config("missing runtime".into())
        );
    }
    assert_eq!(boots.load(Ordering::SeqCst), 1);
    assert!(matches!(lifecycle.state(), RuntimeState::Failed(_)));
}

#[test]
fn test_handles_outlive_release_quietly() {
    let lifecycle = Lifecycle::with_boot(engine_boot);
    let interp = lifecycle.acquire().unwrap();
    let xs = arange(&interp, 4);
    let raw = interp
        .call_as::<i64>(&CallSpec::new("arange").arg(3i64))
        .unwrap()
        .into_raw();

    assert!(lifecycle.release());
    assert!(interp.is_released());
    assert_eq!(xs.to_vec().unwrap_err(), BridgeError::Released);
    assert_eq!(interp.free(raw.handle, raw.data), ReleaseStatus::RuntimeReleased);
    assert_eq!(
        interp.invoke(&CallSpec::new("zeros").arg(2i64)).unwrap_err(),
        BridgeError::Released
    );
    drop(xs);
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_call_paths() {
    let interp = interpreter();
    // Unqualified names resolve against the root module.
    let total: i64 = interp
        .call(&CallSpec::new("sum").arg(vec![1i64, 2, 3]))
        .unwrap();
    assert_eq!(total, 6);
    let qualified: i64 = interp
        .call(&CallSpec::new("numeric.sum").arg(vec![4i64, 5]))
        .unwrap();
    assert_eq!(qualified, 9);

    let err = interp
        .invoke(&CallSpec::new("no_such_function"))
        .unwrap_err();
    assert_eq!(err.foreign_kind(), Some(ExceptionKind::AttributeError));
}

#[test]
fn test_temporaries_are_released() {
    let interp = interpreter();
    let before = interp.live_handles();
    for _ in 0..10 {
        let xs = arange(&interp, 5);
        let sum: i64 = interp.call(&CallSpec::new("sum").arg(&xs)).unwrap();
        assert_eq!(sum, 10);
    }
    assert_eq!(interp.live_handles(), before);
}

#[test]
fn test_result_tags() {
    let interp = interpreter();
    let spec = CallSpec::new("zeros").arg(3i64).returning(ResultTag::Floats);
    assert_eq!(
        interp.invoke(&spec).unwrap().into_scalar(),
        Some(HostValue::Floats(vec![0.0; 3]))
    );

    let err = interp
        .invoke(&CallSpec::new("sum").arg(vec![1i64]).returning(ResultTag::Str))
        .unwrap_err();
    assert!(matches!(err, BridgeError::Type { .. }));

    // Untagged scalars convert directly.
    let total = interp.invoke(&CallSpec::new("sum").arg(vec![2i64, 3])).unwrap();
    assert_eq!(total.into_scalar(), Some(HostValue::Int(5)));
}

#[test]
fn test_untagged_array_results_are_owned() {
    let interp = interpreter();
    let before = interp.live_handles();
    let ones = interp
        .invoke(&CallSpec::new("ones").arg(2i64))
        .unwrap()
        .into_array()
        .expect("array result");
    assert_eq!(interp.type_name(ones.handle()).unwrap(), "ndarray");
    assert_eq!(interp.live_handles(), before + 1);
    drop(ones);
    assert_eq!(interp.live_handles(), before);

    for _ in 0..5 {
        let _ = interp.invoke(&CallSpec::new("arange").arg(3i64)).unwrap();
    }
    assert_eq!(interp.live_handles(), before);
}

#[test]
fn test_keyword_arguments() {
    let interp = interpreter();
    let xs = interp
        .call_as::<f64>(&CallSpec::new("arange").arg(3i64).kwarg("dtype", "float64"))
        .unwrap();
    assert_eq!(xs.to_vec().unwrap(), vec![0.0, 1.0, 2.0]);

    let ys = interp
        .call_as::<i64>(
            &CallSpec::new("arange")
                .arg(3i64)
                .kwarg_opt::<&str>("dtype", None),
        )
        .unwrap();
    assert_eq!(ys.to_vec().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_omitted_differs_from_none() {
    let interp = interpreter();
    // Trailing omitted: rand() gives a scalar.
    let value: f64 = interp
        .call(&CallSpec::new("random.rand").omitted())
        .unwrap();
    assert!((0.0..1.0).contains(&value));

    // An explicit None is a real argument.
    let err = interp
        .invoke(&CallSpec::new("random.rand").arg(()))
        .unwrap_err();
    assert_eq!(err.foreign_kind(), Some(ExceptionKind::TypeError));

    // Interior omitted keeps later positions in place.
    let draws = interp
        .call_as::<i64>(
            &random::RANDINT.spec([Arg::of(4i64), Arg::Omitted, Arg::of(vec![50i64])]),
        )
        .unwrap();
    let draws = draws.to_vec().unwrap();
    assert_eq!(draws.len(), 50);
    assert!(draws.iter().all(|d| (0..4).contains(d)));
}

#[test]
fn test_foreign_exceptions_are_reported() {
    let interp = interpreter();
    let err = random::randint(&interp, 5, Some(5)).unwrap_err();
    assert_eq!(err.foreign_kind(), Some(ExceptionKind::ValueError));
    assert!(err.to_string().contains("low >= high"));

    let err = interp
        .invoke(&CallSpec::new("gcd").arg(1.5f64).arg(2i64))
        .unwrap_err();
    assert_eq!(err.foreign_kind(), Some(ExceptionKind::TypeError));
}

// ============================================================================
// Call-site tables
// ============================================================================

#[test]
fn test_random_wrappers() {
    let interp = interpreter();
    random::seed(&interp, 42).unwrap();
    let a = random::rand_array(&interp, &[2, 3]).unwrap();
    assert_eq!(a.shape(), &[2, 3]);
    assert!(a.to_vec().unwrap().iter().all(|v| (0.0..1.0).contains(v)));

    let roll = random::randint(&interp, 1, Some(7)).unwrap();
    assert!((1..7).contains(&roll));
    let inclusive = random::random_integers(&interp, 3, None).unwrap();
    assert!((1..=3).contains(&inclusive));

    let bytes = random::bytes(&interp, 16).unwrap();
    assert_eq!(bytes.len(), 16);

    let perm = random::permutation(&interp, 10).unwrap();
    let mut values = perm.to_vec().unwrap();
    values.sort_unstable();
    assert_eq!(values, (0..10).collect::<Vec<_>>());

    let picks = random::choice_array(&interp, 5i64, &[20], true, Some(&[0.0, 0.0, 1.0, 0.0, 0.0]))
        .unwrap()
        .to_vec::<i64>()
        .unwrap();
    assert_eq!(picks, vec![2; 20]);

    let normal = random::normal(&interp, 10.0, 0.0, &[4]).unwrap();
    assert_eq!(normal.to_vec().unwrap(), vec![10.0; 4]);
}

#[test]
fn test_seed_makes_draws_repeatable() {
    let interp = interpreter();
    random::seed(&interp, 3).unwrap();
    let first = random::random_sample_array(&interp, &[5]).unwrap().to_vec().unwrap();
    random::seed(&interp, 3).unwrap();
    let second = random::random_sample_array(&interp, &[5]).unwrap().to_vec().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_shuffle_in_place() {
    let interp = interpreter();
    let xs = arange(&interp, 8);
    random::shuffle(&interp, xs.as_object()).unwrap();
    let mut values = xs.to_vec().unwrap();
    values.sort_unstable();
    assert_eq!(values, (0..8).collect::<Vec<_>>());
}

#[test]
fn test_rational_wrappers() {
    let interp = interpreter();
    assert_eq!(rational::gcd(&interp, 12, 18).unwrap(), 6);
    assert_eq!(rational::lcm(&interp, 4, 6).unwrap(), 12);
    let gcds = rational::gcd_array(&interp, vec![12i64, 20, 7], 4i64).unwrap();
    assert_eq!(gcds.to_vec().unwrap(), vec![4, 4, 1]);
    let lcms = rational::lcm_array(&interp, vec![2i64, 3], vec![3i64, 4]).unwrap();
    assert_eq!(lcms.to_vec().unwrap(), vec![6, 12]);
}

// ============================================================================
// Indexing
// ============================================================================

#[test]
fn test_set_then_get() {
    let interp = interpreter();
    let grid = interp
        .call_as::<f64>(&CallSpec::new("zeros").arg(vec![2i64, 3]))
        .unwrap();
    interp.set(grid.handle(), &Index::from(vec![1, 2]), 4.5).unwrap();
    let value: f64 = interp.get_as(grid.handle(), &Index::from(vec![1, 2])).unwrap();
    assert_eq!(value, 4.5);
    assert_eq!(grid.to_vec().unwrap(), vec![0.0, 0.0, 0.0, 0.0, 0.0, 4.5]);

    // Row assignment broadcasts.
    interp
        .set(grid.handle(), &Index::from(vec![AxisIndex::At(0)]), 1.0)
        .unwrap();
    assert_eq!(grid.to_vec().unwrap(), vec![1.0, 1.0, 1.0, 0.0, 0.0, 4.5]);
}

#[test]
fn test_slices() {
    let interp = interpreter();
    let xs = arange(&interp, 10);
    let strided = interp
        .get(
            xs.handle(),
            &Index::from(vec![AxisIndex::slice(Some(2), Some(8), Some(2))]),
        )
        .unwrap()
        .into_array()
        .unwrap();
    assert_eq!(strided.to_vec::<i64>().unwrap(), vec![2, 4, 6]);

    let tail: Vec<i64> = interp
        .get_as(
            xs.handle(),
            &Index::from(vec![AxisIndex::slice(Some(-3), None, None)]),
        )
        .unwrap();
    assert_eq!(tail, vec![7, 8, 9]);
}

#[test]
fn test_slice_views_share_storage() {
    let interp = interpreter();
    let xs = arange(&interp, 6);
    let view = interp
        .get(xs.handle(), &Index::from(vec![AxisIndex::slice(Some(1), Some(4), None)]))
        .unwrap()
        .into_array()
        .unwrap();
    interp.set(view.handle(), &Index::from(vec![0]), 100i64).unwrap();
    assert_eq!(xs.to_vec().unwrap(), vec![0, 100, 2, 3, 4, 5]);
}

#[test]
fn test_fancy_and_mask_indexing() {
    let interp = interpreter();
    let xs = arange(&interp, 5);
    let picked: Vec<i64> = interp
        .get_as(xs.handle(), &Index::from(vec![AxisIndex::Fancy(vec![4, 0, 0])]))
        .unwrap();
    assert_eq!(picked, vec![4, 0, 0]);

    let mask = vec![true, false, true, false, true];
    interp
        .set(xs.handle(), &Index::from(vec![AxisIndex::Mask(mask)]), -1i64)
        .unwrap();
    assert_eq!(xs.to_vec().unwrap(), vec![-1, 1, -1, 3, -1]);
}

#[test]
fn test_extreme_slice_steps() {
    let interp = interpreter();
    let xs = arange(&interp, 10);
    let before = interp.live_handles();
    let slice = |start, stop, step| Index::from(vec![AxisIndex::slice(start, stop, Some(step))]);

    let first: Vec<i64> = interp
        .get_as(xs.handle(), &slice(Some(0), Some(10), i64::MAX))
        .unwrap();
    assert_eq!(first, vec![0]);
    let last: Vec<i64> = interp.get_as(xs.handle(), &slice(None, None, i64::MIN)).unwrap();
    assert_eq!(last, vec![9]);
    let everything: Vec<i64> = interp
        .get_as(xs.handle(), &slice(Some(i64::MIN), Some(i64::MAX), 3))
        .unwrap();
    assert_eq!(everything, vec![0, 3, 6, 9]);
    let nothing: Vec<i64> = interp
        .get_as(xs.handle(), &slice(Some(i64::MAX), Some(i64::MIN), i64::MAX))
        .unwrap();
    assert!(nothing.is_empty());

    interp
        .set(xs.handle(), &slice(None, None, i64::MIN), -1i64)
        .unwrap();
    assert_eq!(xs.to_vec().unwrap()[9], -1);

    // Rows of a matrix under a step wider than any stride.
    let grid = interp
        .call_array(&CallSpec::new("reshape").arg(&xs).arg(vec![2i64, 5]))
        .unwrap();
    let row: Vec<i64> = interp
        .get_as(
            grid.handle(),
            &Index::from(vec![
                AxisIndex::slice(None, None, Some(i64::MAX)),
                AxisIndex::slice(None, None, Some(i64::MAX)),
            ]),
        )
        .unwrap();
    assert_eq!(row, vec![0]);
    drop(grid);
    assert_eq!(interp.live_handles(), before);
}

#[test]
fn test_multidimensional_index_arrays() {
    let interp = interpreter();
    let xs = arange(&interp, 6);
    let positions = interp
        .call_array(&CallSpec::new("array").arg(vec![0i64, 5, 1, 4]))
        .unwrap();
    let square = interp
        .call_array(&CallSpec::new("reshape").arg(&positions).arg(vec![2i64, 2]))
        .unwrap();

    let picked = interp
        .get(xs.handle(), &Index::from(vec![AxisIndex::FancyArray(square.handle())]))
        .unwrap()
        .into_array()
        .expect("array result");
    assert_eq!(picked.shape(), &[2, 2]);
    let values: Vec<i64> = picked.typed::<i64>().unwrap().to_vec().unwrap();
    assert_eq!(values, vec![0, 5, 1, 4]);

    interp
        .set(xs.handle(), &Index::from(vec![AxisIndex::FancyArray(square.handle())]), 9i64)
        .unwrap();
    assert_eq!(xs.to_vec().unwrap(), vec![9, 9, 2, 3, 9, 9]);
}

#[test]
fn test_oversized_shapes_raise() {
    let interp = interpreter();
    let err = interp
        .invoke(&CallSpec::new("arange").arg(1e300f64))
        .unwrap_err();
    assert_eq!(err.foreign_kind(), Some(ExceptionKind::ValueError));

    let err = interp
        .invoke(&CallSpec::new("zeros").arg(vec![i64::MAX, 4]))
        .unwrap_err();
    assert_eq!(err.foreign_kind(), Some(ExceptionKind::ValueError));

    let err = random::randint_array(&interp, 0, Some(5), &[1 << 40, 1 << 40]).unwrap_err();
    assert_eq!(err.foreign_kind(), Some(ExceptionKind::ValueError));

    let err = interp
        .invoke(&CallSpec::new("random.rand").arg(i64::MAX).arg(2i64))
        .unwrap_err();
    assert_eq!(err.foreign_kind(), Some(ExceptionKind::ValueError));
}

#[test]
fn test_index_faults() {
    let interp = interpreter();
    let xs = arange(&interp, 4);
    let rank = interp.get(xs.handle(), &Index::from(vec![0, 0])).unwrap_err();
    assert_eq!(
        rank,
        BridgeError::Index(IndexFault::Rank {
            expected: 1,
            found: 2
        })
    );

    let range = interp.get(xs.handle(), &Index::from(vec![9])).unwrap_err();
    assert!(matches!(range, BridgeError::Index(IndexFault::OutOfRange(_))));

    let step = interp
        .get(xs.handle(), &Index::from(vec![AxisIndex::slice(None, None, Some(0))]))
        .unwrap_err();
    assert_eq!(step, BridgeError::Index(IndexFault::ZeroStep));

    let shape = interp
        .set(
            xs.handle(),
            &Index::from(vec![AxisIndex::Full]),
            vec![1i64, 2, 3],
        )
        .unwrap_err();
    assert!(matches!(shape, BridgeError::Index(IndexFault::Shape(_))));
}

// ============================================================================
// Iteration
// ============================================================================

#[test]
fn test_iteration_runs_to_exhaustion() {
    let interp = interpreter();
    let xs = arange(&interp, 3);
    let it = interp.get_iter(xs.handle()).unwrap();
    assert_eq!(interp.iter_state(&it).unwrap(), IterState::Created);

    let mut seen = Vec::new();
    while let Some(item) = interp.next(&it).unwrap() {
        seen.push(item.into_scalar().unwrap());
    }
    assert_eq!(seen, vec![HostValue::Int(0), HostValue::Int(1), HostValue::Int(2)]);
    assert_eq!(interp.iter_state(&it).unwrap(), IterState::Exhausted);
    // Stays exhausted.
    assert!(interp.next(&it).unwrap().is_none());
    interp.dispose(it).unwrap();

    // A fresh iterator starts over.
    let again = interp.get_iter(xs.handle()).unwrap();
    assert!(matches!(
        interp.next(&again).unwrap(),
        Some(Item::Scalar(HostValue::Int(0)))
    ));
    interp.dispose(again).unwrap();
}

#[test]
fn test_iterating_rows() {
    let interp = interpreter();
    let grid = interp
        .call_as::<i64>(&CallSpec::new("reshape").arg(&arange(&interp, 6)).arg(vec![3i64, 2]))
        .unwrap();
    let rows: Vec<Vec<i64>> = interp
        .iterate(grid.handle())
        .unwrap()
        .map(|row| row.unwrap().into_array().unwrap().to_vec().unwrap())
        .collect();
    assert_eq!(rows, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
}

#[test]
fn test_dispose_twice_is_an_error() {
    let interp = interpreter();
    let xs = arange(&interp, 2);
    let it = interp.get_iter(xs.handle()).unwrap();
    let raw = it.handle();
    interp.dispose(it).unwrap();
    assert_eq!(
        interp.dispose_handle(raw).unwrap_err(),
        BridgeError::InvalidHandle(raw)
    );
}

// ============================================================================
// Buffers
// ============================================================================

#[test]
fn test_double_free_is_detected() {
    let interp = interpreter();
    let raw = arange(&interp, 4).into_raw();
    assert_eq!(interp.free(raw.handle, raw.data + 8), ReleaseStatus::BufferMismatch);
    assert_eq!(interp.free(raw.handle, raw.data), ReleaseStatus::Ok);
    assert_eq!(interp.free(raw.handle, raw.data), ReleaseStatus::StaleHandle);
    assert_eq!(ReleaseStatus::StaleHandle.code(), 1);
}

#[test]
fn test_buffer_descriptor() {
    let interp = interpreter();
    let xs = interp
        .call_as::<f64>(&CallSpec::new("ones").arg(vec![2i64, 2]))
        .unwrap();
    let descriptor = xs.as_object().descriptor();
    assert_eq!(descriptor.shape, vec![2, 2]);
    assert_eq!(descriptor.byte_len, 4 * 8);
    assert_ne!(descriptor.data, 0);
    assert_eq!(interp.buffer(xs.handle()).unwrap(), *descriptor);
}

#[test]
fn test_typed_view_checks_dtype() {
    let interp = interpreter();
    let err = interp
        .call_as::<f64>(&CallSpec::new("arange").arg(3i64))
        .unwrap_err();
    assert_eq!(err, BridgeError::type_mismatch("float64", "int64"));
}

// ============================================================================
// Fields
// ============================================================================

#[test]
fn test_field_access() {
    let interp = interpreter();
    let grid = interp
        .call_as::<f64>(&CallSpec::new("zeros").arg(vec![2i64, 3]))
        .unwrap();
    let shape: Vec<i64> = interp.get_field("shape", grid.handle()).unwrap();
    assert_eq!(shape, vec![2, 3]);
    let ndim: i64 = interp.get_field("ndim", grid.handle()).unwrap();
    assert_eq!(ndim, 2);

    let missing = interp.get_field::<i64>("colour", grid.handle()).unwrap_err();
    assert_eq!(
        missing,
        BridgeError::Attribute {
            name: "colour".into(),
            type_name: "ndarray".into()
        }
    );
    let wrong = interp.get_field::<String>("size", grid.handle()).unwrap_err();
    assert!(matches!(wrong, BridgeError::Type { .. }));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_calls() {
    let interp = interpreter();
    let baseline = interp.live_handles();
    std::thread::scope(|s| {
        for t in 0..4i64 {
            let interp = &interp;
            s.spawn(move || {
                for i in 0..25 {
                    let n = t * 25 + i + 1;
                    let xs = arange(interp, n);
                    let sum: i64 = interp.call(&CallSpec::new("sum").arg(&xs)).unwrap();
                    assert_eq!(sum, n * (n - 1) / 2);
                    interp.set(xs.handle(), &Index::from(vec![0]), 5i64).unwrap();
                    assert_eq!(interp.get_as::<i64>(xs.handle(), &Index::from(vec![0])).unwrap(), 5);
                }
            });
        }
    });
    assert_eq!(interp.live_handles(), baseline);
}

// ============================================================================
// Properties
// ============================================================================

/// Reference slice semantics over `0..n`.
fn slice_model(n: i64, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<i64> {
    let (lo, hi) = if step > 0 { (0, n) } else { (-1, n - 1) };
    let bound = |v: Option<i64>, default: i64| match v {
        None => default,
        Some(v) if v < 0 => (v + n).clamp(lo, hi),
        Some(v) => v.clamp(lo, hi),
    };
    let mut i = bound(start, if step > 0 { 0 } else { n - 1 });
    let stop = bound(stop, if step > 0 { n } else { -1 });
    let mut out = Vec::new();
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    out
}

fn nonzero_step() -> impl Strategy<Value = i64> {
    prop_oneof![
        4 => -4i64..=-1,
        4 => 1i64..=4,
        1 => Just(i64::MAX),
        1 => Just(i64::MIN),
        1 => Just(i64::MIN + 1),
    ]
}

fn slice_bound() -> impl Strategy<Value = Option<i64>> {
    proptest::option::of(prop_oneof![
        8 => -30i64..30,
        1 => Just(i64::MIN),
        1 => Just(i64::MAX),
    ])
}

proptest! {
    #[test]
    fn prop_slices_match_reference(
        n in 0i64..24,
        start in slice_bound(),
        stop in slice_bound(),
        step in nonzero_step(),
    ) {
        let interp = shared();
        let xs = arange(interp, n);
        let index = Index::from(vec![AxisIndex::slice(start, stop, Some(step))]);
        let got: Vec<i64> = interp.get_as(xs.handle(), &index).unwrap();
        prop_assert_eq!(got, slice_model(n, start, stop, step));
    }

    #[test]
    fn prop_set_get_roundtrip(n in 1i64..32, pick in any::<prop::sample::Index>(), value in any::<i64>()) {
        let interp = shared();
        let xs = arange(interp, n);
        let at = pick.index(n as usize) as i64;
        interp.set(xs.handle(), &Index::from(vec![at]), value).unwrap();
        let back: i64 = interp.get_as(xs.handle(), &Index::from(vec![at - n])).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn prop_randint_stays_in_range(low in -50i64..50, width in 1i64..100) {
        let interp = shared();
        let draw = random::randint(interp, low, Some(low + width)).unwrap();
        prop_assert!((low..low + width).contains(&draw));
    }
}
