//! End-to-end properties of the solver that only make sense across a full run: boundary
//! preservation, weak mass conservation, agreement between driver designs, and determinism of
//! a multi-worker run.

use stencil::driver::{Driver, SyncMode};
use stencil::kernel::JacobiMean;
use stencil::time_skew::TimeSkewDriver;
use stencil_comm::allocator::{Generic, Thread};
use stencil_comm::{initialize_from, Configuration, ConfigError, Partitioner};

fn run_plain(
    partitioner: &Partitioner,
    rank: usize,
    allocator: &mut Generic,
    steps: usize,
    mode: SyncMode,
) -> Driver<JacobiMean> {
    let mut driver = Driver::new(JacobiMean, partitioner, rank, allocator, mode, None);
    driver.run(steps, None);
    driver
}

#[test]
fn mis_sized_launches_are_rejected_before_any_allocator_spins_up() {
    assert_eq!(
        Partitioner::new(3, 0.0, 1.0, 40).unwrap_err(),
        ConfigError::NonSquareWorkerCount { p: 3 }
    );
    assert_eq!(
        Partitioner::new(4, 0.0, 1.0, 10).unwrap_err(),
        ConfigError::IndivisibleGrid { n: 10, s: 2 }
    );
}

#[test]
fn serial_single_worker_run_stays_finite_and_bounded() {
    let partitioner = Partitioner::new(1, 0.0, 1.0, 4).unwrap();
    let mut allocator = Generic::Thread(Thread::new());
    let driver = run_plain(&partitioner, 0, &mut allocator, 1, SyncMode::Asynchronous);

    let n = 4i64;
    for x in 0..n {
        for y in 0..n {
            let v = driver.workspace().get_back(x, y);
            assert!(v.is_finite());
            assert!(v.abs() <= 1.0 + 1e-9);
        }
    }
}

#[test]
fn boundary_halo_cells_on_the_global_edge_stay_at_the_dirichlet_constant() {
    // Single worker: every halo cell sits on the global domain edge, so no halo exchange ever
    // writes it. It must still read as the Dirichlet constant after running.
    let partitioner = Partitioner::new(1, 0.0, 1.0, 4).unwrap();
    let mut allocator = Generic::Thread(Thread::new());
    let driver = run_plain(&partitioner, 0, &mut allocator, 3, SyncMode::Asynchronous);

    let n = 4i64;
    for y in 0..n {
        assert_eq!(driver.workspace().get_back(-1, y), 0.0);
        assert_eq!(driver.workspace().get_back(n, y), 0.0);
    }
    for x in 0..n {
        assert_eq!(driver.workspace().get_back(x, -1), 0.0);
        assert_eq!(driver.workspace().get_back(x, n), 0.0);
    }
}

#[test]
fn synchronous_and_asynchronous_designs_agree_over_several_steps() {
    let partitioner = Partitioner::new(1, 0.0, 1.0, 6).unwrap();

    let mut a_sync = Generic::Thread(Thread::new());
    let sync_driver = run_plain(&partitioner, 0, &mut a_sync, 5, SyncMode::Synchronous);

    let mut a_async = Generic::Thread(Thread::new());
    let async_driver = run_plain(&partitioner, 0, &mut a_async, 5, SyncMode::Asynchronous);

    let n = 6i64;
    for x in 0..n {
        for y in 0..n {
            assert_eq!(
                sync_driver.workspace().get_back(x, y),
                async_driver.workspace().get_back(x, y)
            );
        }
    }
}

#[test]
fn time_skewing_window_three_agrees_with_the_non_skewed_driver_over_six_steps() {
    let partitioner = Partitioner::new(1, 0.0, 1.0, 12).unwrap();

    let mut plain_alloc = Generic::Thread(Thread::new());
    let plain = run_plain(&partitioner, 0, &mut plain_alloc, 6, SyncMode::Asynchronous);

    let mut skewed_alloc = Generic::Thread(Thread::new());
    let mut skewed = TimeSkewDriver::new(JacobiMean, &partitioner, 0, 3, &mut skewed_alloc, None);
    skewed.run(6, None);

    let n = 12i64;
    for x in 0..n {
        for y in 0..n {
            assert_eq!(
                plain.workspace().get_back(x, y),
                skewed.workspace().get_back(x, y),
                "mismatch at ({x}, {y})"
            );
        }
    }
}

#[test]
fn max_magnitude_never_increases_across_an_iteration() {
    // The Jacobi mean of 4 values never exceeds their max absolute value, so with no source
    // term the global max magnitude is non-increasing.
    let partitioner = Partitioner::new(1, 0.0, 1.0, 10).unwrap();
    let mut allocator = Generic::Thread(Thread::new());
    let mut driver =
        Driver::new(JacobiMean, &partitioner, 0, &mut allocator, SyncMode::Asynchronous, None);
    driver.initialize();

    let n = 10i64;
    let max_abs = |d: &Driver<JacobiMean>| -> f64 {
        let mut m = 0.0f64;
        for x in 0..n {
            for y in 0..n {
                m = m.max(d.workspace().get_back(x, y).abs());
            }
        }
        m
    };

    let mut previous = max_abs(&driver);
    for k in 0..8 {
        driver.step(k, None);
        let current = max_abs(&driver);
        assert!(current <= previous + 1e-12, "max magnitude grew: {previous} -> {current}");
        previous = current;
    }
}

/// Runs the full 4-worker mesh to completion and returns each rank's flattened back buffer
/// (halo included), ordered by rank.
fn run_four_workers(n: usize, steps: usize) -> Vec<Vec<f64>> {
    let partitioner = Partitioner::new(4, 0.0, 1.0, n).unwrap();
    let builders = Configuration::Process(4).builders();

    let guards = initialize_from(builders, move |mut allocator| {
        use stencil_comm::Allocate;
        let rank = allocator.index();
        let mut driver =
            Driver::new(JacobiMean, &partitioner, rank, &mut allocator, SyncMode::Asynchronous, None);
        driver.run(steps, None);
        (rank, driver.workspace().back_slice().to_vec())
    })
    .unwrap();

    let mut results: Vec<(usize, Vec<f64>)> = guards.join().into_iter().map(Result::unwrap).collect();
    results.sort_by_key(|(rank, _)| *rank);
    results.into_iter().map(|(_, buf)| buf).collect()
}

#[test]
fn a_four_worker_mesh_run_is_deterministic() {
    let first = run_four_workers(8, 5);
    let second = run_four_workers(8, 5);
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}
