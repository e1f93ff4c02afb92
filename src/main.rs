//! Binary entry point: parses CLI arguments, partitions the grid, spawns one worker thread per
//! rank, and runs the chosen driver design to completion.
//!
//! Grounded on the original source's `main()` (`ClusterManager::Init` / barrier / timed loop /
//! `ClusterManager::Finalize`) and on the teacher's own binary wiring style for installing a
//! `tracing-subscriber` at startup.

use std::error::Error;
use std::process::ExitCode;
use std::sync::{Arc, Barrier};

use stencil::config_cli::{self, Config};
use stencil::driver::{Driver, SyncMode};
use stencil::dump::{EveryKth, FileDumper};
use stencil::kernel::JacobiMean;
use stencil::time_skew::TimeSkewDriver;
use stencil::timer::Timer;
use stencil_comm::{initialize_from, Configuration};

const DUMP_TEMPORAL_FREQUENCY: usize = 100;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match config_cli::parse(args.into_iter()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("stencil: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("stencil: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let partitioner = stencil_comm::Partitioner::new(config.workers, 0.0, 1.0, config.n)?;

    let builders = if config.workers == 1 {
        Configuration::Thread.builders()
    } else {
        Configuration::Process(config.workers).builders()
    };

    let start_barrier = Arc::new(Barrier::new(config.workers));
    let end_barrier = Arc::new(Barrier::new(config.workers));

    let guards = initialize_from(builders, move |mut allocator| {
        use stencil_comm::Allocate;
        let rank = allocator.index();

        let dumper = if config.output_enabled {
            let (row, col) = partitioner.grid_position(rank);
            let (offset_x, offset_y) = partitioner.offsets(row, col);
            Some(FileDumper::new(
                rank,
                offset_x,
                offset_y,
                partitioner.step(),
                "dumps",
                Box::new(EveryKth::new(DUMP_TEMPORAL_FREQUENCY)),
            ))
        } else {
            None
        };

        start_barrier.wait();
        let mut timer = Timer::new();
        timer.start();

        if config.window > 1 {
            let mut driver =
                TimeSkewDriver::new(JacobiMean, &partitioner, rank, config.window, &mut allocator, None);
            driver.run(config.time_steps, dumper.as_ref());
        } else {
            let mut driver = Driver::new(
                JacobiMean,
                &partitioner,
                rank,
                &mut allocator,
                SyncMode::Asynchronous,
                None,
            );
            driver.run(config.time_steps, dumper.as_ref());
        }

        let elapsed = timer.stop();
        end_barrier.wait();

        if rank == 0 {
            println!(
                "ranks={} n={} steps={} elapsed={:?}",
                config.workers, config.n, config.time_steps, elapsed
            );
        }
    })?;

    for result in guards.join() {
        result?;
    }
    Ok(())
}
