//! Runs two named tasks on a two-worker pool and prints their results.

use callpool::config::Config;
use callpool::runner::{demo_tasks, PoolRunner};
use std::io;
use tracing::error;

fn main() {
    callpool::logging::init();

    let runner = PoolRunner::new(Config::default());
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // task failures are already printed; only setup and output errors land here
    if let Err(e) = runner.run(demo_tasks(), &mut out) {
        error!("run failed: {}", e);
    }
}
