//! The ordering harness: shared-state setup, the two worker loops, and the
//! final report.
//!
//! The writer stores `data[i]` and then `flag = i` with nothing between them;
//! the reader spins until it sees `flag == i` and checks whether `data[i]`
//! already holds `2*i`. A per-iteration two-party barrier lines both threads
//! up at the top of every episode to maximize the chance of catching a
//! reordering.

use std::sync::{Arc, Barrier};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::HarnessError;
use crate::shared::{DataBuffer, FlagCell};

/// Iteration count baked in at build time unless overridden via
/// `STORE_ORDER_ITERS` (see build.rs).
pub const DEFAULT_ITERS: usize = 128;

/// State shared by the two workers. The flag and the data buffer are the
/// only shared mutable resources: the writer has exclusive write access, the
/// reader exclusive read access, and nothing synchronizes them beyond the
/// per-episode barrier.
#[derive(Debug)]
struct SharedState {
    flag: FlagCell,
    data: DataBuffer,
    barrier: Barrier,
}

/// Outcome of one probe run. Mismatches are a measurement, not an error:
/// the loop always runs to completion so the full rate is captured.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub iters: usize,
    /// Iteration indices where the data store was not yet visible when the
    /// flag store was observed.
    pub mismatches: Vec<usize>,
}

impl ProbeReport {
    pub fn errors_found(&self) -> usize {
        self.mismatches.len()
    }

    /// Final summary line, e.g. `Ordering errors: 0/128`.
    pub fn summary_line(&self) -> String {
        format!("Ordering errors: {}/{}", self.mismatches.len(), self.iters)
    }
}

/// Owns the shared state and drives one writer/reader pair. All regions are
/// released by drop on every exit path, early failures included.
#[derive(Debug)]
pub struct StoreOrderHarness {
    shared: Arc<SharedState>,
    iters: usize,
}

impl StoreOrderHarness {
    /// Allocate and seed the shared state. If the data buffer allocation
    /// fails after the flag succeeded, the flag region is freed by its own
    /// drop on the error return.
    pub fn new(iters: usize) -> Result<Self, HarnessError> {
        let flag = FlagCell::new()?;
        let data = DataBuffer::new(iters)?;

        // Seed values are never inspected; they just touch the memory.
        flag.store(rand::random());
        data.fill_random();

        debug!(iters, "shared state allocated and seeded");

        Ok(StoreOrderHarness {
            shared: Arc::new(SharedState {
                flag,
                data,
                barrier: Barrier::new(2),
            }),
            iters,
        })
    }

    pub fn iters(&self) -> usize {
        self.iters
    }

    pub fn flag_addr(&self) -> usize {
        self.shared.flag.addr()
    }

    pub fn data_addr(&self) -> usize {
        self.shared.data.addr()
    }

    /// Spawn the writer and reader, wait for both, and assemble the report.
    pub fn run(&self) -> Result<ProbeReport, HarnessError> {
        let iters = self.iters;

        let writer_shared = Arc::clone(&self.shared);
        let writer = thread::Builder::new()
            .name("order-writer".to_string())
            .spawn(move || writer_loop(&writer_shared, iters))
            .map_err(|source| HarnessError::ThreadSpawn {
                role: "writer",
                source,
            })?;

        let reader_shared = Arc::clone(&self.shared);
        let reader = thread::Builder::new()
            .name("order-reader".to_string())
            .spawn(move || reader_loop(&reader_shared, iters))
            .map_err(|source| HarnessError::ThreadSpawn {
                role: "reader",
                source,
            })?;
        // If the reader spawn failed, the writer is parked at the first
        // barrier episode; the fatal exit path tears it down with the
        // process, along with the rest of the shared state.

        writer.join().expect("writer thread panicked");
        let mismatches = reader.join().expect("reader thread panicked");

        info!(errors = mismatches.len(), iters, "probe run complete");

        Ok(ProbeReport { iters, mismatches })
    }
}

/// Writer role: data slot first, then the flag, both relaxed stores. The
/// absence of any release fence between the two is the behavior under test.
fn writer_loop(shared: &SharedState, iters: usize) {
    for i in 0..iters {
        shared.barrier.wait();
        shared.data.store(i, (2 * i) as u32);
        shared.flag.store(i as u32);
    }
}

/// Reader role: spin until the flag publishes iteration `i`, then check the
/// data slot. The spin reads the flag through a relaxed atomic load; with a
/// plain non-atomic read the optimizer may hoist the load out of the loop
/// and spin forever on a stale register value.
fn reader_loop(shared: &SharedState, iters: usize) -> Vec<usize> {
    let mut mismatches = Vec::new();

    for i in 0..iters {
        shared.barrier.wait();
        while shared.flag.load() != i as u32 {
            std::hint::spin_loop();
        }

        let got = shared.data.load(i);
        let expected = (2 * i) as u32;
        if got != expected {
            println!("Error: Ordering mismatch at iteration {}", i);
            warn!(iteration = i, expected, got, "ordering mismatch");
            mismatches.push(i);
        }
    }

    mismatches
}
