//! Parallel search support: a fixed pool of worker threads that pick up
//! split points published by a master thread.
//!
//! A thread searching a node with enough depth and remaining moves may hand
//! the rest of the move list to idle workers. The master publishes a
//! `SplitPoint` holding snapshots of its position and stack plus the shared
//! move picker and window, wakes the workers, joins the work itself, and
//! returns only after every slave has left the split point. A beta cutoff
//! observed by any participant stops the others through a flag visible from
//! descendant split points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::coretypes::{Cp, Depth, Move, ONE_PLY};
use crate::game::PositionHistory;
use crate::moveorder::MovePicker;
use crate::position::Position;
use crate::search::{run_split_slave, Frame, SearchShared, Searcher};

/// Depth floor below which splitting is never worth the bookkeeping.
pub const MIN_SPLIT_DEPTH: Depth = 4 * ONE_PLY;
/// Most slaves a single split point will recruit.
const MAX_SLAVES_PER_SPLIT: usize = 8;

/// Shared, lock-guarded state of one split point.
pub(crate) struct SplitShared {
    pub alpha: Cp,
    pub best_value: Cp,
    pub best_move: Move,
    pub move_count: usize,
    pub picker: MovePicker,
    pub slave_mask: u64,
}

/// A node whose remaining moves are searched cooperatively.
pub struct SplitPoint {
    pub(crate) parent: Option<Arc<SplitPoint>>,
    pub(crate) shared: Arc<SearchShared>,
    pub(crate) master: usize,
    pub(crate) pos: Position,
    pub(crate) rep: PositionHistory,
    pub(crate) frames: Vec<Frame>,
    pub(crate) ply: usize,
    pub(crate) depth: Depth,
    pub(crate) beta: Cp,
    pub(crate) pv_node: bool,
    pub(crate) threat_move: Move,
    pub(crate) state: Mutex<SplitShared>,
    pub(crate) cond: Condvar,
    cutoff: AtomicBool,
}

impl SplitPoint {
    /// A participant proved a beta cutoff; everyone else should leave.
    pub fn set_beta_cutoff(&self) {
        self.cutoff.store(true, Ordering::Relaxed);
    }

    pub fn beta_cutoff_occurred(&self) -> bool {
        self.cutoff.load(Ordering::Relaxed)
    }
}

struct WorkerSlot {
    work: Mutex<Option<Arc<SplitPoint>>>,
    cond: Condvar,
}

/// Fixed-size pool of search workers. Thread ids: 0 is the master running
/// the iterative deepening driver; workers are 1..size.
pub struct ThreadPool {
    slots: Vec<WorkerSlot>,
    idle_mask: Mutex<u64>,
    exit: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Create a pool for `size` total search threads and park the workers.
    pub fn new(size: usize) -> Arc<Self> {
        let size = size.clamp(1, 63);
        let workers = size - 1;

        let slots = (0..workers)
            .map(|_| WorkerSlot {
                work: Mutex::new(None),
                cond: Condvar::new(),
            })
            .collect();

        let pool = Arc::new(Self {
            slots,
            idle_mask: Mutex::new(0),
            exit: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        });

        {
            let mut idle = pool.idle_mask.lock();
            for worker in 0..workers {
                *idle |= 1 << (worker + 1);
            }
        }

        let mut handles = pool.handles.lock();
        for worker in 0..workers {
            let pool_ref = Arc::clone(&pool);
            let thread_id = worker + 1;
            handles.push(std::thread::spawn(move || {
                pool_ref.idle_loop(thread_id);
            }));
        }
        drop(handles);

        pool
    }

    /// Total number of search threads, master included.
    pub fn size(&self) -> usize {
        self.slots.len() + 1
    }

    pub fn min_split_depth(&self) -> Depth {
        MIN_SPLIT_DEPTH
    }

    /// True if at least one worker is parked and can be recruited.
    pub fn available_slave_exists(&self) -> bool {
        *self.idle_mask.lock() != 0
    }

    /// Workers park here between assignments; no busy waiting.
    fn idle_loop(&self, thread_id: usize) {
        let slot = &self.slots[thread_id - 1];
        loop {
            let sp = {
                let mut work = slot.work.lock();
                loop {
                    if self.exit.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Some(sp) = work.take() {
                        break sp;
                    }
                    slot.cond.wait(&mut work);
                }
            };

            run_split_slave(Arc::clone(&sp), thread_id);

            // Leave the split point: clear our slave bit and wake the master
            // if it is waiting for the point to drain.
            {
                let mut state = sp.state.lock();
                state.slave_mask &= !(1u64 << thread_id);
                sp.cond.notify_all();
            }

            // Back on the market.
            let mut idle = self.idle_mask.lock();
            *idle |= 1 << thread_id;
        }
    }

    /// Split the remaining moves of the master's current node across idle
    /// workers. Blocks until all participants have finished and returns the
    /// merged (best value, best move, alpha).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn split(
        &self,
        searcher: &mut Searcher,
        pv_node: bool,
        ply: usize,
        depth: Depth,
        alpha: Cp,
        beta: Cp,
        best_value: Cp,
        best_move: Move,
        move_count: usize,
        threat_move: Move,
        picker: MovePicker,
    ) -> (Cp, Move, Cp) {
        let sp = Arc::new(SplitPoint {
            parent: searcher.active_sp.clone(),
            shared: Arc::clone(&searcher.shared),
            master: searcher.thread_id,
            pos: searcher.pos,
            rep: searcher.rep.clone(),
            frames: searcher.stack.clone(),
            ply,
            depth,
            beta,
            pv_node,
            threat_move,
            state: Mutex::new(SplitShared {
                alpha,
                best_value,
                best_move,
                move_count,
                picker,
                slave_mask: 0,
            }),
            cond: Condvar::new(),
            cutoff: AtomicBool::new(false),
        });

        // Recruit idle workers under both the pool and split point locks so
        // a recruited worker always sees its slave bit set.
        {
            let mut idle = self.idle_mask.lock();
            let mut state = sp.state.lock();
            let mut recruited = 0;
            for thread_id in 1..self.size() {
                if recruited >= MAX_SLAVES_PER_SPLIT {
                    break;
                }
                let bit = 1u64 << thread_id;
                if *idle & bit != 0 {
                    *idle &= !bit;
                    state.slave_mask |= bit;
                    recruited += 1;
                    let mut work = self.slots[thread_id - 1].work.lock();
                    *work = Some(Arc::clone(&sp));
                    self.slots[thread_id - 1].cond.notify_one();
                }
            }
        }

        // The master works its own split point like any slave.
        let previous_sp = searcher.active_sp.replace(Arc::clone(&sp));
        crate::search::run_split_master(searcher, &sp);
        searcher.active_sp = previous_sp;

        // Leave only after every slave has left.
        let mut state = sp.state.lock();
        while state.slave_mask != 0 {
            sp.cond.wait(&mut state);
        }
        (state.best_value, state.best_move, state.alpha)
    }

    /// Stop all workers and join their threads.
    pub fn shutdown(&self) {
        self.exit.store(true, Ordering::Relaxed);
        for slot in &self.slots {
            let _work = slot.work.lock();
            slot.cond.notify_all();
        }
        let mut handles = self.handles.lock();
        for handle in handles.drain(..) {
            handle.join().ok();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_starts_and_shuts_down() {
        let pool = ThreadPool::new(4);
        assert_eq!(pool.size(), 4);
        assert!(pool.available_slave_exists());
        pool.shutdown();
        // Idempotent shutdown.
        pool.shutdown();
    }

    #[test]
    fn single_thread_pool_has_no_slaves() {
        let pool = ThreadPool::new(1);
        assert_eq!(pool.size(), 1);
        assert!(!pool.available_slave_exists());
    }

    #[test]
    fn min_split_depth_spans_plies() {
        let pool = ThreadPool::new(2);
        assert_eq!(pool.min_split_depth(), 4 * ONE_PLY);
        pool.shutdown();
    }
}
