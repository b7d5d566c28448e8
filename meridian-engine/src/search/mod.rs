//! Search functions.
//!
//! The driver (`ids`) runs an aspiration-window iterative deepening loop over
//! the recursive main search (`alpha_beta`), which resolves tactical noise at
//! its horizon with a quiescence search (`quiescence`). Work is shared across
//! a pool of threads through split points (`crate::threads`).

mod alpha_beta;
mod history;
mod ids;
mod quiescence;

pub use history::{history_bonus, History};
pub(crate) use alpha_beta::{run_split_master, run_split_slave};

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};

use crate::coretypes::{
    Color, Cp, CpKind, Depth, Move, PlyKind, MAX_MOVES, MAX_PLY, ONE_PLY,
};
use crate::game::{Game, PositionHistory};
use crate::movelist::Line;
use crate::position::Position;
use crate::threads::ThreadPool;
use crate::timeman::{Mode, TimeManager};
use crate::transposition::TranspositionTable;
use crate::uci::{UciInfo, UciResponse};

/// General information gathered from searching a position.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Best move to make for a position discovered.
    pub best_move: Move,
    /// Move expected in reply to the best move, for pondering.
    pub ponder: Option<Move>,
    /// The absolute centipawn evaluation of making the best move.
    pub score: Cp,
    /// The principal variation, or the line of play following the best move.
    pub pv_line: Line,
    /// Depth of the last completed iteration.
    pub depth: PlyKind,
    /// The number of nodes visited in the search.
    pub nodes: u64,
    /// Time spent searching.
    pub elapsed: Duration,
    /// True if the search was cancelled before finishing on its own.
    pub stopped: bool,
}

impl SearchResult {
    /// Which player the absolute score favors, if either.
    pub fn leading(&self) -> Option<Color> {
        self.score.leading()
    }
}

/// Knobs for a single search beyond the time-control mode.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub mode: Mode,
    /// Hard cap on searched nodes.
    pub nodes: Option<u64>,
    /// True while the search runs on the opponent's expected move.
    pub ponder: bool,
    /// Number of principal variations to maintain and report.
    pub multipv: usize,
    /// Playing strength handicap, 0..=20. 20 disables the handicap.
    pub skill_level: u8,
    /// Size of the search thread pool.
    pub threads: usize,
    /// Emit `info` lines while searching.
    pub emit_info: bool,
}

impl SearchSettings {
    pub fn from_mode(mode: Mode) -> Self {
        Self {
            mode,
            nodes: None,
            ponder: false,
            multipv: 1,
            skill_level: 20,
            threads: 1,
            emit_info: true,
        }
    }
}

/// Cross-thread cancellation and ponder state.
///
/// The UCI front end is the only writer of the stop request's input side;
/// every search thread reads it. The condvar wakes a search that finished
/// early while pondering, which must not report until `stop` or `ponderhit`.
#[derive(Debug, Default)]
pub struct Signals {
    stop: AtomicBool,
    ponder: AtomicBool,
    stop_on_ponderhit: AtomicBool,
    waiter: Mutex<()>,
    cond: Condvar,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn set_stop(&self) {
        self.ponder.store(false, Ordering::Relaxed);
        self.stop.store(true, Ordering::Relaxed);
        let _guard = self.waiter.lock();
        self.cond.notify_all();
    }

    pub fn clear(&self) {
        self.stop.store(false, Ordering::Relaxed);
        self.ponder.store(false, Ordering::Relaxed);
        self.stop_on_ponderhit.store(false, Ordering::Relaxed);
    }

    pub fn is_pondering(&self) -> bool {
        self.ponder.load(Ordering::Relaxed)
    }

    pub fn set_pondering(&self, pondering: bool) {
        self.ponder.store(pondering, Ordering::Relaxed);
    }

    pub fn set_stop_on_ponderhit(&self, value: bool) {
        self.stop_on_ponderhit.store(value, Ordering::Relaxed);
    }

    /// The opponent played the expected move: leave ponder mode, stopping
    /// immediately if the search already latched a stop decision.
    pub fn ponderhit(&self) {
        self.ponder.store(false, Ordering::Relaxed);
        if self.stop_on_ponderhit.load(Ordering::Relaxed) {
            self.stop.store(true, Ordering::Relaxed);
        }
        let _guard = self.waiter.lock();
        self.cond.notify_all();
    }

    /// Block until a stop request arrives or pondering ends.
    pub fn wait_for_stop_or_ponderhit(&self) {
        let mut guard = self.waiter.lock();
        while !self.stop_requested() && self.is_pondering() {
            self.cond.wait(&mut guard);
        }
    }

    /// Block until a stop request arrives.
    pub fn wait_for_stop(&self) {
        let mut guard = self.waiter.lock();
        while !self.stop_requested() {
            self.cond.wait(&mut guard);
        }
    }
}

/// One frame of the search stack, scoped to a single ply.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub current_move: Move,
    /// True when the current move may feed the gain table: a quiet,
    /// non-special move with known evals on both sides.
    pub gain_eligible: bool,
    pub excluded: Excluded,
    pub killers: [Move; 2],
    pub mate_killer: Move,
    pub eval: Cp,
    pub eval_margin: Cp,
    pub reduction: Depth,
    pub skip_null_move: bool,
    pub broken_threat: bool,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            current_move: Move::NONE,
            gain_eligible: false,
            excluded: Excluded::None,
            killers: [Move::NONE; 2],
            mate_killer: Move::NONE,
            eval: Cp::NONE,
            eval_margin: Cp::NONE,
            reduction: 0,
            skip_null_move: false,
            broken_threat: false,
        }
    }
}

/// What a singular-extension verification search excludes: either one exact
/// move, or a whole class of moves by the moving piece kind. The class form
/// keeps quiet pawn, king, and checking candidates from being proven
/// "singular" by a near-identical sibling.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Excluded {
    None,
    Move(Move),
    Class(crate::coretypes::PieceKind),
}

impl Excluded {
    pub fn is_none(&self) -> bool {
        matches!(self, Excluded::None)
    }

    /// Bits mixed into the exclusion position key so different exclusions
    /// never share a transposition entry.
    pub fn key_bits(&self) -> u64 {
        match self {
            Excluded::None => 0,
            Excluded::Move(move_) => move_.to_u16() as u64,
            Excluded::Class(kind) => 0x8000_0000 | (65u64 << *kind as u64),
        }
    }
}

/// State shared by every thread participating in one search.
pub(crate) struct SearchShared {
    pub tt: Arc<TranspositionTable>,
    pub history: Arc<History>,
    pub signals: Arc<Signals>,
    pub pool: Arc<ThreadPool>,
    pub settings: SearchSettings,
    pub time_manager: Mutex<TimeManager>,
    pub start_time: Instant,
    pub root_player: Color,
    pub nodes: AtomicU64,
    pub nodes_between_polls: u64,
    /// Depth of the iteration currently running, for depth-capped modes.
    pub current_depth: AtomicU32,
    /// The last aspiration window failed low; suppresses one early-stop rule.
    pub aspiration_fail_low: AtomicBool,
    /// Thread 0 is still searching the first root move.
    pub first_root_move: AtomicBool,
    /// Milliseconds timestamp of the last periodic info heartbeat.
    pub last_info_ms: AtomicU64,
    /// Experimental: score band anchor from deep, drifting iterations.
    pub draw_anchor: AtomicI32,
}

impl SearchShared {
    pub fn nodes_searched(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Per-thread search state. Thread 0 is the master: it owns the root move
/// list and is the only thread that polls the clock and emits output.
pub(crate) struct Searcher {
    pub shared: Arc<SearchShared>,
    pub thread_id: usize,
    pub pos: Position,
    pub rep: PositionHistory,
    pub stack: Vec<Frame>,
    pub nodes_since_poll: u64,
    pub rml: Vec<ids::RootMove>,
    pub best_move_changes: u32,
    /// Innermost split point this thread is working, if any.
    pub active_sp: Option<Arc<crate::threads::SplitPoint>>,
}

/// Two sentinel frames sit below the root so `ply - 1` and `ply - 2`
/// lookups are always in bounds.
pub(crate) const STACK_OFFSET: usize = 2;

impl Searcher {
    pub fn new(shared: Arc<SearchShared>, thread_id: usize, game: &Game) -> Self {
        Self {
            shared,
            thread_id,
            pos: game.position,
            rep: PositionHistory::new(game),
            stack: vec![Frame::default(); MAX_PLY + STACK_OFFSET + 4],
            nodes_since_poll: 0,
            rml: Vec::new(),
            best_move_changes: 0,
            active_sp: None,
        }
    }

    /// Stack frame for a ply, counting the sentinels below the root.
    #[inline]
    pub fn frame(&self, ply: usize) -> &Frame {
        &self.stack[ply + STACK_OFFSET]
    }

    #[inline]
    pub fn frame_mut(&mut self, ply: usize) -> &mut Frame {
        &mut self.stack[ply + STACK_OFFSET]
    }

    /// Frame `back` plies above (toward the root of) `ply`.
    #[inline]
    pub fn frame_back(&self, ply: usize, back: usize) -> &Frame {
        &self.stack[ply + STACK_OFFSET - back]
    }

    /// The position on the board is a draw by rule or repetition of the
    /// search path.
    pub fn is_draw(&self) -> bool {
        self.pos.halfmoves() >= 100
            || self.pos.insufficient_material()
            || self.rep.is_twofold_repetition(self.pos.key())
    }

    /// A beta cutoff happened at this thread's split point or any ancestor.
    pub fn cutoff_occurred(&self) -> bool {
        let mut sp = self.active_sp.clone();
        while let Some(point) = sp {
            if point.beta_cutoff_occurred() {
                return true;
            }
            sp = point.parent.clone();
        }
        false
    }

    pub fn count_node(&mut self) {
        self.shared.nodes.fetch_add(1, Ordering::Relaxed);
        if self.thread_id == 0 {
            self.nodes_since_poll += 1;
            if self.nodes_since_poll > self.shared.nodes_between_polls {
                self.nodes_since_poll = 0;
                self.poll();
            }
        }
    }

    /// Periodic controller run from the master thread: decides whether time
    /// or node budgets expired and emits the once-per-second heartbeat.
    fn poll(&self) {
        let shared = &self.shared;
        let elapsed = shared.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        // Once-per-second searched-nodes heartbeat.
        let last_info = shared.last_info_ms.load(Ordering::Relaxed);
        if elapsed_ms >= 1000 && elapsed_ms.saturating_sub(last_info) >= 1000 {
            shared.last_info_ms.store(elapsed_ms, Ordering::Relaxed);
            if shared.settings.emit_info {
                let info =
                    UciInfo::new().nodes_time(shared.nodes_searched(), elapsed);
                let _ = UciResponse::new_info(info).send();
            }
        }

        // While pondering the clock is the opponent's problem.
        if shared.signals.is_pondering() {
            return;
        }

        let time_manager = shared.time_manager.lock();
        let still_at_first_move = shared.first_root_move.load(Ordering::Relaxed)
            && !shared.aspiration_fail_low.load(Ordering::Relaxed)
            && elapsed > time_manager.available_time();
        let no_more_time = elapsed > time_manager.maximum_time() || still_at_first_move;
        drop(time_manager);

        let mode_stop = shared.settings.mode.stop(
            shared.root_player,
            shared.current_depth.load(Ordering::Relaxed),
            shared.start_time,
        );
        let nodes_exceeded = shared
            .settings
            .nodes
            .map(|cap| shared.nodes_searched() >= cap)
            .unwrap_or(false);

        if (shared.settings.mode.use_time_management() && no_more_time)
            || mode_stop
            || nodes_exceeded
        {
            shared.signals.set_stop();
        }
    }

    /// True when this thread must abandon its current work.
    pub fn must_stop(&self) -> bool {
        self.shared.signals.stop_requested() || self.cutoff_occurred()
    }
}

// Futility and reduction lookup tables, computed once at startup.

static REDUCTIONS: Lazy<[[[i8; 64]; 64]; 2]> = Lazy::new(|| {
    let mut reductions = [[[0i8; 64]; 64]; 2];
    for half_depth in 1..64 {
        for move_count in 1..64 {
            let product = (half_depth as f64).ln() * (move_count as f64).ln();
            let pv_red = product / 3.0;
            let non_pv_red = 0.33 + product / 2.25;
            reductions[1][half_depth][move_count] = if pv_red >= 1.0 {
                (pv_red * ONE_PLY as f64).floor() as i8
            } else {
                0
            };
            reductions[0][half_depth][move_count] = if non_pv_red >= 1.0 {
                (non_pv_red * ONE_PLY as f64).floor() as i8
            } else {
                0
            };
        }
    }
    reductions
});

static FUTILITY_MARGINS: Lazy<[[CpKind; 64]; 16]> = Lazy::new(|| {
    let mut margins = [[0; 64]; 16];
    for depth in 1..16usize {
        for move_count in 0..64usize {
            let log_term = (((depth * depth) as f64) / 2.0).log2() + 1.001;
            margins[depth][move_count] =
                112 * log_term.trunc() as CpKind - 8 * move_count as CpKind + 45;
        }
    }
    margins
});

static FUTILITY_MOVE_COUNTS: Lazy<[usize; 32]> = Lazy::new(|| {
    let mut counts = [0; 32];
    for (depth, count) in counts.iter_mut().enumerate() {
        *count = (3.001 + 0.25 * (depth as f64).powi(2)) as usize;
    }
    counts
});

/// Margin a move must beat to escape futility pruning.
pub(crate) fn futility_margin(depth: Depth, move_count: usize) -> Cp {
    if depth < 7 * ONE_PLY {
        Cp(FUTILITY_MARGINS[depth.max(1) as usize][move_count.min(63)])
    } else {
        Cp(2 * Cp::INFINITE.0)
    }
}

/// Number of moves after which quiet moves become move-count prunable.
pub(crate) fn futility_move_count(depth: Depth) -> usize {
    if depth < 16 * ONE_PLY {
        FUTILITY_MOVE_COUNTS[depth.max(0) as usize]
    } else {
        MAX_MOVES
    }
}

/// Late move reduction in fractional plies.
pub(crate) fn reduction(pv: bool, depth: Depth, move_count: usize) -> Depth {
    REDUCTIONS[pv as usize][((depth / 2).max(0) as usize).min(63)][move_count.min(63)] as Depth
}

/// Run a blocking search over a game with the given settings.
pub fn search_with_settings<G: Into<Game>>(
    game: G,
    settings: SearchSettings,
    tt: Arc<TranspositionTable>,
    signals: Option<Arc<Signals>>,
) -> SearchResult {
    let game = game.into();
    let signals = signals.unwrap_or_default();
    if settings.ponder {
        signals.set_pondering(true);
    }
    ids::think(game, settings, tt, signals)
}

/// Run a blocking, single-threaded search to the given mode's limits.
pub fn search<G: Into<Game>>(
    game: G,
    mode: Mode,
    tt: Arc<TranspositionTable>,
    signals: Option<Arc<Signals>>,
) -> SearchResult {
    search_with_settings(game, SearchSettings::from_mode(mode), tt, signals)
}

/// Spawn a search on a new thread, delivering the result over a channel.
pub fn search_nonblocking<G, T>(
    game: G,
    settings: SearchSettings,
    tt: Arc<TranspositionTable>,
    signals: Arc<Signals>,
    sender: Sender<T>,
) -> JoinHandle<()>
where
    G: Into<Game>,
    T: From<SearchResult> + Send + 'static,
{
    let game = game.into();
    if settings.ponder {
        signals.set_pondering(true);
    }
    std::thread::spawn(move || {
        let result = ids::think(game, settings, tt, signals);
        sender.send(result.into()).ok();
    })
}

/// Pick the poll interval so time-critical searches react quickly.
pub(crate) fn nodes_between_polls(settings: &SearchSettings, time_manager: &TimeManager) -> u64 {
    if let Some(nodes) = settings.nodes {
        return nodes.clamp(1, 30_000);
    }
    let budget = time_manager.maximum_time();
    if budget < Duration::from_millis(1000) {
        1_000
    } else if budget < Duration::from_millis(5000) {
        5_000
    } else {
        30_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn futility_tables_shape() {
        // Margins grow with depth and shrink with move count.
        assert!(futility_margin(2 * ONE_PLY, 0) > futility_margin(ONE_PLY, 0));
        assert!(futility_margin(2 * ONE_PLY, 0) > futility_margin(2 * ONE_PLY, 10));
        // Deep nodes are never futility pruned.
        assert!(futility_margin(8 * ONE_PLY, 0) >= Cp::INFINITE);

        // Move count thresholds grow quadratically with depth.
        assert_eq!(futility_move_count(0), 3);
        assert!(futility_move_count(4) > futility_move_count(2));
        assert_eq!(futility_move_count(16 * ONE_PLY), MAX_MOVES);
    }

    #[test]
    fn reductions_shape() {
        // No reduction for the earliest moves at shallow depth.
        assert_eq!(reduction(true, ONE_PLY, 1), 0);
        // Later moves at higher depth reduce more, and non-PV reduces
        // at least as much as PV.
        assert!(reduction(false, 20 * ONE_PLY, 30) >= reduction(true, 20 * ONE_PLY, 30));
        assert!(reduction(false, 20 * ONE_PLY, 30) > 0);
    }

    #[test]
    fn signals_ponder_latch() {
        let signals = Signals::new();
        signals.set_pondering(true);
        signals.set_stop_on_ponderhit(true);
        assert!(!signals.stop_requested());

        signals.ponderhit();
        assert!(!signals.is_pondering());
        assert!(signals.stop_requested());
    }

    #[test]
    fn excluded_key_bits_distinct() {
        use crate::coretypes::{PieceKind, Square::*};
        let exact = Excluded::Move(Move::new(E2, E4, None));
        let class = Excluded::Class(PieceKind::Pawn);
        assert_ne!(exact.key_bits(), class.key_bits());
        assert_ne!(class.key_bits(), Excluded::Class(PieceKind::King).key_bits());
        assert_eq!(Excluded::None.key_bits(), 0);
    }
}
