//! Time Management

use std::time::{Duration, Instant};

use crate::coretypes::{Color, PlyKind};
use crate::error::{self, ErrorKind};
use crate::uci::SearchControls;

const TIME_RATIO: u32 = 15; // Use 1/15th of remaining time per timed move.
const OVERHEAD: Duration = Duration::from_millis(10); // Expected amount of time loss in ms.

// Returns true if the duration since the start of search is gte to the provided time to move.
fn is_out_of_time(start_time: Instant, move_time: Duration) -> bool {
    start_time.elapsed() + OVERHEAD >= move_time
}

/// There are 4 supported search modes currently, Infinite, Standard, Depth, and MoveTime.
/// Infinite mode: do not stop searching. Search must be signaled externally to stop.
/// Standard mode: standard chess time controls with time per side.
/// Depth mode: search to a given depth.
/// MoveTime mode: search for a specified time per move.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Mode {
    Infinite,           // Search until told to stop. Requires `infinite`.
    Standard(Standard), // Each player has a time limit. Requires `wtime`, `btime`.
    Depth(Depth),       // Search to a given depth. Requires `depth`.
    MoveTime(MoveTime), // Search for a specified amount of time. Requires `movetime`.
}

impl Mode {
    /// Returns true if a search should be stopped.
    pub fn stop(&self, root_player: Color, ply: PlyKind, start_time: Instant) -> bool {
        match self {
            Mode::Infinite => Infinite::stop(),
            Mode::Depth(depth_mode) => depth_mode.stop(ply, start_time),
            Mode::MoveTime(movetime_mode) => movetime_mode.stop(ply, start_time),
            Mode::Standard(standard_mode) => standard_mode.stop(root_player, ply, start_time),
        }
    }

    /// Returns true if this mode manages its own clock, enabling the early
    /// stop heuristics of the iterative deepening driver.
    pub fn use_time_management(&self) -> bool {
        matches!(self, Mode::Standard(_))
    }

    /// Depth cap, if the mode carries one.
    pub fn depth_limit(&self) -> Option<PlyKind> {
        match self {
            Mode::Infinite => None,
            Mode::Depth(depth_mode) => Some(depth_mode.depth),
            Mode::MoveTime(movetime_mode) => movetime_mode.depth,
            Mode::Standard(standard_mode) => standard_mode.depth,
        }
    }

    /// Returns a new Infinite Mode.
    pub fn infinite() -> Self {
        Self::Infinite
    }

    /// Returns a new Depth Mode.
    pub fn depth(ply: PlyKind, movetime: Option<Duration>) -> Self {
        Self::Depth(Depth {
            depth: ply,
            movetime,
        })
    }

    /// Returns a new MoveTime mode.
    pub fn movetime(movetime: Duration, ply: Option<PlyKind>) -> Self {
        Self::MoveTime(MoveTime {
            movetime,
            depth: ply,
        })
    }

    pub fn standard(
        wtime: Duration,
        btime: Duration,
        winc: Option<Duration>,
        binc: Option<Duration>,
        moves_to_go: Option<u32>,
        ply: Option<PlyKind>,
    ) -> Self {
        Self::Standard(Standard {
            wtime,
            btime,
            winc,
            binc,
            moves_to_go,
            depth: ply,
        })
    }
}

impl TryFrom<SearchControls> for Mode {
    type Error = error::Error;
    fn try_from(controls: SearchControls) -> error::Result<Self> {
        if Infinite::satisfied(&controls) {
            Ok(Mode::Infinite)
        } else if Standard::satisfied(&controls) {
            Ok(Mode::standard(
                Duration::from_millis(controls.wtime.unwrap().into()),
                Duration::from_millis(controls.btime.unwrap().into()),
                controls.winc.map(u64::from).map(Duration::from_millis),
                controls.binc.map(u64::from).map(Duration::from_millis),
                controls.moves_to_go,
                controls.depth,
            ))
        } else if MoveTime::satisfied(&controls) {
            Ok(Mode::movetime(
                Duration::from_millis(controls.move_time.unwrap().into()),
                controls.depth,
            ))
        } else if Depth::satisfied(&controls) {
            Ok(Mode::depth(
                controls.depth.unwrap(),
                controls.move_time.map(u64::from).map(Duration::from_millis),
            ))
        } else {
            Err(ErrorKind::ModeNotSatisfied.into())
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Infinite;

impl Infinite {
    fn stop() -> bool {
        false
    }
    /// Returns true if search controls has all required fields for Infinite mode.
    fn satisfied(search_controls: &SearchControls) -> bool {
        search_controls.infinite
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Depth {
    pub depth: PlyKind,
    movetime: Option<Duration>,
}

impl Depth {
    /// Depth mode stops when its depth limit is passed, or optionally if movetime is met.
    fn stop(&self, ply: PlyKind, start_time: Instant) -> bool {
        if ply > self.depth {
            return true;
        }

        if let Some(movetime) = self.movetime {
            if is_out_of_time(start_time, movetime) {
                return true;
            }
        }

        false
    }

    /// Returns true if search controls has all required fields for Depth mode.
    fn satisfied(search_controls: &SearchControls) -> bool {
        search_controls.depth.is_some()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MoveTime {
    movetime: Duration,
    depth: Option<PlyKind>,
}

impl MoveTime {
    /// MoveTime mode stops after a given time has passed, or optionally if its depth is passed.
    fn stop(&self, ply: PlyKind, start_time: Instant) -> bool {
        if is_out_of_time(start_time, self.movetime) {
            return true;
        }
        if let Some(depth) = self.depth {
            if ply > depth {
                return true;
            }
        }

        false
    }

    /// Returns true if search controls has all required fields for MoveTime mode.
    fn satisfied(search_controls: &SearchControls) -> bool {
        search_controls.move_time.is_some()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Standard {
    wtime: Duration,
    btime: Duration,
    winc: Option<Duration>,
    binc: Option<Duration>,
    moves_to_go: Option<u32>,
    depth: Option<PlyKind>,
}

impl Standard {
    /// Standard stops after using some heuristic to determine how much of remaining time to use.
    /// Optionally, stops when a depth is passed.
    fn stop(&self, root_player: Color, ply: PlyKind, start_time: Instant) -> bool {
        if is_out_of_time(start_time, self.player_movetime(root_player)) {
            return true;
        }

        // Optional depth
        if let Some(depth) = self.depth {
            if ply > depth {
                return true;
            }
        }

        false
    }

    fn player_time(&self, root_player: Color) -> Duration {
        match root_player {
            Color::White => self.wtime,
            Color::Black => self.btime,
        }
    }

    fn player_increment(&self, root_player: Color) -> Duration {
        match root_player {
            Color::White => self.winc.unwrap_or_default(),
            Color::Black => self.binc.unwrap_or_default(),
        }
    }

    /// Return the target movetime for a player.
    fn player_movetime(&self, root_player: Color) -> Duration {
        let player_time = self.player_time(root_player);
        let divisor = match self.moves_to_go {
            Some(moves) => moves.clamp(1, TIME_RATIO),
            None => TIME_RATIO,
        };
        player_time / divisor + self.player_increment(root_player) / 2
    }

    /// Returns true if search controls has all required fields for Standard Mode.
    fn satisfied(search_controls: &SearchControls) -> bool {
        search_controls.wtime.is_some() && search_controls.btime.is_some()
    }
}

/// TimeManager turns a search mode into concrete time budgets for the
/// iterative deepening driver: a soft target that early-stop rules compare
/// against, and a hard maximum that the poll enforces. The soft target
/// stretches when the best move keeps changing between iterations.
#[derive(Debug, Clone)]
pub struct TimeManager {
    available: Duration,
    maximum: Duration,
    instability_factor: f64,
}

impl TimeManager {
    pub fn new(mode: &Mode, root_player: Color) -> Self {
        let (available, maximum) = match mode {
            Mode::Standard(standard) => {
                let remaining = standard.player_time(root_player);
                let target = standard.player_movetime(root_player);
                let maximum = std::cmp::min(
                    remaining.saturating_sub(OVERHEAD),
                    std::cmp::max(remaining / 4, target),
                );
                (std::cmp::min(target, maximum), maximum)
            }
            Mode::MoveTime(movetime) => (movetime.movetime, movetime.movetime),
            // Untimed searches never stop on the clock.
            Mode::Infinite | Mode::Depth(_) => (Duration::MAX, Duration::MAX),
        };

        Self {
            available,
            maximum,
            instability_factor: 1.0,
        }
    }

    /// Soft time target; exceeded only while the search is unstable.
    pub fn available_time(&self) -> Duration {
        if self.available == Duration::MAX {
            return self.available;
        }
        self.available.mul_f64(self.instability_factor)
    }

    /// Hard cap; polling stops the search once this is reached.
    pub fn maximum_time(&self) -> Duration {
        self.maximum
    }

    /// Allocate extra time when the best move changed during the last two
    /// iterations, up to twice the base target.
    pub fn pv_instability(&mut self, current_changes: u32, previous_changes: u32) {
        let swings = (current_changes + previous_changes / 2) as f64;
        self.instability_factor = (1.0 + swings / 10.0).min(2.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard() {
        let controls = SearchControls {
            wtime: Some(5000),
            btime: Some(5000),
            ..Default::default()
        };
        let mode = Mode::try_from(controls);

        assert!(mode.is_ok());
        let mode = mode.unwrap();
        assert!(matches!(mode, Mode::Standard(_)));
        assert!(mode.use_time_management());
    }

    #[test]
    fn depth_mode_stops_past_depth() {
        let mode = Mode::depth(4, None);
        let start = Instant::now();
        assert!(!mode.stop(Color::White, 3, start));
        assert!(!mode.stop(Color::White, 4, start));
        assert!(mode.stop(Color::White, 5, start));
        assert!(!mode.use_time_management());
        assert_eq!(mode.depth_limit(), Some(4));
    }

    #[test]
    fn time_manager_budgets() {
        let mode = Mode::standard(
            Duration::from_millis(30_000),
            Duration::from_millis(30_000),
            None,
            None,
            None,
            None,
        );
        let tm = TimeManager::new(&mode, Color::White);
        assert_eq!(tm.available_time(), Duration::from_millis(2000));
        assert!(tm.maximum_time() >= tm.available_time());
        assert!(tm.maximum_time() <= Duration::from_millis(30_000));

        let untimed = TimeManager::new(&Mode::infinite(), Color::White);
        assert_eq!(untimed.maximum_time(), Duration::MAX);
    }

    #[test]
    fn instability_stretches_soft_target() {
        let mode = Mode::movetime(Duration::from_millis(1000), None);
        let mut tm = TimeManager::new(&mode, Color::Black);
        let base = tm.available_time();

        tm.pv_instability(3, 2);
        assert!(tm.available_time() > base);
        // Capped at twice the base.
        tm.pv_instability(100, 100);
        assert_eq!(tm.available_time(), base * 2);
    }
}
