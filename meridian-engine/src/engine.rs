//! Engine struct acts as a simplified API for the various parts of the engine.

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::book::Book;
use crate::error::{self, ErrorKind};
use crate::game::Game;
use crate::position::Position;
use crate::search::{self, SearchResult, SearchSettings, Signals};
use crate::timeman::Mode;
use crate::uci::SearchControls;
use crate::TranspositionTable;

/// EngineBuilder allows for parameters of an Engine to be set and built once,
/// avoiding repeating costly initialization steps of making then changing an Engine.
///
/// Default values:
///
/// * `game`: Starting chess position
/// * `transpositions_mb`: 1 megabyte
/// * `num_threads`: 1
/// * `multipv`: 1
/// * `skill_level`: 20 (no handicap)
/// * `debug`: true
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    game: Game,
    transpositions_mb: usize,
    num_threads: usize,
    multipv: usize,
    skill_level: u8,
    debug: bool,
}

impl EngineBuilder {
    /// Create a new default EngineBuilder.
    pub fn new() -> Self {
        Self {
            game: Game::start_position(),
            transpositions_mb: 1,
            num_threads: 1,
            multipv: 1,
            skill_level: 20,
            debug: true,
        }
    }

    /// Create and return a new Engine.
    pub fn build(&self) -> Engine {
        let tt = Arc::new(TranspositionTable::with_mb(self.transpositions_mb));
        let signals = Arc::new(Signals::new());

        Engine {
            game: self.game.clone(),
            tt,
            signals,
            num_threads: self.num_threads,
            multipv: self.multipv,
            skill_level: self.skill_level,
            book: None,
            best_book_move: true,
            debug: self.debug,
            search_handle: None,
        }
    }

    /// Set the Engine's initial game state.
    pub fn game<G: Into<Game>>(mut self, game: G) -> Self {
        self.game = game.into();
        self
    }

    /// Set the engine's initial search thread pool size.
    pub fn threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set the engine's initial transposition table size in megabytes.
    pub fn transpositions_mb(mut self, transpositions_mb: usize) -> Self {
        self.transpositions_mb = transpositions_mb;
        self
    }

    /// Set the number of principal variations reported per iteration.
    pub fn multipv(mut self, multipv: usize) -> Self {
        self.multipv = multipv;
        self
    }

    /// Set the playing strength handicap (20 disables it).
    pub fn skill_level(mut self, skill_level: u8) -> Self {
        self.skill_level = skill_level;
        self
    }

    /// Set whether the engine begins in debug mode.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine wraps up all parameters required for running any kind of search.
/// It is stateful because to properly evaluate a chess position the history of
/// moves for the current game need to be tracked.
///
/// If a new game is going to be started, the engine needs to be told so.
pub struct Engine {
    // Search fields
    game: Game,
    tt: Arc<TranspositionTable>,
    signals: Arc<Signals>,
    num_threads: usize,
    multipv: usize,
    skill_level: u8,
    book: Option<Book>,
    best_book_move: bool,
    debug: bool,

    // Meta fields
    search_handle: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    /// Returns reference to current game of engine.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Returns reference to current debug flag of engine.
    pub fn debug(&self) -> &bool {
        &self.debug
    }

    /// Returns reference to engine's transposition table.
    pub fn transposition_table(&self) -> &TranspositionTable {
        &self.tt
    }

    /// Set the game or position for evaluation.
    pub fn set_game<T: Into<Game>>(&mut self, game: T) {
        self.game = game.into();
    }

    /// Update the engine's debug parameter.
    pub fn set_debug(&mut self, new_debug: bool) {
        self.debug = new_debug;
    }

    pub fn set_threads(&mut self, num_threads: usize) {
        self.num_threads = num_threads.max(1);
    }

    pub fn set_multipv(&mut self, multipv: usize) {
        self.multipv = multipv.max(1);
    }

    pub fn set_skill_level(&mut self, skill_level: u8) {
        self.skill_level = skill_level.min(20);
    }

    /// Load an opening book from a file, replacing any current book.
    pub fn load_book(&mut self, path: &str) -> error::Result<()> {
        self.book = Some(Book::open(path)?);
        Ok(())
    }

    pub fn unload_book(&mut self) {
        self.book = None;
    }

    pub fn set_best_book_move(&mut self, best_only: bool) {
        self.best_book_move = best_only;
    }

    /// Informs engine that next search will be from a new game.
    /// Returns Ok if engine succeeded in changing state for a new game, Err otherwise.
    pub fn new_game(&mut self) -> error::Result<()> {
        self.try_clear_transpositions()
    }

    /// Attempt to set a new size for the transposition table in Megabytes.
    /// Table is set only if there is exactly one reference to the table (not used in search).
    /// Returns Ok(new capacity) on success or Err if no change was made.
    pub fn try_set_transpositions_mb(&mut self, new_mb: usize) -> error::Result<usize> {
        Arc::get_mut(&mut self.tt)
            .map(|inner_tt| inner_tt.set_mb(new_mb))
            .ok_or(ErrorKind::EngineTranspositionTableInUse.into())
    }

    /// Attempt to clear the transposition table. Table is cleared only if there
    /// are no other Arcs to the table.
    /// Returns Ok on success or Err if the table was not cleared.
    pub fn try_clear_transpositions(&mut self) -> error::Result<()> {
        Arc::get_mut(&mut self.tt)
            .map(|inner_tt| inner_tt.clear())
            .ok_or(ErrorKind::EngineTranspositionTableInUse.into())
    }

    /// Run a blocking search.
    pub fn search_sync(&mut self, mode: Mode) -> SearchResult {
        // Block until a search is ready to run.
        self.stop();
        self.wait();
        self.signals.clear();

        let (sender, receiver) = mpsc::channel();
        self.search(mode, sender).unwrap();
        self.wait();
        receiver.recv().unwrap()
    }

    /// Run a non-blocking search with plain mode limits.
    pub fn search<T>(&mut self, mode: Mode, sender: Sender<T>) -> error::Result<()>
    where
        T: From<SearchResult> + Send + 'static,
    {
        let controls = SearchControls::default();
        self.start_search(self.settings_for(mode, &controls), sender)
    }

    /// Begin a search for a UCI `go` command.
    /// The engine only runs one search at a time, so if it is not ready, it fails to begin.
    pub fn go<T>(&mut self, controls: SearchControls, sender: Sender<T>) -> error::Result<()>
    where
        T: From<SearchResult> + Send + 'static,
    {
        let mode = Mode::try_from(controls)?;

        // Consult the opening book before burning any clock. Book moves are
        // not used while pondering; the pondered move may differ.
        if !controls.ponder {
            if let Some(book) = &self.book {
                if let Some(book_move) = book.probe(&self.game.position, self.best_book_move) {
                    log::info!("book move {book_move}");
                    let mut pv = crate::movelist::Line::new();
                    pv.push(book_move);
                    let result = SearchResult {
                        best_move: book_move,
                        ponder: None,
                        score: crate::coretypes::Cp::DRAW,
                        pv_line: pv,
                        depth: 0,
                        nodes: 0,
                        elapsed: std::time::Duration::ZERO,
                        stopped: false,
                    };
                    sender.send(result.into()).ok();
                    return Ok(());
                }
            }
        }

        self.start_search(self.settings_for(mode, &controls), sender)
    }

    fn settings_for(&self, mode: Mode, controls: &SearchControls) -> SearchSettings {
        let mut settings = SearchSettings::from_mode(mode);
        settings.nodes = controls.nodes;
        settings.ponder = controls.ponder;
        settings.multipv = self.multipv;
        settings.skill_level = self.skill_level;
        settings.threads = self.num_threads;
        settings
    }

    fn start_search<T>(&mut self, settings: SearchSettings, sender: Sender<T>) -> error::Result<()>
    where
        T: From<SearchResult> + Send + 'static,
    {
        if self.search_handle.is_some() {
            return Err((ErrorKind::EngineAlreadySearching, "failed to begin search").into());
        }

        self.signals.clear();
        // Raise the ponder flag before the search thread exists, so a
        // ponderhit arriving immediately after `go` cannot be lost.
        if settings.ponder {
            self.signals.set_pondering(true);
        }
        let handle = search::search_nonblocking(
            self.game.clone(),
            settings,
            Arc::clone(&self.tt),
            Arc::clone(&self.signals),
            sender,
        );
        self.search_handle = Some(handle);

        Ok(())
    }

    /// Informs the active search to stop searching as soon as possible.
    pub fn stop(&self) {
        self.signals.set_stop();
    }

    /// The opponent played the expected move; pondering becomes a live search.
    pub fn ponderhit(&self) {
        self.signals.ponderhit();
    }

    /// Engine blocks thread until search is completed.
    pub fn wait(&mut self) {
        let handle_opt = self.search_handle.take();

        if let Some(handle) = handle_opt {
            handle.join().unwrap();
        }
    }

    /// Returns true if the engine is ready to start a search.
    /// Only one search may run at a time, so if a search is in progress, engine is not ready.
    pub fn ready(&mut self) -> bool {
        let finished = self
            .search_handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(false);
        if finished {
            self.wait();
        }
        self.search_handle.is_none()
    }

    /// Consumes and shuts down the Engine. Signals any threads to stop searching
    /// and waits for internal resources to close first.
    pub fn shutdown(mut self) {
        self.stop();
        self.wait();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coretypes::{Move, Square::*};

    #[test]
    fn builder_and_sync_search() {
        let mut engine = EngineBuilder::new()
            .transpositions_mb(2)
            .threads(1)
            .debug(false)
            .build();

        let result = engine.search_sync(Mode::depth(3, None));
        assert!(Position::start_position()
            .get_legal_moves()
            .contains(&result.best_move));
        assert!(engine.ready());
    }

    #[test]
    fn engine_finds_simple_mate() {
        use crate::fen::Fen;

        let mut engine = Engine::new();
        let pos = Position::parse_fen(
            "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2",
        )
        .unwrap();
        engine.set_game::<Position>(pos);

        let result = engine.search_sync(Mode::depth(4, None));
        assert_eq!(result.best_move, Move::new(D8, H4, None));
        assert!(result.score.is_mate());
    }

    #[test]
    fn tt_clear_guarded_by_search() {
        let mut engine = Engine::new();
        assert!(engine.new_game().is_ok());
        assert!(engine.try_set_transpositions_mb(2).is_ok());
    }
}
