//! Universal Chess Interface
//!
//! Typed representations of the commands the engine consumes and the
//! responses it produces, plus the option table the front end exposes.
//!
//! The front-end thread owns stdin and stdout. Search threads format
//! responses through these types and send them with `UciResponse::send`,
//! which locks stdout per line.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Write};
use std::hash::{Hash, Hasher};
use std::io;
use std::ops::{Deref, Index, IndexMut};
use std::str::{FromStr, SplitWhitespace};
use std::time::Duration;

use crate::coretypes::{Cp, Move, PieceKind, MAX_PLY};
use crate::fen::Fen;
use crate::game::Game;
use crate::movelist::{Line, MoveHistory};
use crate::Position;

pub const UCI_ID_NAME: &str = concat!("Meridian ", env!("CARGO_PKG_VERSION"));
pub const UCI_ID_AUTHOR: &str = "Meridian authors";

/// UciCommands commands from an external program sent to this chess engine.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum UciCommand {
    Uci,
    Debug(bool),
    IsReady,
    SetOption(RawOption),
    UciNewGame,
    Pos(Game),
    Go(SearchControls),
    Stop,
    PonderHit,
    Quit,
}

impl UciCommand {
    /// Parse a single input line into a UciCommand if possible.
    pub fn parse_command(input_str: &str) -> Result<Self, &'static str> {
        let mut input = input_str.split_whitespace();
        let head = input.next().ok_or("Empty Command")?;

        match head {
            "uci" => Ok(UciCommand::Uci),
            "debug" => Self::parse_debug(input),
            "isready" => Ok(UciCommand::IsReady),
            "setoption" => Self::parse_setoption(input),
            "ucinewgame" => Ok(UciCommand::UciNewGame),
            "position" => Self::parse_pos(input),
            "go" => Self::parse_go(input),
            "stop" => Ok(UciCommand::Stop),
            "ponderhit" => Ok(UciCommand::PonderHit),
            "quit" => Ok(UciCommand::Quit),
            _ => Err("Command unknown"),
        }
    }

    /// Extract a `debug` command if possible.
    /// command: `debug [on | off]`
    fn parse_debug(mut input: SplitWhitespace) -> Result<Self, &'static str> {
        let debug_mode_str = input.next().ok_or("debug missing mode [on | off]")?;

        match debug_mode_str {
            "on" => Ok(Self::Debug(true)),
            "off" => Ok(Self::Debug(false)),
            _ => Err("debug mode invalid argument"),
        }
    }

    /// Extract a `setoption` command if possible.
    /// command: `setoption name [id] (value x)`
    fn parse_setoption(mut input: SplitWhitespace) -> Result<Self, &'static str> {
        let name = input.next().ok_or("setoption missing name")?;
        (name == "name")
            .then_some(())
            .ok_or("setoption not followed by name")?;

        let mut name = String::new();
        let mut value = String::new();
        let mut had_value = false;

        // the id following `name` consists of the input string until the token
        // `value` or end of input is encountered.
        for token in input.by_ref() {
            if token == "value" {
                had_value = true;
                break;
            } else {
                name.push_str(token);
                name.push(' ');
            }
        }
        name.pop(); // Remove trailing space.
        (!name.is_empty())
            .then_some(())
            .ok_or("setoption name not followed by id")?;

        // input iterator is either empty, or "value" has been parsed and the rest
        // of input is the contents of value string.
        if had_value {
            for token in input {
                value.push_str(token);
                value.push(' ');
            }
            value.pop(); // Remove trailing space.
            (!value.is_empty())
                .then_some(())
                .ok_or("setoption value not followed by string")?;
        }

        Ok(UciCommand::SetOption(RawOption {
            name: name.as_str().into(),
            value,
        }))
    }

    /// Extract a `position` command if possible.
    /// command: `position [fen fen_str | startpos] (moves move_list ...)`
    fn parse_pos(mut input: SplitWhitespace) -> Result<Self, &'static str> {
        let position_input = input
            .next()
            .ok_or("position missing description [fen | startpos]")?;

        // Parse a valid position from startpos or FEN, or return an Err(_).
        let position = match position_input {
            "startpos" => Ok(Position::start_position()),
            "fen" => {
                let mut fen_str = String::new();
                let err_str = "position fen malformed";
                for _ in 0..6 {
                    fen_str.push_str(input.next().ok_or(err_str)?);
                    fen_str.push(' ');
                }
                Position::parse_fen(&fen_str).map_err(|_| err_str)
            }
            _ => Err("position description type invalid"),
        }?;

        // Collect the sequence of moves to apply to the position. The full
        // history is retained so repetition detection sees the whole game.
        let mut moves = MoveHistory::new();
        if let Some("moves") = input.next() {
            for move_str in input {
                moves.push(Move::from_str(move_str)?);
            }
        }

        let game =
            Game::new(position, moves).map_err(|_| "position moves provided illegal move")?;
        Ok(Self::Pos(game))
    }

    /// Extract a `go` command if possible.
    /// command: `go [wtime | btime | winc | binc | depth | nodes | mate | movetime | infinite | ponder]*`
    fn parse_go(mut input: SplitWhitespace) -> Result<Self, &'static str> {
        // The following options have no arguments:
        // ponder, infinite
        // The following options must be followed with an integer value:
        // wtime, btime, winc, binc, depth, nodes, mate, movetime, movestogo
        const HAS_U32_ARG: [&str; 8] = [
            "wtime",
            "btime",
            "winc",
            "binc",
            "depth",
            "movestogo",
            "mate",
            "movetime",
        ];

        let mut controls = SearchControls::new();

        while let Some(input_str) = input.next() {
            // Attempt to parse all options with a u32 argument type.
            if HAS_U32_ARG.contains(&input_str) {
                let argument: u32 = input
                    .next()
                    .ok_or("go no argument provided")?
                    .parse()
                    .map_err(|_| "go failed to parse integer")?;

                match input_str {
                    "wtime" => controls.wtime = Some(argument),
                    "btime" => controls.btime = Some(argument),
                    "winc" => controls.winc = Some(argument),
                    "binc" => controls.binc = Some(argument),
                    "depth" => controls.depth = Some(argument),
                    "movestogo" => controls.moves_to_go = Some(argument),
                    "mate" => controls.mate = Some(argument),
                    "movetime" => controls.move_time = Some(argument),
                    _ => return Err("go invalid option"),
                };
            } else if input_str == "nodes" {
                let argument: u64 = input
                    .next()
                    .ok_or("go no argument provided")?
                    .parse()
                    .map_err(|_| "go failed to parse integer")?;
                controls.nodes = Some(argument);
            } else if input_str == "infinite" {
                controls.infinite = true;
            } else if input_str == "ponder" {
                controls.ponder = true;
            } else {
                return Err("go invalid option");
            }
        }

        Ok(UciCommand::Go(controls))
    }
}

impl FromStr for UciCommand {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_command(s)
    }
}

/// Engine to external program communication.
#[derive(Debug, Clone)]
pub enum UciResponse {
    Id,
    UciOk,
    ReadyOk,
    Opt(UciOption),
    BestMove(Move, Option<Move>),
    Info(UciInfo),
}

impl UciResponse {
    pub fn new_option(uci_opt: UciOption) -> Self {
        Self::Opt(uci_opt)
    }

    pub fn new_best_move(move_: Move, ponder: Option<Move>) -> Self {
        Self::BestMove(move_, ponder.filter(|ponder| ponder.is_some()))
    }

    pub fn new_info(uci_info: UciInfo) -> Self {
        Self::Info(uci_info)
    }

    /// Send this UciResponse over stdout.
    pub fn send(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        <io::StdoutLock as io::Write>::write_all(&mut handle, self.to_string().as_ref())?;
        <io::StdoutLock as io::Write>::flush(&mut handle)
    }
}

impl Display for UciResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Id => {
                f.write_str("id name ")?;
                f.write_str(UCI_ID_NAME)?;
                f.write_char('\n')?;
                f.write_str("id author ")?;
                f.write_str(UCI_ID_AUTHOR)?;
                f.write_char('\n')
            }
            Self::UciOk => f.write_str("uciok\n"),
            Self::ReadyOk => f.write_str("readyok\n"),
            Self::BestMove(move_, ponder) => {
                f.write_str("bestmove ")?;
                move_.fmt(f)?;
                if let Some(ponder) = ponder {
                    f.write_str(" ponder ")?;
                    ponder.fmt(f)?;
                }
                f.write_char('\n')
            }
            Self::Opt(uci_opt) => {
                writeln!(f, "{}", uci_opt)
            }
            Self::Info(info) => {
                writeln!(f, "{}", info)
            }
        }
    }
}

/// Print an `info string` diagnostic when debug mode allows it.
pub fn debug(debug_enabled: bool, s: &str) -> io::Result<()> {
    if debug_enabled {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        <io::StdoutLock as io::Write>::write_all(&mut handle, format!("info string {s}\n").as_ref())?;
        <io::StdoutLock as io::Write>::flush(&mut handle)?;
    }
    Ok(())
}

/// Print an `info string error` diagnostic unconditionally.
pub fn error(s: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    <io::StdoutLock as io::Write>::write_all(&mut handle, format!("info string error {s}\n").as_ref())?;
    <io::StdoutLock as io::Write>::flush(&mut handle)
}

/// Bound qualifier on a reported score.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScoreBound {
    Exact,
    Lower,
    Upper,
}

/// Search information lines sent to the GUI.
///
/// Only populated fields are printed. Canonical field order follows the UCI
/// protocol: depth, multipv, score, currmove, nodes, nps, time, pv.
#[derive(Debug, Clone, Default)]
pub struct UciInfo {
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<(Cp, ScoreBound)>,
    pub currmove: Option<(Move, u32)>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub time: Option<Duration>,
    pub pv: Option<Line>,
    pub string: Option<String>,
}

impl UciInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn multipv(mut self, index: u32) -> Self {
        self.multipv = Some(index);
        self
    }

    /// Score relative to the side to move, with its bound qualifier.
    pub fn score(mut self, score: Cp, bound: ScoreBound) -> Self {
        self.score = Some((score, bound));
        self
    }

    pub fn currmove(mut self, move_: Move, number: u32) -> Self {
        self.currmove = Some((move_, number));
        self
    }

    pub fn nodes_time(mut self, nodes: u64, elapsed: Duration) -> Self {
        self.nodes = Some(nodes);
        self.time = Some(elapsed);
        let secs = elapsed.as_secs_f64();
        self.nps = Some(if secs > 0.0 {
            (nodes as f64 / secs) as u64
        } else {
            0
        });
        self
    }

    pub fn pv(mut self, pv: Line) -> Self {
        self.pv = Some(pv);
        self
    }

    pub fn string(mut self, s: String) -> Self {
        self.string = Some(s);
        self
    }
}

/// Convert an engine value into the UCI score encoding.
///
/// Ordinary scores print as centipawns scaled by the pawn value; mate scores
/// print as full moves to mate, negative when the engine is being mated.
pub fn value_to_uci(value: Cp) -> String {
    if value.abs() < Cp(Cp::CHECKMATE.0 - MAX_PLY as i32) {
        format!("cp {}", value.0 * 100 / PieceKind::Pawn.centipawns().0)
    } else if value > Cp(0) {
        format!("mate {}", (Cp::CHECKMATE.0 - value.0 + 1) / 2)
    } else {
        format!("mate {}", (-Cp::CHECKMATE.0 - value.0) / 2)
    }
}

impl Display for UciInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("info")?;
        if let Some(depth) = self.depth {
            write!(f, " depth {}", depth)?;
        }
        if let Some(multipv) = self.multipv {
            write!(f, " multipv {}", multipv)?;
        }
        if let Some((score, bound)) = self.score {
            write!(f, " score {}", value_to_uci(score))?;
            match bound {
                ScoreBound::Lower => f.write_str(" lowerbound")?,
                ScoreBound::Upper => f.write_str(" upperbound")?,
                ScoreBound::Exact => (),
            }
        }
        if let Some((move_, number)) = self.currmove {
            write!(f, " currmove {} currmovenumber {}", move_, number)?;
        }
        if let Some(nodes) = self.nodes {
            write!(f, " nodes {}", nodes)?;
        }
        if let Some(nps) = self.nps {
            write!(f, " nps {}", nps)?;
        }
        if let Some(time) = self.time {
            write!(f, " time {}", time.as_millis())?;
        }
        if let Some(ref pv) = self.pv {
            f.write_str(" pv")?;
            for move_ in pv {
                write!(f, " {}", move_)?;
            }
        }
        if let Some(ref s) = self.string {
            write!(f, " string {}", s)?;
        }
        Ok(())
    }
}

/// Type parsed from a Uci `setoption` command.
/// The value is stringly typed, because it can be a string, bool, integer, or nothing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawOption {
    pub name: CaselessString,
    pub value: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Check {
    pub value: bool,
    pub default: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Spin {
    pub value: i64,
    pub default: i64,
    pub min: i64,
    pub max: i64,
}

impl Spin {
    pub fn value(&self) -> i64 {
        self.value
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Combo {
    pub value: String,
    pub default: String,
    pub choices: HashSet<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Button {
    pub pressed: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UciText {
    pub value: String,
    pub default: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum UciOptionType {
    Check(Check),
    Spin(Spin),
    Combo(Combo),
    Button(Button),
    Str(UciText),
}

impl Display for UciOptionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use UciOptionType::*;
        match self {
            Check(check) => {
                write!(f, "type check default {}", check.default)
            }
            Spin(spin) => {
                write!(
                    f,
                    "type spin default {} min {} max {}",
                    spin.default, spin.min, spin.max
                )
            }
            Combo(combo) => {
                write!(f, "type combo default {}", combo.default)?;
                for choice in &combo.choices {
                    write!(f, " var {}", choice)?;
                }
                Ok(())
            }
            Button(_) => f.write_str("type button"),
            Str(text) => {
                write!(f, "type string default {}", text.default)
            }
        }
    }
}

/// A single typed engine option with its current value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UciOption {
    pub name: CaselessString,
    pub option_type: UciOptionType,
}

impl UciOption {
    /// Create a new UciOption of type check, with a default value.
    pub fn new_check(name: &str, default: bool) -> Self {
        Self {
            name: name.into(),
            option_type: UciOptionType::Check(Check {
                value: default,
                default,
            }),
        }
    }

    /// Create a new UciOption of type spin with a default value, and a min and max.
    pub fn new_spin(name: &str, default: i64, min: i64, max: i64) -> Self {
        assert!(min < max, "Illegal spin, min >= max");
        assert!(default >= min, "Illegal spin, default < min");
        assert!(default <= max, "Illegal spin, default > max");

        Self {
            name: name.into(),
            option_type: UciOptionType::Spin(Spin {
                value: default,
                default,
                min,
                max,
            }),
        }
    }

    /// Create a new UciOption of type combo with a default value and a list of choices.
    /// Default value must be a member of choices, ignoring case.
    pub fn new_combo(name: &str, default: &str, choices: &[&str]) -> Self {
        let default = default.trim().to_string();
        let choices: HashSet<String> = choices.iter().map(|s| s.trim().to_string()).collect();

        assert!(choices
            .iter()
            .any(|item| item.to_lowercase() == default.to_lowercase()));

        Self {
            name: name.into(),
            option_type: UciOptionType::Combo(Combo {
                value: default.clone(),
                default,
                choices,
            }),
        }
    }

    /// Create a new UciOption of type button with a default state of pressed or not pressed.
    pub fn new_button(name: &str, pressed: bool) -> Self {
        Self {
            name: name.into(),
            option_type: UciOptionType::Button(Button { pressed }),
        }
    }

    /// Create a new UciOption of type string with a default value.
    pub fn new_string(name: &str, default: &str) -> Self {
        Self {
            name: name.into(),
            option_type: UciOptionType::Str(UciText {
                value: default.trim().to_string(),
                default: default.trim().to_string(),
            }),
        }
    }

    pub fn check(&self) -> &Check {
        match &self.option_type {
            UciOptionType::Check(check) => check,
            _ => panic!("option {} is not a check", self.name.0),
        }
    }

    pub fn check_mut(&mut self) -> &mut Check {
        match &mut self.option_type {
            UciOptionType::Check(check) => check,
            _ => panic!("option is not a check"),
        }
    }

    pub fn spin(&self) -> &Spin {
        match &self.option_type {
            UciOptionType::Spin(spin) => spin,
            _ => panic!("option {} is not a spin", self.name.0),
        }
    }

    pub fn spin_mut(&mut self) -> &mut Spin {
        match &mut self.option_type {
            UciOptionType::Spin(spin) => spin,
            _ => panic!("option is not a spin"),
        }
    }

    pub fn button(&self) -> &Button {
        match &self.option_type {
            UciOptionType::Button(button) => button,
            _ => panic!("option {} is not a button", self.name.0),
        }
    }

    pub fn button_mut(&mut self) -> &mut Button {
        match &mut self.option_type {
            UciOptionType::Button(button) => button,
            _ => panic!("option is not a button"),
        }
    }

    pub fn text(&self) -> &UciText {
        match &self.option_type {
            UciOptionType::Str(text) => text,
            _ => panic!("option {} is not a string", self.name.0),
        }
    }

    /// Given a RawOption, try to extract a typed value from it's stringly-typed value.
    /// The type of the parsed value must match the value of this UciOptionType value.
    /// This returns Ok(()) on success.
    pub fn try_update(&mut self, raw_opt: &RawOption) -> Result<(), &'static str> {
        (self.name == raw_opt.name)
            .then_some(())
            .ok_or("names do not match")?;

        match self.option_type {
            UciOptionType::Check(ref mut check) => {
                check.value = bool::from_str(&raw_opt.value).map_err(|_| "raw value not a bool")?;
            }
            UciOptionType::Spin(ref mut spin) => {
                let new_value: i64 = raw_opt.value.parse().map_err(|_| "raw value not an int")?;
                (spin.min..=spin.max)
                    .contains(&new_value)
                    .then_some(())
                    .ok_or("value out of range")?;
                spin.value = new_value;
            }
            UciOptionType::Combo(ref mut combo) => {
                combo
                    .choices
                    .contains(&raw_opt.value)
                    .then_some(())
                    .ok_or("value not a valid choice")?;
                combo.value = raw_opt.value.clone();
            }
            UciOptionType::Button(ref mut button) => button.pressed = true,
            UciOptionType::Str(ref mut text) => text.value = raw_opt.value.clone(),
        };

        Ok(())
    }
}

impl Display for UciOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "option name {} {}", self.name.0, self.option_type)
    }
}

/// CaselessString is a String wrapper that compares and hashes a string with
/// ignored casing and leading/trailing whitespace.
/// It retains casing for printing, and removes leading/trailing whitespace.
#[derive(Debug, Clone)]
pub struct CaselessString(pub String);

impl PartialEq for CaselessString {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_lowercase() == other.0.to_lowercase()
    }
}
impl Eq for CaselessString {}

impl PartialEq<&str> for CaselessString {
    fn eq(&self, other: &&str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }
}

impl Hash for CaselessString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_lowercase().hash(state);
    }
}

impl Deref for CaselessString {
    type Target = String;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for CaselessString {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

/// Underlying type for UciOptions.
type OptionsMap = HashMap<CaselessString, UciOption>;

/// A HashMap wrapper for UciOption that has extra functionality for UciOption.
/// An option can only be updated with an option of equivalent type.
#[derive(Debug, Default)]
pub struct UciOptions(OptionsMap);

impl UciOptions {
    /// Create a new UciOptions using underlying HashMap::new().
    pub fn new() -> Self {
        Self(OptionsMap::new())
    }

    /// Insert stores a UciOption using it's name as the key and the full item as the value.
    /// It always replaces what is located in the container completely.
    /// If an item existed in the container, the item is removed and returned.
    pub fn insert(&mut self, uci_opt: UciOption) -> Option<UciOption> {
        let key = uci_opt.name.clone();
        // Remove key before inserting ensures Key capitalization is updated.
        let old_value = self.0.remove(&key);
        self.0.insert(key, uci_opt);
        old_value
    }

    /// UciOptions are uniquely defined by their name. Returns true if a key exists.
    pub fn contains<K: Into<CaselessString>>(&self, key: K) -> bool {
        let key: CaselessString = key.into();
        self.0.contains_key(&key)
    }

    /// Attempts to update a stored UciOption with the value in a RawOption.
    /// This will not create a new UciOption entry.
    /// On success, returns a mutable reference to the updated option.
    pub fn update(&mut self, raw_opt: &RawOption) -> Result<&mut UciOption, &'static str> {
        let option = self
            .0
            .get_mut(&raw_opt.name)
            .ok_or("RawOption name not a valid UciOption")?;
        option.try_update(raw_opt)?;
        Ok(option)
    }
}

impl Deref for UciOptions {
    type Target = OptionsMap;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Index<&str> for UciOptions {
    type Output = UciOption;
    fn index(&self, name: &str) -> &Self::Output {
        self.0
            .get(&CaselessString::from(name))
            .unwrap_or_else(|| panic!("no option named {name}"))
    }
}

impl IndexMut<&str> for UciOptions {
    fn index_mut(&mut self, name: &str) -> &mut Self::Output {
        self.0
            .get_mut(&CaselessString::from(name))
            .unwrap_or_else(|| panic!("no option named {name}"))
    }
}

/// Raw values parsed from a `go` command. Converted into a `timeman::Mode`
/// plus node/ponder limits by the engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SearchControls {
    pub wtime: Option<u32>,
    pub btime: Option<u32>,
    pub winc: Option<u32>,
    pub binc: Option<u32>,
    pub moves_to_go: Option<u32>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub mate: Option<u32>,
    pub move_time: Option<u32>,
    pub infinite: bool,
    pub ponder: bool,
}

impl SearchControls {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SearchControls {
    fn default() -> Self {
        Self {
            wtime: None,
            btime: None,
            winc: None,
            binc: None,
            moves_to_go: None,
            depth: None,
            nodes: None,
            mate: None,
            move_time: None,
            infinite: false,
            ponder: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coretypes::Square::*;

    /// Tests commands: uci, isready, ucinewgame, stop, ponderhit, quit
    #[test]
    fn parse_command_singles() {
        {
            let input = "uci";
            let command = UciCommand::parse_command(input);
            assert_eq!(UciCommand::Uci, command.unwrap());
        }
        {
            let input = "isready\n";
            let command = UciCommand::parse_command(input);
            assert_eq!(UciCommand::IsReady, command.unwrap());
        }
        {
            let input = "ucinewgame";
            let command = UciCommand::parse_command(input);
            assert_eq!(UciCommand::UciNewGame, command.unwrap());
        }
        {
            let input = "stop";
            let command = UciCommand::parse_command(input);
            assert_eq!(UciCommand::Stop, command.unwrap());
        }
        {
            let input = "ponderhit";
            let command = UciCommand::parse_command(input);
            assert_eq!(UciCommand::PonderHit, command.unwrap());
        }
        {
            let input = "quit";
            let command = UciCommand::parse_command(input);
            assert_eq!(UciCommand::Quit, command.unwrap());
        }
    }

    #[test]
    fn parse_command_debug() {
        let on = "debug on";
        let off = "debug off";
        let command_on = UciCommand::parse_command(on);
        let command_off = UciCommand::parse_command(off);
        assert_eq!(UciCommand::Debug(true), command_on.unwrap());
        assert_eq!(UciCommand::Debug(false), command_off.unwrap());
    }

    #[test]
    fn parse_command_setoption() {
        {
            let input = "setoption name Hash value 100\n";
            let command = UciCommand::parse_command(input);
            let raw_opt = RawOption {
                name: "hash".into(),
                value: String::from("100"),
            };
            assert_eq!(UciCommand::SetOption(raw_opt), command.unwrap());
        }
        {
            let input = "setoption name Multi Word Name value this is a test string.c";
            let command = UciCommand::parse_command(input);
            let raw_opt = RawOption {
                name: "Multi Word Name".into(),
                value: String::from("this is a test string.c"),
            };
            assert_eq!(UciCommand::SetOption(raw_opt), command.unwrap());
        }
        {
            let input = "setoption name Clear Hash \n";
            let command = UciCommand::parse_command(input);
            let raw_opt = RawOption {
                name: "Clear Hash".into(),
                value: String::from(""),
            };
            assert_eq!(UciCommand::SetOption(raw_opt), command.unwrap());
        }
    }

    #[test]
    fn parse_command_pos() {
        {
            // Simple start position.
            let start_game = Game::start_position();
            let command_start_str = "position startpos";
            let command_start1 = UciCommand::parse_command(command_start_str).unwrap();
            assert_eq!(UciCommand::Pos(start_game), command_start1);
        }

        {
            // Derived from applying moves to start position. The move
            // history is preserved on the parsed game.
            let moves: MoveHistory = [Move::new(D2, D4, None), Move::new(D7, D5, None)]
                .into_iter()
                .collect();
            let game = Game::new(Position::start_position(), moves).unwrap();
            let command_start_moves_str = "position startpos moves d2d4 d7d5";
            let command = UciCommand::parse_command(command_start_moves_str).unwrap();
            assert_eq!(UciCommand::Pos(game), command);
        }

        {
            // Positions derived from a fen.
            let pos_fen_str = "rnbqkbnr/pppp1ppp/8/4P3/8/8/PPP1PPPP/RNBQKBNR b KQkq - 0 2";
            let command_str =
                "position fen rnbqkbnr/pppp1ppp/8/4P3/8/8/PPP1PPPP/RNBQKBNR b KQkq - 0 2";
            let pos = Position::parse_fen(pos_fen_str).unwrap();
            let command = UciCommand::parse_command(command_str).unwrap();
            assert_eq!(UciCommand::Pos(Game::from(pos)), command);
        }

        {
            // Illegal moves in the history are rejected.
            assert!(UciCommand::parse_command("position startpos moves e2e5").is_err());
        }
    }

    #[test]
    fn parse_command_go() {
        {
            let input = "go depth 10 wtime 40000 \n";
            let command = UciCommand::parse_command(input).unwrap();
            let mut search_ctrl = SearchControls::new();
            search_ctrl.depth = Some(10);
            search_ctrl.wtime = Some(40000);
            assert_eq!(UciCommand::Go(search_ctrl), command);
        }
        {
            let input = "go ponder wtime 1000 btime 1000";
            let command = UciCommand::parse_command(input).unwrap();
            match command {
                UciCommand::Go(controls) => {
                    assert!(controls.ponder);
                    assert_eq!(controls.wtime, Some(1000));
                }
                _ => panic!("expected go command"),
            }
        }
    }

    #[test]
    fn ucioptions_insert_update_contains() {
        let option_hash = UciOption::new_spin("Hash", 1, 1, 16000);
        let option_clear_hash = UciOption::new_button("Clear Hash", false);
        let option_ponder = UciOption::new_check("Ponder", false);
        let option_threads = UciOption::new_spin("Threads", 1, 1, 32);

        let mut uci_options = UciOptions::new();

        assert_eq!(uci_options.len(), 0);
        assert_eq!(uci_options.insert(option_hash.clone()), None);
        assert_eq!(uci_options.insert(option_clear_hash.clone()), None);
        assert_eq!(uci_options.insert(option_ponder.clone()), None);
        assert_eq!(uci_options.insert(option_threads.clone()), None);
        assert_eq!(uci_options.len(), 4);

        let raw_hash = RawOption {
            name: "hash".into(),
            value: "14".into(),
        };
        assert!(uci_options.update(&raw_hash).is_ok());
        assert_eq!(uci_options["Hash"].spin().value(), 14);

        assert_eq!(option_clear_hash, uci_options["clear hash"]);
        assert_eq!(option_ponder, uci_options["ponder"]);
        assert_eq!(option_threads, uci_options["threads"]);
        assert_ne!(option_hash, uci_options["hash"]);
    }

    #[test]
    fn score_encoding() {
        assert_eq!(value_to_uci(Cp(0)), "cp 0");
        assert_eq!(value_to_uci(Cp(150)), "cp 150");
        assert_eq!(value_to_uci(Cp(-25)), "cp -25");
        // Mate for the side to move in 1 ply -> "mate 1".
        assert_eq!(value_to_uci(Cp::mate_in(1)), "mate 1");
        assert_eq!(value_to_uci(Cp::mate_in(3)), "mate 2");
        // Being mated prints negative move counts.
        assert_eq!(value_to_uci(Cp::mated_in(2)), "mate -1");
    }

    #[test]
    fn info_line_format() {
        let mut pv = Line::new();
        pv.push(Move::new(E2, E4, None));
        pv.push(Move::new(E7, E5, None));

        let info = UciInfo::new()
            .depth(6)
            .multipv(1)
            .score(Cp(33), ScoreBound::Exact)
            .nodes_time(1000, Duration::from_millis(500))
            .pv(pv);
        assert_eq!(
            info.to_string(),
            "info depth 6 multipv 1 score cp 33 nodes 1000 nps 2000 time 500 pv e2e4 e7e5"
        );

        let bounds = UciInfo::new().depth(2).score(Cp(10), ScoreBound::Lower);
        assert_eq!(bounds.to_string(), "info depth 2 score cp 10 lowerbound");

        let mated = UciInfo::new().depth(0).score(Cp(0), ScoreBound::Exact);
        assert_eq!(mated.to_string(), "info depth 0 score cp 0");
    }

    #[test]
    fn bestmove_with_ponder() {
        let best = UciResponse::new_best_move(Move::new(D8, H4, None), None);
        assert_eq!(best.to_string(), "bestmove d8h4\n");

        let with_ponder = UciResponse::new_best_move(
            Move::new(E2, E4, None),
            Some(Move::new(E7, E5, None)),
        );
        assert_eq!(with_ponder.to_string(), "bestmove e2e4 ponder e7e5\n");

        // A reserved ponder value is dropped rather than printed.
        let none_ponder = UciResponse::new_best_move(Move::new(E2, E4, None), Some(Move::NONE));
        assert_eq!(none_ponder.to_string(), "bestmove e2e4\n");

        let stalemate = UciResponse::new_best_move(Move::NONE, None);
        assert_eq!(stalemate.to_string(), "bestmove 0000\n");
    }
}
