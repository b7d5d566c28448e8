//! Main UCI interface to the Meridian engine.

mod logger;

use std::io;
use std::str::FromStr;
use std::sync::mpsc;
use std::thread;

use log::LevelFilter;

use meridian_engine::search::SearchResult;
use meridian_engine::uci::{self, UciCommand, UciOption, UciOptions, UciResponse};
use meridian_engine::{Engine, EngineBuilder, Fen};

fn main() -> io::Result<()> {
    let log_handle = logger::init(LevelFilter::Info);
    println!("{} by {}", uci::UCI_ID_NAME, uci::UCI_ID_AUTHOR);

    // Engine internal parameters, exposed over the UCI option surface.
    let mut uci_options = UciOptions::new();
    uci_options.insert(UciOption::new_spin("Hash", 1, 1, 16000));
    uci_options.insert(UciOption::new_button("Clear Hash", false));
    uci_options.insert(UciOption::new_spin(
        "Threads",
        1,
        1,
        num_cpus::get().max(1) as i64,
    ));
    uci_options.insert(UciOption::new_spin("MultiPV", 1, 1, 500));
    uci_options.insert(UciOption::new_spin("Skill Level", 20, 0, 20));
    uci_options.insert(UciOption::new_check("Ponder", false));
    uci_options.insert(UciOption::new_check("OwnBook", false));
    uci_options.insert(UciOption::new_string("Book File", "book.txt"));
    uci_options.insert(UciOption::new_check("Best Book Move", true));
    uci_options.insert(UciOption::new_check("Use Search Log", false));
    uci_options.insert(UciOption::new_string("Search Log Filename", "SearchLog.txt"));
    uci_options.insert(UciOption::new_check("Debug", false));

    let mut engine: Engine = EngineBuilder::new()
        .transpositions_mb(uci_options["Hash"].spin().value() as usize)
        .debug(uci_options["Debug"].check().value)
        .build();
    let mut debug = uci_options["Debug"].check().value;

    loop {
        // Wait to receive a line of input.
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break; // stdin closed
        }
        if input.trim().is_empty() {
            continue;
        }

        // Attempt to parse an input string into a UciCommand for processing.
        let command = if let Ok(command) = UciCommand::from_str(&input) {
            command
        } else {
            uci::error(&format!("{} could not be parsed", input.escape_debug()))?;
            continue;
        };

        match command {
            // GUI is telling engine to use UCI protocol.
            // It requires a response of Id, available options, and an acknowledgement.
            UciCommand::Uci => {
                UciResponse::Id.send()?;
                for uci_opt in uci_options.values() {
                    UciResponse::new_option(uci_opt.clone()).send()?;
                }
                UciResponse::UciOk.send()?;
            }

            // Command used to sync GUI with engine. Requires acknowledgement response.
            UciCommand::IsReady => {
                UciResponse::ReadyOk.send()?;
            }

            // The next search will be from a different game.
            // Clearing the transposition table of all entries allows engine
            // to enter a new game without prior information.
            UciCommand::UciNewGame => {
                engine.stop();
                engine.wait();
                match engine.new_game() {
                    Ok(()) => uci::debug(debug, "transposition table cleared")?,
                    Err(err) => uci::error(&err.to_string())?,
                }
            }

            // GUI commands engine to immediately stop any active search.
            UciCommand::Stop => {
                engine.stop();
            }

            // Inform the engine that user has played an expected move and may
            // continue its search of that move as a normal search.
            UciCommand::PonderHit => {
                engine.ponderhit();
            }

            // Shutdown engine.
            UciCommand::Quit => {
                engine.stop();
                break;
            }

            // Tells engine to send extra `info string` to the GUI.
            // Command can be sent anytime.
            UciCommand::Debug(new_debug_value) => {
                uci::debug(
                    debug | new_debug_value,
                    &format!("set debug {}", new_debug_value),
                )?;
                uci_options["Debug"].check_mut().value = new_debug_value;
                debug = new_debug_value;
                engine.set_debug(new_debug_value);
            }

            // Command to change engine internal parameters.
            // This should only be sent while engine is waiting.
            UciCommand::SetOption(raw_opt) => match uci_options.update(&raw_opt) {
                Ok(option) => {
                    // Received a new hash table capacity, so reassign tt.
                    if option.name == "Hash" {
                        let mb = option.spin().value() as usize;
                        engine.stop();
                        engine.wait();
                        match engine.try_set_transpositions_mb(mb) {
                            Ok(capacity) => uci::debug(
                                debug,
                                &format!("tt mb: {}, capacity: {}", mb, capacity),
                            )?,
                            Err(err) => uci::error(&err.to_string())?,
                        }

                    // Button was pressed to clear the hash table.
                    } else if option.name == "Clear Hash" {
                        option.button_mut().pressed = false;
                        engine.stop();
                        engine.wait();
                        match engine.try_clear_transpositions() {
                            Ok(()) => uci::debug(debug, "hash table cleared")?,
                            Err(err) => uci::error(&err.to_string())?,
                        }
                    } else if option.name == "Threads" {
                        engine.set_threads(option.spin().value() as usize);
                        uci::debug(
                            debug,
                            &format!("setoption Threads: {}", option.spin().value()),
                        )?;
                    } else if option.name == "MultiPV" {
                        engine.set_multipv(option.spin().value() as usize);
                    } else if option.name == "Skill Level" {
                        engine.set_skill_level(option.spin().value() as u8);
                    } else if option.name == "Ponder" {
                        uci::debug(
                            debug,
                            &format!("setoption Ponder: {}", option.check().value),
                        )?;
                    } else if option.name == "OwnBook" {
                        if option.check().value {
                            let path = uci_options["Book File"].text().value.clone();
                            match engine.load_book(&path) {
                                Ok(()) => uci::debug(debug, &format!("book loaded: {path}"))?,
                                Err(err) => uci::error(&err.to_string())?,
                            }
                        } else {
                            engine.unload_book();
                        }
                    } else if option.name == "Best Book Move" {
                        engine.set_best_book_move(option.check().value);
                    } else if option.name == "Use Search Log" {
                        if option.check().value {
                            let path = uci_options["Search Log Filename"].text().value.clone();
                            match log_handle.log_to_file(&path) {
                                Ok(()) => uci::debug(debug, &format!("search log: {path}"))?,
                                Err(err) => uci::error(&err.to_string())?,
                            }
                        } else {
                            log_handle.log_to_stderr();
                        }
                    }
                }
                Err(s) => {
                    uci::error(s)?;
                }
            },

            // Set the current position.
            UciCommand::Pos(new_game) => {
                uci::debug(debug, &format!("set position {}", new_game.position.to_fen()))?;
                engine.set_game(new_game);
            }

            // Begin a search with provided parameters. The bestmove reply is
            // printed when the search delivers its result.
            UciCommand::Go(controls) => {
                if !engine.ready() {
                    uci::error("search already running")?;
                    continue;
                }

                let (sender, receiver) = mpsc::channel::<SearchResult>();
                match engine.go(controls, sender) {
                    Ok(()) => {
                        thread::spawn(move || {
                            if let Ok(result) = receiver.recv() {
                                let _ = UciResponse::new_best_move(result.best_move, result.ponder)
                                    .send();
                            }
                        });
                    }
                    Err(err) => uci::error(&err.to_string())?,
                }
            }
        }
    }

    Ok(())
}
