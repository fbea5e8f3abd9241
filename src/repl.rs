// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive session issuing `define`, `require` and `extend` against a
//! recording host.

use extender_loader::{
    DefineArgs, ExecutionStack, ExtendArgs, ExtendError, HostCall, ModuleId, ModuleSystem,
    RecordingHost, RequireTarget,
};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};
use std::cell::Cell;
use std::path::PathBuf;

/// REPL configuration constants
const HISTORY_FILE: &str = ".extender_history";
const MAX_HISTORY_SIZE: usize = 1000;

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Graph,
    Calls,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let cmd = input.strip_prefix('.')?.split_whitespace().next()?.to_lowercase();

        match cmd.as_str() {
            "help" | "h" | "?" => Some(ReplCommand::Help),
            "exit" | "quit" | "q" => Some(ReplCommand::Exit),
            "clear" | "cls" => Some(ReplCommand::Clear),
            "graph" | "g" => Some(ReplCommand::Graph),
            "calls" | "c" => Some(ReplCommand::Calls),
            _ => None,
        }
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".graph", "Show the override chains"),
            (".calls", "Show every call the host received"),
        ]
    }
}

/// A module system call typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `require <id>...`
    Require(Vec<ModuleId>),
    /// `define <id> [dep...]`
    Define { id: ModuleId, deps: Vec<ModuleId> },
    /// `extend <location> [dep...]`, issued from a script at `location`
    Extend {
        location: String,
        deps: Option<Vec<ModuleId>>,
    },
}

impl Statement {
    /// Parse a statement, `None` when the shape is not recognized
    pub fn parse(input: &str) -> Option<Self> {
        let mut words = input.split_whitespace();
        let keyword = words.next()?;
        let rest: Vec<String> = words.map(String::from).collect();

        match keyword {
            "require" if !rest.is_empty() => Some(Statement::Require(rest)),
            "define" => {
                let (id, deps) = rest.split_first()?;
                Some(Statement::Define {
                    id: id.clone(),
                    deps: deps.to_vec(),
                })
            }
            "extend" => {
                let (location, deps) = rest.split_first()?;
                Some(Statement::Extend {
                    location: location.clone(),
                    deps: (!deps.is_empty()).then(|| deps.to_vec()),
                })
            }
            _ => None,
        }
    }

    /// Usage lines for help output
    pub fn usage() -> &'static [(&'static str, &'static str)] {
        &[
            ("require <id>...", "Require modules"),
            ("define <id> [dep...]", "Define a named module"),
            ("extend <location> [dep...]", "Extend from the script at <location>"),
        ]
    }
}

/// The installed module system and the script stack it identifies callers by
pub struct Session {
    system: ModuleSystem<RecordingHost>,
    stack: ExecutionStack,
    factories: Cell<usize>,
}

impl Session {
    /// Create a session whose callers are read from `stack`
    pub fn new(system: ModuleSystem<RecordingHost>, stack: ExecutionStack) -> Self {
        Self {
            system,
            stack,
            factories: Cell::new(0),
        }
    }

    /// The installed module system
    pub fn system(&self) -> &ModuleSystem<RecordingHost> {
        &self.system
    }

    /// Run `statement`, returning the calls that reached the host
    pub fn execute(&self, statement: Statement) -> Result<Vec<HostCall>, ExtendError> {
        let before = self.system.host().calls().len();

        match statement {
            Statement::Require(ids) => {
                self.system.require(RequireTarget::Many(ids), None, None);
            }
            Statement::Define { id, deps } => {
                let factory = self.next_factory();
                self.system.define(DefineArgs::Named(id, deps, factory));
            }
            Statement::Extend { location, deps } => {
                let factory = self.next_factory();
                let _entry = self.stack.enter(location);
                let args = match deps {
                    Some(deps) => ExtendArgs::WithDeps(deps, factory),
                    None => ExtendArgs::Factory(factory),
                };
                self.system.extend(args)?;
            }
        }

        Ok(self.system.host().calls().split_off(before))
    }

    /// Every module id named by the override map
    pub fn known_ids(&self) -> Vec<String> {
        let map = &self.system.overrides().map;
        let mut ids: Vec<String> = map
            .iter()
            .flat_map(|(base, chain)| std::iter::once(base.to_string()).chain(chain.iter().cloned()))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn next_factory(&self) -> String {
        let n = self.factories.get() + 1;
        self.factories.set(n);
        format!("factory#{}", n)
    }
}

/// Helper struct for rustyline that provides completion and hints
#[derive(Default)]
struct ExtenderHelper {
    /// Statement keywords, REPL commands and known module ids
    words: Vec<String>,
}

impl ExtenderHelper {
    fn new(ids: Vec<String>) -> Self {
        let mut words: Vec<String> = ["require", "define", "extend"]
            .into_iter()
            .map(String::from)
            .collect();
        words.extend(
            ReplCommand::all_commands()
                .iter()
                .map(|(cmd, _)| cmd.to_string()),
        );
        words.extend(ids);
        Self { words }
    }

    fn word_start(line: &str) -> usize {
        line.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0)
    }
}

impl Completer for ExtenderHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = Self::word_start(&line[..pos]);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches: Vec<Pair> = self
            .words
            .iter()
            .filter(|candidate| candidate.starts_with(word))
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for ExtenderHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let word = &line[Self::word_start(line)..];
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|candidate| candidate.starts_with(word) && candidate.len() > word.len())
            .map(|candidate| candidate[word.len()..].to_string().dimmed().to_string())
    }
}

impl Highlighter for ExtenderHelper {}

impl Validator for ExtenderHelper {}

impl Helper for ExtenderHelper {}

/// The interactive REPL
pub struct Repl {
    session: Session,
    editor: Editor<ExtenderHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(session: Session) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ExtenderHelper::new(session.known_ids())));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("extender")
            .join(HISTORY_FILE);

        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let _ = editor.load_history(&history_path);

        Ok(Self {
            session,
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = format!("{} ", "extender>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    if trimmed.starts_with('.') {
                        match ReplCommand::parse(trimmed) {
                            Some(cmd) => match self.execute_command(cmd) {
                                CommandResult::Continue => continue,
                                CommandResult::Exit => break,
                            },
                            None => {
                                eprintln!("{}: unknown command '{}'", "Error".red().bold(), trimmed.cyan());
                                continue;
                            }
                        }
                    }

                    match Statement::parse(trimmed) {
                        Some(statement) => self.execute_and_print(statement),
                        None => {
                            eprintln!("{}: cannot parse '{}'", "Error".red().bold(), trimmed.cyan());
                            eprintln!("Type {} for usage", ".help".cyan());
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        let _ = self.editor.save_history(&self.history_path);
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(
            "  {} {} {}",
            "extender".white().bold(),
            "v".dimmed(),
            extender_loader::VERSION.bright_yellow()
        );
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand) -> CommandResult {
        match cmd {
            ReplCommand::Help => {
                self.print_help();
                CommandResult::Continue
            }
            ReplCommand::Exit => CommandResult::Exit,
            ReplCommand::Clear => {
                print!("\x1B[2J\x1B[H");
                CommandResult::Continue
            }
            ReplCommand::Graph => {
                crate::commands::graph(self.session.system());
                CommandResult::Continue
            }
            ReplCommand::Calls => {
                let calls = self.session.system().host().calls();
                if calls.is_empty() {
                    println!("{}", "No calls yet".dimmed());
                }
                for (n, call) in calls.iter().enumerate() {
                    println!("{:>4} {}", (n + 1).dimmed(), format_call(call));
                }
                CommandResult::Continue
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Statements:".white().bold());
        println!();
        for (usage, desc) in Statement::usage() {
            println!("  {:28} {}", usage.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();
        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:28} {}", cmd.cyan(), desc.dimmed());
        }
        println!();
    }

    fn execute_and_print(&mut self, statement: Statement) {
        match self.session.execute(statement) {
            Ok(calls) if calls.is_empty() => {
                println!("{}", "(ignored: already defined)".dimmed());
            }
            Ok(calls) => {
                for call in &calls {
                    println!("{}", format_call(call));
                }
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red().bold(), e);
            }
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// Format a host call for display
fn format_call(call: &HostCall) -> String {
    match call {
        HostCall::Define { id, deps, factory } => format!(
            "{} {} [{}] {}",
            "define".magenta().bold(),
            id.as_deref().unwrap_or("<anonymous>").green(),
            deps.join(", "),
            factory.dimmed()
        ),
        HostCall::Require { target } => match target {
            RequireTarget::Config(config) => {
                format!("{} {}", "require".cyan().bold(), config)
            }
            other => format!(
                "{} [{}]",
                "require".cyan().bold(),
                other.ids().join(", ").green()
            ),
        },
    }
}
