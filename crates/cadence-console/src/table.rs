//! Command table and the built-in console commands.
//!
//! A [`CommandTable`] is an ordered list of [`CommandEntry`] values. Lookup
//! is a case-sensitive exact match on the command name, scanned in table
//! order; the first match wins.
//!
//! Every table starts with `help`, `quit`, `exit` and `close`, in that
//! order. These names are reserved: a supplied entry with one of them is
//! dropped when the table is built.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::CommandError;
use crate::io::LineSink;

/// Default column at which help text starts.
pub const DEFAULT_HELP_COLUMN: usize = 28;

/// What a handler asks the dispatcher to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Keep accepting commands.
    Continue,
    /// Terminate the console.
    Quit,
}

/// Result type returned by command handlers.
pub type CommandResult = Result<CommandStatus, CommandError>;

/// A command handler.
pub type CommandHandler =
    Arc<dyn Fn(&mut CommandContext<'_>, &Invocation<'_>) -> CommandResult + Send + Sync>;

/// A tokenized input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    name: &'a str,
    args: Vec<&'a str>,
    rest: &'a str,
}

impl<'a> Invocation<'a> {
    /// Split `line` on whitespace into a command name and arguments.
    ///
    /// Returns `None` for a blank line.
    pub fn parse(line: &'a str) -> Option<Self> {
        let trimmed = line.trim_start();
        let name = trimmed.split_whitespace().next()?;
        let rest = trimmed.get(name.len()..).unwrap_or_default().trim();
        Some(Self {
            name,
            args: rest.split_whitespace().collect(),
            rest,
        })
    }

    /// The command name (first token).
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Argument tokens after the name.
    pub fn args(&self) -> &[&'a str] {
        &self.args
    }

    /// The first argument token, if any.
    pub fn first_arg(&self) -> Option<&'a str> {
        self.args.first().copied()
    }

    /// Everything after the name, trimmed.
    pub const fn rest(&self) -> &'a str {
        self.rest
    }
}

/// What a handler can reach while it runs.
pub struct CommandContext<'a> {
    table: &'a CommandTable,
    out: &'a mut dyn LineSink,
    help_column: usize,
}

impl<'a> CommandContext<'a> {
    /// Build a context over `table` writing to `out`.
    pub fn new(table: &'a CommandTable, out: &'a mut dyn LineSink, help_column: usize) -> Self {
        Self {
            table,
            out,
            help_column,
        }
    }

    /// The table being dispatched against.
    pub const fn table(&self) -> &'a CommandTable {
        self.table
    }

    /// Write one line to the console output.
    pub fn write_line(&mut self, text: &str) {
        self.out.write_line(text);
    }

    /// Format `entry`'s help line for this console.
    pub fn help_line(&self, entry: &CommandEntry) -> String {
        entry.help_line(self.help_column)
    }
}

/// One row of a command table.
#[derive(Clone)]
pub struct CommandEntry {
    handler: CommandHandler,
    name: &'static str,
    hint: &'static str,
    help: &'static str,
}

impl CommandEntry {
    /// Create an entry. `hint` describes the arguments, e.g. `[(command)]`.
    pub fn new<F>(name: &'static str, hint: &'static str, help: &'static str, handler: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>, &Invocation<'_>) -> CommandResult + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            name,
            hint,
            help,
        }
    }

    /// Command name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Argument hint.
    pub const fn hint(&self) -> &'static str {
        self.hint
    }

    /// Help text. Empty for aliases.
    pub const fn help(&self) -> &'static str {
        self.help
    }

    /// Run the handler.
    pub fn invoke(&self, ctx: &mut CommandContext<'_>, invocation: &Invocation<'_>) -> CommandResult {
        (self.handler)(ctx, invocation)
    }

    /// `name hint`, padded to `column`, then the help text.
    pub fn help_line(&self, column: usize) -> String {
        let left = if self.hint.is_empty() {
            self.name.to_owned()
        } else {
            format!("{} {}", self.name, self.hint)
        };
        if self.help.is_empty() {
            return left;
        }
        let width = column.max(left.len().saturating_add(1));
        format!("{left:<width$}{}", self.help)
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("hint", &self.hint)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

/// Ordered command table.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    /// Build a table of the built-ins followed by `entries`.
    ///
    /// Entries named like a built-in are dropped.
    pub fn new(entries: impl IntoIterator<Item = CommandEntry>) -> Self {
        let mut table: Vec<CommandEntry> = builtin_entries().into();
        for entry in entries {
            if is_reserved(entry.name) {
                warn!(command = entry.name, "reserved command name, entry ignored");
                continue;
            }
            table.push(entry);
        }
        Self { entries: table }
    }

    /// A table holding only the built-ins.
    pub fn standard() -> Self {
        Self::new([])
    }

    /// First entry named exactly `name`.
    pub fn find(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// All entries in table order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries. Never true for a built table.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Names taken by [`builtin_entries`].
pub const RESERVED_NAMES: [&str; 4] = ["help", "quit", "exit", "close"];

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// The built-in entries: `help`, then the `quit` / `exit` / `close` aliases.
pub fn builtin_entries() -> [CommandEntry; 4] {
    [
        CommandEntry::new(
            "help",
            "[(command)]",
            "Displays a list of all the commands",
            help_command,
        ),
        CommandEntry::new("quit", "", "Quits the console", quit_command),
        CommandEntry::new("exit", "", "", quit_command),
        CommandEntry::new("close", "", "", quit_command),
    ]
}

/// `help` lists every entry; `help <name>` shows only that entry.
///
/// # Errors
///
/// Returns [`CommandError::UnknownTopic`] if `<name>` is not in the table.
pub fn help_command(ctx: &mut CommandContext<'_>, invocation: &Invocation<'_>) -> CommandResult {
    let table = ctx.table();
    match invocation.first_arg() {
        None => {
            ctx.write_line("Commands:");
            for entry in table.entries() {
                let line = ctx.help_line(entry);
                ctx.write_line(&line);
            }
            Ok(CommandStatus::Continue)
        }
        Some(topic) => {
            let entry = table.find(topic).ok_or_else(|| CommandError::UnknownTopic {
                topic: topic.to_owned(),
            })?;
            let line = ctx.help_line(entry);
            ctx.write_line(&line);
            Ok(CommandStatus::Continue)
        }
    }
}

/// Shared handler behind `quit`, `exit` and `close`.
pub const fn quit_command(
    _ctx: &mut CommandContext<'_>,
    _invocation: &Invocation<'_>,
) -> CommandResult {
    Ok(CommandStatus::Quit)
}
