// Interactive Command Loop
//
// Reads commands line by line, prompts for operands and prints results.
// All calculator semantics live in the kernel; this module only parses
// text and formats output.

use std::io::{self, BufRead, Write};

use chrono::Local;
use rust_decimal::Decimal;

use tally_kernel::numeric::parse_operand;
use tally_kernel::operations::Operation;
use tally_kernel::Calculator;

const CANCEL: &str = "cancel";

/// A parsed top-level command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Calculate(Operation),
    History,
    Clear,
    Undo,
    Redo,
    Save,
    Load,
    Help,
    Exit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Command> {
        let command = input.trim().to_ascii_lowercase();
        let parsed = match command.as_str() {
            "history" => Command::History,
            "clear" => Command::Clear,
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "save" => Command::Save,
            "load" => Command::Load,
            "help" | "menu" | "h" | "?" => Command::Help,
            "exit" | "quit" => Command::Exit,
            other => Command::Calculate(Operation::resolve(other).ok()?),
        };
        Some(parsed)
    }
}

pub struct Repl {
    calculator: Calculator,
}

impl Repl {
    pub fn new(calculator: Calculator) -> Self {
        Self { calculator }
    }

    /// Run until `exit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> io::Result<()> {
        writeln!(out, "Welcome to the Tally calculator!")?;
        print_menu(&mut out)?;

        loop {
            write!(out, "» ")?;
            out.flush()?;
            let Some(line) = read_line(&mut input)? else {
                writeln!(out)?;
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Some(Command::Calculate(op)) => self.perform(op, &mut input, &mut out)?,
                Some(Command::History) => self.show_history(&mut out)?,
                Some(Command::Clear) => {
                    self.calculator.clear();
                    writeln!(out, "History cleared.")?;
                }
                Some(Command::Undo) => {
                    let msg = if self.calculator.undo() { "Undone." } else { "Nothing to undo." };
                    writeln!(out, "{msg}")?;
                }
                Some(Command::Redo) => {
                    let msg = if self.calculator.redo() { "Redone." } else { "Nothing to redo." };
                    writeln!(out, "{msg}")?;
                }
                Some(Command::Save) => match self.calculator.save(None) {
                    Ok(path) => writeln!(out, "History saved to {}.", path.display())?,
                    Err(err) => writeln!(out, "Error: {err}")?,
                },
                Some(Command::Load) => match self.calculator.load(None) {
                    Ok(count) => writeln!(out, "History loaded ({count} records).")?,
                    Err(err) => writeln!(out, "Error: {err}")?,
                },
                Some(Command::Help) => print_menu(&mut out)?,
                Some(Command::Exit) => {
                    writeln!(out, "Goodbye!")?;
                    break;
                }
                None => writeln!(out, "Unknown command. Type 'help' for a list of commands.")?,
            }
        }

        Ok(())
    }

    fn perform<R: BufRead, W: Write>(
        &mut self,
        operation: Operation,
        input: &mut R,
        out: &mut W,
    ) -> io::Result<()> {
        writeln!(out, "\nEnter numbers (or type '{CANCEL}' to abort):")?;
        let Some(a) = self.prompt_operand("  first  : ", input, out)? else {
            writeln!(out, "Operation cancelled.")?;
            return Ok(());
        };
        let Some(b) = self.prompt_operand("  second : ", input, out)? else {
            writeln!(out, "Operation cancelled.")?;
            return Ok(());
        };

        match self.calculator.compute(operation.name(), a, b) {
            Ok(result) => writeln!(out, "\n Result → {}\n", self.calculator.display(result))?,
            Err(err) => writeln!(out, "Error: {err}")?,
        }
        for failure in self.calculator.take_persistence_failures() {
            writeln!(out, "Warning: {}", failure.error)?;
        }
        Ok(())
    }

    /// `None` when the user cancels or input ends.
    fn prompt_operand<R: BufRead, W: Write>(
        &self,
        prompt: &str,
        input: &mut R,
        out: &mut W,
    ) -> io::Result<Option<Decimal>> {
        let max = self.calculator.config().max_input_value;
        loop {
            write!(out, "{prompt}")?;
            out.flush()?;
            let Some(raw) = read_line(input)? else {
                return Ok(None);
            };
            if raw.trim().eq_ignore_ascii_case(CANCEL) {
                return Ok(None);
            }
            match parse_operand(&raw, max) {
                Ok(value) => return Ok(Some(value)),
                Err(err) => writeln!(out, "Please enter a valid number or '{CANCEL}' ({err}).")?,
            }
        }
    }

    fn show_history<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let history = self.calculator.history();
        if history.is_empty() {
            return writeln!(out, "No history yet.");
        }
        for (idx, record) in history.iter().enumerate() {
            writeln!(
                out,
                "[{:>3}] {}  {}({}, {}) = {}",
                idx + 1,
                record.timestamp.with_timezone(&Local).format("%H:%M:%S"),
                record.operation,
                record.a,
                record.b,
                self.calculator.display(record.result)
            )?;
        }
        Ok(())
    }
}

fn print_menu<W: Write>(out: &mut W) -> io::Result<()> {
    let names: Vec<&str> = Operation::ALL.iter().map(|op| op.name()).collect();
    writeln!(out, "\nAvailable commands")?;
    writeln!(out, "──────────────────")?;
    for chunk in names.chunks(4) {
        writeln!(out, "  {}", chunk.join(", "))?;
    }
    writeln!(out, "                           → perform calculation")?;
    writeln!(out, "  history                  → display history")?;
    writeln!(out, "  clear                    → clear history")?;
    writeln!(out, "  undo / redo              → undo or redo last change")?;
    writeln!(out, "  save / load              → manual save or load of history")?;
    writeln!(out, "  help                     → show this menu")?;
    writeln!(out, "  exit                     → quit the calculator\n")
}

fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
