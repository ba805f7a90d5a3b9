//! A line-oriented interactive session over a [`ReviewSurface`].
//!
//! This is the terminal version of the review table: the user types commands,
//! we print the table and short notifications. Errors are reported and the
//! session carries on.

use std::{
    io::{BufRead, Write},
    str::FromStr,
};

use crate::{prelude::*, record::CheckField};

use super::{Mode, ReviewSurface, clipboard::Clipboard};

/// Help text for the session.
const HELP: &str = "\
Commands:
  show                 Show the extracted data
  edit                 Start editing
  set <field> <value>  Change a field while editing (e.g. `set payee Jane Doe`)
  save                 Save changes and stop editing
  discard              Throw away unsaved changes and stop editing
  copy                 Copy the data to the clipboard
  json                 Print the saved data as JSON
  help                 Show this message
  quit                 Leave the session";

/// A parsed session command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Show,
    Edit,
    Set { field: CheckField, value: String },
    Save,
    Discard,
    Copy,
    Json,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let no_args = |command: Command| {
            if rest.is_empty() {
                Ok(command)
            } else {
                Err(anyhow!("`{verb}` takes no arguments"))
            }
        };
        match verb.to_ascii_lowercase().as_str() {
            "show" | "ls" => no_args(Command::Show),
            "edit" => no_args(Command::Edit),
            "set" => {
                let (field, value) = rest
                    .split_once(char::is_whitespace)
                    .map(|(field, value)| (field, value.trim()))
                    .unwrap_or((rest, ""));
                if field.is_empty() {
                    return Err(anyhow!("usage: set <field> <value>"));
                }
                Ok(Command::Set {
                    field: field.parse()?,
                    value: value.to_owned(),
                })
            }
            "save" => no_args(Command::Save),
            "discard" | "cancel" => no_args(Command::Discard),
            "copy" => no_args(Command::Copy),
            "json" => no_args(Command::Json),
            "help" | "?" => no_args(Command::Help),
            "quit" | "exit" | "q" => no_args(Command::Quit),
            _ => Err(anyhow!("unknown command {:?} (try `help`)", verb)),
        }
    }
}

/// Run an interactive session until `quit` or end of input.
///
/// Unsaved edits are discarded when the session ends.
pub fn run_session(
    surface: &mut ReviewSurface,
    input: impl BufRead,
    output: &mut impl Write,
    clipboard: &mut dyn Clipboard,
) -> Result<()> {
    write!(output, "{}", surface.render_table())?;
    writeln!(output, "Type `help` for a list of commands.")?;
    prompt(surface, output)?;

    for line in input.lines() {
        let line = line.context("failed to read session input")?;
        if line.trim().is_empty() {
            prompt(surface, output)?;
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => apply(surface, command, output, clipboard)?,
            Err(err) => writeln!(output, "❌ {err}")?,
        }
        prompt(surface, output)?;
    }

    if surface.mode() == Mode::Editing {
        surface.discard_edits();
        writeln!(output, "⚠️  Unsaved changes discarded")?;
    }
    output.flush()?;
    Ok(())
}

/// Apply a single command.
fn apply(
    surface: &mut ReviewSurface,
    command: Command,
    output: &mut impl Write,
    clipboard: &mut dyn Clipboard,
) -> Result<()> {
    match command {
        Command::Show => write!(output, "{}", surface.render_table())?,
        Command::Edit => match surface.mode() {
            Mode::Viewing => {
                surface.toggle_edit();
                writeln!(output, "✏️  Editing. Use `set <field> <value>`, then `save`.")?;
            }
            Mode::Editing => writeln!(output, "Already editing")?,
        },
        Command::Set { field, value } => match surface.set_field(field, value) {
            Ok(()) => writeln!(output, "{field}: {}", surface.displayed().get(field))?,
            Err(err) => writeln!(output, "❌ {err}")?,
        },
        Command::Save => match surface.mode() {
            Mode::Editing => {
                surface.toggle_edit();
                writeln!(output, "✅ Changes Saved")?;
                write!(output, "{}", surface.render_table())?;
            }
            Mode::Viewing => writeln!(output, "Nothing to save")?,
        },
        Command::Discard => match surface.mode() {
            Mode::Editing => {
                surface.discard_edits();
                writeln!(output, "Changes discarded")?;
            }
            Mode::Viewing => writeln!(output, "Nothing to discard")?,
        },
        Command::Copy => match surface.copy_to(clipboard) {
            Ok(()) => writeln!(output, "📋 Data Copied!")?,
            Err(err) => writeln!(output, "❌ Copy Failed: {err}")?,
        },
        Command::Json => {
            let json = serde_json::to_string_pretty(surface.record())
                .context("failed to serialize check data")?;
            writeln!(output, "{json}")?;
        }
        Command::Help => writeln!(output, "{HELP}")?,
        Command::Quit => {}
    }
    Ok(())
}

/// Print a prompt showing the current mode.
fn prompt(surface: &ReviewSurface, output: &mut impl Write) -> Result<()> {
    let mode = match surface.mode() {
        Mode::Viewing => "view",
        Mode::Editing => "edit",
    };
    write!(output, "{mode}> ")?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::CheckRecord, review::clipboard::MemoryClipboard};

    fn john_doe() -> CheckRecord {
        CheckRecord {
            payee: "John Doe".to_owned(),
            amount_numerical: "500.00".to_owned(),
            amount_words: "Five Hundred Only".to_owned(),
            date: "01/02/2024".to_owned(),
            bank_name: "State Bank of India".to_owned(),
            ifsc_code: "SBIN0001234".to_owned(),
            account_number: "12345678901".to_owned(),
            check_number: "000123".to_owned(),
            issuer_name: "Acme Traders".to_owned(),
        }
    }

    fn run(surface: &mut ReviewSurface, input: &str, clipboard: &mut MemoryClipboard) -> String {
        let mut output = Vec::new();
        run_session(surface, input.as_bytes(), &mut output, clipboard).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("show".parse::<Command>().unwrap(), Command::Show);
        assert_eq!(" SAVE ".parse::<Command>().unwrap(), Command::Save);
        assert_eq!(
            "set payee   Jane Doe ".parse::<Command>().unwrap(),
            Command::Set {
                field: CheckField::Payee,
                value: "Jane Doe".to_owned(),
            }
        );
        assert_eq!(
            "set bank_name".parse::<Command>().unwrap(),
            Command::Set {
                field: CheckField::BankName,
                value: String::new(),
            }
        );
        assert!("set".parse::<Command>().is_err());
        assert!("set memo rent".parse::<Command>().is_err());
        assert!("edit now".parse::<Command>().is_err());
        assert!("frobnicate".parse::<Command>().is_err());
    }

    #[test]
    fn test_edit_save_scenario() {
        let mut surface = ReviewSurface::new(john_doe());
        let mut clipboard = MemoryClipboard::default();
        let output = run(
            &mut surface,
            "edit\nset payee Jane Doe\nsave\ncopy\nquit\n",
            &mut clipboard,
        );
        assert!(output.contains("Changes Saved"), "{output}");
        assert!(output.contains("Data Copied!"), "{output}");

        let mut expected = john_doe();
        expected.payee = "Jane Doe".to_owned();
        assert_eq!(surface.record(), &expected);
        assert_eq!(
            clipboard.text.as_deref(),
            Some(expected.to_labeled_text().as_str())
        );
    }

    #[test]
    fn test_errors_do_not_end_session() {
        let mut surface = ReviewSurface::new(john_doe());
        let mut clipboard = MemoryClipboard::unavailable();
        let output = run(
            &mut surface,
            "set payee Jane Doe\nbogus\ncopy\njson\n",
            &mut clipboard,
        );
        assert!(output.contains("Start editing before changing fields"), "{output}");
        assert!(output.contains("unknown command"), "{output}");
        assert!(output.contains("Copy Failed"), "{output}");
        assert!(output.contains("\"payee\": \"John Doe\""), "{output}");
        assert_eq!(surface.record(), &john_doe());
    }

    #[test]
    fn test_end_of_input_discards_unsaved_edits() {
        let mut surface = ReviewSurface::new(john_doe());
        let mut clipboard = MemoryClipboard::default();
        let output = run(&mut surface, "edit\nset payee Jane Doe\n", &mut clipboard);
        assert!(output.contains("Unsaved changes discarded"), "{output}");
        assert_eq!(surface.mode(), Mode::Viewing);
        assert_eq!(surface.record(), &john_doe());
    }
}
