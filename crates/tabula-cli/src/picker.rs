//! Terminal session picker.

use chrono::{DateTime, Local, Utc};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use tabula_core::{SessionEntry, SessionPicker};

/// Format a datetime for display.
pub fn format_time(dt: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = dt.with_timezone(&Local);
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// Resolve user input to a session name: a 1-based number, an exact name,
/// or a prefix matching exactly one session.
pub fn resolve_choice(input: &str, entries: &[SessionEntry]) -> Option<String> {
    if let Ok(n) = input.parse::<usize>() {
        if n >= 1 && n <= entries.len() {
            return Some(entries[n - 1].name.clone());
        }
    }
    if let Some(entry) = entries.iter().find(|e| e.name == input) {
        return Some(entry.name.clone());
    }
    let mut prefixed = entries.iter().filter(|e| e.name.starts_with(input));
    match (prefixed.next(), prefixed.next()) {
        (Some(entry), None) => Some(entry.name.clone()),
        _ => None,
    }
}

/// Picker that prompts on the terminal with rustyline.
pub struct PromptPicker {
    editor: DefaultEditor,
}

impl PromptPicker {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl SessionPicker for PromptPicker {
    fn pick(&mut self, entries: &[SessionEntry]) -> Option<String> {
        for (i, entry) in entries.iter().enumerate() {
            println!("{:>3}. {}  {}", i + 1, entry.name, format_time(&entry.last_modified));
        }
        println!();

        loop {
            match self.editor.readline("session> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        return None;
                    }
                    match resolve_choice(line, entries) {
                        Some(name) => return Some(name),
                        None => eprintln!("No single session matches '{}'", line),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return None,
                Err(e) => {
                    tracing::warn!("Prompt failed: {}", e);
                    return None;
                }
            }
        }
    }
}
