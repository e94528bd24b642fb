use colored::Colorize;
use std::fmt;

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Section,
}

fn render(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    match kind {
        MessageKind::Info => format!("{} {}", "[i]".cyan(), text),
        MessageKind::Success => format!("{} {}", "[ok]".green(), text),
        MessageKind::Warning => format!("{} {}", "[!]".yellow(), text.yellow()),
        MessageKind::Error => format!("{} {}", "[x]".red().bold(), text.red()),
        MessageKind::Section => text.bold().underline().to_string(),
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    match kind {
        MessageKind::Error | MessageKind::Warning => eprintln!("{}", render(kind, message)),
        _ => println!("{}", render(kind, message)),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Plain line for tabular output.
pub fn line(message: impl fmt::Display) {
    println!("{}", message);
}
