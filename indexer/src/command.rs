use anyhow::{anyhow, bail, Error};
use std::str::FromStr;

/// One line of input to the interactive shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the posting list of a single term.
    Lookup(String),
    /// Run a free-text query.
    Find(String),
    Help,
    Exit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match verb.to_lowercase().as_str() {
            "lookup" | "print" if rest.is_empty() => bail!("usage: lookup <term>"),
            "lookup" | "print" => Ok(Command::Lookup(rest.to_string())),
            "find" if rest.is_empty() => bail!("usage: find <query>"),
            "find" => Ok(Command::Find(rest.to_string())),
            "help" | "?" => Ok(Command::Help),
            "exit" | "quit" => Ok(Command::Exit),
            "" => Err(anyhow!("empty command")),
            other => Err(anyhow!("unknown command '{other}'")),
        }
    }
}
