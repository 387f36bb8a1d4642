//! Operator commands typed on stdin during `wabridge run`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
	Groups,
	Monitor(String),
	Stop,
	Status,
	Logout,
	Quit,
	Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "commands: groups | monitor <group-id> | stop | status | logout | quit";

impl OperatorCommand {
	/// Parses one input line. Blank lines yield `None`.
	pub fn parse(line: &str) -> Option<Result<Self, ParseError>> {
		let mut words = line.split_whitespace();
		let verb = words.next()?;
		let rest: Vec<&str> = words.collect();

		let command = match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
			("groups" | "g", []) => Ok(OperatorCommand::Groups),
			("monitor" | "m", [id]) => Ok(OperatorCommand::Monitor((*id).to_string())),
			("monitor" | "m", _) => Err(ParseError("usage: monitor <group-id>".to_string())),
			("stop", []) => Ok(OperatorCommand::Stop),
			("status" | "s", []) => Ok(OperatorCommand::Status),
			("logout", []) => Ok(OperatorCommand::Logout),
			("quit" | "exit" | "q", []) => Ok(OperatorCommand::Quit),
			("help" | "?", _) => Ok(OperatorCommand::Help),
			(other, _) => Err(ParseError(format!("unknown command '{other}' ({HELP})"))),
		};
		Some(command)
	}
}
