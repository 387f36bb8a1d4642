//! Relaxed JSON pre-processing.
//!
//! The worker evolves independently of the host, so lines are accepted with
//! `//` and `/* */` comments and trailing commas. Both are removed here,
//! outside of string literals, before handing the text to `serde_json`.

use serde_json::{Map, Value};

/// Strips comments and trailing commas outside of string literals.
pub(crate) fn relax(input: &str) -> String {
	strip_trailing_commas(&strip_comments(input))
}

fn strip_comments(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	let mut chars = input.chars().peekable();
	let mut in_string = false;
	let mut escaped = false;

	while let Some(c) = chars.next() {
		if in_string {
			out.push(c);
			if escaped {
				escaped = false;
			} else if c == '\\' {
				escaped = true;
			} else if c == '"' {
				in_string = false;
			}
			continue;
		}

		match (c, chars.peek()) {
			('"', _) => {
				in_string = true;
				out.push(c);
			}
			('/', Some('/')) => {
				for next in chars.by_ref() {
					if next == '\n' {
						out.push('\n');
						break;
					}
				}
			}
			('/', Some('*')) => {
				chars.next();
				let mut prev = '\0';
				for next in chars.by_ref() {
					if prev == '*' && next == '/' {
						break;
					}
					prev = next;
				}
				out.push(' ');
			}
			_ => out.push(c),
		}
	}

	out
}

fn strip_trailing_commas(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	let mut in_string = false;
	let mut escaped = false;

	for (idx, c) in input.char_indices() {
		if in_string {
			out.push(c);
			if escaped {
				escaped = false;
			} else if c == '\\' {
				escaped = true;
			} else if c == '"' {
				in_string = false;
			}
			continue;
		}

		match c {
			'"' => {
				in_string = true;
				out.push(c);
			}
			',' => {
				let next = input[idx + 1..].chars().find(|n| !n.is_whitespace());
				if !matches!(next, Some('}') | Some(']')) {
					out.push(c);
				}
			}
			_ => out.push(c),
		}
	}

	out
}

/// Lowercases every object key, recursively.
///
/// Field matching on the wire is case-insensitive; folding once up front
/// lets the payload structs use plain lowercase names. When two keys differ
/// only by case the later one wins.
pub(crate) fn fold_keys(value: Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut folded = Map::with_capacity(map.len());
			for (key, inner) in map {
				folded.insert(key.to_ascii_lowercase(), fold_keys(inner));
			}
			Value::Object(folded)
		}
		Value::Array(items) => Value::Array(items.into_iter().map(fold_keys).collect()),
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn removes_line_and_block_comments() {
		let text = "{\"a\": 1, // trailing note\n \"b\": /* inline */ 2}";
		let value: Value = serde_json::from_str(&relax(text)).unwrap();
		assert_eq!(value, serde_json::json!({"a": 1, "b": 2}));
	}

	#[test]
	fn removes_trailing_commas() {
		let text = r#"{"groups": [{"id": "1", "name": "A",},], }"#;
		let value: Value = serde_json::from_str(&relax(text)).unwrap();
		assert_eq!(
			value,
			serde_json::json!({"groups": [{"id": "1", "name": "A"}]})
		);
	}

	#[test]
	fn leaves_string_contents_alone() {
		let text = r#"{"data": "a//b/*c*/,}", "q": "say \"hi\", ]"}"#;
		let value: Value = serde_json::from_str(&relax(text)).unwrap();
		assert_eq!(value["data"], "a//b/*c*/,}");
		assert_eq!(value["q"], "say \"hi\", ]");
	}

	#[test]
	fn folds_nested_keys() {
		let value = serde_json::json!({"Media": {"Id": "x", "SenderName": "Bob"}, "TYPE": "media"});
		let folded = fold_keys(value);
		assert_eq!(folded["media"]["id"], "x");
		assert_eq!(folded["media"]["sendername"], "Bob");
		assert_eq!(folded["type"], "media");
	}
}
