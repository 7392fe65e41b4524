use std::iter::Peekable;
use std::str::Chars;

/// Symbols that always form a token of their own, even when glued to a word.
pub const OPERATORS: [char;3] = [
	'<', '>', '&'
];

pub fn is_operator(word: &str) -> bool {
	let mut chars = word.chars();
	matches!((chars.next(), chars.next()), (Some(ch), None) if OPERATORS.contains(&ch))
}

/// Splits one input line into words.
///
/// Whitespace separates words, and each of `<`, `>` and `&` becomes a token of its own
/// wherever it appears, so `cmd>out` yields `cmd`, `>`, `out`. There is no quoting.
pub struct LineTokenizer<'a> {
	chars: Peekable<Chars<'a>>,
}

impl<'a> LineTokenizer<'a> {
	pub fn new(input: &'a str) -> Self {
		Self { chars: input.chars().peekable() }
	}

	fn skip_whitespace(&mut self) {
		while self.chars.peek().is_some_and(|ch| ch.is_whitespace()) {
			self.chars.next();
		}
	}

	fn build_word(&mut self) -> String {
		let mut word = String::new();
		while let Some(&ch) = self.chars.peek() {
			if ch.is_whitespace() || OPERATORS.contains(&ch) {
				break
			}
			word.push(ch);
			self.chars.next();
		}
		word
	}
}

impl Iterator for LineTokenizer<'_> {
	type Item = String;

	fn next(&mut self) -> Option<String> {
		self.skip_whitespace();
		let ch = *self.chars.peek()?;
		if OPERATORS.contains(&ch) {
			self.chars.next();
			return Some(ch.to_string())
		}
		Some(self.build_word())
	}
}

pub fn tokenize(line: &str) -> Vec<String> {
	LineTokenizer::new(line).collect()
}
