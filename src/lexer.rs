/// A word or one of the three operators. Operators are only recognized
/// as standalone words; `a|b` stays a single word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	Word(String),
	Pipe,
	RedirectIn,
	RedirectOut,
}

/// Splits a line on whitespace runs. A blank line yields an empty vector,
/// which callers treat as a no-op.
pub fn tokenize(line: &str) -> Vec<Token> {
	line.split_whitespace()
		.map(|word| match word {
			"|" => Token::Pipe,
			"<" => Token::RedirectIn,
			">" => Token::RedirectOut,
			_ => Token::Word(word.to_owned()),
		})
		.collect()
}
