//! Word splitting for a single command line.
//!
//! Follows POSIX quoting: unquoted blanks separate words, single quotes are
//! fully literal, inside double quotes a backslash only escapes `$`, `` ` ``,
//! `"`, `\` and newline, and adjacent quoted/unquoted fragments join into one
//! word. No expansion of any kind happens here.

use crate::error::{ShellError, ShellResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    /// Between words.
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the machine to completion.
    ///
    /// A word is in progress whenever the state is not [`LexingState::Start`],
    /// which is what lets `''` or `""` produce an empty word.
    fn make_words(&mut self) -> ShellResult<Vec<String>> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote => {
                Err(ShellError::Quote)
            }
            LexingState::ReadingWord => {
                out.push(std::mem::take(&mut self.buffer));
                Ok(out)
            }
            LexingState::Start => Ok(out),
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char) {
        if is_blank(ch) {
            return;
        }
        self.state = LexingState::ReadingWord;
        self.push_unquoted(ch);
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        if is_blank(ch) {
            out.push(std::mem::take(&mut self.buffer));
            self.state = LexingState::Start;
        } else {
            self.push_unquoted(ch);
        }
    }

    /// Appends an unquoted character, switching into a quote state or
    /// consuming an escape as needed.
    fn push_unquoted(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => match self.read_char() {
                Some(escaped) => self.buffer.push(escaped),
                // A lone trailing backslash stays literal.
                None => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.peek_char() {
                Some('$' | '`' | '"' | '\\') => {
                    self.read_char();
                    self.buffer.push(self.input[self.pos - 1]);
                }
                Some('\n') => {
                    self.read_char();
                }
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n')
}

/// Splits `line` into shell words.
///
/// Fails with [`ShellError::Quote`] when a quote is left open.
pub fn tokenize(line: &str) -> ShellResult<Vec<String>> {
    let words = LexingFSM::new(line).make_words()?;
    log::debug!("tokenized {:?} into {:?}", line, words);
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        tokenize(line).unwrap()
    }

    #[test]
    fn plain_words_round_trip() {
        let input = vec!["ls", "-la", "/tmp", "some_file.txt"];
        assert_eq!(words(&input.join(" ")), input);
    }

    #[test]
    fn runs_of_blanks_separate_words() {
        assert_eq!(words("  echo \t hello    world  "), vec!["echo", "hello", "world"]);
        assert!(words("   ").is_empty());
        assert!(words("").is_empty());
    }

    #[test]
    fn single_quotes_are_literal() {
        assert_eq!(
            words(r"echo 'hello   world' 'a\nb' '$HOME'"),
            vec!["echo", "hello   world", r"a\nb", "$HOME"]
        );
    }

    #[test]
    fn double_quotes_only_escape_special_characters() {
        assert_eq!(
            words(r#"echo "a \" b" "c \\ d" "e \n f" "\$x""#),
            vec!["echo", "a \" b", r"c \ d", r"e \n f", "$x"]
        );
    }

    #[test]
    fn adjacent_fragments_concatenate() {
        assert_eq!(words(r#"echo ab'cd'"ef"gh"#), vec!["echo", "abcdefgh"]);
        assert_eq!(words(r#"cat "/tmp/file name"'s'"#), vec!["cat", "/tmp/file names"]);
    }

    #[test]
    fn empty_quotes_make_an_empty_word() {
        assert_eq!(words(r#"echo "" ''"#), vec!["echo", "", ""]);
    }

    #[test]
    fn backslash_escapes_outside_quotes() {
        assert_eq!(words(r"echo a\ b \'x\' c\\d"), vec!["echo", "a b", "'x'", r"c\d"]);
        assert_eq!(words(r"echo trailing\"), vec!["echo", r"trailing\"]);
    }

    #[test]
    fn unterminated_quotes_fail() {
        assert!(matches!(tokenize("echo 'abc"), Err(ShellError::Quote)));
        assert!(matches!(tokenize(r#"echo "abc"#), Err(ShellError::Quote)));
        assert!(matches!(tokenize(r#"echo "abc\""#), Err(ShellError::Quote)));
    }
}
