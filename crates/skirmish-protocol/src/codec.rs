//! Codec trait and the text implementation used by game scripts.
//!
//! A codec converts between a [`Section`] tree and its text form. The
//! battle layer only needs "something that implements [`Codec`]"; the
//! engine's bracketed section format is provided as [`TdfCodec`].
//!
//! # Grammar
//!
//! ```text
//! script  := item*
//! item    := section | pair
//! section := '[' name ']' '{' item* '}'
//! pair    := key '=' value ';'
//! ```
//!
//! `//` line comments and `/* */` block comments may appear anywhere
//! whitespace may.

use crate::{ProtocolError, Section};

/// A codec that can write a script tree to text and read it back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a script tree.
    ///
    /// If `root` has an empty name its values and children are written at
    /// the top level; otherwise `root` itself is written as a section.
    fn encode(&self, root: &Section) -> String;

    /// Parses as much of `text` as possible.
    ///
    /// Always returns the tree built so far (every section opened before the
    /// problem is kept, with whatever it already contained) together with
    /// the first error, if there was one.
    fn decode_partial(&self, text: &str) -> (Section, Option<ProtocolError>);

    /// Parses `text`, failing on the first grammar error.
    fn decode(&self, text: &str) -> Result<Section, ProtocolError> {
        match self.decode_partial(text) {
            (root, None) => Ok(root),
            (_, Some(err)) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// TdfCodec
// ---------------------------------------------------------------------------

/// The engine's bracketed section format.
///
/// ## Example
///
/// ```rust
/// use skirmish_protocol::{Codec, TdfCodec};
///
/// let root = TdfCodec
///     .decode("[GAME]\n{\n\tMapName=Comet Catcher;\n}\n")
///     .unwrap();
/// let game = root.find("game").unwrap();
/// assert_eq!(game.get("mapname"), Some("Comet Catcher"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TdfCodec;

impl Codec for TdfCodec {
    fn encode(&self, root: &Section) -> String {
        let mut out = String::new();
        if root.name().is_empty() {
            for (key, value) in root.values() {
                out.push_str(&format!("{key}={value};\n"));
            }
            for child in root.children() {
                write_section(&mut out, child, 0);
            }
        } else {
            write_section(&mut out, root, 0);
        }
        out
    }

    fn decode_partial(&self, text: &str) -> (Section, Option<ProtocolError>) {
        let mut parser = Parser {
            src: text,
            pos: 0,
            line: 1,
        };
        let mut root = Section::root();
        let err = parser.parse_body(&mut root, true).err();
        if let Some(err) = &err {
            tracing::debug!(error = %err, "game script parsed partially");
        }
        (root, err)
    }
}

fn write_section(out: &mut String, section: &Section, depth: usize) {
    let indent = "\t".repeat(depth);
    out.push_str(&format!("{indent}[{}]\n{indent}{{\n", section.name()));
    for (key, value) in section.values() {
        out.push_str(&format!("{indent}\t{key}={value};\n"));
    }
    for child in section.children() {
        write_section(out, child, depth + 1);
    }
    out.push_str(&format!("{indent}}}\n"));
}

/// Recursive-descent reader over the raw text.
///
/// All structural characters are ASCII, so byte offsets found by scanning
/// for them are always valid `str` slice boundaries. Lookahead compares raw
/// bytes since comment bodies are stepped through one byte at a time.
struct Parser<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl Parser<'_> {
    fn bytes(&self) -> &[u8] {
        self.src.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn rest_starts_with(&self, prefix: &str) -> bool {
        self.bytes()[self.pos..].starts_with(prefix.as_bytes())
    }

    fn malformed(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::Malformed {
            line: self.line,
            reason: reason.into(),
        }
    }

    /// Advances past whitespace and comments, counting lines.
    fn skip_trivia(&mut self) {
        loop {
            while let Some(b) = self.peek() {
                if !b.is_ascii_whitespace() {
                    break;
                }
                if b == b'\n' {
                    self.line += 1;
                }
                self.pos += 1;
            }
            if self.rest_starts_with("//") {
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else if self.rest_starts_with("/*") {
                self.pos += 2;
                loop {
                    if self.rest_starts_with("*/") {
                        self.pos += 2;
                        break;
                    }
                    match self.peek() {
                        Some(b'\n') => self.line += 1,
                        Some(_) => {}
                        None => break,
                    }
                    self.pos += 1;
                }
            } else {
                return;
            }
        }
    }

    fn parse_body(
        &mut self,
        section: &mut Section,
        top_level: bool,
    ) -> Result<(), ProtocolError> {
        loop {
            self.skip_trivia();
            match self.peek() {
                None if top_level => return Ok(()),
                None => {
                    return Err(ProtocolError::UnexpectedEof {
                        section: section.name().to_string(),
                    });
                }
                Some(b'}') if top_level => {
                    return Err(self.malformed("unmatched '}'"));
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'[') => self.parse_section(section)?,
                Some(_) => self.parse_pair(section)?,
            }
        }
    }

    fn parse_section(&mut self, parent: &mut Section) -> Result<(), ProtocolError> {
        // Skip '['.
        self.pos += 1;
        let start = self.pos;
        let end = loop {
            match self.peek() {
                Some(b']') => break self.pos,
                Some(b'\n') | None => {
                    return Err(self.malformed("unterminated section name"));
                }
                Some(_) => self.pos += 1,
            }
        };
        let name = self.src[start..end].trim().to_string();
        self.pos = end + 1;

        self.skip_trivia();
        if self.peek() != Some(b'{') {
            return Err(self.malformed(format!("expected '{{' after [{name}]")));
        }
        self.pos += 1;

        let mut child = Section::new(name);
        let result = self.parse_body(&mut child, false);
        parent.add_child(child);
        result
    }

    fn parse_pair(&mut self, section: &mut Section) -> Result<(), ProtocolError> {
        let start = self.pos;
        let eq = loop {
            match self.peek() {
                Some(b'=') => break self.pos,
                Some(b';' | b'{' | b'}' | b'[' | b'\n') | None => {
                    return Err(self.malformed("expected key=value"));
                }
                Some(_) => self.pos += 1,
            }
        };
        let key = self.src[start..eq].trim();
        if key.is_empty() {
            return Err(self.malformed("empty key"));
        }

        self.pos = eq + 1;
        let value_start = self.pos;
        let semi = loop {
            match self.peek() {
                Some(b';') => break self.pos,
                Some(b'\n' | b'}') | None => {
                    return Err(self.malformed(format!("missing ';' after value of {key}")));
                }
                Some(_) => self.pos += 1,
            }
        };
        let value = self.src[value_start..semi].trim();
        section.set(key, value);
        self.pos = semi + 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
// written by the lobby
[GAME]
{
\tMapName=Delta Siege Dry;
\tGameType=Balanced Annihilation V7.72;
\t/* players
\t   follow */
\t[PLAYER0]
\t{
\t\tName=alice;
\t\tTeam=0;
\t}
\t[modoptions]
\t{
\t}
}
";

    #[test]
    fn test_decode_reads_nested_sections() {
        let root = TdfCodec.decode(SCRIPT).expect("valid script");
        let game = root.find("GAME").expect("game section");
        assert_eq!(game.get("mapname"), Some("Delta Siege Dry"));
        assert_eq!(game.get("GameType"), Some("Balanced Annihilation V7.72"));

        let player = game.find("player0").expect("player section");
        assert_eq!(player.get("name"), Some("alice"));
        assert_eq!(player.get_int("team", -1), 0);
        assert!(game.find("MODOPTIONS").unwrap().is_empty());
    }

    #[test]
    fn test_decode_value_may_contain_equals_and_brackets_inside_text() {
        let root = TdfCodec
            .decode("[GAME]{Description=a=b [x];}")
            .expect("valid script");
        let game = root.find("GAME").unwrap();
        assert_eq!(game.get("description"), Some("a=b [x]"));
    }

    #[test]
    fn test_decode_missing_close_brace_keeps_partial_tree() {
        let text = "[GAME]\n{\n\tMapName=Tabula;\n\t[PLAYER0]\n\t{\n\t\tName=bob;\n";
        let (root, err) = TdfCodec.decode_partial(text);

        assert!(matches!(err, Some(ProtocolError::UnexpectedEof { .. })));
        let game = root.find("GAME").expect("partial game section kept");
        assert_eq!(game.get("MapName"), Some("Tabula"));
        assert_eq!(game.find("PLAYER0").unwrap().get("Name"), Some("bob"));
    }

    #[test]
    fn test_decode_block_comment_with_non_ascii_is_skipped() {
        let text = "[GAME]\n{\n\t/* carte: Delta Siège */\n\tMapName=Tabula;\n}\n";
        let (root, err) = TdfCodec.decode_partial(text);

        assert!(err.is_none(), "unexpected error: {err:?}");
        assert_eq!(root.find("GAME").unwrap().get("MapName"), Some("Tabula"));
    }

    #[test]
    fn test_decode_unterminated_block_comment_with_non_ascii_ends_cleanly() {
        let (root, err) = TdfCodec.decode_partial("[GAME]\n{\n\tMapName=Tabula;\n\t/* été");

        assert!(matches!(err, Some(ProtocolError::UnexpectedEof { .. })));
        assert_eq!(root.find("GAME").unwrap().get("MapName"), Some("Tabula"));
    }

    #[test]
    fn test_decode_missing_semicolon_reports_line() {
        let text = "[GAME]\n{\n\tMapName=Tabula\n}\n";
        let err = TdfCodec.decode(text).unwrap_err();
        assert!(
            matches!(err, ProtocolError::Malformed { line: 3, .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_decode_unmatched_close_brace_at_top_level() {
        let err = TdfCodec.decode("}").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_decode_empty_input_is_empty_root() {
        let root = TdfCodec.decode("  \n // nothing\n").unwrap();
        assert!(root.is_empty());
    }

    #[test]
    fn test_encode_then_decode_preserves_tree() {
        let original = TdfCodec.decode(SCRIPT).unwrap();
        let text = TdfCodec.encode(&original);
        let reparsed = TdfCodec.decode(&text).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn test_encode_indents_with_tabs() {
        let mut game = Section::new("GAME");
        game.set("MapName", "Tabula");
        game.child_mut("PLAYER0").set("Name", "alice");

        let text = TdfCodec.encode(&game);
        assert_eq!(
            text,
            "[GAME]\n{\n\tMapName=Tabula;\n\t[PLAYER0]\n\t{\n\t\tName=alice;\n\t}\n}\n"
        );
    }
}
