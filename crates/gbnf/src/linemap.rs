/// The type of a byte offset in a string
pub type Offset = u32;

/// Use this for human output text spans.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct CodePointPos {
    /// zero-based line index
    pub line: u32,
    /// zero-based column offset relative to the start of the line, unicode code points (variable length)
    pub character: u32,
}

#[derive(Clone, Copy)]
pub struct LineInfo {
    /// index of the line within the file
    pub line: u32,
    /// byte offset of the start of the line
    pub line_start: Offset,
    /// Does the line contain non-ascii characters?
    pub is_unicode: bool,
}

pub struct LineMap {
    lines: Vec<(Offset, bool)>,
}

impl LineMap {
    /// Only the first [`Offset::MAX`] bytes of `src` are indexed.
    pub fn new(src: &str) -> Self {
        let mut lines = Vec::new();

        let mut prev_end = 0;
        let mut saw_unicode = false;
        let mut bytes = src.bytes().take(Offset::MAX as usize).enumerate();

        // utf8 bytes are either encoding an ascii character or are >=128
        // so we can search for ascii characters by interpreting the string as bytes
        // and not getting any false positives
        while let Some((mut i, b)) = bytes.next() {
            // \r\n  \n  \r are all newlines, the lexer agrees
            match b {
                b'\n' | b'\r' => {
                    if b == b'\r' {
                        if let Some((new_i, b'\n')) = bytes.clone().next() {
                            bytes.next();
                            i = new_i;
                        }
                    }
                    lines.push((prev_end, saw_unicode));
                    saw_unicode = false;
                    prev_end = i as Offset + 1;
                }
                _ => {
                    if b >= 128 {
                        saw_unicode = true;
                    }
                }
            }
        }

        lines.push((prev_end, saw_unicode));

        Self { lines }
    }
    /// Returns zero-based Line and Column offset in unicode codepoints. Offset is clamped to the end of `src`
    pub fn offset_to_codepoint(&self, src: &str, offset: Offset) -> CodePointPos {
        let mut offset = Offset::min(offset, end_offset(src));
        while !src.is_char_boundary(offset as usize) {
            offset -= 1;
        }

        let LineInfo {
            line,
            line_start,
            is_unicode,
        } = self.offset_to_line(offset);

        let line_str = &src[line_start as usize..offset as usize];
        let character = if is_unicode {
            line_str.chars().count() as u32
        } else {
            line_str.len() as u32
        };

        CodePointPos { line, character }
    }
    /// Find the line which contains the offset.
    pub fn offset_to_line(&self, byte_offset: Offset) -> LineInfo {
        let index = self.lines.binary_search_by_key(&byte_offset, |a| a.0);
        let line = match index {
            Ok(a) => a,
            Err(a) => a - 1,
        };
        let (line_start, is_unicode) = self.lines[line];
        debug_assert!(line_start <= byte_offset);

        LineInfo {
            line: line as u32,
            line_start,
            is_unicode,
        }
    }
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Length of `src`, saturated to the largest representable offset.
pub fn end_offset(src: &str) -> Offset {
    Offset::try_from(src.len()).unwrap_or(Offset::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup() {
        let str = "abcd\nì\n\nế";
        let mapping = LineMap::new(str);

        let test = |offset: Offset, (l, c): (u32, u32)| {
            let res = mapping.offset_to_codepoint(str, offset);
            let expected = CodePointPos {
                line: l,
                character: c,
            };
            assert_eq!(expected, res);
        };

        test(0, (0, 0));
        test(4, (0, 4));
        test(5, (1, 0));
        test(7, (1, 1));
        test(8, (2, 0));
        test(9, (3, 0));
    }

    #[test]
    fn crlf_newline() {
        let text = "Hi!\r\nyo";
        let map = LineMap::new(text);
        assert_eq!(map.lines, &[(0, false), (5, false)]);
        assert_eq!(
            map.offset_to_codepoint(text, 6),
            CodePointPos {
                line: 1,
                character: 1
            }
        );
    }

    #[test]
    fn lone_cr_newline() {
        let map = LineMap::new("a\rb");
        assert_eq!(map.lines, &[(0, false), (2, false)]);
    }

    #[test]
    fn offset_clamp() {
        let text = "a\nb\nc";
        let map = LineMap::new(text);
        let pos = map.offset_to_codepoint(text, 9000);
        assert_eq!(
            pos,
            CodePointPos {
                line: 2,
                character: 1
            }
        );
        assert_eq!(map.line_count(), 3);
    }

    #[test]
    fn end_offset_is_length() {
        assert_eq!(end_offset(""), 0);
        assert_eq!(end_offset("aé"), 3);
    }

    #[test]
    fn empty() {
        let map = LineMap::new("");
        assert_eq!(
            map.offset_to_codepoint("", 0),
            CodePointPos {
                line: 0,
                character: 0
            }
        );
    }
}
