use std::{fmt::Display, ops::Deref};

/// Byte range into the grammar source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Span {
    start: u32,
    end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Span {
        Self { start, end }
    }
    pub fn at(pos: u32) -> Span {
        Self {
            start: pos,
            end: pos,
        }
    }
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }
    #[track_caller]
    pub fn as_str(self, src: &str) -> &str {
        &src[self.start as usize..self.end as usize]
    }
    /// Smallest span covering both.
    pub fn join(self, other: Span) -> Span {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
    pub fn start(self) -> u32 {
        self.start
    }
    pub fn end(self) -> u32 {
        self.end
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Spanned<T> {
    pub inner: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Spanned<T> {
        Spanned { inner: value, span }
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[test]
fn test_span_join() {
    let a = Span::new(3, 5);
    let b = Span::new(1, 4);
    assert_eq!(a.join(b), Span::new(1, 5));
    assert_eq!(Span::at(7).join(a), Span::new(3, 7));
    assert!(Span::at(2).is_empty());
    assert_eq!(Span::new(2, 4).as_str("abcdef"), "cd");
}
