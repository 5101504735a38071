use std::ops::Range;

/// Byte range into the source text.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Span {
    lo: usize,
    hi: usize,
}

impl Span {
    pub const DUMMY: Span = Span::new(0, 0);

    pub const fn new(lo: usize, hi: usize) -> Self {
        Self { lo, hi }
    }

    pub const fn lo(&self) -> usize {
        self.lo
    }

    pub const fn hi(&self) -> usize {
        self.hi
    }

    /// Span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }

    /// Pulls a span that starts at or past the end of `src` back onto its
    /// last character.
    pub fn clamp_to(self, src: &str) -> Span {
        match src.char_indices().last() {
            Some((last, c)) if self.lo >= src.len() => Span::new(last, last + c.len_utf8()),
            _ => self,
        }
    }

    /// Byte range of the source line containing the start of the span,
    /// without its terminator.
    pub fn line_in(&self, src: &str) -> Range<usize> {
        let lo = self.lo.min(src.len());
        let start = src[..lo].rfind('\n').map_or(0, |i| i + 1);
        let end = src[lo..].find('\n').map_or(src.len(), |i| lo + i);
        start..end
    }
}
