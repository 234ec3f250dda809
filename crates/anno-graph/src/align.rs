//! Greedy pairwise alignment of two parallel base tiers.
//!
//! Matching heads pair up. On a mismatch the engine looks ahead on both sides
//! for the nearest partner of the other side's head and consumes the shorter
//! skipped run as gaps, so one cursor keeps advancing while the other searches
//! forward. This is deliberately local: it does not look for a globally
//! optimal alignment.

/// One column entry of an aligned sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aligned<T> {
    Element(T),
    Gap,
}

impl<T> Aligned<T> {
    #[must_use]
    pub const fn element(&self) -> Option<&T> {
        match self {
            Self::Element(value) => Some(value),
            Self::Gap => None,
        }
    }

    #[must_use]
    pub const fn is_gap(&self) -> bool {
        matches!(self, Self::Gap)
    }
}

/// Two equal-length aligned sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment<T> {
    pub a: Vec<Aligned<T>>,
    pub b: Vec<Aligned<T>>,
}

impl<T> Default for Alignment<T> {
    fn default() -> Self {
        Self {
            a: Vec::new(),
            b: Vec::new(),
        }
    }
}

impl<T> Alignment<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Columns where both sides carry an element.
    #[must_use]
    pub fn paired(&self) -> usize {
        self.columns()
            .filter(|(a, b)| !a.is_gap() && !b.is_gap())
            .count()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&Aligned<T>, &Aligned<T>)> {
        self.a.iter().zip(&self.b)
    }

    fn push(&mut self, a: Aligned<T>, b: Aligned<T>) {
        self.a.push(a);
        self.b.push(b);
    }
}

impl<T: Clone> Alignment<T> {
    /// The `a` side with gaps removed.
    #[must_use]
    pub fn strip_a(&self) -> Vec<T> {
        self.a.iter().filter_map(Aligned::element).cloned().collect()
    }

    /// The `b` side with gaps removed.
    #[must_use]
    pub fn strip_b(&self) -> Vec<T> {
        self.b.iter().filter_map(Aligned::element).cloned().collect()
    }
}

/// Whether two labels plausibly transcribe the same unit: equal text, or one
/// non-empty label contained in the other.
#[must_use]
pub fn label_compatible(x: &str, y: &str) -> bool {
    if x == y {
        return true;
    }
    !x.is_empty() && !y.is_empty() && (x.contains(y) || y.contains(x))
}

/// Align `a` against `b` with an unbounded forward search.
pub fn align<T, F>(a: &[T], b: &[T], compatible: F) -> Alignment<T>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    align_within(a, b, compatible, None)
}

/// Align `a` against `b`, searching at most `lookahead` elements past each
/// head for a partner (`None` searches to the end).
pub fn align_within<T, F>(
    a: &[T],
    b: &[T],
    compatible: F,
    lookahead: Option<usize>,
) -> Alignment<T>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    let mut out = Alignment::default();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if compatible(&a[i], &b[j]) {
            out.push(Aligned::Element(a[i].clone()), Aligned::Element(b[j].clone()));
            i += 1;
            j += 1;
            continue;
        }

        let end_b = lookahead.map_or(b.len(), |w| (j + 1 + w).min(b.len()));
        let end_a = lookahead.map_or(a.len(), |w| (i + 1 + w).min(a.len()));
        let skip_b = (j + 1..end_b)
            .find(|&k| compatible(&a[i], &b[k]))
            .map(|k| k - j);
        let skip_a = (i + 1..end_a)
            .find(|&k| compatible(&a[k], &b[j]))
            .map(|k| k - i);

        match (skip_b, skip_a) {
            (Some(sb), Some(sa)) if sb <= sa => {
                gaps_on_a(&mut out, &b[j..j + sb]);
                j += sb;
            }
            (Some(sb), None) => {
                gaps_on_a(&mut out, &b[j..j + sb]);
                j += sb;
            }
            (_, Some(sa)) => {
                gaps_on_b(&mut out, &a[i..i + sa]);
                i += sa;
            }
            (None, None) => {
                out.push(Aligned::Element(a[i].clone()), Aligned::Gap);
                out.push(Aligned::Gap, Aligned::Element(b[j].clone()));
                i += 1;
                j += 1;
            }
        }
    }

    gaps_on_b(&mut out, &a[i..]);
    gaps_on_a(&mut out, &b[j..]);
    out
}

fn gaps_on_a<T: Clone>(out: &mut Alignment<T>, run: &[T]) {
    for value in run {
        out.push(Aligned::Gap, Aligned::Element(value.clone()));
    }
}

fn gaps_on_b<T: Clone>(out: &mut Alignment<T>, run: &[T]) {
    for value in run {
        out.push(Aligned::Element(value.clone()), Aligned::Gap);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn labels(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn compat(x: &String, y: &String) -> bool {
        label_compatible(x, y)
    }

    #[rstest]
    #[case("k a t", "k a t")]
    #[case("k a t", "k t")]
    #[case("dh ah", "d ax")]
    #[case("", "a b")]
    #[case("s t aa p", "s aa p s")]
    #[case("a b c d", "x y")]
    fn gaps_removed_reconstruct_inputs(#[case] a: &str, #[case] b: &str) {
        let (a, b) = (labels(a), labels(b));
        let out = align(&a, &b, compat);
        assert_eq!(out.a.len(), out.b.len());
        assert_eq!(out.strip_a(), a);
        assert_eq!(out.strip_b(), b);
    }

    #[test]
    fn deletion_is_a_single_gap() {
        let out = align(&labels("k a t"), &labels("k t"), compat);
        assert_eq!(out.len(), 3);
        assert_eq!(out.paired(), 2);
        assert!(out.b[1].is_gap());
    }

    #[test]
    fn substring_labels_pair() {
        let out = align(&labels("er r"), &labels("er"), compat);
        assert_eq!(out.paired(), 1);
        assert!(label_compatible("aa1", "aa"));
        assert!(!label_compatible("", "aa"));
    }

    #[test]
    fn unmatched_heads_are_emitted_against_gaps() {
        let out = align(&labels("p"), &labels("b"), compat);
        assert_eq!(out.len(), 2);
        assert_eq!(out.paired(), 0);
    }

    #[test]
    fn lookahead_bounds_the_search() {
        let a = labels("x a");
        let b = labels("y z w a");
        let unbounded = align(&a, &b, compat);
        assert_eq!(unbounded.paired(), 1);
        let bounded = align_within(&a, &b, compat, Some(1));
        assert_eq!(bounded.strip_b(), b);
        assert_eq!(bounded.paired(), 0);
    }
}
