use libc::off_t;

/// A byte range `[start, start + len)`. A length of `0` makes the range
/// extensible: it covers every byte from `start` onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRange {
    start: off_t,
    len: off_t,
}

impl LockRange {
    pub fn new(start: off_t, len: off_t) -> Self {
        Self { start, len }
    }

    pub fn start(&self) -> off_t {
        self.start
    }

    pub fn len(&self) -> off_t {
        self.len
    }

    pub fn is_unbounded(&self) -> bool {
        self.len == 0
    }

    /// One byte past the range, `None` when unbounded.
    pub fn end(&self) -> Option<off_t> {
        if self.is_unbounded() {
            None
        } else {
            Some(self.start + self.len)
        }
    }

    /// Whether the two ranges share at least one byte.
    pub fn overlaps(&self, other: &LockRange) -> bool {
        if self.len == 0 {
            return other.len == 0 || other.start + other.len - 1 >= self.start;
        }
        if other.start >= self.start {
            other.start < self.start + self.len
        } else {
            other.len == 0 || other.start + other.len > self.start
        }
    }

    /// How the requested range `req` cuts into `self`, `None` when the two
    /// are disjoint. The cases are tested in this order so every
    /// overlapping pair falls into exactly one class.
    pub fn classify(&self, req: &LockRange) -> Option<RegionOverlap> {
        if !self.overlaps(req) {
            return None;
        }
        Some(if self.strictly_contains(req) {
            RegionOverlap::Interior
        } else if self.covered_by(req) {
            RegionOverlap::Covers
        } else if self.tail_covered_by(req) {
            RegionOverlap::Tail
        } else {
            RegionOverlap::Head
        })
    }

    /// `req` sits strictly inside `self`: bytes of `self` survive on both
    /// sides.
    fn strictly_contains(&self, req: &LockRange) -> bool {
        req.len > 0
            && self.start < req.start
            && (self.len == 0 || self.start + self.len > req.start + req.len)
    }

    /// `req` covers all of `self`.
    fn covered_by(&self, req: &LockRange) -> bool {
        (self.len > 0
            && req.len > 0
            && self.start >= req.start
            && self.start + self.len <= req.start + req.len)
            || (req.len == 0 && req.start <= self.start)
    }

    /// `req` starts strictly inside `self` and reaches at least its end.
    fn tail_covered_by(&self, req: &LockRange) -> bool {
        (self.len > 0
            && req.len > 0
            && self.start < req.start
            && self.start + self.len <= req.start + req.len)
            || (req.len == 0 && self.start < req.start)
    }

    /// The part of `self` left of `req`. Only meaningful for the
    /// `Interior` and `Tail` classes, where `req.start > self.start`.
    pub fn left_remainder(&self, req: &LockRange) -> LockRange {
        LockRange::new(self.start, req.start - self.start)
    }

    /// The part of `self` right of `req`, unbounded iff `self` is. Only
    /// meaningful for the `Interior` and `Head` classes, where `req` is
    /// bounded and ends inside `self`.
    pub fn right_remainder(&self, req: &LockRange) -> LockRange {
        let start = req.start + req.len;
        let len = if self.len == 0 {
            0
        } else {
            self.start + self.len - start
        };
        LockRange::new(start, len)
    }
}

/// How a requested range cuts into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOverlap {
    /// The request covers the whole range.
    Covers,
    /// The request is strictly inside: a remainder survives on each side.
    Interior,
    /// The request covers the tail of the range only.
    Tail,
    /// The request covers the head of the range only.
    Head,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: off_t, len: off_t) -> LockRange {
        LockRange::new(start, len)
    }

    #[test]
    fn bounded_overlap() {
        assert!(range(0, 10).overlaps(&range(9, 1)));
        assert!(range(9, 1).overlaps(&range(0, 10)));
        assert!(!range(0, 10).overlaps(&range(10, 5)));
        assert!(!range(10, 5).overlaps(&range(0, 10)));
        assert!(range(5, 5).overlaps(&range(0, 6)));
    }

    #[test]
    fn unbounded_overlap() {
        assert!(range(10, 0).overlaps(&range(10, 0)));
        assert!(range(10, 0).overlaps(&range(50, 0)));
        assert!(range(10, 0).overlaps(&range(0, 11)));
        assert!(!range(10, 0).overlaps(&range(0, 10)));
        assert!(range(0, 10).overlaps(&range(9, 0)));
        assert!(!range(0, 10).overlaps(&range(10, 0)));
    }

    #[test]
    fn classify_bounded() {
        assert_eq!(
            range(0, 9).classify(&range(3, 3)),
            Some(RegionOverlap::Interior)
        );
        assert_eq!(
            range(3, 3).classify(&range(0, 9)),
            Some(RegionOverlap::Covers)
        );
        assert_eq!(
            range(5, 5).classify(&range(5, 5)),
            Some(RegionOverlap::Covers)
        );
        assert_eq!(
            range(5, 5).classify(&range(7, 3)),
            Some(RegionOverlap::Tail)
        );
        assert_eq!(
            range(5, 5).classify(&range(5, 3)),
            Some(RegionOverlap::Head)
        );
        assert_eq!(
            range(5, 5).classify(&range(3, 4)),
            Some(RegionOverlap::Head)
        );
        assert_eq!(range(5, 5).classify(&range(10, 2)), None);
    }

    #[test]
    fn classify_unbounded() {
        // an unbounded range cut by a bounded request keeps an unbounded
        // right remainder
        assert_eq!(
            range(10, 0).classify(&range(15, 5)),
            Some(RegionOverlap::Interior)
        );
        assert_eq!(
            range(10, 0).classify(&range(5, 10)),
            Some(RegionOverlap::Head)
        );
        // an unbounded request swallows everything at or after its start
        assert_eq!(
            range(10, 0).classify(&range(10, 0)),
            Some(RegionOverlap::Covers)
        );
        assert_eq!(
            range(10, 0).classify(&range(12, 0)),
            Some(RegionOverlap::Tail)
        );
        assert_eq!(
            range(10, 5).classify(&range(0, 0)),
            Some(RegionOverlap::Covers)
        );
        assert_eq!(
            range(10, 5).classify(&range(12, 0)),
            Some(RegionOverlap::Tail)
        );
    }

    #[test]
    fn remainders() {
        let cut = range(0, 9).left_remainder(&range(3, 3));
        assert_eq!((cut.start(), cut.len()), (0, 3));
        let cut = range(0, 9).right_remainder(&range(3, 3));
        assert_eq!((cut.start(), cut.len()), (6, 3));

        // right remainder of an unbounded range stays unbounded
        let cut = range(10, 0).right_remainder(&range(15, 5));
        assert_eq!((cut.start(), cut.len()), (20, 0));
        let cut = range(10, 0).left_remainder(&range(15, 5));
        assert_eq!((cut.start(), cut.len()), (10, 5));
    }
}
