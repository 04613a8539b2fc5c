//! Sets of code points, kept as sorted runs of inclusive ranges.
//!
//! Every mutating operation re-establishes the normal form: ranges are in
//! strictly ascending order, pairwise disjoint, and never adjacent (a set
//! containing `'a'..='m'` and `'n'..='z'` stores a single range).

use crate::COCO_WCHAR_MAX;

/// An inclusive run of code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub from: u32,
    pub to: u32,
}

impl Range {
    /// Number of code points covered; at least 1.
    pub fn count(&self) -> usize {
        (self.to - self.from + 1) as usize
    }
}

/// An ordered set of disjoint, non-adjacent inclusive ranges over
/// `0..=COCO_WCHAR_MAX`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharSet {
    ranges: Vec<Range>,
}

impl CharSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The normalised ranges, ascending.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Membership test.
    pub fn get(&self, i: u32) -> bool {
        for r in &self.ranges {
            if i < r.from {
                return false;
            }
            if i <= r.to {
                return true;
            }
        }
        false
    }

    /// Inserts `i`, extending or merging neighbouring ranges as needed.
    /// Idempotent.
    pub fn set(&mut self, i: u32) {
        let mut j = 0;
        while j < self.ranges.len() {
            let cur = self.ranges[j];
            if i + 1 < cur.from {
                break; // strictly before, not adjacent
            }
            if i >= cur.from && i <= cur.to {
                return; // already present
            }
            if i + 1 == cur.from {
                self.ranges[j].from = i;
                return;
            }
            if i == cur.to + 1 {
                self.ranges[j].to = i;
                if j + 1 < self.ranges.len() && i + 1 == self.ranges[j + 1].from {
                    self.ranges[j].to = self.ranges[j + 1].to;
                    self.ranges.remove(j + 1);
                }
                return;
            }
            j += 1;
        }
        self.ranges.insert(j, Range { from: i, to: i });
    }

    /// Number of code points in the set.
    pub fn elements(&self) -> usize {
        self.ranges.iter().map(Range::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Smallest member, or `None` for the empty set.
    pub fn first(&self) -> Option<u32> {
        self.ranges.first().map(|r| r.from)
    }

    /// `self := self ∪ s`.
    pub fn union(&mut self, s: &CharSet) {
        let mut all: Vec<Range> = Vec::with_capacity(self.ranges.len() + s.ranges.len());
        all.extend_from_slice(&self.ranges);
        all.extend_from_slice(&s.ranges);
        all.sort_by_key(|r| r.from);

        let mut out: Vec<Range> = Vec::with_capacity(all.len());
        for r in all {
            match out.last_mut() {
                Some(last) if r.from <= last.to + 1 => last.to = last.to.max(r.to),
                _ => out.push(r),
            }
        }
        self.ranges = out;
    }

    /// `self := self ∩ s`.
    pub fn intersect(&mut self, s: &CharSet) {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < s.ranges.len() {
            let x = self.ranges[i];
            let y = s.ranges[j];
            let from = x.from.max(y.from);
            let to = x.to.min(y.to);
            if from <= to {
                out.push(Range { from, to });
            }
            if x.to < y.to {
                i += 1;
            } else {
                j += 1;
            }
        }
        self.ranges = out;
    }

    /// `self := self \ s`.
    pub fn subtract(&mut self, s: &CharSet) {
        let mut out = Vec::new();
        for r in &self.ranges {
            let mut lo = r.from;
            let mut done = false;
            for y in &s.ranges {
                if y.to < lo {
                    continue;
                }
                if y.from > r.to {
                    break;
                }
                if y.from > lo {
                    out.push(Range {
                        from: lo,
                        to: y.from - 1,
                    });
                }
                if y.to >= r.to {
                    done = true;
                    break;
                }
                lo = y.to + 1;
            }
            if !done && lo <= r.to {
                out.push(Range { from: lo, to: r.to });
            }
        }
        self.ranges = out;
    }

    /// True when every member of `s` is a member of `self`.
    ///
    /// Both sets are normalised, so a range of `s` is covered iff a single
    /// range of `self` contains it.
    pub fn includes(&self, s: &CharSet) -> bool {
        s.ranges
            .iter()
            .all(|y| self.ranges.iter().any(|x| x.from <= y.from && y.to <= x.to))
    }

    /// True when the sets share at least one member.
    pub fn intersects(&self, s: &CharSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < s.ranges.len() {
            let x = self.ranges[i];
            let y = s.ranges[j];
            if x.from.max(y.from) <= x.to.min(y.to) {
                return true;
            }
            if x.to < y.to {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// Becomes the full set `0..=COCO_WCHAR_MAX`.
    pub fn fill(&mut self) {
        self.ranges = vec![Range {
            from: 0,
            to: COCO_WCHAR_MAX,
        }];
    }
}

impl FromIterator<u32> for CharSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let mut s = CharSet::new();
        for i in iter {
            s.set(i);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn of(items: &[u32]) -> CharSet {
        items.iter().copied().collect()
    }

    fn assert_normalised(s: &CharSet) {
        for w in s.ranges().windows(2) {
            assert!(w[0].from <= w[0].to);
            assert!(
                w[0].to + 1 < w[1].from,
                "ranges {:?} and {:?} overlap or are adjacent",
                w[0],
                w[1]
            );
        }
    }

    #[test]
    fn set_grows_and_merges_ranges() {
        let mut s = CharSet::new();
        s.set(5);
        s.set(7);
        assert_eq!(s.ranges().len(), 2);
        s.set(6); // bridges the gap
        assert_eq!(s.ranges(), &[Range { from: 5, to: 7 }]);
        s.set(4);
        s.set(8);
        assert_eq!(s.ranges(), &[Range { from: 4, to: 8 }]);
        s.set(6); // idempotent
        assert_eq!(s.ranges(), &[Range { from: 4, to: 8 }]);
        assert_normalised(&s);
    }

    #[test]
    fn get_and_elements() {
        let s = of(&[1, 2, 3, 10, 20, 21]);
        assert!(s.get(2));
        assert!(s.get(10));
        assert!(!s.get(4));
        assert!(!s.get(19));
        assert_eq!(s.elements(), 6);
        assert_eq!(s.first(), Some(1));
        assert_eq!(CharSet::new().first(), None);
    }

    #[test]
    fn union_normalises() {
        let mut a = of(&[1, 2, 3, 9]);
        let b = of(&[4, 5, 20]);
        a.union(&b);
        assert_eq!(
            a.ranges(),
            &[
                Range { from: 1, to: 5 },
                Range { from: 9, to: 9 },
                Range { from: 20, to: 20 }
            ]
        );
        assert_normalised(&a);
    }

    #[test]
    fn intersect_keeps_common_runs() {
        let mut a = of(&[1, 2, 3, 4, 10, 11]);
        let b = of(&[3, 4, 5, 11, 12]);
        a.intersect(&b);
        assert_eq!(
            a.ranges(),
            &[Range { from: 3, to: 4 }, Range { from: 11, to: 11 }]
        );
    }

    #[test]
    fn subtract_splits_ranges() {
        let mut a = CharSet::new();
        for i in 0..10 {
            a.set(i);
        }
        let b = of(&[3, 4, 7]);
        a.subtract(&b);
        assert_eq!(
            a.ranges(),
            &[
                Range { from: 0, to: 2 },
                Range { from: 5, to: 6 },
                Range { from: 8, to: 9 }
            ]
        );
        assert_normalised(&a);
    }

    #[test]
    fn subtract_everything_leaves_empty() {
        let mut a = of(&[1, 2, 3]);
        let mut b = CharSet::new();
        b.fill();
        a.subtract(&b);
        assert!(a.is_empty());
        assert_eq!(a.elements(), 0);
    }

    #[test]
    fn includes_union_difference_agree() {
        let a = of(&[1, 2, 3, 4, 10]);
        let b = of(&[2, 3, 10]);
        assert!(a.includes(&b));
        assert!(!b.includes(&a));

        // A ⊇ B  ⇔  A ∪ B = A  ⇔  B \ A = ∅
        let mut u = a.clone();
        u.union(&b);
        assert_eq!(u, a);
        let mut d = b.clone();
        d.subtract(&a);
        assert!(d.is_empty());
    }

    #[test]
    fn intersects() {
        let a = of(&[1, 2, 3]);
        let b = of(&[3, 4]);
        let c = of(&[7, 8]);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!CharSet::new().intersects(&a));
    }

    #[test]
    fn fill_covers_the_bmp() {
        let mut s = CharSet::new();
        s.fill();
        assert_eq!(s.elements(), COCO_WCHAR_MAX as usize + 1);
        assert!(s.get(0));
        assert!(s.get(COCO_WCHAR_MAX));
        let mut again = s.clone();
        again.union(&s);
        assert_eq!(again, s);
    }

    #[test]
    fn mixed_operations_stay_normalised() {
        let mut s = CharSet::new();
        for i in [900, 5, 6, 7, 100, 101, 4, 8] {
            s.set(i);
        }
        assert_normalised(&s);
        let mut other = of(&[7, 8, 9, 99, 100]);
        other.union(&s);
        assert_normalised(&other);
        other.subtract(&of(&[6]));
        assert_normalised(&other);
        other.intersect(&s);
        assert_normalised(&other);
    }
}
