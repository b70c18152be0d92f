use std::{
    cmp::{Eq, PartialEq},
    collections::HashMap,
    hash::Hash,
    ops::Range,
};

/// A run of consecutive equal elements present in both a and b
#[derive(Eq, PartialEq, Debug, Clone, Copy, Ord, PartialOrd, Hash)]
pub struct CommonMatch {
    /// How many elements
    pub length: usize,
    /// Where the run starts in a
    pub left_idx: usize,
    /// Where the run starts in b
    pub right_idx: usize,
}

impl CommonMatch {
    /// Longer runs win. Equal runs prefer the earliest position in b, then in a
    fn is_better_than(&self, other: &CommonMatch) -> bool {
        if self.length != other.length {
            return self.length > other.length;
        }

        (self.right_idx, self.left_idx) < (other.right_idx, other.left_idx)
    }
}

/// Representation of a single position in an aligned pair of sequences
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DiffItem<T> {
    /// Element present, unchanged, in both sequences
    Common(T),
    /// Block where the sequences disagree. Either side may be empty, never both
    Change { left: Vec<T>, right: Vec<T> },
}

impl<T> DiffItem<T> {
    pub fn is_change(&self) -> bool {
        matches!(self, DiffItem::Change { .. })
    }

    /// The elements this item contributes to a
    pub fn left(&self) -> &[T] {
        match self {
            DiffItem::Common(item) => std::slice::from_ref(item),
            DiffItem::Change { left, .. } => left,
        }
    }

    /// The elements this item contributes to b
    pub fn right(&self) -> &[T] {
        match self {
            DiffItem::Common(item) => std::slice::from_ref(item),
            DiffItem::Change { right, .. } => right,
        }
    }
}

/// Ordered alignment of a against b. Replaying every item's left side gives back a, replaying
/// every right side gives back b
pub type DiffArray<T> = Vec<DiffItem<T>>;

/// Number of change blocks in a diff array
pub fn change_count<T>(diff_array: &[DiffItem<T>]) -> usize {
    diff_array.iter().filter(|item| item.is_change()).count()
}

/// Helper struct to build a DiffArray from the gaps between common matches
#[derive(Clone, Debug, Eq, PartialEq)]
struct DiffBuilder<T> {
    seq: DiffArray<T>,
}

impl<T: Clone> DiffBuilder<T> {
    fn new() -> DiffBuilder<T> {
        DiffBuilder { seq: Vec::new() }
    }

    /// Add the unmatched gap of both sides
    ///
    /// A gap empty on both sides contributes nothing
    fn push_change(&mut self, left: &[T], right: &[T]) {
        if left.is_empty() && right.is_empty() {
            return;
        }

        self.seq.push(DiffItem::Change {
            left: left.to_vec(),
            right: right.to_vec(),
        });
    }

    fn push_common(&mut self, items: &[T]) {
        self.seq
            .extend(items.iter().cloned().map(DiffItem::Common));
    }
}

/// Map every distinct element of a and b to a small integer token
fn intern<'a, U: Eq + Hash>(a: &'a [U], b: &'a [U]) -> (Vec<usize>, Vec<usize>) {
    let mut tokens: HashMap<&U, usize> = HashMap::new();
    let mut tokenize = |items: &'a [U]| -> Vec<usize> {
        items
            .iter()
            .map(|item| {
                let next = tokens.len();
                *tokens.entry(item).or_insert(next)
            })
            .collect()
    };

    let a_tokens = tokenize(a);
    let b_tokens = tokenize(b);
    (a_tokens, b_tokens)
}

#[derive(Clone, Debug, Default)]
struct State {
    /// Length of the longest string accepted by this state
    len: usize,
    /// Suffix link, `None` only for the root
    link: Option<usize>,
    /// Earliest index in b where the strings of this state end
    first_end: usize,
    next: HashMap<usize, usize>,
}

/// Suffix automaton over a slice of b
///
/// Building it and walking a slice of a through it are both linear, so finding the longest shared
/// run of a region costs O(|a| + |b|) regardless of how often elements repeat
struct SuffixAutomaton {
    states: Vec<State>,
    /// States in use, the rest are kept around for their allocations
    used: usize,
    last: usize,
}

impl SuffixAutomaton {
    fn new() -> SuffixAutomaton {
        SuffixAutomaton {
            states: Vec::new(),
            used: 0,
            last: 0,
        }
    }

    fn add_state(&mut self, len: usize, link: Option<usize>, first_end: usize) -> usize {
        let idx = self.used;
        self.used += 1;

        if idx == self.states.len() {
            self.states.push(State::default());
        }

        let state = &mut self.states[idx];
        state.len = len;
        state.link = link;
        state.first_end = first_end;
        state.next.clear();
        idx
    }

    /// Rebuild the automaton so that it accepts exactly the substrings of b[b_range]
    fn rebuild(&mut self, b: &[usize], b_range: Range<usize>) {
        self.used = 0;
        self.last = self.add_state(0, None, 0);

        for b_idx in b_range {
            self.extend(b[b_idx], b_idx);
        }
    }

    fn extend(&mut self, token: usize, b_idx: usize) {
        let cur = self.add_state(self.states[self.last].len + 1, None, b_idx);

        let mut p = Some(self.last);
        while let Some(p_idx) = p {
            if self.states[p_idx].next.contains_key(&token) {
                break;
            }
            self.states[p_idx].next.insert(token, cur);
            p = self.states[p_idx].link;
        }

        self.last = cur;

        let Some(p_idx) = p else {
            self.states[cur].link = Some(0);
            return;
        };

        let q = self.states[p_idx].next[&token];
        if self.states[p_idx].len + 1 == self.states[q].len {
            self.states[cur].link = Some(q);
            return;
        }

        let clone = self.add_state(
            self.states[p_idx].len + 1,
            self.states[q].link,
            self.states[q].first_end,
        );
        let next = self.states[q].next.clone();
        self.states[clone].next = next;

        let mut p = Some(p_idx);
        while let Some(p_idx) = p {
            if self.states[p_idx].next.get(&token) != Some(&q) {
                break;
            }
            self.states[p_idx].next.insert(token, clone);
            p = self.states[p_idx].link;
        }

        self.states[q].link = Some(clone);
        self.states[cur].link = Some(clone);
    }

    /// Find the longest run shared by a[a_range] and the indexed slice of b
    fn longest_match(&self, a: &[usize], a_range: Range<usize>) -> Option<CommonMatch> {
        let mut best: Option<CommonMatch> = None;

        let mut state = 0;
        let mut length = 0;
        for a_idx in a_range {
            let token = a[a_idx];

            // Drop leading elements of the current run until it can be extended
            loop {
                if let Some(&next) = self.states[state].next.get(&token) {
                    state = next;
                    length += 1;
                    break;
                }

                match self.states[state].link {
                    Some(link) => {
                        state = link;
                        length = self.states[link].len;
                    }
                    None => {
                        length = 0;
                        break;
                    }
                }
            }

            if length == 0 {
                continue;
            }

            let candidate = CommonMatch {
                length,
                left_idx: a_idx + 1 - length,
                right_idx: self.states[state].first_end + 1 - length,
            };

            if best.map_or(true, |best| candidate.is_better_than(&best)) {
                best = Some(candidate);
            }
        }

        best
    }
}

/// Find the runs shared by a and b, ordered by position
///
/// The longest run of the whole input is taken first, then the regions before and after it are
/// searched independently. Runs therefore never overlap and are increasing in both a and b
pub fn find_common<U>(a: &[U], b: &[U]) -> Vec<CommonMatch>
where
    U: Eq + Hash,
{
    let (a, b) = intern(a, b);
    let mut automaton = SuffixAutomaton::new();

    let mut matches = Vec::new();
    let mut regions = vec![(0..a.len(), 0..b.len())];

    while let Some((a_range, b_range)) = regions.pop() {
        if a_range.is_empty() || b_range.is_empty() {
            continue;
        }

        automaton.rebuild(&b, b_range.clone());
        let Some(common) = automaton.longest_match(&a, a_range.clone()) else {
            continue;
        };

        regions.push((
            a_range.start..common.left_idx,
            b_range.start..common.right_idx,
        ));
        regions.push((
            common.left_idx + common.length..a_range.end,
            common.right_idx + common.length..b_range.end,
        ));
        matches.push(common);
    }

    matches.sort_by_key(|common| common.left_idx);
    matches
}

/// Align a against b
pub fn diff<U>(a: &[U], b: &[U]) -> DiffArray<U>
where
    U: Eq + Hash + Clone,
{
    let mut builder = DiffBuilder::new();

    let mut a_idx = 0;
    let mut b_idx = 0;
    for common in find_common(a, b) {
        builder.push_change(&a[a_idx..common.left_idx], &b[b_idx..common.right_idx]);
        builder.push_common(&a[common.left_idx..common.left_idx + common.length]);

        a_idx = common.left_idx + common.length;
        b_idx = common.right_idx + common.length;
    }
    builder.push_change(&a[a_idx..], &b[b_idx..]);

    builder.seq
}

#[cfg(test)]
mod test {
    use super::*;

    fn common(length: usize, left_idx: usize, right_idx: usize) -> CommonMatch {
        CommonMatch {
            length,
            left_idx,
            right_idx,
        }
    }

    fn change<T: Clone>(left: &[T], right: &[T]) -> DiffItem<T> {
        DiffItem::Change {
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }

    #[test]
    fn same() {
        let a = [1, 2, 3, 4];
        let b = [1, 2, 3, 4];
        assert_eq!(find_common(&a, &b), vec![common(4, 0, 0)]);

        let d = diff(&a, &b);
        assert_eq!(
            d,
            vec![
                DiffItem::Common(1),
                DiffItem::Common(2),
                DiffItem::Common(3),
                DiffItem::Common(4),
            ]
        );
        assert_eq!(change_count(&d), 0);
    }

    #[test]
    fn both_empty() {
        let a: [i32; 0] = [];
        assert!(find_common(&a, &a).is_empty());
        assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn find_common_shuffled() {
        let a = [1, 2, 3, 4, 5, 6, 7, 8, 9, 0];
        let b = [2, 3, 1, 4, 7, 8, 9, 0, 5, 6];
        assert_eq!(
            find_common(&a, &b),
            vec![common(2, 1, 0), common(1, 3, 3), common(4, 6, 4)]
        );
    }

    #[test]
    fn find_common_prelast_only_diff() {
        let a = [1, 2, 3, 4, 5, 6, 0];
        let b = [1, 2, 3, 4, 5, 0];
        assert_eq!(find_common(&a, &b), vec![common(5, 0, 0), common(1, 6, 5)]);
    }

    #[test]
    fn find_common_many() {
        let a = [1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 7, 8, 9, 1, 2, 0, 4, 4];
        let b = [2, 3, 1, 4, 7, 8, 9, 0, 5, 6, 1, 7, 8, 0, 0, 9, 1, 2, 4, 4];
        assert_eq!(
            find_common(&a, &b),
            vec![
                common(2, 1, 0),
                common(1, 3, 3),
                common(4, 6, 4),
                common(2, 10, 11),
                common(3, 12, 15),
                common(2, 16, 18),
            ]
        );
    }

    #[test]
    fn equal_runs_prefer_earliest_b() {
        let a = [1, 2];
        let b = [2, 1];
        assert_eq!(find_common(&a, &b), vec![common(1, 1, 0)]);
        assert_eq!(
            diff(&a, &b),
            vec![change(&[1], &[]), DiffItem::Common(2), change(&[], &[1])]
        );
    }

    #[test]
    fn replace_element() {
        let a = [1, 2, 3, 5];
        let b = [1, 2, 4, 5];
        assert_eq!(
            diff(&a, &b),
            vec![
                DiffItem::Common(1),
                DiffItem::Common(2),
                change(&[3], &[4]),
                DiffItem::Common(5),
            ]
        );
    }

    #[test]
    fn remove_all() {
        let a = [1, 2, 3, 4];
        let b = [];
        assert!(find_common(&a, &b).is_empty());
        assert_eq!(diff(&a, &b), vec![change(&[1, 2, 3, 4], &[])]);
    }

    #[test]
    fn prepend() {
        let a = [1, 2, 3, 4];
        let b = [0, 0, 1, 2, 3, 4];
        assert_eq!(
            diff(&a, &b),
            vec![
                change(&[], &[0, 0]),
                DiffItem::Common(1),
                DiffItem::Common(2),
                DiffItem::Common(3),
                DiffItem::Common(4),
            ]
        );
    }

    #[test]
    fn append() {
        let a = [1, 2];
        let b = [1, 2, 3, 4];
        let d = diff(&a, &b);
        assert_eq!(d.last(), Some(&change(&[], &[3, 4])));
        assert_eq!(change_count(&d), 1);
    }

    #[test]
    fn nothing_in_common() {
        let a = [1, 2, 3, 4];
        let b = [5, 6, 7, 8];
        assert_eq!(diff(&a, &b), vec![change(&a, &b)]);
    }

    #[test]
    fn block_move() {
        let a = [1, 2, 3, 4, 5, 6, 7, 8];
        let b = [1, 2, 3, 6, 7, 8, 4, 5];
        assert_eq!(find_common(&a, &b), vec![common(3, 0, 0), common(3, 5, 3)]);
        assert_eq!(
            diff(&a, &b),
            vec![
                DiffItem::Common(1),
                DiffItem::Common(2),
                DiffItem::Common(3),
                change(&[4, 5], &[]),
                DiffItem::Common(6),
                DiffItem::Common(7),
                DiffItem::Common(8),
                change(&[], &[4, 5]),
            ]
        );
    }

    #[test]
    fn smallest_match() {
        let a = [
            "line1",
            "line right",
            "line4",
            "line4",
            "line5",
            "line6",
            "line2",
            "line7",
        ];
        let b = ["line1", "line left", "line2", "line3", "line4", "line5"];
        assert_eq!(
            diff(&a, &b),
            vec![
                DiffItem::Common("line1"),
                change(&["line right", "line4"], &["line left", "line2", "line3"]),
                DiffItem::Common("line4"),
                DiffItem::Common("line5"),
                change(&["line6", "line2", "line7"], &[]),
            ]
        );
    }

    #[test]
    fn duplicate_match() {
        let a = [
            "line2", "line3a", "line4", "line5", "line6", "line4", "line6", "line7", "line8",
            "line9",
        ];
        let b = ["line2", "line4", "line5", "line6", "line7", "line8", "line9"];
        assert_eq!(
            diff(&a, &b),
            vec![
                DiffItem::Common("line2"),
                change(&["line3a"], &[]),
                DiffItem::Common("line4"),
                DiffItem::Common("line5"),
                change(&["line6", "line4"], &[]),
                DiffItem::Common("line6"),
                DiffItem::Common("line7"),
                DiffItem::Common("line8"),
                DiffItem::Common("line9"),
            ]
        );
    }

    #[test]
    fn duplicate_match_middle() {
        let a = [
            "line2", "line3a", "line3", "line4", "line5", "line6", "line4", "line6", "line7",
        ];
        let b = ["line2", "line3", "line4", "line5", "line6", "line7"];
        assert_eq!(
            diff(&a, &b),
            vec![
                DiffItem::Common("line2"),
                change(&["line3a"], &[]),
                DiffItem::Common("line3"),
                DiffItem::Common("line4"),
                DiffItem::Common("line5"),
                DiffItem::Common("line6"),
                change(&["line4", "line6"], &[]),
                DiffItem::Common("line7"),
            ]
        );
    }

    #[test]
    fn repeated_lines_between_unique_ones() {
        // Shaped like two JSON arrays of objects with no key in common
        let object_lines = |prefix: &str| -> Vec<String> {
            (0..1000)
                .flat_map(|i| [format!("\"{prefix}{i}\": {i},"), "},".to_string()])
                .collect()
        };
        let a = object_lines("a");
        let b = object_lines("b");

        let d = diff(&a, &b);
        assert_eq!(change_count(&d), 1000);
        assert_eq!(d.len(), 2000);
        assert_eq!(d[0], change(&a[0..1], &b[0..1]));
        assert_eq!(d[1], DiffItem::Common("},".to_string()));
        assert_eq!(d[1999], DiffItem::Common("},".to_string()));
    }

    #[test]
    fn duplicate_match_start() {
        let a = ["line2", "line5", "line6", "line7", "line8", "line9"];
        let b = [
            "line2", "line5", "line6", "line7", "line5", "line6", "line7", "line8", "line9",
        ];
        assert_eq!(
            diff(&a, &b),
            vec![
                DiffItem::Common("line2"),
                change(&[], &["line5", "line6", "line7"]),
                DiffItem::Common("line5"),
                DiffItem::Common("line6"),
                DiffItem::Common("line7"),
                DiffItem::Common("line8"),
                DiffItem::Common("line9"),
            ]
        );
    }

    #[test]
    fn sides_replay_inputs() {
        let a = [1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 7, 8, 9, 1, 2, 0, 4, 4];
        let b = [2, 3, 1, 4, 7, 8, 9, 0, 5, 6, 1, 7, 8, 0, 0, 9, 1, 2, 4, 4];
        let d = diff(&a, &b);

        let left: Vec<i32> = d.iter().flat_map(DiffItem::left).copied().collect();
        let right: Vec<i32> = d.iter().flat_map(DiffItem::right).copied().collect();
        assert_eq!(left, a);
        assert_eq!(right, b);
    }
}
