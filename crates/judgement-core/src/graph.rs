//! C2: comparison-graph connectivity (spec §4.2).
//!
//! Every judged pair is an edge regardless of outcome; union-find over text
//! indices gives components in `O(n * alpha(n))`.

use judgement_types::{Connectivity, Text, Verdict};

/// Union-find over `0..n` with path compression and union by rank.
///
/// Crate-visible (not private to this module) so the scheduler (C8) can
/// reuse it to track connectivity live as it greedily fills a batch,
/// rather than recomputing `is_connected` from scratch after every pick.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
    components: usize,
}

impl UnionFind {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            components: n,
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    /// Returns `true` when this union actually merged two components.
    pub(crate) fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        self.components -= 1;
        true
    }

    pub(crate) fn components(&self) -> usize {
        self.components
    }
}

/// Compute connectivity of the comparison graph over `texts` given
/// `verdicts` (each verdict contributes an edge between its two texts,
/// regardless of outcome).
#[must_use]
pub fn is_connected(texts: &[Text], verdicts: &[Verdict]) -> Connectivity {
    let n = texts.len();
    if n == 0 {
        return Connectivity {
            is_connected: true,
            components: 0,
            component_of: Vec::new(),
        };
    }

    let index_of: std::collections::HashMap<u64, usize> =
        texts.iter().enumerate().map(|(i, t)| (t.id, i)).collect();

    let mut uf = UnionFind::new(n);
    for v in verdicts {
        if let (Some(&i), Some(&j)) = (index_of.get(&v.text_a_id), index_of.get(&v.text_b_id)) {
            uf.union(i, j);
        }
    }

    let roots: Vec<usize> = (0..n).map(|i| uf.find(i)).collect();
    let mut compact = std::collections::HashMap::new();
    let component_of: Vec<usize> = roots
        .into_iter()
        .map(|r| {
            let next = compact.len();
            *compact.entry(r).or_insert(next)
        })
        .collect();
    let components = compact.len();

    Connectivity {
        is_connected: components <= 1,
        components,
        component_of,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgement_types::Outcome;

    fn text(id: u64) -> judgement_types::Text {
        judgement_types::Text {
            id,
            assignment_id: 1,
            anonymized_name: format!("t{id}"),
            content: None,
            content_html: None,
            original_filename: None,
            created_at: 0,
        }
    }

    fn verdict(a: u64, b: u64) -> Verdict {
        Verdict {
            id: a * 100 + b,
            assignment_id: 1,
            text_a_id: a,
            text_b_id: b,
            outcome: Outcome::AWins,
            created_at: 0,
            rater_id: None,
            rater_name: None,
            comment_a: None,
            comment_b: None,
            supersedes_id: None,
            is_final: false,
            pair_key: None,
        }
    }

    #[test]
    fn zero_texts_is_connected() {
        let c = is_connected(&[], &[]);
        assert!(c.is_connected);
        assert_eq!(c.components, 0);
    }

    #[test]
    fn one_text_is_connected() {
        let c = is_connected(&[text(1)], &[]);
        assert!(c.is_connected);
        assert_eq!(c.components, 1);
    }

    #[test]
    fn two_texts_no_verdicts_is_disconnected() {
        let c = is_connected(&[text(1), text(2)], &[]);
        assert!(!c.is_connected);
        assert_eq!(c.components, 2);
    }

    #[test]
    fn disconnected_triple() {
        let texts = vec![text(1), text(2), text(3)];
        let verdicts = vec![verdict(1, 2)];
        let c = is_connected(&texts, &verdicts);
        assert!(!c.is_connected);
        assert_eq!(c.components, 2);
        assert_eq!(c.component_of[0], c.component_of[1]);
        assert_ne!(c.component_of[0], c.component_of[2]);
    }

    #[test]
    fn chain_is_connected() {
        let texts = vec![text(1), text(2), text(3)];
        let verdicts = vec![verdict(1, 2), verdict(2, 3)];
        let c = is_connected(&texts, &verdicts);
        assert!(c.is_connected);
        assert_eq!(c.components, 1);
    }
}
