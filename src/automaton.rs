// =============================================================================
// automaton.rs — THE HAND-FORGED AHO-CORASICK AUTOMATON
// =============================================================================
//
// Every keyword domain in this engine runs on the same machine: a trie of
// keyword characters, stitched together with failure links so one
// left-to-right pass over a message finds every keyword at once, overlaps
// included. "she" in a message reports both "she" and "he". All of them.
//
// Nodes live in a flat arena and point at each other by index. The failure
// link is just another index, so the tree owns its children and nothing else.
//
// Construction is two-phase and the type system enforces it:
//
//   AutomatonBuilder::insert(..)   as many times as you like
//   AutomatonBuilder::build()      consumes the builder, computes failure
//                                  links and output sets exactly once
//   Automaton::search(..)          &self, lock-free, callable from any thread
//
// Output sets are merged at build time: each node carries its own keywords
// plus everything its failure node carries, so the scan never has to chase
// the failure chain just to collect matches.
// =============================================================================

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

type NodeId = usize;
type OutputId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<char, NodeId>,
    fail: NodeId,
    outputs: Vec<OutputId>,
}

#[derive(Debug, Clone)]
struct Output<M> {
    /// Keyword text exactly as inserted, never case-folded.
    keyword: String,
    /// Length in chars; folding preserves it.
    char_len: usize,
    metadata: M,
}

/// Fold a single char for case-insensitive matching.
///
/// Chars whose lowercase form expands to several chars are kept as they are,
/// so folding never changes the char count and positions stay valid.
fn fold(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(folded), None) => folded,
        _ => ch,
    }
}

/// Mutable construction phase of an [`Automaton`].
#[derive(Debug, Clone)]
pub struct AutomatonBuilder<M> {
    nodes: Vec<Node>,
    outputs: Vec<Output<M>>,
    case_sensitive: bool,
    keyword_count: usize,
    max_char_len: usize,
}

impl<M> Default for AutomatonBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> AutomatonBuilder<M> {
    /// A case-insensitive builder.
    pub fn new() -> Self {
        Self::with_case_sensitivity(false)
    }

    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self {
            nodes: vec![Node::default()],
            outputs: Vec::new(),
            case_sensitive,
            keyword_count: 0,
            max_char_len: 0,
        }
    }

    /// Add a keyword with its metadata.
    ///
    /// Inserting the same keyword twice yields two output entries, even with
    /// identical metadata. Deduplication belongs to the consumers.
    /// Empty keywords are ignored.
    pub fn insert(&mut self, keyword: &str, metadata: M) {
        if keyword.is_empty() {
            return;
        }

        let mut node = ROOT;
        let mut char_len = 0;
        for ch in keyword.chars() {
            let ch = self.normalize(ch);
            char_len += 1;
            let existing = self.nodes[node].children.get(&ch).copied();
            node = match existing {
                Some(child) => child,
                None => self.add_child(node, ch),
            };
        }

        let output = self.outputs.len();
        self.outputs.push(Output {
            keyword: keyword.to_string(),
            char_len,
            metadata,
        });
        self.nodes[node].outputs.push(output);
        self.keyword_count += 1;
        self.max_char_len = self.max_char_len.max(char_len);
    }

    pub fn keyword_count(&self) -> usize {
        self.keyword_count
    }

    /// Compute failure links and merged output sets, yielding the immutable
    /// automaton. Breadth-first, so a node's failure target (always shallower)
    /// is complete before the node itself is visited.
    pub fn build(mut self) -> Automaton<M> {
        let mut queue: VecDeque<NodeId> = VecDeque::new();

        let first_level: Vec<NodeId> = self.nodes[ROOT].children.values().copied().collect();
        for child in first_level {
            self.nodes[child].fail = ROOT;
            queue.push_back(child);
        }

        while let Some(current) = queue.pop_front() {
            let edges: Vec<(char, NodeId)> = self.nodes[current]
                .children
                .iter()
                .map(|(&ch, &child)| (ch, child))
                .collect();

            for (ch, child) in edges {
                let mut cursor = self.nodes[current].fail;
                let fail = loop {
                    if let Some(&next) = self.nodes[cursor].children.get(&ch) {
                        break next;
                    }
                    if cursor == ROOT {
                        break ROOT;
                    }
                    cursor = self.nodes[cursor].fail;
                };

                self.nodes[child].fail = fail;
                let inherited = self.nodes[fail].outputs.clone();
                self.nodes[child].outputs.extend(inherited);
                queue.push_back(child);
            }
        }

        Automaton {
            nodes: self.nodes,
            outputs: self.outputs,
            case_sensitive: self.case_sensitive,
            keyword_count: self.keyword_count,
            max_char_len: self.max_char_len,
        }
    }

    fn add_child(&mut self, parent: NodeId, ch: char) -> NodeId {
        let child = self.nodes.len();
        self.nodes.push(Node::default());
        self.nodes[parent].children.insert(ch, child);
        child
    }

    fn normalize(&self, ch: char) -> char {
        if self.case_sensitive {
            ch
        } else {
            fold(ch)
        }
    }
}

/// One keyword occurrence found by [`Automaton::search`].
///
/// `position` and `end` are byte offsets into the scanned text, so
/// `&text[m.position..m.end]` is the matched slice.
#[derive(Debug, PartialEq)]
pub struct Match<'a, M> {
    pub keyword: &'a str,
    pub position: usize,
    pub end: usize,
    pub metadata: &'a M,
}

impl<M> Clone for Match<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Match<'_, M> {}

/// A finalized multi-pattern matcher. Read-only; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Automaton<M> {
    nodes: Vec<Node>,
    outputs: Vec<Output<M>>,
    case_sensitive: bool,
    keyword_count: usize,
    /// Longest keyword, in chars.
    max_char_len: usize,
}

impl<M> Automaton<M> {
    /// An automaton with no keywords. Every search comes back empty.
    pub fn empty(case_sensitive: bool) -> Self {
        AutomatonBuilder::with_case_sensitivity(case_sensitive).build()
    }

    /// Every keyword occurrence in `text`, in scan order. Keywords ending at
    /// the same char are reported longest first.
    pub fn search<'a>(&'a self, text: &str) -> Vec<Match<'a, M>> {
        let mut matches = Vec::new();
        self.scan(text, |found| {
            matches.push(found);
            true
        });
        matches
    }

    /// Like [`search`](Self::search), but only the first occurrence of each
    /// distinct keyword text is kept.
    pub fn search_unique<'a>(&'a self, text: &str) -> Vec<Match<'a, M>> {
        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut matches = Vec::new();
        self.scan(text, |found| {
            if seen.insert(found.keyword) {
                matches.push(found);
            }
            true
        });
        matches
    }

    /// Whether any keyword occurs in `text`. Stops at the first hit.
    pub fn is_match(&self, text: &str) -> bool {
        let mut hit = false;
        self.scan(text, |_| {
            hit = true;
            false
        });
        hit
    }

    pub fn keyword_count(&self) -> usize {
        self.keyword_count
    }

    pub fn is_empty(&self) -> bool {
        self.keyword_count == 0
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Core scan loop. `emit` returns `false` to stop early.
    fn scan<'a, F>(&'a self, text: &str, mut emit: F)
    where
        F: FnMut(Match<'a, M>) -> bool,
    {
        if self.keyword_count == 0 || text.is_empty() {
            return;
        }

        // Byte offsets of the last `max_char_len` chars, indexed by char
        // number modulo the window. No match reaches further back than that.
        let window = self.max_char_len;
        let mut char_starts: Vec<usize> = vec![0; window];
        let mut state = ROOT;

        for (char_idx, (byte_idx, raw)) in text.char_indices().enumerate() {
            char_starts[char_idx % window] = byte_idx;
            let ch = if self.case_sensitive { raw } else { fold(raw) };

            loop {
                if let Some(&next) = self.nodes[state].children.get(&ch) {
                    state = next;
                    break;
                }
                if state == ROOT {
                    break;
                }
                state = self.nodes[state].fail;
            }

            let end = byte_idx + raw.len_utf8();
            for &output_id in &self.nodes[state].outputs {
                let output = &self.outputs[output_id];
                let start_char = char_idx + 1 - output.char_len;
                let found = Match {
                    keyword: output.keyword.as_str(),
                    position: char_starts[start_char % window],
                    end,
                    metadata: &output.metadata,
                };
                if !emit(found) {
                    return;
                }
            }
        }
    }
}

impl<M> fmt::Display for Automaton<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Automaton({} keywords, {} nodes, {})",
            self.keyword_count,
            self.nodes.len(),
            if self.case_sensitive {
                "case-sensitive"
            } else {
                "case-insensitive"
            }
        )
    }
}

impl<M> FromIterator<(String, M)> for Automaton<M> {
    fn from_iter<I: IntoIterator<Item = (String, M)>>(iter: I) -> Self {
        let mut builder = AutomatonBuilder::new();
        for (keyword, metadata) in iter {
            builder.insert(&keyword, metadata);
        }
        builder.build()
    }
}
