/// One `/`-delimited component of a registered pattern.
///
/// `Param` and `CatchAll` are parametric: they match any incoming segment
/// value at their position. `CatchAll` additionally swallows the rest of
/// the path.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    pub fn parse(part: &str) -> Self {
        if let Some(name) = part.strip_prefix(':') {
            Segment::Param(name.to_owned())
        } else if let Some(name) = part.strip_prefix('*') {
            Segment::CatchAll(name.to_owned())
        } else {
            Segment::Literal(part.to_owned())
        }
    }

    fn matches(&self, part: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == part,
            Segment::Param(_) | Segment::CatchAll(_) => true,
        }
    }

    fn is_parametric(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }
}

impl Default for Segment {
    fn default() -> Self {
        Segment::Literal(String::new())
    }
}

/// A trie node. Children keep insertion order: at search time the
/// first-registered candidate wins, which makes registration order the
/// tie-break between a literal and a parametric segment at the same
/// position.
#[derive(Default, Debug)]
pub struct Node {
    segment: Segment,
    pattern: Option<String>,
    children: Vec<Node>,
}

impl Node {
    fn new(segment: Segment) -> Self {
        Self {
            segment,
            pattern: None,
            children: vec![],
        }
    }

    /// The full pattern terminating at this node, if any. Nodes created
    /// only as ancestors of a longer pattern carry none.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn insert(&mut self, pattern: &str, parts: &[&str], depth: usize) {
        if depth == parts.len() {
            // Re-registering the same pattern silently overwrites.
            self.pattern = Some(pattern.to_owned());
            return;
        }

        let part = parts[depth];
        let pos = match self.children.iter().position(|ch| ch.reusable_for(part)) {
            Some(pos) => pos,
            None => {
                self.children.push(Node::new(Segment::parse(part)));
                self.children.len() - 1
            }
        };
        self.children[pos].insert(pattern, parts, depth + 1);
    }

    // A parametric child is reused by any deeper insertion passing through
    // its position, whatever the new pattern calls it.
    fn reusable_for(&self, part: &str) -> bool {
        self.segment.is_parametric() || self.segment.matches(part)
    }

    pub fn search(&self, parts: &[&str], depth: usize) -> Option<&Node> {
        if depth == parts.len() || matches!(self.segment, Segment::CatchAll(_)) {
            // An intermediate-only node reached exactly is not a match.
            return self.pattern.is_some().then_some(self);
        }

        let part = parts[depth];
        self.children
            .iter()
            .filter(|ch| ch.segment.matches(part))
            .find_map(|ch| ch.search(parts, depth + 1))
    }
}
