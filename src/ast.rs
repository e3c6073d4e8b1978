//! The flat-array AST store: structure-of-arrays node table with
//! parent-implicit, first-child/next-sibling tree links.
//!
//! Nodes are never mutated after `Tokenizer::tokenize` returns; `reset`
//! drops the logical contents (by resetting the length) without releasing
//! the backing `Vec` capacity, so a warm `AstStore` re-used across parses on
//! the same `ParseContext` never reallocates for same-shaped input.

/// Dense index into the AstStore's parallel columns. `NONE` stands in for
/// spec.md's `-1` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeKind {
    Object,
    Array,
    String,
    Number,
    BoolTrue,
    BoolFalse,
    Null,
    Field,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::String => "string",
            NodeKind::Number => "number",
            NodeKind::BoolTrue | NodeKind::BoolFalse => "boolean",
            NodeKind::Null => "null",
            NodeKind::Field => "field",
        }
    }
}

/// Per-node bit flags. Only two bits are defined by spec.md; both fit in one
/// byte, so there is no reason to reach for a flags-generation macro crate
/// for this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct NodeFlags(u8);

impl NodeFlags {
    pub const STRING_ESCAPED: NodeFlags = NodeFlags(0b01);
    pub const NUMBER_FLOAT: NodeFlags = NodeFlags(0b10);

    pub const fn empty() -> Self {
        NodeFlags(0)
    }

    #[inline]
    pub fn contains(self, other: NodeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn set(&mut self, other: NodeFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for NodeFlags {
    type Output = NodeFlags;
    fn bitor(self, rhs: NodeFlags) -> NodeFlags {
        NodeFlags(self.0 | rhs.0)
    }
}

/// Structure-of-arrays node table. Every column is indexed by the same
/// `NodeIndex`.
#[derive(Default)]
pub struct AstStore {
    kind: Vec<NodeKind>,
    start: Vec<u32>,
    end: Vec<u32>,
    first_child: Vec<NodeIndex>,
    next_sibling: Vec<NodeIndex>,
    last_child: Vec<NodeIndex>,
    flags: Vec<NodeFlags>,
    hash: Vec<u64>,
    root: NodeIndex,
}

impl AstStore {
    pub fn new() -> Self {
        Self {
            kind: Vec::new(),
            start: Vec::new(),
            end: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            last_child: Vec::new(),
            flags: Vec::new(),
            hash: Vec::new(),
            root: NodeIndex::NONE,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            kind: Vec::with_capacity(cap),
            start: Vec::with_capacity(cap),
            end: Vec::with_capacity(cap),
            first_child: Vec::with_capacity(cap),
            next_sibling: Vec::with_capacity(cap),
            last_child: Vec::with_capacity(cap),
            flags: Vec::with_capacity(cap),
            hash: Vec::with_capacity(cap),
            root: NodeIndex::NONE,
        }
    }

    pub fn len(&self) -> usize {
        self.kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    /// Resets the logical length to zero and drops the root, without
    /// shrinking any column's backing capacity.
    pub fn reset(&mut self) {
        self.kind.clear();
        self.start.clear();
        self.end.clear();
        self.first_child.clear();
        self.next_sibling.clear();
        self.last_child.clear();
        self.flags.clear();
        self.hash.clear();
        self.root = NodeIndex::NONE;
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn set_root(&mut self, index: NodeIndex) {
        self.root = index;
    }

    /// Appends a node and returns its index. The backing columns grow
    /// geometrically (via `Vec`'s own amortized-doubling growth), never
    /// shrinking on `reset`.
    pub fn add_node(&mut self, kind: NodeKind, start: u32, end: u32, flags: NodeFlags, hash: u64) -> NodeIndex {
        let index = NodeIndex(self.kind.len() as u32);
        self.kind.push(kind);
        self.start.push(start);
        self.end.push(end);
        self.first_child.push(NodeIndex::NONE);
        self.next_sibling.push(NodeIndex::NONE);
        self.last_child.push(NodeIndex::NONE);
        self.flags.push(flags);
        self.hash.push(hash);
        index
    }

    #[inline]
    pub fn get_kind(&self, i: NodeIndex) -> NodeKind {
        self.kind[i.index()]
    }

    #[inline]
    pub fn get_start(&self, i: NodeIndex) -> u32 {
        self.start[i.index()]
    }

    #[inline]
    pub fn get_end(&self, i: NodeIndex) -> u32 {
        self.end[i.index()]
    }

    #[inline]
    pub fn set_end(&mut self, i: NodeIndex, end: u32) {
        self.end[i.index()] = end;
    }

    #[inline]
    pub fn get_first_child(&self, i: NodeIndex) -> NodeIndex {
        self.first_child[i.index()]
    }

    #[inline]
    pub fn set_first_child(&mut self, i: NodeIndex, child: NodeIndex) {
        self.first_child[i.index()] = child;
    }

    #[inline]
    pub fn get_next_sibling(&self, i: NodeIndex) -> NodeIndex {
        self.next_sibling[i.index()]
    }

    #[inline]
    pub fn set_next_sibling(&mut self, i: NodeIndex, sibling: NodeIndex) {
        self.next_sibling[i.index()] = sibling;
    }

    #[inline]
    pub fn get_flags(&self, i: NodeIndex) -> NodeFlags {
        self.flags[i.index()]
    }

    #[inline]
    pub fn get_hash(&self, i: NodeIndex) -> u64 {
        self.hash[i.index()]
    }

    /// Links `child` as the last child of `parent`, in O(1) amortized time
    /// via the private `last_child` tail pointer. `last_child` is an
    /// implementation detail: traversal APIs only ever expose
    /// `first_child`/`next_sibling`.
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        let tail = self.last_child[parent.index()];
        if tail.is_none() {
            self.first_child[parent.index()] = child;
        } else {
            self.next_sibling[tail.index()] = child;
        }
        self.last_child[parent.index()] = child;
    }
}
