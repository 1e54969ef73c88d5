//! Recursive popcount tree construction
//!
//! `TreeBuilder::build(width)` splits the input in half, builds a reducer for
//! each half and joins their outputs through one register. Each level of
//! recursion adds one register stage, so the root output lags the input by
//! the tree depth while a fresh input can be presented every cycle.
//!
//! # Odd widths
//!
//! Both halves of a split are built over the upper width `width - width/2`.
//! On odd widths the lower slice is one bit short and is zero-extended on the
//! left, so the two subtrees are identical in shape, every leaf has a 2-bit
//! port and every leaf-to-root path crosses exactly `depth` registers.

use crate::error::{TreeError, TreeResult};
use crate::split::{split_widths, Split};
use crate::width::widthr;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, trace};

/// Dense register identifier, assigned in post-order by the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegisterId(pub u32);

impl RegisterId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Role of a register within the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    /// Sum of two raw input bits
    Leaf,
    /// Sum of two child outputs
    Sum,
}

/// A synchronous register slot in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterSpec {
    pub id: RegisterId,
    /// Register width in bits
    pub width: usize,
    pub kind: RegisterKind,
}

/// Terminal node summing the two bits of its input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    /// Port bits wired to the input: 2, or 1 for a single-bit tree
    pub input_width: usize,
    pub register: RegisterSpec,
}

impl Leaf {
    /// Width of a leaf's input port
    pub const PORT_WIDTH: usize = 2;

    /// Number of port bits tied to constant zero
    pub fn padding(&self) -> usize {
        Self::PORT_WIDTH - self.input_width
    }
}

/// Node joining an upper and a lower subtree through one register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Internal {
    pub input_width: usize,
    pub split: Split,
    /// Subtree over the upper (most-significant) slice
    pub left: Box<Node>,
    /// Subtree over the lower slice, zero-extended to the upper width
    pub right: Box<Node>,
    pub register: RegisterSpec,
    pub depth: usize,
}

/// Popcount tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Leaf(Leaf),
    Internal(Internal),
}

impl Node {
    /// Width of this node's input port
    pub fn input_width(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.input_width,
            Node::Internal(node) => node.input_width,
        }
    }

    /// Width of this node's output register
    pub fn output_width(&self) -> usize {
        self.register().width
    }

    /// The register driving this node's output
    pub fn register(&self) -> &RegisterSpec {
        match self {
            Node::Leaf(leaf) => &leaf.register,
            Node::Internal(node) => &node.register,
        }
    }

    /// Register stages between any input bit and this node's output
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Internal(node) => node.depth,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn register_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Internal(node) => 1 + node.left.register_count() + node.right.register_count(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Internal(node) => node.left.leaf_count() + node.right.leaf_count(),
        }
    }

    /// Walk the subtree in pre-order.
    ///
    /// The visitor receives each node together with its hierarchical path
    /// (`root`, `root.upper`, `root.lower.upper`, ...) and the range of
    /// top-level input bits wired to its port. The range is shorter than the
    /// port where the node sits in zero-extended territory, and empty when
    /// the whole port is tied low.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&Node, &str, Range<usize>),
    {
        self.visit_at("root", 0..self.input_width(), &mut visitor);
    }

    fn visit_at<F>(&self, path: &str, bits: Range<usize>, visitor: &mut F)
    where
        F: FnMut(&Node, &str, Range<usize>),
    {
        visitor(self, path, bits.clone());
        if let Node::Internal(node) = self {
            let boundary = (bits.start + node.split.lower).min(bits.end);
            node.left
                .visit_at(&format!("{}.upper", path), boundary..bits.end, visitor);
            node.right
                .visit_at(&format!("{}.lower", path), bits.start..boundary, visitor);
        }
    }
}

/// Recursive builder for popcount trees
#[derive(Debug, Default)]
pub struct TreeBuilder {
    next_register: u32,
}

impl TreeBuilder {
    /// Build a popcount tree over `width` input bits.
    ///
    /// Width is validated before any structure is built. A 1-bit tree is a
    /// single leaf with its high port bit tied low.
    pub fn build(width: usize) -> TreeResult<Node> {
        if width < 1 {
            return Err(TreeError::InvalidWidth(width));
        }
        let mut builder = TreeBuilder::default();
        let root = if width == 1 {
            Node::Leaf(Leaf {
                input_width: 1,
                register: builder.allocate(widthr(1), RegisterKind::Leaf),
            })
        } else {
            builder.build_node(width)
        };
        debug!(
            "Built popcount tree: width={} depth={} registers={}",
            width,
            root.depth(),
            builder.next_register
        );
        Ok(root)
    }

    fn build_node(&mut self, width: usize) -> Node {
        if width <= Leaf::PORT_WIDTH {
            assert_eq!(width, Leaf::PORT_WIDTH, "leaf built over {} bits", width);
            let register = self.allocate(widthr(width), RegisterKind::Leaf);
            trace!("leaf {:?}", register.id);
            return Node::Leaf(Leaf {
                input_width: width,
                register,
            });
        }

        let split = split_widths(width);
        let left = self.build_node(split.branch_width());
        let right = self.build_node(split.branch_width());
        assert_eq!(split.upper + split.lower, width);
        assert_eq!(left.depth(), right.depth());

        let register = self.allocate(widthr(width), RegisterKind::Sum);
        trace!(
            "sum {:?}: width {} split {:?} ({} padding bit(s))",
            register.id,
            width,
            split,
            split.padding()
        );

        Node::Internal(Internal {
            input_width: width,
            split,
            depth: left.depth() + 1,
            left: Box::new(left),
            right: Box::new(right),
            register,
        })
    }

    fn allocate(&mut self, width: usize, kind: RegisterKind) -> RegisterSpec {
        let id = RegisterId(self.next_register);
        self.next_register += 1;
        RegisterSpec { id, width, kind }
    }
}

/// Summary figures for a built tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub input_width: usize,
    pub output_width: usize,
    pub depth: usize,
    pub registers: usize,
    pub register_bits: usize,
    pub leaves: usize,
    /// Zero bits added by odd splits, summed over every internal node
    pub padding_bits: usize,
}

/// A built tree together with its flattened register table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopcountTree {
    root: Node,
    /// Indexed by `RegisterId`
    registers: Vec<RegisterSpec>,
    /// Hierarchical register names, indexed by `RegisterId`
    names: Vec<String>,
}

impl PopcountTree {
    pub fn build(width: usize) -> TreeResult<Self> {
        let root = TreeBuilder::build(width)?;
        Ok(Self::from_root(root))
    }

    pub fn from_root(root: Node) -> Self {
        let count = root.register_count();
        let mut slots: Vec<Option<(RegisterSpec, String)>> = vec![None; count];

        root.visit(|node, path, _| {
            let reg = *node.register();
            slots[reg.id.index()] = Some((reg, path.to_string()));
        });

        let (registers, names): (Vec<RegisterSpec>, Vec<String>) = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                Some(entry) => entry,
                None => panic!("register id {} not assigned by the builder", i),
            })
            .unzip();

        PopcountTree {
            root,
            registers,
            names,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn input_width(&self) -> usize {
        self.root.input_width()
    }

    pub fn output_width(&self) -> usize {
        self.root.output_width()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn registers(&self) -> &[RegisterSpec] {
        &self.registers
    }

    pub fn register_name(&self, id: RegisterId) -> &str {
        &self.names[id.index()]
    }

    pub fn stats(&self) -> TreeStats {
        let mut padding_bits = 0;
        self.root.visit(|node, _, _| {
            if let Node::Internal(internal) = node {
                padding_bits += internal.split.padding();
            }
        });

        TreeStats {
            input_width: self.input_width(),
            output_width: self.output_width(),
            depth: self.depth(),
            registers: self.registers.len(),
            register_bits: self.registers.iter().map(|r| r.width).sum(),
            leaves: self.root.leaf_count(),
            padding_bits,
        }
    }
}
