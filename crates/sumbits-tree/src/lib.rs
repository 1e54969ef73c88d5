//! sumbits structural layer
//!
//! Builds pipelined population-count reduction trees. A tree over `width`
//! input bits is split recursively (upper slice takes the extra bit on odd
//! widths), every level adds one register sized by [`widthr`], and the
//! finished tree is immutable. Simulation lives in `sumbits-sim`.
//!
//! ```
//! use sumbits_tree::{PopcountTree, Netlist, ResetKind};
//!
//! let tree = PopcountTree::build(17).unwrap();
//! assert_eq!(tree.depth(), 5);
//! assert_eq!(tree.output_width(), 5);
//!
//! let netlist = Netlist::from_tree(&tree, "sumbits", ResetKind::Asynchronous);
//! assert_eq!(netlist.output, tree.root().register().id);
//! ```

pub mod error;
pub mod netlist;
pub mod split;
pub mod tree;
pub mod width;

pub use error::{TreeError, TreeResult};
pub use netlist::{
    Netlist, NetlistRegister, Port, PortDirection, RegisterSource, ResetKind,
};
pub use split::{split, Split};
pub use tree::{
    Internal, Leaf, Node, PopcountTree, RegisterId, RegisterKind, RegisterSpec, TreeBuilder,
    TreeStats,
};
pub use width::{clog2, widthr};
