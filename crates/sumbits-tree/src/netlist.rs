//! Structural netlist export
//!
//! Flattens a built tree into a list of named registers and their sources.
//! The netlist is a complete description of the pipeline (ports, widths,
//! split boundaries, register graph) for backends that render it into a
//! concrete hardware or software description.

use crate::tree::{Leaf, Node, PopcountTree, RegisterId, RegisterKind};
use serde::{Deserialize, Serialize};

/// How registers respond to the reset signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetKind {
    /// Reset sampled on the clock edge
    #[serde(alias = "sync")]
    Synchronous,
    /// Reset clears registers as soon as it is asserted
    #[default]
    #[serde(alias = "async")]
    Asynchronous,
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

/// Top-level port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    pub width: usize,
}

/// What a register samples on each clock edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegisterSource {
    /// Sum of `width` input bits starting at `lsb`, padded with `padding` zero bits
    InputBits {
        lsb: usize,
        width: usize,
        padding: usize,
    },
    /// Sum of two register outputs
    Sum { upper: RegisterId, lower: RegisterId },
}

/// Register in the flattened netlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetlistRegister {
    pub id: RegisterId,
    pub name: String,
    pub width: usize,
    pub kind: RegisterKind,
    pub source: RegisterSource,
}

/// Flattened register graph of a popcount pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Netlist {
    pub name: String,
    pub input_width: usize,
    pub output_width: usize,
    pub depth: usize,
    pub reset: ResetKind,
    pub ports: Vec<Port>,
    /// Ordered by register id; every source refers to a lower id
    pub registers: Vec<NetlistRegister>,
    /// Register driving the `q` output port
    pub output: RegisterId,
}

impl Netlist {
    pub fn from_tree(tree: &PopcountTree, name: impl Into<String>, reset: ResetKind) -> Self {
        let mut registers: Vec<Option<NetlistRegister>> = vec![None; tree.registers().len()];

        tree.root().visit(|node, _, bits| {
            let reg = *node.register();
            let source = match node {
                // Ports in zero-extended territory see fewer real bits
                Node::Leaf(_) => RegisterSource::InputBits {
                    lsb: bits.start,
                    width: bits.len(),
                    padding: Leaf::PORT_WIDTH - bits.len(),
                },
                Node::Internal(internal) => RegisterSource::Sum {
                    upper: internal.left.register().id,
                    lower: internal.right.register().id,
                },
            };
            registers[reg.id.index()] = Some(NetlistRegister {
                id: reg.id,
                name: tree.register_name(reg.id).to_string(),
                width: reg.width,
                kind: reg.kind,
                source,
            });
        });

        let ports = vec![
            Port {
                name: "clk".to_string(),
                direction: PortDirection::Input,
                width: 1,
            },
            Port {
                name: "rst".to_string(),
                direction: PortDirection::Input,
                width: 1,
            },
            Port {
                name: "d".to_string(),
                direction: PortDirection::Input,
                width: tree.input_width(),
            },
            Port {
                name: "q".to_string(),
                direction: PortDirection::Output,
                width: tree.output_width(),
            },
        ];

        Netlist {
            name: name.into(),
            input_width: tree.input_width(),
            output_width: tree.output_width(),
            depth: tree.depth(),
            reset,
            ports,
            registers: registers.into_iter().flatten().collect(),
            output: tree.root().register().id,
        }
    }

    pub fn register(&self, id: RegisterId) -> Option<&NetlistRegister> {
        self.registers.get(id.index()).filter(|r| r.id == id)
    }

    pub fn total_register_bits(&self) -> usize {
        self.registers.iter().map(|r| r.width).sum()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netlist(width: usize) -> Netlist {
        let tree = PopcountTree::build(width).unwrap();
        Netlist::from_tree(&tree, "sumbits", ResetKind::Asynchronous)
    }

    #[test]
    fn test_every_register_present() {
        for width in 1..=40 {
            let n = netlist(width);
            let tree = PopcountTree::build(width).unwrap();
            assert_eq!(n.registers.len(), tree.registers().len());
            for (i, reg) in n.registers.iter().enumerate() {
                assert_eq!(reg.id.index(), i);
            }
        }
    }

    #[test]
    fn test_sources_precede_sinks() {
        let n = netlist(23);
        for reg in &n.registers {
            match reg.source {
                RegisterSource::InputBits { .. } => {}
                RegisterSource::Sum { upper, lower } => {
                    assert!(upper < reg.id && lower < reg.id);
                }
            }
        }
    }

    #[test]
    fn test_input_bits_cover_input_once() {
        let n = netlist(17);
        let mut covered = vec![0usize; 17];
        for reg in &n.registers {
            if let RegisterSource::InputBits { lsb, width, .. } = reg.source {
                for bit in lsb..lsb + width {
                    covered[bit] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_odd_split_pads_lower_leaves() {
        // 3 -> upper 2 (bits 1..3) + lower 1 (bit 0) widened to a 2-bit leaf
        let n = netlist(3);
        let sources: Vec<_> = n.registers.iter().map(|r| r.source).collect();
        assert_eq!(
            sources,
            vec![
                RegisterSource::InputBits {
                    lsb: 1,
                    width: 2,
                    padding: 0
                },
                RegisterSource::InputBits {
                    lsb: 0,
                    width: 1,
                    padding: 1
                },
                RegisterSource::Sum {
                    upper: RegisterId(0),
                    lower: RegisterId(1)
                },
            ]
        );
    }

    #[test]
    fn test_ports() {
        let n = netlist(17);
        let q = n.ports.iter().find(|p| p.name == "q").unwrap();
        assert_eq!(q.width, 5);
        assert_eq!(q.direction, PortDirection::Output);
        let d = n.ports.iter().find(|p| p.name == "d").unwrap();
        assert_eq!(d.width, 17);
        assert_eq!(n.output, n.registers.last().unwrap().id);
    }

    #[test]
    fn test_json_roundtrip() {
        let n = netlist(9);
        let json = n.to_json_pretty().unwrap();
        assert!(json.contains("\"asynchronous\""));
        assert_eq!(Netlist::from_json(&json).unwrap(), n);
    }

    #[test]
    fn test_reset_kind_aliases() {
        let kind: ResetKind = serde_json::from_str("\"sync\"").unwrap();
        assert_eq!(kind, ResetKind::Synchronous);
        assert_eq!(ResetKind::default(), ResetKind::Asynchronous);
    }
}
