//! Rung elements: instructions and branch markers.

use std::fmt;

/// Stable identifier for a branch within one compiled rung sequence.
///
/// `0` is reserved/invalid so IDs are always non-zero. IDs are allocated
/// densely per compile pass of one rung and are not promised stable across
/// passes; callers holding one across an edit must re-resolve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchId(u32);

impl BranchId {
    /// Lowest valid branch ID.
    pub const MIN: Self = Self(1);

    /// Create a new branch ID, rejecting 0.
    pub fn new(raw: u32) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Allocates dense branch IDs for one compile pass.
#[derive(Debug, Clone)]
pub(crate) struct BranchIdAllocator {
    next: u32,
}

impl BranchIdAllocator {
    pub(crate) fn new() -> Self {
        Self { next: BranchId::MIN.0 }
    }

    pub(crate) fn allocate(&mut self) -> BranchId {
        let id = BranchId(self.next);
        self.next += 1;
        id
    }
}

/// The kind of one entry in a rung's element sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A drawn logic unit: contact, coil, or function block.
    Instruction,
    /// Opens a parallel branch group; its first leg follows immediately.
    BranchStart,
    /// Divides two parallel legs of the innermost open branch.
    BranchNext,
    /// Closes the innermost open branch.
    BranchEnd,
}

/// Visual classification of an instruction, derived from its mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Examine-if-closed / examine-if-open contact. `normally_closed` selects
    /// the XIO rendering.
    Contact { normally_closed: bool },
    /// Output coil; `marker` is the letter drawn inside (L for latch, U for
    /// unlatch), if any.
    Coil { marker: Option<char> },
    /// Everything else renders as a function block with one text row per
    /// operand.
    Block,
}

impl SymbolKind {
    /// Classify a mnemonic the way the ladder canvas does: XIC/XIO are
    /// contacts, OTE/OTL/OTU are coils, anything else is a block.
    pub fn from_mnemonic(mnemonic: &str) -> Self {
        match mnemonic.to_ascii_lowercase().as_str() {
            "xic" => Self::Contact {
                normally_closed: false,
            },
            "xio" => Self::Contact {
                normally_closed: true,
            },
            "ote" => Self::Coil { marker: None },
            "otl" => Self::Coil { marker: Some('L') },
            "otu" => Self::Coil { marker: Some('U') },
            _ => Self::Block,
        }
    }
}

/// One logic instruction: a mnemonic plus its ordered operand texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    mnemonic: String,
    operands: Vec<String>,
    alias: Option<String>,
}

impl Instruction {
    /// Create an instruction from a mnemonic and operand texts.
    pub fn new(mnemonic: impl Into<String>, operands: Vec<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            operands,
            alias: None,
        }
    }

    /// Attach an alias label shown above the symbol next to the operand text.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Parse canonical instruction text such as `XIC(Motor_Start)` or
    /// `TON(Timer1,1000,0)`. Text without parentheses is a bare mnemonic.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once('(') {
            Some((mnemonic, rest)) => {
                let inner = rest.strip_suffix(')').unwrap_or(rest);
                let operands = if inner.is_empty() {
                    Vec::new()
                } else {
                    inner.split(',').map(|op| op.trim().to_string()).collect()
                };
                Self::new(mnemonic.trim(), operands)
            }
            None => Self::new(text, Vec::new()),
        }
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn operands(&self) -> &[String] {
        &self.operands
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Visual classification for layout and rendering.
    pub fn symbol_kind(&self) -> SymbolKind {
        SymbolKind::from_mnemonic(&self.mnemonic)
    }

    /// The text drawn above the symbol: first operand, or `???` when the
    /// instruction has none.
    pub fn label_text(&self) -> &str {
        self.operands.first().map_or("???", |op| op.as_str())
    }

    /// Number of label lines drawn above the symbol (operand text plus the
    /// alias line when present). Blocks carry their operands inside the box
    /// instead.
    pub fn label_lines(&self) -> u32 {
        match self.symbol_kind() {
            SymbolKind::Block => 0,
            _ => 1 + u32::from(self.alias.is_some()),
        }
    }

    /// Canonical text form, e.g. `XIC(Motor_Start)`.
    pub fn text(&self) -> String {
        format!("{}({})", self.mnemonic, self.operands.join(","))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.mnemonic, self.operands.join(","))
    }
}

/// One entry of a rung's compiled element sequence.
///
/// Positions are contiguous zero-based indices; every mutation of the
/// underlying sequence re-indexes so that no gaps ever exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqElement {
    pub kind: ElementKind,
    /// Contiguous zero-based index into the rung's sequence.
    pub position: usize,
    /// The branch this entry belongs to or introduces. `None` on the main
    /// rung.
    pub branch_id: Option<BranchId>,
    /// Outermost branch group containing this entry, if any.
    pub root_branch_id: Option<BranchId>,
    /// For `BranchNext`: the leg this marker chains from. For
    /// `BranchStart`/`BranchEnd`: the enclosing context's leg (`None` at top
    /// level).
    pub parent_branch_id: Option<BranchId>,
    /// 0 = main rung, increasing with nesting depth.
    pub branch_level: u32,
    /// Present only for `ElementKind::Instruction`.
    pub instruction: Option<Instruction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_id_rejects_zero() {
        assert!(BranchId::new(0).is_none());
        assert_eq!(BranchId::new(5).unwrap().get(), 5);
    }

    #[test]
    fn allocator_is_dense_from_one() {
        let mut alloc = BranchIdAllocator::new();
        assert_eq!(alloc.allocate().get(), 1);
        assert_eq!(alloc.allocate().get(), 2);
        assert_eq!(alloc.allocate().get(), 3);
    }

    #[test]
    fn mnemonic_classification() {
        assert_eq!(
            SymbolKind::from_mnemonic("XIC"),
            SymbolKind::Contact {
                normally_closed: false
            }
        );
        assert_eq!(
            SymbolKind::from_mnemonic("xio"),
            SymbolKind::Contact {
                normally_closed: true
            }
        );
        assert_eq!(SymbolKind::from_mnemonic("OTL"), SymbolKind::Coil {
            marker: Some('L')
        });
        assert_eq!(SymbolKind::from_mnemonic("TON"), SymbolKind::Block);
    }

    #[test]
    fn parse_round_trips_text() {
        let instr = Instruction::parse("TON(Timer1,1000,0)");
        assert_eq!(instr.mnemonic(), "TON");
        assert_eq!(instr.operands(), ["Timer1", "1000", "0"]);
        assert_eq!(instr.text(), "TON(Timer1,1000,0)");
    }

    #[test]
    fn label_lines_count_alias() {
        let plain = Instruction::parse("XIC(A)");
        assert_eq!(plain.label_lines(), 1);
        let aliased = Instruction::parse("XIC(A)").with_alias("Start_PB");
        assert_eq!(aliased.label_lines(), 2);
        let block = Instruction::parse("MOV(A,B)");
        assert_eq!(block.label_lines(), 0);
    }
}
