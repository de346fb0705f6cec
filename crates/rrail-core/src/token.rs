//! Token-based in-memory rung model.
//!
//! A rung is stored the way controller rung text encodes it: a flat list of
//! instruction tokens interleaved with `[` (branch start), `,` (next leg),
//! and `]` (branch end) markers. The compiler walks the tokens once,
//! allocates branch ids, and produces the contiguous [`SeqElement`] sequence
//! the layout engine consumes. Every mutator splices tokens and lets the next
//! compile re-index, so positions can never have gaps.

use crate::element::{
    BranchId, BranchIdAllocator, ElementKind, Instruction, SeqElement,
};
use crate::error::{LadderError, NotFoundError, StructuralError};
use crate::sequence::SequenceModel;

/// One token of a rung's stored text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Instruction(Instruction),
    BranchOpen,
    BranchNext,
    BranchClose,
}

impl Token {
    const fn is_instruction(&self) -> bool {
        matches!(self, Self::Instruction(_))
    }
}

/// A branch group's token footprint, produced by one compile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupSpan {
    id: BranchId,
    /// Token index of the `[` marker.
    start: usize,
    /// Token index of the matching `]` marker.
    end: usize,
    /// Token indices of the group's `,` markers, in order.
    dividers: Vec<usize>,
}

#[derive(Debug)]
struct Compiled {
    elements: Vec<SeqElement>,
    groups: Vec<GroupSpan>,
}

/// Per-open-branch compiler state.
#[derive(Debug, Clone, Copy)]
struct OpenGroup {
    group: BranchId,
    leg: BranchId,
    root: BranchId,
    level: u32,
    start_token: usize,
}

/// In-memory [`SequenceModel`] over a token list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRung {
    tokens: Vec<Token>,
    comment: String,
}

impl TokenRung {
    /// Create an empty rung.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse rung text such as `XIC(A)[XIC(B),XIC(C)]OTE(D)`.
    ///
    /// Whitespace between tokens is ignored; commas inside instruction
    /// parentheses belong to the instruction, not the branch structure.
    pub fn parse(text: &str) -> Self {
        let mut tokens = Vec::new();
        let mut buf = String::new();
        let mut paren_depth = 0u32;

        let mut flush = |buf: &mut String, tokens: &mut Vec<Token>| {
            if !buf.trim().is_empty() {
                tokens.push(Token::Instruction(Instruction::parse(buf.trim())));
            }
            buf.clear();
        };

        for ch in text.chars() {
            match ch {
                '(' => {
                    paren_depth += 1;
                    buf.push(ch);
                }
                ')' => {
                    paren_depth = paren_depth.saturating_sub(1);
                    buf.push(ch);
                }
                '[' if paren_depth == 0 => {
                    flush(&mut buf, &mut tokens);
                    tokens.push(Token::BranchOpen);
                }
                ',' if paren_depth == 0 => {
                    flush(&mut buf, &mut tokens);
                    tokens.push(Token::BranchNext);
                }
                ']' if paren_depth == 0 => {
                    flush(&mut buf, &mut tokens);
                    tokens.push(Token::BranchClose);
                }
                c if c.is_whitespace() && paren_depth == 0 => {
                    flush(&mut buf, &mut tokens);
                }
                c => buf.push(c),
            }
        }
        flush(&mut buf, &mut tokens);

        Self {
            tokens,
            comment: String::new(),
        }
    }

    /// Canonical text form of the token list.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Instruction(instr) => out.push_str(&instr.text()),
                Token::BranchOpen => out.push('['),
                Token::BranchNext => out.push(','),
                Token::BranchClose => out.push(']'),
            }
        }
        out
    }

    /// The raw tokens, for inspection.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// True when every `[` has a matching `]` and no divider floats free.
    pub fn branch_structure_valid(&self) -> bool {
        self.compile().is_ok()
    }

    fn check_position(&self, position: usize) -> Result<(), LadderError> {
        if position >= self.tokens.len() {
            return Err(NotFoundError::Position {
                position,
                len: self.tokens.len(),
            }
            .into());
        }
        Ok(())
    }

    fn compile(&self) -> Result<Compiled, LadderError> {
        let mut alloc = BranchIdAllocator::new();
        let mut stack: Vec<OpenGroup> = Vec::new();
        let mut elements = Vec::with_capacity(self.tokens.len());
        let mut groups: Vec<GroupSpan> = Vec::new();

        for (position, token) in self.tokens.iter().enumerate() {
            match token {
                Token::Instruction(instruction) => {
                    let frame = stack.last();
                    elements.push(SeqElement {
                        kind: ElementKind::Instruction,
                        position,
                        branch_id: frame.map(|f| f.leg),
                        root_branch_id: frame.map(|f| f.root),
                        parent_branch_id: None,
                        branch_level: frame.map_or(0, |f| f.level),
                        instruction: Some(instruction.clone()),
                    });
                }
                Token::BranchOpen => {
                    let group = alloc.allocate();
                    let enclosing = stack.last().copied();
                    let root = enclosing.map_or(group, |f| f.root);
                    let level = enclosing.map_or(1, |f| f.level + 1);
                    elements.push(SeqElement {
                        kind: ElementKind::BranchStart,
                        position,
                        branch_id: Some(group),
                        root_branch_id: Some(root),
                        parent_branch_id: enclosing.map(|f| f.leg),
                        branch_level: level,
                        instruction: None,
                    });
                    groups.push(GroupSpan {
                        id: group,
                        start: position,
                        end: position,
                        dividers: Vec::new(),
                    });
                    stack.push(OpenGroup {
                        group,
                        leg: group,
                        root,
                        level,
                        start_token: position,
                    });
                }
                Token::BranchNext => {
                    let frame = stack
                        .last_mut()
                        .ok_or(StructuralError::MalformedTokens { position })?;
                    let leg = alloc.allocate();
                    elements.push(SeqElement {
                        kind: ElementKind::BranchNext,
                        position,
                        branch_id: Some(leg),
                        root_branch_id: Some(frame.root),
                        parent_branch_id: Some(frame.leg),
                        branch_level: frame.level,
                        instruction: None,
                    });
                    let group = frame.group;
                    frame.leg = leg;
                    let span = groups
                        .iter_mut()
                        .rfind(|span| span.id == group)
                        .ok_or(StructuralError::DanglingBranch { branch: group })?;
                    span.dividers.push(position);
                }
                Token::BranchClose => {
                    let frame = stack
                        .pop()
                        .ok_or(StructuralError::EndWithoutStart { position })?;
                    elements.push(SeqElement {
                        kind: ElementKind::BranchEnd,
                        position,
                        branch_id: Some(frame.group),
                        root_branch_id: Some(frame.root),
                        parent_branch_id: stack.last().map(|f| f.leg),
                        branch_level: frame.level,
                        instruction: None,
                    });
                    let span = groups
                        .iter_mut()
                        .rfind(|span| span.id == frame.group)
                        .ok_or(StructuralError::DanglingBranch {
                            branch: frame.group,
                        })?;
                    span.end = position;
                    debug_assert_eq!(span.start, frame.start_token);
                }
            }
        }

        if !stack.is_empty() {
            return Err(StructuralError::Unbalanced { open: stack.len() }.into());
        }

        Ok(Compiled { elements, groups })
    }

    fn group_span(&self, branch: BranchId) -> Result<GroupSpan, LadderError> {
        let compiled = self.compile()?;
        compiled
            .groups
            .into_iter()
            .find(|span| span.id == branch)
            .ok_or_else(|| NotFoundError::Branch { branch }.into())
    }
}

impl SequenceModel for TokenRung {
    fn elements(&self) -> Result<Vec<SeqElement>, LadderError> {
        Ok(self.compile()?.elements)
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn add_instruction(
        &mut self,
        instruction: Instruction,
        position: usize,
    ) -> Result<(), LadderError> {
        if position > self.tokens.len() {
            return Err(NotFoundError::Position {
                position,
                len: self.tokens.len(),
            }
            .into());
        }
        self.tokens.insert(position, Token::Instruction(instruction));
        Ok(())
    }

    fn remove_instructions(&mut self, start: usize, end: usize) -> Result<(), LadderError> {
        if start > end {
            return Err(StructuralError::InvalidBranchRange { start, end }.into());
        }
        self.check_position(end)?;
        for position in start..=end {
            if !self.tokens[position].is_instruction() {
                return Err(StructuralError::MarkerNotRemovable { position }.into());
            }
        }
        self.tokens.drain(start..=end);
        Ok(())
    }

    fn move_instruction(&mut self, old: usize, new: usize) -> Result<(), LadderError> {
        self.check_position(old)?;
        if !self.tokens[old].is_instruction() {
            return Err(StructuralError::MarkerNotRemovable { position: old }.into());
        }
        let token = self.tokens.remove(old);
        if new > self.tokens.len() {
            self.tokens.insert(old, token);
            return Err(NotFoundError::Position {
                position: new,
                len: self.tokens.len() + 1,
            }
            .into());
        }
        self.tokens.insert(new, token);
        Ok(())
    }

    fn insert_branch(&mut self, start: usize, end: usize) -> Result<BranchId, LadderError> {
        if start > end {
            return Err(StructuralError::InvalidBranchRange { start, end }.into());
        }
        self.check_position(end)?;

        // The wrapped slice must be self-contained: balanced markers and no
        // leg divider at the slice's own depth.
        let mut depth = 0i32;
        for token in &self.tokens[start..=end] {
            match token {
                Token::BranchOpen => depth += 1,
                Token::BranchClose => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(StructuralError::InvalidBranchRange { start, end }.into());
                    }
                }
                Token::BranchNext if depth == 0 => {
                    return Err(StructuralError::InvalidBranchRange { start, end }.into());
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(StructuralError::InvalidBranchRange { start, end }.into());
        }

        self.tokens.insert(end + 1, Token::BranchClose);
        self.tokens.insert(start, Token::BranchOpen);

        let compiled = self.compile()?;
        compiled
            .groups
            .iter()
            .find(|span| span.start == start)
            .map(|span| span.id)
            .ok_or_else(|| StructuralError::InvalidBranchRange { start, end }.into())
    }

    fn remove_branch(&mut self, branch: BranchId) -> Result<(), LadderError> {
        let span = self.group_span(branch)?;

        // Everything after the first divider must be empty: deletion splices
        // the first leg into the enclosing context and never discards logic.
        if let Some(&first_divider) = span.dividers.first() {
            let occupied = (first_divider + 1..span.end)
                .filter(|index| !span.dividers.contains(index))
                .count();
            if occupied > 0 {
                return Err(StructuralError::BranchLegsNotEmpty { branch, occupied }.into());
            }
        }

        let mut doomed: Vec<usize> = span.dividers.clone();
        doomed.push(span.start);
        doomed.push(span.end);
        doomed.sort_unstable();
        for index in doomed.into_iter().rev() {
            self.tokens.remove(index);
        }
        Ok(())
    }

    fn insert_branch_leg(&mut self, branch: BranchId) -> Result<(), LadderError> {
        let span = self.group_span(branch)?;
        self.tokens.insert(span.end, Token::BranchNext);
        Ok(())
    }

    fn internal_nesting_level(&self, position: usize) -> Result<u32, LadderError> {
        self.check_position(position)?;
        if self.tokens[position] != Token::BranchOpen {
            return Err(StructuralError::MalformedTokens { position }.into());
        }

        // Find the matching close, then count leg dividers of nested groups.
        let mut depth = 1i32;
        let mut end = None;
        for (index, token) in self.tokens.iter().enumerate().skip(position + 1) {
            match token {
                Token::BranchOpen => depth += 1,
                Token::BranchClose => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(index);
                        break;
                    }
                }
                _ => {}
            }
        }
        let end = end.ok_or(StructuralError::Unbalanced { open: depth as usize })?;

        let mut open = 0i32;
        let mut nested_legs = 0u32;
        let mut deepest = 0u32;
        for token in &self.tokens[position + 1..end] {
            match token {
                Token::BranchOpen => open += 1,
                Token::BranchClose => open -= 1,
                Token::BranchNext if open > 0 => {
                    nested_legs += 1;
                    deepest = deepest.max(nested_legs);
                }
                _ => {}
            }
        }
        Ok(deepest)
    }

    fn comment(&self) -> &str {
        &self.comment
    }

    fn set_comment(&mut self, comment: &str) {
        self.comment = comment.to_string();
    }
}
