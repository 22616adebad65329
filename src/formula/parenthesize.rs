//! # Parenthesization
//!
//! Decides where a child subtree has to be wrapped in explicit `Parentheses` so the
//! formula reads unambiguously. Every existing wrapper is removed first and the tree is
//! then walked top-down, so the pass is idempotent.
//!
//! The decision for `(parent, index, child)` is the default precedence rule (wrap a
//! child that binds looser than its parent) unless one of the special cases for
//! `Divide`, the right operand of `Subtract`, or `Power` applies; those are final.
//! Operands that are already visually delimited (`Root`, `Log`, `Function`, `Negate`,
//! the expression of `Derivative`) are never wrapped.

use crate::formula::formula_tree::{Formula, PRECEDENCE_POWER};

impl Formula {
    /// Removes every `Parentheses` node, keeping the innermost wrapped subtree.
    pub fn strip_parentheses(self) -> Formula {
        match self {
            Formula::Parentheses(child) => child.strip_parentheses(),
            other => other.map_children(Formula::strip_parentheses),
        }
    }

    /// Wraps exactly the children whose reading would otherwise be ambiguous.
    pub fn parenthesize(self) -> Formula {
        wrap_children(self.strip_parentheses())
    }
}

fn wrap_children(node: Formula) -> Formula {
    let decisions: Vec<bool> = node
        .children()
        .iter()
        .enumerate()
        .map(|(index, child)| needs_parentheses(&node, index, child))
        .collect();
    let mut index = 0;
    node.map_children(|child| {
        let wrap = decisions.get(index).copied().unwrap_or(false);
        index += 1;
        let child = wrap_children(child);
        if wrap { Formula::parentheses(child) } else { child }
    })
}

/// Whether `child`, sitting at position `index` of `parent`, must be wrapped.
pub fn needs_parentheses(parent: &Formula, index: usize, child: &Formula) -> bool {
    match parent {
        // stacked fraction bars are the only ambiguity inside a fraction
        Formula::Divide(..) => matches!(child, Formula::Divide(..)),
        Formula::Subtract(..) if index == 1 => child.precedence() == parent.precedence(),
        Formula::Power(..) if index == 0 => match child {
            Formula::Symbol(symbol) => symbol.visible_pieces() > 1,
            Formula::Negate(_) => true,
            other => other.precedence() < PRECEDENCE_POWER,
        },
        Formula::Power(..) => match child {
            Formula::Power(..) => true,
            Formula::Symbol(symbol) => symbol.has_power_above_one(),
            _ => false,
        },
        Formula::Root(..) | Formula::Log(..) | Formula::Function(..) | Formula::Negate(_) => false,
        Formula::Derivative(..) if index == 0 => false,
        Formula::Parentheses(_) => false,
        _ => child.precedence() < parent.precedence(),
    }
}
