//! # Layout Engine
//!
//! Computes the geometry of a formula under a maximum bounding rectangle: the node's
//! own box, the boxes of its operator glyphs, the boxes of its children and the
//! vertical anchor ("center") used to align it with its neighbours. The renderer draws
//! from these rectangles; no pixels are produced here.
//!
//! Every rectangle returned for a node is relative to that node's bounding-box origin.
//! [`LayoutEngine::layout_tree`] resolves them into absolute positions for the whole tree.
//!
//! ## Algorithms
//! - leaves binary-search an integer font size so the padded text fits the bounds; the
//!   search stops at the default font size, which is also the size of an unconstrained leaf
//! - `Empty` takes a golden-ratio box that never grows past the configured default
//! - `+ - *` put a depth-scaled operator square between their operands and shrink both
//!   operands proportionally when the row is too wide
//! - fractions stack their operands over a bar 1/15 of their height and shrink both
//!   proportionally when the stack is too tall
//! - powers set the exponent at half scale to the upper right; the anchor of a power is
//!   the anchor of its base
//! - parentheses, roots, logarithms, functions, derivatives, limits and integrals reserve
//!   fixed-ratio glyph boxes sized relative to their main operand and shrink that operand
//!   when the composition overflows
//!
//! Shrink ratios are computed against the unconstrained ("natural") layout of the
//! children, never against a layout that already depends on the bounds. Child bounds are
//! therefore non-decreasing functions of the node's bounds, and tightening `max_width` or
//! `max_height` never enlarges a box.
//!
//! ## Memoization
//! Layout is a pure function of `(subtree, max_width, max_height, depth)`. Within one
//! public call the engine memoizes on that key (the subtree by address); the memo is
//! cleared before the call returns, so no state leaks between calls.

use crate::formula::errors::FormulaError;
use crate::formula::formula_tree::{Formula, NodeTag};
use crate::formula::layout_config::{GOLDEN_RATIO, LayoutConfig};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;

/// bound value meaning "no constraint"
pub const UNCONSTRAINED: f64 = f64::INFINITY;

/// integral sign height relative to the integrand
const INTEGRAL_HEIGHT_RATIO: f64 = 1.3;
/// integral sign width relative to its height
const INTEGRAL_WIDTH_RATIO: f64 = 0.35;
/// horizontal gap after "lim", relative to its height
const LIMIT_GAP_RATIO: f64 = 0.2;
const CONTAINMENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// rectangle of the given size at the origin
    pub fn sized(width: f64, height: f64) -> Rect {
        Rect::new(0.0, 0.0, width, height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// `other` lies fully inside `self` (up to rounding noise)
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - CONTAINMENT_EPSILON
            && other.y >= self.y - CONTAINMENT_EPSILON
            && other.right() <= self.right() + CONTAINMENT_EPSILON
            && other.bottom() <= self.bottom() + CONTAINMENT_EPSILON
    }

    /// finite position and non-negative finite size
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// Font measurement supplied by the renderer.
pub trait TextMetrics {
    /// `(width, height)` of `text` set at `font_size`; must grow with the font size
    fn measure(&self, text: &str, font_size: f64) -> (f64, f64);
}

/// Fixed-advance metrics: every glyph is `0.6·size` wide, lines are `1.2·size` tall.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceMetrics;

impl TextMetrics for MonospaceMetrics {
    fn measure(&self, text: &str, font_size: f64) -> (f64, f64) {
        let advance = 0.6 * font_size;
        (advance * text.chars().count() as f64, 1.2 * font_size)
    }
}

/// A node of a laid-out tree with absolute coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    /// child indices leading from the root to this node
    pub path: Vec<usize>,
    pub tag: NodeTag,
    pub rect: Rect,
    /// absolute y of the node's anchor line
    pub center: f64,
    pub operators: Vec<Rect>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Budget {
    max_width: f64,
    max_height: f64,
    depth: usize,
}

fn clamp_bound(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

impl Budget {
    fn root(max_width: f64, max_height: f64) -> Budget {
        Budget {
            max_width: clamp_bound(max_width),
            max_height: clamp_bound(max_height),
            depth: 0,
        }
    }

    /// bounds for a child one nesting level deeper
    fn child(&self, max_width: f64, max_height: f64) -> Budget {
        Budget {
            max_width: clamp_bound(max_width),
            max_height: clamp_bound(max_height),
            depth: self.depth + 1,
        }
    }

    fn unconstrained(&self) -> Budget {
        self.child(UNCONSTRAINED, UNCONSTRAINED)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    rect: Rect,
    /// bounds the child was laid out with; `None` for a slot that is not drawn
    budget: Option<Budget>,
}

#[derive(Debug, Clone)]
struct Arrangement {
    width: f64,
    height: f64,
    center: f64,
    operators: Vec<Rect>,
    /// one per child, in positional order
    slots: Vec<Slot>,
}

impl Arrangement {
    fn leaf(width: f64, height: f64) -> Arrangement {
        Arrangement {
            width,
            height,
            center: height / 2.0,
            operators: Vec::new(),
            slots: Vec::new(),
        }
    }

    fn slot_rect(&self, index: usize) -> Rect {
        self.slots.get(index).map(|s| s.rect).unwrap_or_default()
    }
}

/// Collects operator and child rectangles in free coordinates, then moves them so the
/// composition starts at the origin. The extent of everything placed becomes the
/// bounding box, so children are contained by construction.
#[derive(Default)]
struct Frame {
    operators: Vec<Rect>,
    slots: Vec<Slot>,
}

impl Frame {
    fn operator(&mut self, rect: Rect) {
        self.operators.push(rect);
    }

    /// places `child` with its top-left corner at `(x, y)`; children go in index order
    fn child(&mut self, child: &Arrangement, budget: Budget, x: f64, y: f64) {
        self.slots.push(Slot {
            rect: Rect::new(x, y, child.width, child.height),
            budget: Some(budget),
        });
    }

    fn hidden_child(&mut self) {
        self.slots.push(Slot {
            rect: Rect::default(),
            budget: None,
        });
    }

    fn finish(self, center: f64) -> Arrangement {
        let visible: Vec<Rect> = self
            .operators
            .iter()
            .copied()
            .chain(self.slots.iter().filter(|s| s.budget.is_some()).map(|s| s.rect))
            .collect();
        if visible.is_empty() {
            return Arrangement::leaf(0.0, 0.0);
        }
        let min_x = visible.iter().map(|r| r.x).fold(f64::INFINITY, f64::min);
        let min_y = visible.iter().map(|r| r.y).fold(f64::INFINITY, f64::min);
        let max_x = visible.iter().map(|r| r.right()).fold(f64::NEG_INFINITY, f64::max);
        let max_y = visible.iter().map(|r| r.bottom()).fold(f64::NEG_INFINITY, f64::max);
        let operators = self
            .operators
            .iter()
            .map(|r| r.translated(-min_x, -min_y))
            .collect();
        let slots = self
            .slots
            .into_iter()
            .map(|slot| match slot.budget {
                Some(_) => Slot {
                    rect: slot.rect.translated(-min_x, -min_y),
                    budget: slot.budget,
                },
                None => slot,
            })
            .collect();
        Arrangement {
            width: max_x - min_x,
            height: max_y - min_y,
            center: center - min_y,
            operators,
            slots,
        }
    }
}

type MemoKey = (usize, u64, u64, usize);

pub struct LayoutEngine<'a> {
    config: &'a LayoutConfig,
    metrics: &'a dyn TextMetrics,
    memo: RefCell<HashMap<MemoKey, Arrangement>>,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(config: &'a LayoutConfig, metrics: &'a dyn TextMetrics) -> LayoutEngine<'a> {
        LayoutEngine {
            config,
            metrics,
            memo: RefCell::new(HashMap::new()),
        }
    }

    //___________________________________PUBLIC API____________________________________

    /// Box occupied by `node` under the bounds, at the origin.
    pub fn bounding_box(&self, node: &Formula, max_width: f64, max_height: f64) -> Rect {
        let arrangement = self.top_level(node, max_width, max_height);
        Rect::sized(arrangement.width, arrangement.height)
    }

    /// Boxes of the node's own glyphs (operator sign, fraction bar, radical parts,
    /// function name, arcs), relative to the node's origin.
    pub fn operator_boxes(&self, node: &Formula, max_width: f64, max_height: f64) -> Vec<Rect> {
        self.top_level(node, max_width, max_height).operators
    }

    /// Box of child `index` relative to the node's origin. A slot that is not drawn
    /// (the bounds of an indefinite integral) gets an empty box at the origin.
    pub fn child_box(
        &self,
        node: &Formula,
        index: usize,
        max_width: f64,
        max_height: f64,
    ) -> Result<Rect, FormulaError> {
        if index >= node.arity() {
            return Err(FormulaError::ChildIndexOutOfRange {
                index,
                arity: node.arity(),
            });
        }
        Ok(self.top_level(node, max_width, max_height).slot_rect(index))
    }

    /// y of the anchor line used to align the node with its neighbours.
    pub fn center(&self, node: &Formula, max_width: f64, max_height: f64) -> f64 {
        self.top_level(node, max_width, max_height).center
    }

    /// Absolute boxes of every drawn node, in pre-order.
    pub fn layout_tree(&self, node: &Formula, max_width: f64, max_height: f64) -> Vec<PlacedNode> {
        let mut placed = Vec::new();
        let mut path = Vec::new();
        self.place(node, Budget::root(max_width, max_height), 0.0, 0.0, &mut path, &mut placed);
        self.memo.borrow_mut().clear();
        placed
    }

    fn top_level(&self, node: &Formula, max_width: f64, max_height: f64) -> Arrangement {
        let arrangement = self.arrange(node, Budget::root(max_width, max_height));
        self.memo.borrow_mut().clear();
        arrangement
    }

    fn place(
        &self,
        node: &Formula,
        budget: Budget,
        x: f64,
        y: f64,
        path: &mut Vec<usize>,
        placed: &mut Vec<PlacedNode>,
    ) {
        let arrangement = self.arrange(node, budget);
        placed.push(PlacedNode {
            path: path.clone(),
            tag: node.tag(),
            rect: Rect::new(x, y, arrangement.width, arrangement.height),
            center: y + arrangement.center,
            operators: arrangement
                .operators
                .iter()
                .map(|r| r.translated(x, y))
                .collect(),
        });
        for (index, (child, slot)) in node.children().into_iter().zip(&arrangement.slots).enumerate() {
            if let Some(child_budget) = slot.budget {
                path.push(index);
                self.place(child, child_budget, x + slot.rect.x, y + slot.rect.y, path, placed);
                path.pop();
            }
        }
    }

    //___________________________________DISPATCH____________________________________

    fn arrange(&self, node: &Formula, budget: Budget) -> Arrangement {
        let key = (
            node as *const Formula as usize,
            budget.max_width.to_bits(),
            budget.max_height.to_bits(),
            budget.depth,
        );
        if let Some(hit) = self.memo.borrow().get(&key) {
            return hit.clone();
        }
        let arrangement = match node {
            Formula::Empty => self.empty_box(budget),
            Formula::Symbol(symbol) => {
                let (width, height) =
                    self.text_box(&symbol.to_string(), budget.max_width, budget.max_height);
                Arrangement::leaf(width, height)
            }
            Formula::Parentheses(child) => self.parentheses(child, budget),
            Formula::Add(l, r) | Formula::Subtract(l, r) | Formula::Multiply(l, r) => {
                self.linear(l, r, budget)
            }
            Formula::Negate(child) => self.negate(child, budget),
            Formula::Divide(n, d) => self.fraction(n, d, budget),
            Formula::Power(base, exponent) => self.power(base, exponent, budget),
            Formula::Root(degree, base) => self.root(degree, base, budget),
            Formula::Log(base, argument) => self.logarithm(base, argument, budget),
            Formula::Function(kind, argument) => self.function(&kind.to_string(), argument, budget),
            Formula::Derivative(expression, variable) => {
                self.derivative(expression, variable, budget)
            }
            Formula::Limit(start, end, expression) => self.limit(start, end, expression, budget),
            Formula::Integral(integrand, variable, from, to) => {
                self.integral(integrand, variable, from, to, node.is_definite_integral(), budget)
            }
        };
        self.memo.borrow_mut().insert(key, arrangement.clone());
        arrangement
    }

    //___________________________________LEAVES____________________________________

    /// Padded size of `text` at the largest integer font size that fits the bounds.
    fn text_box(&self, text: &str, max_width: f64, max_height: f64) -> (f64, f64) {
        let config = self.config;
        let padded = |font_size: f64| {
            let (w, h) = self.metrics.measure(text, font_size);
            let padding = font_size * config.padding_ratio;
            (w + 2.0 * padding, h + 2.0 * padding)
        };
        if max_width.is_infinite() && max_height.is_infinite() {
            return padded(config.default_font_size);
        }
        let fits = |font_size: i64| {
            let (w, h) = padded(font_size as f64);
            w <= max_width + CONTAINMENT_EPSILON && h <= max_height + CONTAINMENT_EPSILON
        };
        let ceiling = config.default_font_size.min(config.max_font_size);
        let mut lo = config.min_font_size.ceil() as i64;
        let mut hi = (ceiling.floor() as i64).max(lo);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if fits(mid) {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        padded(lo as f64)
    }

    /// Operator text box whose height follows the operand it decorates.
    fn glyph(&self, text: &str, operand_height: f64) -> (f64, f64) {
        self.text_box(text, UNCONSTRAINED, operand_height * self.config.glyph_ratio)
    }

    fn empty_box(&self, budget: Budget) -> Arrangement {
        let width = self
            .config
            .empty_size
            .min(budget.max_width)
            .min(budget.max_height * GOLDEN_RATIO);
        Arrangement::leaf(width, width / GOLDEN_RATIO)
    }

    //___________________________________LINEAR____________________________________

    fn linear(&self, l: &Formula, r: &Formula, budget: Budget) -> Arrangement {
        let full_side = self.config.operator_side(budget.depth);
        let side = full_side.min(budget.max_height);
        let natural_left = self.arrange(l, budget.unconstrained()).width;
        let natural_right = self.arrange(r, budget.unconstrained()).width;
        let requested = natural_left + natural_right;
        let mut ratio = 1.0;
        if requested + full_side > budget.max_width {
            let available = (budget.max_width - full_side).max(0.0);
            ratio = if requested > 0.0 { available / requested } else { 0.0 };
            debug!("row of width {} shrunk by {}", requested + full_side, ratio);
        }
        let left_budget = budget.child(natural_left * ratio, budget.max_height);
        let right_budget = budget.child(natural_right * ratio, budget.max_height);
        let left = self.arrange(l, left_budget);
        let right = self.arrange(r, right_budget);
        let above = left.center.max(right.center).max(side / 2.0);
        let mut frame = Frame::default();
        frame.child(&left, left_budget, 0.0, above - left.center);
        frame.operator(Rect::new(left.width, above - side / 2.0, side, side));
        frame.child(&right, right_budget, left.width + side, above - right.center);
        frame.finish(above)
    }

    fn negate(&self, child: &Formula, budget: Budget) -> Arrangement {
        let full_side = self.config.operator_side(budget.depth);
        let side = full_side.min(budget.max_height);
        let child_budget = budget.child(budget.max_width - full_side, budget.max_height);
        let operand = self.arrange(child, child_budget);
        let above = operand.center.max(side / 2.0);
        let mut frame = Frame::default();
        frame.operator(Rect::new(0.0, above - side / 2.0, side, side));
        frame.child(&operand, child_budget, side, above - operand.center);
        frame.finish(above)
    }

    fn parentheses(&self, child: &Formula, budget: Budget) -> Arrangement {
        let arc_ratio = self.config.arc_ratio;
        self.refit(budget, 0, |child_budget| {
            let inner = self.arrange(child, child_budget);
            let arc = inner.height * arc_ratio;
            let mut frame = Frame::default();
            frame.operator(Rect::new(0.0, 0.0, arc, inner.height));
            frame.child(&inner, child_budget, arc, 0.0);
            frame.operator(Rect::new(arc + inner.width, 0.0, arc, inner.height));
            frame.finish(inner.center)
        })
    }

    //___________________________________FRACTIONS____________________________________

    fn bar_height(&self, stacked: f64) -> f64 {
        (stacked * self.config.divide_ratio).max(self.config.divide_min_height)
    }

    fn fraction(&self, n: &Formula, d: &Formula, budget: Budget) -> Arrangement {
        let natural_top = self.arrange(n, budget.unconstrained()).height;
        let natural_bottom = self.arrange(d, budget.unconstrained()).height;
        let stacked = natural_top + natural_bottom;
        let mut ratio = 1.0;
        if stacked + self.bar_height(stacked) > budget.max_height {
            let ratio_bar = self.config.divide_ratio;
            let proportional = budget.max_height / (1.0 + ratio_bar);
            let target = if proportional * ratio_bar >= self.config.divide_min_height {
                proportional
            } else {
                (budget.max_height - self.config.divide_min_height).max(0.0)
            };
            ratio = if stacked > 0.0 { (target / stacked).min(1.0) } else { 0.0 };
            debug!("fraction of height {} shrunk by {}", stacked, ratio);
        }
        let top_budget = budget.child(budget.max_width, natural_top * ratio);
        let bottom_budget = budget.child(budget.max_width, natural_bottom * ratio);
        let top = self.arrange(n, top_budget);
        let bottom = self.arrange(d, bottom_budget);
        let bar = self.bar_height(top.height + bottom.height);
        let width = top.width.max(bottom.width);
        let mut frame = Frame::default();
        frame.child(&top, top_budget, (width - top.width) / 2.0, 0.0);
        frame.operator(Rect::new(0.0, top.height, width, bar));
        frame.child(&bottom, bottom_budget, (width - bottom.width) / 2.0, top.height + bar);
        frame.finish(top.height + bar / 2.0)
    }

    //___________________________________COMPOSITIONS____________________________________

    /// Lays the composition out with unconstrained operands. When that natural
    /// arrangement overflows the bounds, the main operand is laid out again under its
    /// natural box scaled by the overflow ratio and the rest of the composition follows it.
    fn refit<F>(&self, budget: Budget, main: usize, build: F) -> Arrangement
    where
        F: Fn(Budget) -> Arrangement,
    {
        let natural = build(budget.unconstrained());
        let scale = (budget.max_width / natural.width)
            .min(budget.max_height / natural.height)
            .min(1.0);
        if scale >= 1.0 {
            return natural;
        }
        let operand = natural.slot_rect(main);
        debug!("composition {}x{} refit by {}", natural.width, natural.height, scale);
        build(budget.child(operand.width * scale, operand.height * scale))
    }

    fn power(&self, base: &Formula, exponent: &Formula, budget: Budget) -> Arrangement {
        self.refit(budget, 0, |base_budget| {
            let lower = self.arrange(base, base_budget);
            let exponent_budget =
                budget.child(base_budget.max_width, lower.height * self.config.exponent_scale);
            let upper = self.arrange(exponent, exponent_budget);
            let base_y = upper.height * 0.5;
            let mut frame = Frame::default();
            frame.child(&lower, base_budget, 0.0, base_y);
            frame.child(&upper, exponent_budget, lower.width, 0.0);
            frame.finish(base_y + lower.center)
        })
    }

    fn root(&self, degree: &Formula, base: &Formula, budget: Budget) -> Arrangement {
        let config = self.config;
        self.refit(budget, 1, |base_budget| {
            let radicand = self.arrange(base, base_budget);
            let degree_budget =
                budget.child(UNCONSTRAINED, radicand.height * config.root_degree_scale);
            let index = self.arrange(degree, degree_budget);
            let gap = radicand.height * config.root_gap_ratio;
            let bar = radicand.height * config.divide_ratio;
            let lead = index.width.max(gap);
            let mut frame = Frame::default();
            frame.child(&index, degree_budget, 0.0, 0.0);
            // riser, bar and connector of the radical sign
            frame.operator(Rect::new(lead - gap, index.height, gap, bar + radicand.height));
            frame.operator(Rect::new(lead, index.height, radicand.width, bar));
            frame.operator(Rect::new(
                lead + radicand.width,
                index.height,
                bar,
                (3.0 * bar).min(bar + radicand.height),
            ));
            frame.child(&radicand, base_budget, lead, index.height + bar);
            frame.finish(index.height + bar + radicand.center)
        })
    }

    fn logarithm(&self, base: &Formula, argument: &Formula, budget: Budget) -> Arrangement {
        let config = self.config;
        self.refit(budget, 1, |argument_budget| {
            let operand = self.arrange(argument, argument_budget);
            let (name_w, name_h) = self.glyph("log", operand.height);
            let base_budget = budget.child(UNCONSTRAINED, operand.height * config.bound_scale);
            let subscript = self.arrange(base, base_budget);
            let arc = operand.height * config.arc_ratio;
            let name_y = operand.center - name_h / 2.0;
            let open_x = name_w + subscript.width;
            let mut frame = Frame::default();
            frame.operator(Rect::new(0.0, name_y, name_w, name_h));
            frame.child(&subscript, base_budget, name_w, name_y + name_h - subscript.height / 2.0);
            frame.operator(Rect::new(open_x, 0.0, arc, operand.height));
            frame.child(&operand, argument_budget, open_x + arc, 0.0);
            frame.operator(Rect::new(open_x + arc + operand.width, 0.0, arc, operand.height));
            frame.finish(operand.center)
        })
    }

    fn function(&self, name: &str, argument: &Formula, budget: Budget) -> Arrangement {
        let config = self.config;
        self.refit(budget, 0, |argument_budget| {
            let operand = self.arrange(argument, argument_budget);
            let (name_w, name_h) = self.glyph(name, operand.height);
            let arc = operand.height * config.arc_ratio;
            let mut frame = Frame::default();
            frame.operator(Rect::new(0.0, operand.center - name_h / 2.0, name_w, name_h));
            frame.operator(Rect::new(name_w, 0.0, arc, operand.height));
            frame.child(&operand, argument_budget, name_w + arc, 0.0);
            frame.operator(Rect::new(name_w + arc + operand.width, 0.0, arc, operand.height));
            frame.finish(operand.center)
        })
    }

    /// `d/dv (f)`: a small fraction of "d" glyphs followed by the bracketed expression.
    fn derivative(&self, expression: &Formula, variable: &Formula, budget: Budget) -> Arrangement {
        let config = self.config;
        self.refit(budget, 0, |expression_budget| {
            let operand = self.arrange(expression, expression_budget);
            let (d_w, d_h) = self.glyph("d", operand.height);
            let variable_budget = budget.child(UNCONSTRAINED, d_h);
            let var = self.arrange(variable, variable_budget);
            let row_w = d_w + var.width;
            let row_h = d_h.max(var.height);
            let bar = self.bar_height(d_h + row_h);
            let fraction_center = d_h + bar / 2.0;
            let row_y = d_h + bar;
            let arc = operand.height * config.arc_ratio;
            let operand_y = fraction_center - operand.center;
            let mut frame = Frame::default();
            frame.operator(Rect::new((row_w - d_w) / 2.0, 0.0, d_w, d_h));
            frame.operator(Rect::new(0.0, d_h, row_w, bar));
            frame.operator(Rect::new(0.0, row_y + (row_h - d_h) / 2.0, d_w, d_h));
            frame.operator(Rect::new(row_w, operand_y, arc, operand.height));
            frame.operator(Rect::new(row_w + arc + operand.width, operand_y, arc, operand.height));
            frame.child(&operand, expression_budget, row_w + arc, operand_y);
            frame.child(&var, variable_budget, d_w, row_y + (row_h - var.height) / 2.0);
            frame.finish(fraction_center)
        })
    }

    /// "lim" over a `start → end` row, followed by the expression.
    fn limit(
        &self,
        start: &Formula,
        end: &Formula,
        expression: &Formula,
        budget: Budget,
    ) -> Arrangement {
        let config = self.config;
        self.refit(budget, 2, |expression_budget| {
            let operand = self.arrange(expression, expression_budget);
            let (lim_w, lim_h) = self.glyph("lim", operand.height);
            let row_budget = budget.child(UNCONSTRAINED, operand.height * config.bound_scale);
            let from = self.arrange(start, row_budget);
            let (arrow_w, arrow_h) =
                self.text_box("→", UNCONSTRAINED, operand.height * config.bound_scale);
            let to = self.arrange(end, row_budget);
            let row_w = from.width + arrow_w + to.width;
            let row_h = from.height.max(arrow_h).max(to.height);
            let column_w = lim_w.max(row_w);
            let row_x = (column_w - row_w) / 2.0;
            let center = lim_h / 2.0;
            let mut frame = Frame::default();
            frame.operator(Rect::new((column_w - lim_w) / 2.0, 0.0, lim_w, lim_h));
            frame.operator(Rect::new(
                row_x + from.width,
                lim_h + (row_h - arrow_h) / 2.0,
                arrow_w,
                arrow_h,
            ));
            frame.child(&from, row_budget, row_x, lim_h + (row_h - from.height) / 2.0);
            frame.child(
                &to,
                row_budget,
                row_x + from.width + arrow_w,
                lim_h + (row_h - to.height) / 2.0,
            );
            frame.child(
                &operand,
                expression_budget,
                column_w + lim_h * LIMIT_GAP_RATIO,
                center - operand.center,
            );
            frame.finish(center)
        })
    }

    /// Integral sign, integrand, "d" and the variable; in definite mode the bounds sit
    /// above and below the sign.
    fn integral(
        &self,
        integrand: &Formula,
        variable: &Formula,
        from: &Formula,
        to: &Formula,
        definite: bool,
        budget: Budget,
    ) -> Arrangement {
        let config = self.config;
        self.refit(budget, 0, |integrand_budget| {
            let operand = self.arrange(integrand, integrand_budget);
            let sign_h = operand.height * INTEGRAL_HEIGHT_RATIO;
            let sign_w = sign_h * INTEGRAL_WIDTH_RATIO;
            let center = sign_h / 2.0;
            let (d_w, d_h) = self.glyph("d", operand.height);
            let variable_budget = budget.child(UNCONSTRAINED, d_h);
            let var = self.arrange(variable, variable_budget);
            let d_x = sign_w + operand.width;
            let mut frame = Frame::default();
            frame.operator(Rect::new(0.0, 0.0, sign_w, sign_h));
            frame.operator(Rect::new(d_x, center - d_h / 2.0, d_w, d_h));
            frame.child(&operand, integrand_budget, sign_w, center - operand.center);
            frame.child(&var, variable_budget, d_x + d_w, center - var.center);
            if definite {
                let bound_budget = budget.child(UNCONSTRAINED, operand.height * config.bound_scale);
                let lower = self.arrange(from, bound_budget);
                let upper = self.arrange(to, bound_budget);
                frame.child(&lower, bound_budget, 0.0, sign_h);
                frame.child(&upper, bound_budget, sign_w * 0.6, -upper.height);
            } else {
                frame.hidden_child();
                frame.hidden_child();
            }
            frame.finish(center)
        })
    }
}
