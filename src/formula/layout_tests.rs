use crate::formula::errors::FormulaError;
use crate::formula::formula_tree::{Formula, FunctionKind, NodeTag};
use crate::formula::layout::{LayoutEngine, MonospaceMetrics, PlacedNode, Rect, UNCONSTRAINED};
use crate::formula::layout_config::{GOLDEN_RATIO, LayoutConfig};
use strum::IntoEnumIterator;
//___________________________________TESTS____________________________________

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn n(value: f64) -> Formula {
        Formula::number(value)
    }

    fn x() -> Formula {
        Formula::variable('x').unwrap()
    }

    fn assert_non_increasing(boxes: &[Rect]) {
        for pair in boxes.windows(2) {
            assert!(
                pair[1].width <= pair[0].width + 1e-9 && pair[1].height <= pair[0].height + 1e-9,
                "box grew from {:?} to {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// a tree touching every node type, with a definite integral and explicit groups
    fn showcase() -> Formula {
        let fraction = x().pow(n(2.0)) / Formula::root(n(3.0), x() + n(1.0));
        let calculus = Formula::function(FunctionKind::Sin, Formula::log(n(2.0), x()))
            * Formula::derivative(Formula::limit(x(), n(0.0), x() / x()), x());
        let integral = Formula::definite_integral(
            -Formula::parentheses(x() - n(4.0)),
            x(),
            n(0.0),
            n(1.0),
        );
        fraction + calculus - integral
    }

    fn parent_of<'a>(placed: &'a [PlacedNode], node: &PlacedNode) -> &'a PlacedNode {
        let parent_path = &node.path[..node.path.len() - 1];
        placed
            .iter()
            .find(|p| p.path == parent_path)
            .expect("every placed child has a placed parent")
    }

    #[test]
    fn test_leaf_unconstrained_uses_default_font() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let rect = engine.bounding_box(&x(), UNCONSTRAINED, UNCONSTRAINED);
        // 0.6·32 advance, 1.2·32 line, 3.2 padding on each side
        assert_relative_eq!(rect.width, 25.6, epsilon = 1e-9);
        assert_relative_eq!(rect.height, 44.8, epsilon = 1e-9);
        assert_relative_eq!(engine.center(&x(), UNCONSTRAINED, UNCONSTRAINED), 22.4, epsilon = 1e-9);
    }

    #[test]
    fn test_leaf_font_search() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        // height 1.4·fs <= 40 gives font size 28
        let rect = engine.bounding_box(&x(), 1000.0, 40.0);
        assert_relative_eq!(rect.height, 39.2, epsilon = 1e-9);
        assert_relative_eq!(rect.width, 22.4, epsilon = 1e-9);
        assert_eq!(engine.bounding_box(&x(), UNCONSTRAINED, 40.0), rect);
        // generous bounds stop at the default font
        let large = engine.bounding_box(&x(), 5000.0, 5000.0);
        assert_relative_eq!(large.height, 1.4 * 32.0, epsilon = 1e-9);
        // impossible bounds fall back to the smallest font
        let tiny = engine.bounding_box(&x(), 1.0, 1.0);
        assert_relative_eq!(tiny.height, 1.4 * 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_leaf_never_outgrows_unconstrained_box() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let free = engine.bounding_box(&x(), UNCONSTRAINED, UNCONSTRAINED);
        let boxes: Vec<Rect> = [UNCONSTRAINED, 5000.0, 1000.0, 100.0, 30.0, 10.0]
            .iter()
            .map(|b| engine.bounding_box(&x(), *b, *b))
            .collect();
        assert_eq!(boxes[1], free);
        assert_non_increasing(&boxes);

        let custom = LayoutConfig {
            default_font_size: 100.0,
            ..LayoutConfig::default()
        };
        let engine = LayoutEngine::new(&custom, &MonospaceMetrics);
        let free = engine.bounding_box(&x(), UNCONSTRAINED, UNCONSTRAINED);
        assert_relative_eq!(free.height, 140.0, epsilon = 1e-9);
        assert_eq!(engine.bounding_box(&x(), 5000.0, 5000.0), free);
    }

    #[test]
    fn test_empty_box_is_capped_golden_rectangle() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        for (w, h) in [(UNCONSTRAINED, UNCONSTRAINED), (1000.0, 1000.0), (UNCONSTRAINED, 500.0)] {
            let rect = engine.bounding_box(&Formula::Empty, w, h);
            assert_relative_eq!(rect.width, 48.0);
            assert_relative_eq!(rect.height, 48.0 / GOLDEN_RATIO);
        }
        let narrow = engine.bounding_box(&Formula::Empty, 20.0, 1000.0);
        assert_relative_eq!(narrow.width, 20.0);
        let flat = engine.bounding_box(&Formula::Empty, 1000.0, 10.0);
        assert_relative_eq!(flat.width, 10.0 * GOLDEN_RATIO);
        assert_relative_eq!(flat.height, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_operator_square_shrinks_with_depth() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let f = n(1.0) + (n(2.0) + n(3.0));
        let placed = engine.layout_tree(&f, UNCONSTRAINED, UNCONSTRAINED);
        assert_relative_eq!(placed[0].operators[0].width, 24.0);
        let inner = placed.iter().find(|p| p.path == vec![1]).unwrap();
        assert_relative_eq!(inner.operators[0].width, 16.0, epsilon = 1e-9);

        let custom = LayoutConfig {
            depth_shrink: 0.5,
            ..LayoutConfig::default()
        };
        let engine = LayoutEngine::new(&custom, &MonospaceMetrics);
        let placed = engine.layout_tree(&f, UNCONSTRAINED, UNCONSTRAINED);
        let inner = placed.iter().find(|p| p.path == vec![1]).unwrap();
        assert_relative_eq!(inner.operators[0].width, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_row_shrinks_to_width() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let f = n(1.0) + n(2.0);
        let natural = engine.bounding_box(&f, UNCONSTRAINED, 200.0);
        // two 32px digits and the operator square
        assert_relative_eq!(natural.width, 24.0 + 2.0 * 25.6, epsilon = 1e-9);
        let squeezed = engine.bounding_box(&f, 60.0, 200.0);
        assert!(squeezed.width <= 60.0);
        let left = engine.child_box(&f, 0, 60.0, 200.0).unwrap();
        let right = engine.child_box(&f, 1, 60.0, 200.0).unwrap();
        // each digit gets 18px of width, font size 22
        assert_relative_eq!(left.width, 17.6, epsilon = 1e-9);
        assert_relative_eq!(left.width, right.width, epsilon = 1e-9);
        assert!(right.x >= left.right() + 24.0 - 1e-9);
    }

    #[test]
    fn test_fraction_geometry() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let f = x() / Formula::variable('y').unwrap();
        let rect = engine.bounding_box(&f, UNCONSTRAINED, UNCONSTRAINED);
        let bar = 89.6 / 15.0;
        assert_relative_eq!(rect.height, 89.6 + bar, epsilon = 1e-9);
        let operators = engine.operator_boxes(&f, UNCONSTRAINED, UNCONSTRAINED);
        assert_eq!(operators.len(), 1);
        assert_relative_eq!(operators[0].y, 44.8, epsilon = 1e-9);
        assert_relative_eq!(operators[0].height, bar, epsilon = 1e-9);
        assert_relative_eq!(
            engine.center(&f, UNCONSTRAINED, UNCONSTRAINED),
            44.8 + bar / 2.0,
            epsilon = 1e-9
        );
        let squeezed = engine.bounding_box(&f, 400.0, 100.0);
        assert!(squeezed.height <= 100.0);
        let top = engine.child_box(&f, 0, 400.0, 100.0).unwrap();
        let bottom = engine.child_box(&f, 1, 400.0, 100.0).unwrap();
        assert!(bottom.y >= top.bottom());
    }

    #[test]
    fn test_power_anchor_is_base_anchor() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let nested = x().pow(n(2.0)).pow(n(3.0));
        let placed = engine.layout_tree(&nested, UNCONSTRAINED, UNCONSTRAINED);
        let outer = &placed[0];
        let inner = placed.iter().find(|p| p.path == vec![0]).unwrap();
        let innermost = placed.iter().find(|p| p.path == vec![0, 0]).unwrap();
        assert_relative_eq!(outer.center, inner.center, epsilon = 1e-9);
        assert_relative_eq!(inner.center, innermost.center, epsilon = 1e-9);

        let exponent = placed.iter().find(|p| p.path == vec![1]).unwrap();
        assert!(exponent.rect.height <= inner.rect.height * 0.5 + 1e-9);
        assert!(exponent.rect.x >= inner.rect.right() - 1e-9);
    }

    #[test]
    fn test_root_has_three_operator_boxes() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let f = Formula::root(n(3.0), x());
        let operators = engine.operator_boxes(&f, UNCONSTRAINED, UNCONSTRAINED);
        assert_eq!(operators.len(), 3);
        let degree = engine.child_box(&f, 0, UNCONSTRAINED, UNCONSTRAINED).unwrap();
        let base = engine.child_box(&f, 1, UNCONSTRAINED, UNCONSTRAINED).unwrap();
        let rect = engine.bounding_box(&f, UNCONSTRAINED, UNCONSTRAINED);
        assert_relative_eq!(
            rect.height,
            degree.height + base.height / 15.0 + base.height,
            epsilon = 1e-9
        );
        assert!(degree.height < base.height);
        assert!(base.x > operators[0].x);
    }

    #[test]
    fn test_definite_integral_reserves_bound_space() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let indefinite = Formula::integral(x(), x());
        let definite = Formula::definite_integral(x(), x(), n(0.0), n(1.0));
        let a = engine.bounding_box(&indefinite, UNCONSTRAINED, UNCONSTRAINED);
        let b = engine.bounding_box(&definite, UNCONSTRAINED, UNCONSTRAINED);
        assert!(b.height > a.height);
        // hidden bound slots of an indefinite integral are empty boxes
        let hidden = engine.child_box(&indefinite, 2, UNCONSTRAINED, UNCONSTRAINED).unwrap();
        assert_eq!(hidden, Rect::default());
        let placed = engine.layout_tree(&indefinite, UNCONSTRAINED, UNCONSTRAINED);
        assert_eq!(placed.len(), 3);
    }

    #[test]
    fn test_child_box_index_out_of_range() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let f = x() + n(1.0);
        assert_eq!(
            engine.child_box(&f, 2, 100.0, 100.0),
            Err(FormulaError::ChildIndexOutOfRange { index: 2, arity: 2 })
        );
        assert!(engine.child_box(&x(), 0, 100.0, 100.0).is_err());
    }

    #[test]
    fn test_children_are_contained() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let tree = showcase();
        let bounds = [
            (UNCONSTRAINED, UNCONSTRAINED),
            (1000.0, 800.0),
            (300.0, 200.0),
            (120.0, 60.0),
            (30.0, 10.0),
            (UNCONSTRAINED, 100.0),
            (200.0, UNCONSTRAINED),
        ];
        for (w, h) in bounds {
            let placed = engine.layout_tree(&tree, w, h);
            assert_eq!(placed.len(), tree.node_count());
            for node in &placed {
                assert!(node.rect.is_valid(), "{:?} invalid at {:?}", node.tag, (w, h));
                for operator in &node.operators {
                    assert!(operator.is_valid());
                    assert!(node.rect.contains(operator), "{:?} operator escapes", node.tag);
                }
                if !node.path.is_empty() {
                    let parent = parent_of(&placed, node);
                    assert!(
                        parent.rect.contains(&node.rect),
                        "{:?} at {:?} escapes {:?} under {:?}",
                        node.tag,
                        node.path,
                        parent.tag,
                        (w, h)
                    );
                }
            }
            // relative child boxes agree with the absolute tree
            let root = engine.bounding_box(&tree, w, h);
            assert_eq!(root, placed[0].rect);
            for index in 0..tree.arity() {
                let child = engine.child_box(&tree, index, w, h).unwrap();
                assert!(root.contains(&child));
            }
        }
    }

    #[test]
    fn test_shrinking_bounds_never_grows_boxes() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);

        let leaf = n(123.0);
        let boxes: Vec<Rect> = [400.0, 200.0, 100.0, 50.0, 20.0, 5.0]
            .iter()
            .map(|w| engine.bounding_box(&leaf, *w, 300.0))
            .collect();
        assert_non_increasing(&boxes);

        let sum = n(1.0) + n(2.0);
        let boxes: Vec<Rect> = [500.0, 228.0, 150.0, 80.0, 40.0]
            .iter()
            .map(|w| engine.bounding_box(&sum, *w, 200.0))
            .collect();
        assert_non_increasing(&boxes);
        let boxes: Vec<Rect> = [300.0, 150.0, 60.0, 30.0, 12.0]
            .iter()
            .map(|h| engine.bounding_box(&sum, 1000.0, *h))
            .collect();
        assert_non_increasing(&boxes);

        let fraction = x() / Formula::variable('y').unwrap();
        let boxes: Vec<Rect> = [1000.0, 382.0, 200.0, 100.0, 40.0]
            .iter()
            .map(|h| engine.bounding_box(&fraction, 400.0, *h))
            .collect();
        assert_non_increasing(&boxes);
        let boxes: Vec<Rect> = [400.0, 100.0, 50.0, 10.0]
            .iter()
            .map(|w| engine.bounding_box(&fraction, *w, 1000.0))
            .collect();
        assert_non_increasing(&boxes);

        let boxes: Vec<Rect> = [100.0, 60.0, 30.0, 10.0]
            .iter()
            .map(|w| engine.bounding_box(&Formula::Empty, *w, *w))
            .collect();
        assert_non_increasing(&boxes);
    }

    /// bounds starting unconstrained, then shrinking by 7% per step
    fn shrinking(start: f64, steps: usize) -> Vec<f64> {
        std::iter::once(UNCONSTRAINED)
            .chain(std::iter::successors(Some(start), |b| Some(b * 0.93)).take(steps))
            .collect()
    }

    #[test]
    fn test_shrinking_bounds_never_grow_compositions() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let y = Formula::variable('y').unwrap();
        let trees = [
            Formula::parentheses(x() + n(1.0)),
            Formula::function(FunctionKind::Sin, x()),
            Formula::function(FunctionKind::Cos, Formula::parentheses(x() - y.clone())),
            Formula::root(n(3.0), x() + n(1.0)),
            Formula::log(n(2.0), x() + n(1.0)),
            Formula::derivative(x() + n(1.0), x()),
            Formula::limit(x(), n(0.0), x() / y.clone()),
            Formula::integral(x() * y.clone(), x()),
            Formula::definite_integral(x(), x(), n(0.0), n(1.0)),
            (x() + n(1.0)).pow(n(2.0)),
            -(x() + y.clone()),
            (x() + n(1.0)) / (y.clone() - n(2.0)),
            n(1.0) + Formula::function(FunctionKind::Tan, x()) * y.clone(),
        ];
        for tree in &trees {
            let by_height: Vec<Rect> = shrinking(400.0, 45)
                .iter()
                .map(|h| engine.bounding_box(tree, 150.0, *h))
                .collect();
            assert_non_increasing(&by_height);
            let by_width: Vec<Rect> = shrinking(600.0, 45)
                .iter()
                .map(|w| engine.bounding_box(tree, *w, 60.0))
                .collect();
            assert_non_increasing(&by_width);
            let both: Vec<Rect> = shrinking(800.0, 60)
                .iter()
                .map(|b| engine.bounding_box(tree, *b, *b))
                .collect();
            assert_non_increasing(&both);
        }
    }

    #[test]
    fn test_compositions_fit_generous_bounds_naturally() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let tree = Formula::function(FunctionKind::Sin, Formula::parentheses(x() + n(1.0)));
        let free = engine.bounding_box(&tree, UNCONSTRAINED, UNCONSTRAINED);
        assert_eq!(engine.bounding_box(&tree, 5000.0, 5000.0), free);
        // a tight height scales the operand down with the glyphs that follow it
        let squeezed = engine.bounding_box(&tree, 5000.0, free.height / 2.0);
        assert!(squeezed.height <= free.height / 2.0 + 1e-9);
        assert!(squeezed.width < free.width);
    }

    #[test]
    fn test_empty_slots_lay_out() {
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        for tag in NodeTag::iter().filter(|t| *t != NodeTag::Symbol) {
            let node = Formula::with_empty_slots(tag).unwrap();
            for (w, h) in [(UNCONSTRAINED, UNCONSTRAINED), (200.0, 100.0)] {
                let rect = engine.bounding_box(&node, w, h);
                assert!(rect.is_valid(), "{} gave {:?}", tag, rect);
                for index in 0..node.arity() {
                    let child = engine.child_box(&node, index, w, h).unwrap();
                    assert!(rect.contains(&child), "{} child {} escapes", tag, index);
                }
            }
        }
    }

    #[test]
    fn test_results_do_not_depend_on_call_history() {
        let config = LayoutConfig::default();
        let warm = LayoutEngine::new(&config, &MonospaceMetrics);
        let tree = showcase();
        let _ = warm.layout_tree(&tree, 150.0, 90.0);
        let _ = warm.bounding_box(&tree, UNCONSTRAINED, UNCONSTRAINED);
        let fresh = LayoutEngine::new(&config, &MonospaceMetrics);
        assert_eq!(
            warm.bounding_box(&tree, 400.0, 300.0),
            fresh.bounding_box(&tree, 400.0, 300.0)
        );
        assert_eq!(
            warm.operator_boxes(&tree, 400.0, 300.0),
            fresh.operator_boxes(&tree, 400.0, 300.0)
        );
    }
}
