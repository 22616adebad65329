//! Tunable constants of the layout engine.
//!
//! The defaults reproduce the classic look (fonts between 8 and 128 px, operators
//! shrinking by 2/3 per nesting level, fraction bars 1/15 of the stacked height,
//! exponents at half scale). A configuration document overrides any subset of them:
//! ```text
//! layout
//!   min_font_size: 10
//!   depth_shrink: 0.75
//! ```

use crate::Utils::task_parser::{get_f64, parse_config_document};
use crate::formula::errors::FormulaError;
use std::path::Path;

/// golden ratio, aspect of an empty placeholder box
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// lower bound of the font size search for leaves
    pub min_font_size: f64,
    /// largest font size a configuration may choose as its default
    pub max_font_size: f64,
    /// font size of an unconstrained leaf and upper bound of the font size search
    pub default_font_size: f64,
    /// padding around leaf text, relative to its font size
    pub padding_ratio: f64,
    /// side of the operator square at nesting depth 0
    pub operator_size: f64,
    /// operator square shrink per nesting level
    pub depth_shrink: f64,
    /// nesting level after which operators stop shrinking
    pub max_depth: usize,
    /// fraction bar height relative to the stacked operands
    pub divide_ratio: f64,
    pub divide_min_height: f64,
    /// exponent height relative to its base
    pub exponent_scale: f64,
    /// root degree height relative to the radicand
    pub root_degree_scale: f64,
    /// width of the radical riser relative to the radicand height
    pub root_gap_ratio: f64,
    /// width of an empty placeholder when space allows
    pub empty_size: f64,
    /// width of a parenthesis arc relative to the enclosed height
    pub arc_ratio: f64,
    /// height of operator text ("log", "sin", "d", "lim") relative to its operand
    pub glyph_ratio: f64,
    /// height of integral bounds and limit subscripts relative to the operand
    pub bound_scale: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            min_font_size: 8.0,
            max_font_size: 128.0,
            default_font_size: 32.0,
            padding_ratio: 0.1,
            operator_size: 24.0,
            depth_shrink: 2.0 / 3.0,
            max_depth: 4,
            divide_ratio: 1.0 / 15.0,
            divide_min_height: 2.0,
            exponent_scale: 0.5,
            root_degree_scale: 0.4,
            root_gap_ratio: 0.3,
            empty_size: 48.0,
            arc_ratio: 0.15,
            glyph_ratio: 0.6,
            bound_scale: 0.4,
        }
    }
}

impl LayoutConfig {
    /// Side of the operator square at the given nesting depth.
    pub fn operator_side(&self, depth: usize) -> f64 {
        self.operator_size * self.depth_shrink.powi(depth.min(self.max_depth) as i32)
    }

    /// Reads the `layout` section of a configuration document on top of the defaults.
    /// Unknown keys are ignored.
    pub fn from_document(input: &str) -> Result<LayoutConfig, FormulaError> {
        let document = parse_config_document(input)?;
        let mut config = LayoutConfig::default();
        {
            let fields: [(&str, &mut f64); 15] = [
                ("min_font_size", &mut config.min_font_size),
                ("max_font_size", &mut config.max_font_size),
                ("default_font_size", &mut config.default_font_size),
                ("padding_ratio", &mut config.padding_ratio),
                ("operator_size", &mut config.operator_size),
                ("depth_shrink", &mut config.depth_shrink),
                ("divide_ratio", &mut config.divide_ratio),
                ("divide_min_height", &mut config.divide_min_height),
                ("exponent_scale", &mut config.exponent_scale),
                ("root_degree_scale", &mut config.root_degree_scale),
                ("root_gap_ratio", &mut config.root_gap_ratio),
                ("empty_size", &mut config.empty_size),
                ("arc_ratio", &mut config.arc_ratio),
                ("glyph_ratio", &mut config.glyph_ratio),
                ("bound_scale", &mut config.bound_scale),
            ];
            for (key, slot) in fields {
                if let Some(value) = get_f64(&document, "layout", key)? {
                    *slot = value;
                }
            }
        }
        if let Some(depth) = get_f64(&document, "layout", "max_depth")? {
            if depth < 0.0 || depth.fract() != 0.0 {
                return Err(FormulaError::Config(format!(
                    "layout.max_depth must be a non-negative integer, got {}",
                    depth
                )));
            }
            config.max_depth = depth as usize;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<LayoutConfig, FormulaError> {
        let input = std::fs::read_to_string(path.as_ref())
            .map_err(|e| FormulaError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        LayoutConfig::from_document(&input)
    }

    pub fn validate(&self) -> Result<(), FormulaError> {
        let positive = [
            ("min_font_size", self.min_font_size),
            ("max_font_size", self.max_font_size),
            ("default_font_size", self.default_font_size),
            ("operator_size", self.operator_size),
            ("empty_size", self.empty_size),
            ("divide_ratio", self.divide_ratio),
            ("exponent_scale", self.exponent_scale),
            ("root_degree_scale", self.root_degree_scale),
            ("glyph_ratio", self.glyph_ratio),
            ("bound_scale", self.bound_scale),
            ("depth_shrink", self.depth_shrink),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(FormulaError::Config(format!(
                    "layout.{} must be positive, got {}",
                    key, value
                )));
            }
        }
        let non_negative = [
            ("padding_ratio", self.padding_ratio),
            ("divide_min_height", self.divide_min_height),
            ("root_gap_ratio", self.root_gap_ratio),
            ("arc_ratio", self.arc_ratio),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FormulaError::Config(format!(
                    "layout.{} must not be negative, got {}",
                    key, value
                )));
            }
        }
        if self.min_font_size > self.max_font_size {
            return Err(FormulaError::Config(format!(
                "layout.min_font_size {} exceeds max_font_size {}",
                self.min_font_size, self.max_font_size
            )));
        }
        if self.default_font_size < self.min_font_size || self.default_font_size > self.max_font_size {
            return Err(FormulaError::Config(format!(
                "layout.default_font_size {} lies outside [{}, {}]",
                self.default_font_size, self.min_font_size, self.max_font_size
            )));
        }
        if self.depth_shrink > 1.0 || self.exponent_scale > 1.0 {
            return Err(FormulaError::Config(
                "layout.depth_shrink and layout.exponent_scale must not exceed 1".to_string(),
            ));
        }
        Ok(())
    }
}
