//! XML persistence of formula trees.
//!
//! ```text
//! <formula version="1">
//!   <divide>
//!     <symbol index="0" factor="2" pi="1" e="0" i="0" x="1"/>
//!     <function index="1" kind="sin">
//!       <symbol index="0" factor="1" pi="0" e="0" i="0" y="1"/>
//!     </function>
//!   </divide>
//! </formula>
//! ```
//! Elements are named by the node tag. Children carry their slot in `index`; an `Empty`
//! slot is not written and reads back as `Empty`.

use crate::formula::errors::FormulaError;
use crate::formula::formula_tree::{Formula, FunctionKind, NodeTag};
use crate::formula::numeric_symbol::{NumericSymbol, SymbolicConstant, variable_index};
use log::info;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::path::Path;
use std::str::FromStr;
use strum::IntoEnumIterator;

pub const FORMAT_VERSION: &str = "1";
const ROOT_ELEMENT: &str = "formula";

fn persistence_error(msg: impl Into<String>) -> FormulaError {
    FormulaError::Persistence(msg.into())
}

impl Formula {
    pub fn to_xml(&self) -> Result<String, FormulaError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut root = BytesStart::new(ROOT_ELEMENT);
        root.push_attribute(("version", FORMAT_VERSION));
        if self.is_empty() {
            writer.write_event(Event::Empty(root))?;
        } else {
            writer.write_event(Event::Start(root))?;
            write_node(&mut writer, self, None)?;
            writer.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| persistence_error(e.to_string()))
    }

    pub fn from_xml(xml: &str) -> Result<Formula, FormulaError> {
        read_document(xml)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FormulaError> {
        let xml = self.to_xml()?;
        std::fs::write(path.as_ref(), xml)?;
        info!("formula saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Formula, FormulaError> {
        let xml = std::fs::read_to_string(path.as_ref())?;
        let formula = Formula::from_xml(&xml)?;
        info!(
            "formula with {} nodes loaded from {}",
            formula.node_count(),
            path.as_ref().display()
        );
        Ok(formula)
    }
}

//___________________________________WRITING____________________________________

fn symbol_attributes(element: &mut BytesStart, symbol: &NumericSymbol) {
    element.push_attribute(("factor", symbol.factor().to_string().as_str()));
    for (constant, name) in SymbolicConstant::iter().zip(["pi", "e", "i"]) {
        element.push_attribute((name, symbol.power(constant).to_string().as_str()));
    }
    for (name, power) in symbol.variables() {
        element.push_attribute((name.to_string().as_str(), power.to_string().as_str()));
    }
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    node: &Formula,
    index: Option<usize>,
) -> Result<(), FormulaError> {
    let tag = node.tag();
    let mut element = BytesStart::new(tag.as_ref());
    if let Some(index) = index {
        element.push_attribute(("index", index.to_string().as_str()));
    }
    match node {
        Formula::Symbol(symbol) => symbol_attributes(&mut element, symbol),
        Formula::Function(kind, _) => element.push_attribute(("kind", kind.as_ref())),
        _ => {}
    }
    let children = node.children();
    if children.iter().all(|c| c.is_empty()) {
        writer.write_event(Event::Empty(element))?;
        return Ok(());
    }
    writer.write_event(Event::Start(element))?;
    for (i, child) in children.into_iter().enumerate() {
        if !child.is_empty() {
            write_node(writer, child, Some(i))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(tag.as_ref())))?;
    Ok(())
}

//___________________________________READING____________________________________

/// A node whose children are still being read.
struct OpenNode {
    node: Formula,
    index: Option<usize>,
}

fn attributes(element: &BytesStart) -> Result<Vec<(String, String)>, FormulaError> {
    let mut pairs = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| persistence_error(format!("attribute error: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, FormulaError> {
    value
        .parse::<T>()
        .map_err(|_| persistence_error(format!("invalid value '{}' for '{}'", value, key)))
}

fn read_symbol(pairs: &[(String, String)]) -> Result<NumericSymbol, FormulaError> {
    let factor = pairs
        .iter()
        .find(|(k, _)| k == "factor")
        .ok_or_else(|| persistence_error("symbol without factor"))?;
    let mut symbol = NumericSymbol::new(parse_number(&factor.0, &factor.1)?);
    for (key, value) in pairs {
        match key.as_str() {
            "factor" | "index" => {}
            "pi" => symbol.set_power(SymbolicConstant::Pi, parse_number(key, value)?),
            "e" => symbol.set_power(SymbolicConstant::E, parse_number(key, value)?),
            "i" => symbol.set_power(SymbolicConstant::I, parse_number(key, value)?),
            name => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) if variable_index(letter).is_some() => {
                        symbol.set_var_power(letter, parse_number(key, value)?)?
                    }
                    _ => return Err(persistence_error(format!("unknown symbol attribute '{}'", name))),
                }
            }
        }
    }
    Ok(symbol)
}

fn open_node(element: &BytesStart) -> Result<OpenNode, FormulaError> {
    let name = String::from_utf8_lossy(element.name().as_ref()).to_string();
    let tag = NodeTag::from_str(&name)
        .map_err(|_| persistence_error(format!("unknown element <{}>", name)))?;
    let pairs = attributes(element)?;
    let index = match pairs.iter().find(|(k, _)| k == "index") {
        Some((key, value)) => Some(parse_number::<usize>(key, value)?),
        None => None,
    };
    let node = match tag {
        NodeTag::Symbol => Formula::symbol(read_symbol(&pairs)?),
        NodeTag::Function => {
            let (_, kind) = pairs
                .iter()
                .find(|(k, _)| k == "kind")
                .ok_or_else(|| persistence_error("function without kind"))?;
            let kind = FunctionKind::from_str(kind)
                .map_err(|_| persistence_error(format!("unknown function kind '{}'", kind)))?;
            Formula::function(kind, Formula::Empty)
        }
        tag => Formula::with_empty_slots(tag)?,
    };
    Ok(OpenNode { node, index })
}

/// Attaches a finished node to its parent, or makes it the document's formula.
fn close_node(
    finished: OpenNode,
    stack: &mut [OpenNode],
    result: &mut Option<Formula>,
) -> Result<(), FormulaError> {
    match stack.last_mut() {
        Some(parent) => {
            let index = finished
                .index
                .ok_or_else(|| persistence_error(format!("<{}> without index", finished.node.tag())))?;
            if index >= parent.node.arity() {
                return Err(persistence_error(format!(
                    "<{}> has no slot {}",
                    parent.node.tag(),
                    index
                )));
            }
            if !parent.node.child(index)?.is_empty() {
                return Err(persistence_error(format!(
                    "slot {} of <{}> written twice",
                    index,
                    parent.node.tag()
                )));
            }
            parent.node.set_child(index, finished.node)?;
        }
        None => {
            if result.is_some() {
                return Err(persistence_error("more than one root node"));
            }
            *result = Some(finished.node);
        }
    }
    Ok(())
}

fn check_root(element: &BytesStart) -> Result<(), FormulaError> {
    let version = attributes(element)?
        .into_iter()
        .find(|(k, _)| k == "version")
        .map(|(_, v)| v);
    match version.as_deref() {
        Some(FORMAT_VERSION) => Ok(()),
        Some(other) => Err(persistence_error(format!("unsupported format version {}", other))),
        None => Err(persistence_error("missing format version")),
    }
}

fn read_document(xml: &str) -> Result<Formula, FormulaError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut in_root = false;
    let mut seen_root = false;
    let mut stack: Vec<OpenNode> = Vec::new();
    let mut result: Option<Formula> = None;
    loop {
        match reader.read_event()? {
            Event::Start(ref e) if !in_root => {
                if e.name().as_ref() != ROOT_ELEMENT.as_bytes() || seen_root {
                    return Err(persistence_error("expected a single <formula> root"));
                }
                check_root(e)?;
                in_root = true;
                seen_root = true;
            }
            Event::Empty(ref e) if !in_root => {
                if e.name().as_ref() != ROOT_ELEMENT.as_bytes() || seen_root {
                    return Err(persistence_error("expected a single <formula> root"));
                }
                check_root(e)?;
                seen_root = true;
            }
            Event::Start(ref e) => stack.push(open_node(e)?),
            Event::Empty(ref e) => {
                let finished = open_node(e)?;
                close_node(finished, &mut stack, &mut result)?;
            }
            Event::End(ref e) => match stack.pop() {
                Some(finished) => close_node(finished, &mut stack, &mut result)?,
                None if e.name().as_ref() == ROOT_ELEMENT.as_bytes() => in_root = false,
                None => return Err(persistence_error("unbalanced closing element")),
            },
            Event::Text(_) if in_root => {
                return Err(persistence_error("unexpected text inside <formula>"));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !seen_root {
        return Err(persistence_error("missing <formula> root"));
    }
    if in_root || !stack.is_empty() {
        return Err(persistence_error("document ends inside an element"));
    }
    Ok(result.unwrap_or(Formula::Empty))
}
