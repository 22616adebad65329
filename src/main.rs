#![allow(non_snake_case)]
use RustedFormula::Utils::logger::{init_logger_from_document, save_layout_to_csv};
use RustedFormula::formula::engine_bridge::NumericEngine;
use RustedFormula::formula::errors::FormulaError;
use RustedFormula::formula::formula_tree::{Formula, NodeTag};
use RustedFormula::formula::layout::{LayoutEngine, MonospaceMetrics};
use RustedFormula::formula::layout_config::LayoutConfig;
use RustedFormula::formula::numeric_symbol::Bindings;
use log::info;

const SETTINGS: &str = "
// tighter layout
layout
  min_font_size: 10
  depth_shrink: 0.75
logging
  level: info
";

fn main() -> Result<(), FormulaError> {
    let example = 0;
    // example 5 also writes the log into a file in the working directory
    let settings = if example == 5 {
        format!("{}  log_dir: .\n", SETTINGS)
    } else {
        SETTINGS.to_string()
    };
    if let Some(path) = init_logger_from_document(&settings)? {
        println!("logging into {}", path.display());
    }
    match example {
        0 => {
            // REWRITING
            // raw tree as typed, its canonical form and the form with display parentheses
            let input = "2*x + 3*x - 7/3 + (y^2)^(1/2)";
            let raw = Formula::parse_expression(input)?;
            println!("raw: {}", raw);
            let canonical = raw.canonicalize();
            println!("canonical: {}", canonical);
            println!("for display: {}", canonical.clone().parenthesize());
            let bindings = Bindings::from([('x', 1.0), ('y', 2.0)]);
            println!("value at x=1, y=2: {}", canonical.evaluate(&bindings)?);
        }
        1 => {
            // LAYOUT
            let f = Formula::parse_expression("int(x^2, x, 0, 1) / sqrt(2) + lim(x, 0, sin(x)/x)")?
                .canonicalize()
                .parenthesize();
            let config = LayoutConfig::default();
            let engine = LayoutEngine::new(&config, &MonospaceMetrics);
            let rect = engine.bounding_box(&f, 800.0, 400.0);
            println!("{} fits into {:?}", f, rect);
            let placed = engine.layout_tree(&f, 800.0, 400.0);
            for node in &placed {
                println!("{:?} {} {:?}", node.path, node.tag, node.rect);
            }
            save_layout_to_csv(&placed, "layout.csv")?;
        }
        2 => {
            // ENGINE BRIDGE
            let area = Formula::parse_expression("int(sin(x), x, 0, pi)")?;
            println!("engine term: {}", area.to_engine()?);
            let value = area.evaluate_exact(&NumericEngine)?;
            println!("{} = {}", area, value);
        }
        3 => {
            // EDITING AND PERSISTENCE
            // a node dropped with empty slots, filled in one by one, saved and loaded back
            let mut f = Formula::with_empty_slots(NodeTag::Divide)?;
            println!("dropped: {}", f);
            f.set_child(0, Formula::parse_expression("x + 1")?)?;
            println!("half filled: {} (approximate: {:?})", f, f.approximate());
            f.set_child(1, Formula::number(4.0))?;
            f.save_to_file("formula.xml")?;
            let restored = Formula::load_from_file("formula.xml")?;
            info!("restored {}", restored);
            assert_eq!(restored, f);
        }
        4 => {
            // CONFIGURATION
            let config = LayoutConfig::from_document(SETTINGS)?;
            println!("{:?}", config);
        }
        5 => {
            // LOGGING INTO A FILE
            info!("canonical: {}", Formula::parse_expression("x/10 + 385/128")?.canonicalize());
        }
        _ => {
            println!("no such example");
        }
    }
    Ok(())
}
