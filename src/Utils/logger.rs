use crate::formula::errors::FormulaError;
use crate::formula::layout::PlacedNode;
use crate::Utils::task_parser::{get_string, parse_config_document};
use chrono::Local;
use csv::Writer;
use itertools::Itertools;
use simplelog::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Maps a textual log level ("debug", "info", "warn", "error") to a filter; `None` is info.
pub fn parse_level(loglevel: Option<&str>) -> Result<LevelFilter, FormulaError> {
    match loglevel {
        None | Some("info") => Ok(LevelFilter::Info),
        Some("debug") => Ok(LevelFilter::Debug),
        Some("warn") => Ok(LevelFilter::Warn),
        Some("error") => Ok(LevelFilter::Error),
        Some(other) => Err(FormulaError::Config(format!(
            "loglevel must be debug, info, warn or error, got '{}'",
            other
        ))),
    }
}

fn init(level: LevelFilter, file: Option<File>) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(file) = file {
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    // a second initialisation keeps the first logger
    let _ = CombinedLogger::init(loggers);
}

/// Console logging at the given level.
pub fn init_logger(loglevel: Option<String>) -> Result<(), FormulaError> {
    let level = parse_level(loglevel.as_deref())?;
    init(level, None);
    Ok(())
}

/// Console logging plus a `log_<date>_<time>.txt` file in `dir`.
/// Returns the path of the file.
pub fn init_logger_with_file<P: AsRef<Path>>(
    loglevel: Option<String>,
    dir: P,
) -> Result<PathBuf, FormulaError> {
    let level = parse_level(loglevel.as_deref())?;
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let path = dir.as_ref().join(format!("log_{}.txt", date_and_time));
    let file = File::create(&path)?;
    init(level, Some(file));
    Ok(path)
}

/// `level` and `log_dir` of the `logging` section; both optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogSettings {
    pub level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_document(input: &str) -> Result<LogSettings, FormulaError> {
        let document = parse_config_document(input)?;
        let settings = LogSettings {
            level: get_string(&document, "logging", "level"),
            log_dir: get_string(&document, "logging", "log_dir").map(PathBuf::from),
        };
        parse_level(settings.level.as_deref())?;
        Ok(settings)
    }
}

/// Starts logging as the `logging` section of a configuration document asks:
/// console only, or console plus a file when `log_dir` is given.
/// Returns the log file path, if any.
pub fn init_logger_from_document(input: &str) -> Result<Option<PathBuf>, FormulaError> {
    let settings = LogSettings::from_document(input)?;
    match settings.log_dir {
        Some(dir) => init_logger_with_file(settings.level, dir).map(Some),
        None => init_logger(settings.level).map(|_| None),
    }
}

/// Dumps laid-out nodes to csv, one row per node:
/// path, tag, x, y, width, height, center, operator count
pub fn save_layout_to_csv<P: AsRef<Path>>(
    placed: &[PlacedNode],
    filename: P,
) -> Result<(), FormulaError> {
    let csv_error = |e: csv::Error| FormulaError::Persistence(e.to_string());
    let mut writer = Writer::from_path(filename.as_ref()).map_err(csv_error)?;
    writer
        .write_record(["path", "tag", "x", "y", "width", "height", "center", "operators"])
        .map_err(csv_error)?;
    for node in placed {
        let row = [
            node.path.iter().join("/"),
            node.tag.to_string(),
            node.rect.x.to_string(),
            node.rect.y.to_string(),
            node.rect.width.to_string(),
            node.rect.height.to_string(),
            node.center.to_string(),
            node.operators.len().to_string(),
        ];
        writer.write_record(&row).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::formula_tree::Formula;
    use crate::formula::layout::{LayoutEngine, MonospaceMetrics};
    use crate::formula::layout_config::LayoutConfig;
    use tempfile::tempdir;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(None).unwrap(), LevelFilter::Info);
        assert_eq!(parse_level(Some("debug")).unwrap(), LevelFilter::Debug);
        assert!(matches!(parse_level(Some("verbose")), Err(FormulaError::Config(_))));
        assert!(init_logger(Some("loud".to_string())).is_err());
        assert!(init_logger(Some("warn".to_string())).is_ok());
    }

    #[test]
    fn test_log_settings_from_document() {
        let settings = LogSettings::from_document(
            "layout min_font_size: 10\nlogging\n  level: debug\n  log_dir: logs",
        )
        .unwrap();
        assert_eq!(settings.level.as_deref(), Some("debug"));
        assert_eq!(settings.log_dir, Some(PathBuf::from("logs")));

        let settings = LogSettings::from_document("layout min_font_size: 10").unwrap();
        assert_eq!(settings, LogSettings::default());

        assert!(matches!(
            LogSettings::from_document("logging level: chatty"),
            Err(FormulaError::Config(_))
        ));
    }

    #[test]
    fn test_logging_into_a_file() {
        let dir = tempdir().unwrap();
        let document = format!("logging\n  level: warn\n  log_dir: {}", dir.path().display());
        let path = init_logger_from_document(&document).unwrap().unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());

        let path = init_logger_with_file(None, dir.path()).unwrap();
        assert!(path.exists());
        assert!(init_logger_with_file(Some("loud".to_string()), dir.path()).is_err());
    }

    #[test]
    fn test_save_layout_to_csv() {
        let formula = Formula::variable('x').unwrap() / Formula::number(2.0);
        let config = LayoutConfig::default();
        let engine = LayoutEngine::new(&config, &MonospaceMetrics);
        let placed = engine.layout_tree(&formula, 400.0, 300.0);

        let dir = tempdir().unwrap();
        let path = dir.path().join("layout.csv");
        save_layout_to_csv(&placed, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][1], "divide");
        assert_eq!(&rows[0][7], "1");
        assert_eq!(&rows[1][0], "0");
        assert_eq!(&rows[2][1], "symbol");
    }
}
