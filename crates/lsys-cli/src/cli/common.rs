//! Common utilities shared across CLI commands.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lsys::{EngineConfig, LSystem, LoadReport, Pipeline};

/// Load the engine config, or the defaults when no file was given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Build an L-system from a grammar file, or stdin when `source` is `-`.
///
/// An early stop is not an error here; the engine already logs it.
pub fn load_lsystem(source: &str, config: &EngineConfig) -> Result<(LSystem, LoadReport)> {
    let mut lsystem = LSystem::with_config(Pipeline::shared("lsys-cli"), config)?;

    let report = if source == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading grammar from stdin")?;
        lsystem.load_from_text(&text).context("parsing grammar from stdin")?
    } else {
        lsystem
            .load_from_file(source)
            .with_context(|| format!("loading grammar {}", source))?
    };

    Ok((lsystem, report))
}

/// The requested iteration, or the newest one.
pub fn resolve_iteration(lsystem: &LSystem, requested: Option<usize>) -> Result<usize> {
    match requested {
        Some(index) => {
            lsystem.iteration(index)?;
            Ok(index)
        }
        None => Ok(lsystem.iteration_count().saturating_sub(1)),
    }
}

/// Write to a file, or stdout when no path (or `-`) is given.
pub fn write_output(path: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Shorten long symbol strings for display.
pub fn truncate_symbols(symbols: &str, max_len: usize) -> String {
    let total = symbols.chars().count();
    if total <= max_len {
        return symbols.to_string();
    }
    let head: String = symbols.chars().take(max_len).collect();
    format!("{}... (+{} more)", head, total - max_len)
}
