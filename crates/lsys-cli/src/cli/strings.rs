//! Strings command - print the symbol string of every iteration.

use anyhow::Result;
use clap::Args;

use lsys::EngineConfig;

use super::common::{load_lsystem, truncate_symbols};

#[derive(Debug, Args)]
pub struct StringsArgs {
    /// Grammar file (- for stdin)
    pub grammar: String,

    /// Longest prefix shown per iteration (0 = no limit)
    #[arg(long, default_value_t = 120)]
    pub max_len: usize,
}

/// Execute the strings command.
pub fn cmd_strings(args: &StringsArgs, config: &EngineConfig) -> Result<()> {
    let (lsystem, _) = load_lsystem(&args.grammar, config)?;

    for (index, record) in lsystem.iterations().iter().enumerate() {
        let symbols = record.symbols();
        let shown = if args.max_len == 0 {
            symbols.to_string()
        } else {
            truncate_symbols(symbols, args.max_len)
        };
        println!("{:>3} [{}] {}", index, symbols.chars().count(), shown);
    }

    Ok(())
}
