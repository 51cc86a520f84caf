//! Stats command - iteration sizes, buffer usage and load timing.

use std::time::Instant;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use lsys::{ChainConfig, ChainStats, EngineConfig, LSystem, chain_segments};

use super::common::load_lsystem;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Grammar file (- for stdin)
    pub grammar: String,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct IterationStats {
    index: usize,
    symbols: usize,
    first: usize,
    count: usize,
    segments: usize,
}

#[derive(Serialize)]
struct BufferStats {
    used_bytes: usize,
    capacity_bytes: usize,
    max_bytes: usize,
    generation: u64,
}

#[derive(Serialize)]
struct Report {
    angle: f32,
    target_iterations: u32,
    reached: usize,
    complete: bool,
    stopped_early: Option<String>,
    load_ms: f64,
    iterations: Vec<IterationStats>,
    buffer: BufferStats,
    latest_chains: Option<ChainStats>,
}

/// Execute the stats command.
pub fn cmd_stats(args: &StatsArgs, config: &EngineConfig) -> Result<()> {
    let start = Instant::now();
    let (lsystem, load) = load_lsystem(&args.grammar, config)?;
    let elapsed = start.elapsed();

    let report = Report {
        angle: lsystem.grammar().angle(),
        target_iterations: load.target,
        reached: load.reached,
        complete: load.is_complete(),
        stopped_early: load.stopped_early.as_ref().map(|e| e.to_string()),
        load_ms: elapsed.as_secs_f64() * 1000.0,
        iterations: iteration_stats(&lsystem),
        buffer: BufferStats {
            used_bytes: lsystem.buffer().used_bytes(),
            capacity_bytes: lsystem.buffer().capacity_bytes(),
            max_bytes: lsystem.buffer().max_bytes(),
            generation: lsystem.buffer().generation(),
        },
        latest_chains: latest_chain_stats(&lsystem),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }
    Ok(())
}

fn iteration_stats(lsystem: &LSystem) -> Vec<IterationStats> {
    lsystem
        .iterations()
        .iter()
        .enumerate()
        .map(|(index, record)| IterationStats {
            index,
            symbols: record.symbols().chars().count(),
            first: record.range().first,
            count: record.range().count,
            segments: record.range().segment_count(),
        })
        .collect()
}

fn latest_chain_stats(lsystem: &LSystem) -> Option<ChainStats> {
    let record = lsystem.latest()?;
    let vertices = lsystem.buffer().vertices(record.range())?;
    let chains = chain_segments(vertices, &ChainConfig::default());
    Some(ChainStats::from_chains(record.range().segment_count(), &chains))
}

fn print_table(report: &Report) {
    println!("═══════════════════════════════════════════════");
    println!("  L-SYSTEM: {} iterations at {}°", report.reached, report.angle);
    println!("═══════════════════════════════════════════════");
    println!(
        "  {:>4}  {:>10}  {:>10}  {:>10}  {:>10}",
        "iter", "symbols", "first", "vertices", "segments"
    );
    for it in &report.iterations {
        println!(
            "  {:>4}  {:>10}  {:>10}  {:>10}  {:>10}",
            it.index, it.symbols, it.first, it.count, it.segments
        );
    }
    println!("───────────────────────────────────────────────");
    println!(
        "  Buffer: {} / {} bytes (max {}, generation {})",
        report.buffer.used_bytes,
        report.buffer.capacity_bytes,
        report.buffer.max_bytes,
        report.buffer.generation
    );
    if let Some(chains) = &report.latest_chains {
        println!(
            "  Latest: {} segments -> {} polylines ({:.1}% reduction, longest {})",
            chains.input_segments,
            chains.output_chains,
            chains.reduction_ratio * 100.0,
            chains.max_chain_length
        );
    }
    println!("  Load time (ms): {:.2}", report.load_ms);
    match &report.stopped_early {
        Some(reason) => println!(
            "  Stopped early: {} of {} iterations ({})",
            report.reached, report.target_iterations, reason
        ),
        None => println!("  Target reached: {} iterations", report.target_iterations),
    }
    println!("═══════════════════════════════════════════════");
}
