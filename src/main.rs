//! GP-MaL fitness CLI - Score pre-computed embeddings from JSON files.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::time::Instant;

use gpmal::{
    compute::{FitnessEvaluator, RunContext, TreeEvaluator, TreeOutput},
    schema::{Dataset, EmbeddingRecord, Matrix, ObjectiveMode, RunConfig, load_json},
};

/// Embeddings already produced by an external tree evaluator.
struct Precomputed;

impl TreeEvaluator for Precomputed {
    type Individual = EmbeddingRecord;

    fn evaluate(&self, record: &EmbeddingRecord, _mode: ObjectiveMode) -> TreeOutput {
        TreeOutput {
            embedding: record.embedding.clone(),
            auxiliary: record.auxiliary,
        }
    }
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 4 {
        eprintln!(
            "Usage: {} <run.json> <dataset.json> <embeddings.json>",
            args[0]
        );
        eprintln!();
        eprintln!("Score embeddings by neighbourhood-structure preservation.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json         Run configuration (objective, objective count, K, cache)");
        eprintln!("  dataset.json     Original dataset: {{\"data\": [[...], ...]}}");
        eprintln!("  embeddings.json  [{{\"embedding\": [[...], ...], \"auxiliary\": 1.0}}, ...]");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config: RunConfig = load_json(&args[1]).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });
    let dataset: Dataset = load_json(&args[2]).unwrap_or_else(|e| {
        eprintln!("Error loading dataset: {}", e);
        std::process::exit(1);
    });
    let records: Vec<EmbeddingRecord> = load_json(&args[3]).unwrap_or_else(|e| {
        eprintln!("Error loading embeddings: {}", e);
        std::process::exit(1);
    });

    println!("GP-MaL Fitness Evaluation");
    println!("=========================");
    println!(
        "Dataset: {} instances x {} features",
        dataset.data.rows(),
        dataset.data.cols()
    );
    println!(
        "Objective: {} ({} objectives)",
        config.objective, config.num_objectives
    );
    println!("Neighbours: {}", config.neighbours);
    println!("Embeddings: {}", records.len());
    println!();

    let start = Instant::now();
    let ctx = RunContext::from_dataset(config, &dataset.data).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });
    println!(
        "Neighbour ordering built in {:.3}s",
        start.elapsed().as_secs_f32()
    );

    let evaluator = FitnessEvaluator::new(&ctx, Precomputed);
    let start = Instant::now();
    let fitness = evaluator.evaluate_batch(&records).unwrap_or_else(|e| {
        eprintln!("Evaluation aborted: {}", e);
        std::process::exit(1);
    });
    let elapsed = start.elapsed();

    println!();
    for (i, f) in fitness.iter().enumerate() {
        let values: Vec<String> = f.as_slice().iter().map(|v| format!("{:.6}", v)).collect();
        println!(
            "  [{}] ({}){}",
            i,
            values.join(", "),
            if f.is_degenerate() { " degenerate" } else { "" }
        );
    }

    let stats = ctx.report();
    println!();
    println!("{}", stats);
    println!(
        "Time: {:.3}s ({:.1} evals/s)",
        elapsed.as_secs_f32(),
        fitness.len() as f32 / elapsed.as_secs_f32().max(1e-9)
    );
}

fn print_example_config() {
    let config = RunConfig::default();
    let example = vec![EmbeddingRecord {
        embedding: Matrix::column(vec![0.0, 1.0, 3.0, 7.0]),
        auxiliary: Some(12.0),
    }];

    println!("Example configuration (run.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
    println!();
    println!("Example embeddings (embeddings.json):");
    println!("{}", serde_json::to_string_pretty(&example).unwrap());
}
