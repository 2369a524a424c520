use anyhow::{Context as _, Result};
use boggle_ocr::{Config, Context};

fn run() -> Result<()> {
    env_logger::init();
    let path = std::env::args().nth(1).expect("Usage: solve IMAGE");

    let config = Config::from_env()?;
    let context = Context::from_config(config).context("Failed to load dictionary and templates")?;
    let result = context
        .solve_file(&path)
        .with_context(|| format!("Failed to solve {}", path))?;

    println!("Board located with {} ({}x{})", result.method, result.grid_size, result.grid_size);
    println!("{}\n", result.board);
    println!("{} of {} words:", result.words.len(), result.total_words);
    for word in result.words.iter() {
        println!("{:<16} {:?}", word.word, word.start);
    }
    println!("\nsolve took {:?}", result.timings.total);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:?}", err);
    }
}
