use anyhow::{Context as _, Result};
use boggle_ocr::{montage, save_templates, Config, Context};

/// Write the cells of a board as `montage.png`. With a second argument, also save the recognized cells as templates
/// in that directory.
fn run() -> Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let path = args.next().expect("Usage: montage IMAGE [TEMPLATE_DIR]");

    let config = Config::from_env()?;
    let context = Context::from_config(config)?;
    let result = context
        .solve_file(&path)
        .with_context(|| format!("Failed to solve {}", path))?;
    println!("{}", result.board);

    montage(&result.cells, result.grid_size, 64).save("montage.png")?;
    if let Some(dir) = args.next() {
        let saved = save_templates(
            &dir,
            &result.cells,
            &result.recognition.letters,
            context.recognizer().params(),
        )?;
        println!("saved {} templates in {}", saved.len(), dir);
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:?}", err);
    }
}
