use std::fs;

use clap::Parser;
use lstm::{Config, Lstm, ModelError};

const DEFAULT_TEXT: &str = "hello world this is a small lstm learning to predict the next \
character of a sentence, one step at a time, with hand written backpropagation through time. \
hello world this is a small lstm learning to predict the next character.";

#[derive(Parser)]
#[command(name = "lstm")]
#[command(about = "Train a character-level LSTM with manual backpropagation through time")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<String>,

    /// Training text file (defaults to a built-in sentence)
    #[arg(short, long)]
    file: Option<String>,

    #[arg(long)]
    hidden_dim: Option<usize>,

    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    seq_length: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Save the trained model here (versioned; .json or binary)
    #[arg(short, long)]
    save: Option<String>,

    /// Prompt for the sample printed after training
    #[arg(short, long, default_value = "hello ")]
    prompt: String,

    /// Number of characters to sample after training
    #[arg(long, default_value_t = 60)]
    sample_length: usize,
}

fn main() -> lstm::Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(hidden_dim) = args.hidden_dim {
        config.model.hidden_dim = hidden_dim;
    }
    if let Some(seed) = args.seed {
        config.model.seed = Some(seed);
    }
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }
    if let Some(learning_rate) = args.learning_rate {
        config.training.learning_rate = learning_rate;
    }
    if let Some(seq_length) = args.seq_length {
        config.training.seq_length = seq_length;
    }
    config.validate()?;

    let text = match &args.file {
        Some(path) => fs::read_to_string(path).map_err(ModelError::from)?,
        None => DEFAULT_TEXT.to_string(),
    };

    let mut model = Lstm::from_text(&text, &config.model)?;
    println!(
        "Model: vocab {} | hidden {} | {} parameters",
        model.vocab.size(),
        model.params.hidden_dim(),
        model.total_parameters()
    );

    let report = model.train_text(&text, &config.training)?;
    if let (Some(first), Some(last)) = (report.first_loss(), report.final_loss()) {
        println!(
            "Trained {} epochs: loss {:.4} -> {:.4}",
            report.losses.len(),
            first,
            last
        );
    }

    // Sampling needs a prompt the vocabulary can encode
    let prompt: String = args
        .prompt
        .chars()
        .filter(|&c| model.vocab.contains(c))
        .collect();
    if prompt.is_empty() {
        println!("Prompt has no known characters, skipping sample");
    } else {
        let sample = model.generate(&prompt, args.sample_length)?;
        println!("Sample: {prompt}{sample}");
    }

    if let Some(path) = &args.save {
        model.save_versioned(path, Some(format!("trained {} epochs", report.losses.len())))?;
        println!("Saved model to {path}");
    }

    Ok(())
}
