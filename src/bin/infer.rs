use std::io::{BufRead, Write};

use clap::Parser;
use lstm::{Lstm, MAX_SEQ_LEN};

#[derive(Parser, Debug)]
#[command(name = "infer")]
#[command(about = "Generate text from a saved character-level LSTM")]
struct Args {
    /// Path to the saved model (versioned .json or .bin)
    #[arg(short, long, default_value = "models/lstm.bin")]
    model: String,

    /// If provided, generate once for this prompt then exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Characters to generate per prompt
    #[arg(short, long, default_value_t = 80)]
    length: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load model (versioned with integrity and compatibility checks)
    let model = Lstm::load_versioned(&args.model)?;
    println!(
        "Loaded model from {} (vocab {}, context {}).",
        &args.model,
        model.vocab.size(),
        MAX_SEQ_LEN
    );

    if let Some(p) = args.prompt {
        let out = model.generate(&p, args.length)?;
        println!("Output: {p}{out}");
        return Ok(());
    }

    let stdin = std::io::stdin();
    interactive(&model, stdin.lock(), std::io::stdout(), args.length)?;
    Ok(())
}

/// Prompt loop; stops on EOF, `exit`, or a read error
fn interactive<R: BufRead, W: Write>(
    model: &Lstm,
    mut reader: R,
    mut out: W,
    length: usize,
) -> std::io::Result<()> {
    writeln!(out, "\n--- Interactive Generation ---")?;
    writeln!(out, "Type a prompt and press Enter to continue it.")?;
    writeln!(out, "Decoding: greedy | type 'exit' to quit.")?;

    let mut input = String::new();
    loop {
        input.clear();
        write!(out, "\nPrompt: ")?;
        out.flush()?;

        match reader.read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Failed to read input: {e}");
                break;
            }
        }

        let prompt = input.trim_end_matches(['\n', '\r']);
        if prompt.eq_ignore_ascii_case("exit") {
            writeln!(out, "Goodbye!")?;
            break;
        }
        if prompt.is_empty() {
            continue;
        }

        match model.generate(prompt, length) {
            Ok(text) => writeln!(out, "Model: {prompt}{text}")?,
            Err(e) => eprintln!("{e}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstm::ModelConfig;

    struct FailingReader;

    impl std::io::Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("stdin closed"))
        }
    }

    fn test_model() -> Lstm {
        let config = ModelConfig {
            hidden_dim: 4,
            init_std: 0.1,
            seed: Some(3),
        };
        Lstm::from_text("abc", &config).unwrap()
    }

    #[test]
    fn test_read_error_ends_loop() {
        let reader = std::io::BufReader::new(FailingReader);
        let mut out = Vec::new();
        interactive(&test_model(), reader, &mut out, 3).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.matches("Prompt: ").count(), 1);
    }

    #[test]
    fn test_prompts_until_exit() {
        let reader = std::io::Cursor::new("ab\n\nexit\nab\n");
        let mut out = Vec::new();
        interactive(&test_model(), reader, &mut out, 3).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.matches("Model: ab").count(), 1);
        assert!(printed.ends_with("Goodbye!\n"));
    }
}
