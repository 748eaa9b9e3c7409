use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use livecoach::advice::executor::{AdviceExecutor, ProcessExecutor};
use livecoach::audio::source::WavAudioSource;
use livecoach::capability::diarization::FixedLabeler;
use livecoach::capability::stt::MockRecognizer;
use livecoach::config::Config;
use livecoach::pipeline::orchestrator::{Capabilities, Pipeline};
use livecoach::session::{SessionEvent, SessionSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "livecoach", version, about = "Real-time conversation coaching from live audio")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded conversation through the pipeline with a stub recognizer
    Simulate {
        /// Mono 16-bit WAV file to play through the pipeline
        #[arg(long)]
        wav: PathBuf,

        /// Transcript lines the stub recognizer emits, one per segment
        #[arg(long = "line")]
        lines: Vec<String>,
    },
    /// Validate the configuration and print the resolved values
    CheckConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate { wav, lines } => run_simulate(config, &wav, lines),
        Commands::CheckConfig => run_check_config(config),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    Ok(config.with_env_overrides())
}

fn run_check_config(config: Config) -> Result<()> {
    config.validate().context("configuration is invalid")?;
    let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
    print!("{rendered}");
    Ok(())
}

fn run_simulate(config: Config, wav: &Path, lines: Vec<String>) -> Result<()> {
    let source = WavAudioSource::from_path(wav)
        .with_context(|| format!("failed to open {}", wav.display()))?;
    eprintln!(
        "livecoach: simulating {:.1}s of audio from {}",
        source.duration_secs(),
        wav.display()
    );

    let executor: Option<Arc<dyn AdviceExecutor>> = match &config.advice.model_command {
        Some(command) => {
            eprintln!("livecoach: primary advice model: {command}");
            Some(Arc::new(ProcessExecutor::new(command, &config.advice.model_args)))
        }
        None => {
            eprintln!("livecoach: no model command configured, advice is rule-based");
            None
        }
    };

    let line_refs: Vec<&str> = if lines.is_empty() {
        vec!["hello, thanks for taking the time today"]
    } else {
        lines.iter().map(|s| s.as_str()).collect()
    };
    let capabilities = Capabilities {
        scorer: None,
        recognizer: Arc::new(MockRecognizer::with_responses(&line_refs)),
        executor,
        labeler: Arc::new(FixedLabeler::default()),
    };

    let (event_tx, event_rx) = crossbeam_channel::bounded::<SessionEvent>(64);
    let handle = Pipeline::new(config)
        .with_event_sender(event_tx)
        .start(Box::new(source), capabilities)
        .context("failed to start pipeline")?;

    // Print turns as they are advised; exit once the audio is drained and
    // events go quiet.
    let mut printed: usize = 0;
    loop {
        match event_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(SessionEvent::TurnAdvised { .. }) => {
                printed = print_new_turns(&handle.snapshot(), printed);
            }
            Ok(SessionEvent::ModeChanged(mode)) => {
                eprintln!("livecoach: advice mode is now {mode:?}");
            }
            Ok(SessionEvent::AudioFailed) => {
                eprintln!("livecoach: audio capture failed, winding down");
            }
            Err(_) => {
                if handle.audio_finished() {
                    break;
                }
            }
        }
    }
    // Give in-flight turns a moment to land before the final snapshot.
    std::thread::sleep(Duration::from_millis(500));

    let snapshot = handle.stop();
    print_new_turns(&snapshot, printed);
    print_summary(&snapshot);
    Ok(())
}

fn print_new_turns(snapshot: &SessionSnapshot, already_printed: usize) -> usize {
    for (turn, advice) in snapshot
        .turns
        .iter()
        .zip(&snapshot.advice)
        .skip(already_printed)
    {
        println!("[#{} {}] {}", turn.id, turn.speaker.as_str(), turn.text);
        println!(
            "  -> {} {} ({:?}): {}",
            advice.priority, advice.category, advice.source, advice.insight
        );
        println!("     {}", advice.action);
    }
    snapshot.turns.len()
}

fn print_summary(snapshot: &SessionSnapshot) {
    eprintln!(
        "livecoach: session done: {} turns, {} segments from {} chunks, mode {:?}",
        snapshot.turns.len(),
        snapshot.segment_count,
        snapshot.chunk_count,
        snapshot.mode,
    );
    if let Some(error) = &snapshot.audio_error {
        eprintln!("livecoach: session ended by audio failure: {error}");
    }
    let dropped =
        snapshot.chunks_dropped + snapshot.segments_dropped + snapshot.transcripts_dropped;
    if dropped > 0 {
        eprintln!(
            "livecoach: shed {} item(s) under backpressure ({} chunks, {} segments, {} transcripts)",
            dropped, snapshot.chunks_dropped, snapshot.segments_dropped, snapshot.transcripts_dropped
        );
    }
}
