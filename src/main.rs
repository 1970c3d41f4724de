use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use jarvis::assistant::{ModelBackend, OllamaClient};
use jarvis::speech::{probe_backends, select_backend};
use jarvis::voice::{
    AudioCapture, AudioPlayback, MicrophoneSource, PLAYBACK_SAMPLE_RATE, SAMPLE_RATE, rms,
};
use jarvis::{Config, Daemon};

/// Jarvis - voice-activated assistant
#[derive(Parser)]
#[command(name = "jarvis", version, about)]
struct Cli {
    /// Print replies instead of speaking them
    #[arg(long, env = "JARVIS_TEXT_ONLY")]
    text_only: bool,

    /// Start even if the language model is unreachable
    #[arg(long)]
    skip_model_check: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Привет! Это проверка синтеза речи.")]
        text: String,
    },
    /// List available speech backends in priority order
    Backends,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,jarvis=info",
        1 => "info,jarvis=debug",
        2 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => {
                tokio::task::spawn_blocking(move || test_mic(duration)).await?
            }
            Command::TestSpeaker => tokio::task::spawn_blocking(test_speaker).await?,
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::Backends => {
                list_backends(&config);
                Ok(())
            }
        };
    }

    tracing::info!(
        text_only = cli.text_only,
        model = %config.llm.model,
        "starting jarvis"
    );

    let ollama = Arc::new(OllamaClient::new(&config.llm)?);
    if cli.skip_model_check {
        tracing::warn!("skipping language model check");
    } else {
        ollama.ping().await.map_err(|e| {
            anyhow::anyhow!(
                "language model at {} is not reachable ({e}); start `ollama serve` and pull {}, or pass --skip-model-check",
                config.llm.url,
                config.llm.model
            )
        })?;
    }
    let model: Arc<dyn ModelBackend> = ollama;

    let speech = select_backend(&config.voice, cli.text_only);
    tracing::info!(backend = speech.name(), "speech backend selected");

    let stop = CancellationToken::new();
    let abort = CancellationToken::new();
    spawn_interrupt_handler(stop.clone(), abort.clone());

    let stt = config.stt.clone();
    let daemon = Daemon::new(config, model, speech);
    tracing::info!("jarvis ready - say \"{}\"", daemon.wake_phrase());

    daemon
        .run(move || MicrophoneSource::open(&stt), stop, abort)
        .await?;

    Ok(())
}

/// First Ctrl-C stops gracefully, the second aborts speech draining
fn spawn_interrupt_handler(stop: CancellationToken, abort: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!("interrupt received, stopping (press Ctrl-C again to abort)");
        stop.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("second interrupt, aborting");
            abort.cancel();
        }
    });
}

/// Test microphone input
fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        let samples = capture
            .read_chunk(SAMPLE_RATE as usize, Duration::from_secs(2))?
            .unwrap_or_default();
        let energy = rms(&samples);
        let peak = samples
            .iter()
            .map(|s| f32::from(s.unsigned_abs()) / f32::from(i16::MAX))
            .fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new(PLAYBACK_SAMPLE_RATE)?;

    let frequency = 440.0_f32;
    #[allow(clippy::cast_precision_loss)]
    let rate = PLAYBACK_SAMPLE_RATE as f32;
    let num_samples = PLAYBACK_SAMPLE_RATE as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), PLAYBACK_SAMPLE_RATE);
    playback.play(samples, &AtomicBool::new(false))?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Speak through the backend the assistant would use
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    let backend = select_backend(&config.voice, false);
    println!("Testing TTS via {} with text: \"{text}\"\n", backend.name());

    backend.speak(text).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Print probe results
fn list_backends(config: &Config) {
    let found = probe_backends(&config.voice, |program| which::which(program).is_ok());

    println!("Speech backends in priority order:");
    for (i, kind) in found.iter().enumerate() {
        let marker = if i == 0 { " (selected)" } else { "" };
        println!("  {}. {kind}{marker}", i + 1);
    }
}
