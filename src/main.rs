use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use voxbridge::audio::{load_wav, samples_to_pcm16_le};
use voxbridge::cli::{Cli, Commands, ConfigAction, EnvelopeKind};
use voxbridge::config::Config;
use voxbridge::features::FeatureExtractor;
use voxbridge::peer::{
    MessageEnvelope, PeerMessageChannel, Role, Signal, TcpTransport, encode_frame, pump_inbound,
};
use voxbridge::pipeline::{PeerEvent, PeerRelay};
use voxbridge::translate::DictionaryTranslator;
use voxbridge::viseme::{MonotonicClock, generate, total_span};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Features { wav, raw } => run_features(&config, &wav, raw, cli.verbose)?,
        Commands::Visemes {
            text,
            lang,
            duration,
            json,
        } => {
            let lang = lang.unwrap_or_else(|| config.translation.target_lang.clone());
            run_visemes(&text, &lang, duration, json)?;
        }
        Commands::Translate { text, from, to } => {
            let from = from.unwrap_or_else(|| config.translation.source_lang.clone());
            let to = to.unwrap_or_else(|| config.translation.target_lang.clone());
            let translated = load_dictionary(&config)?.translate(&text, &from, &to)?;
            if !cli.quiet {
                eprintln!("{}", format!("{} -> {}", from, to).dimmed());
            }
            println!("{}", translated);
        }
        Commands::Envelope {
            kind,
            text,
            translated,
            from,
            to,
            wav,
            frame,
        } => {
            let from = from.unwrap_or_else(|| config.translation.source_lang.clone());
            let to = to.unwrap_or_else(|| config.translation.target_lang.clone());
            let envelope = match kind {
                EnvelopeKind::Transcript => MessageEnvelope::transcript(text, from),
                EnvelopeKind::Translation => {
                    MessageEnvelope::translation(text, translated, from, to)
                }
                EnvelopeKind::Audio => {
                    let path = wav.context("--wav is required for audio envelopes")?;
                    let waveform = load_wav(&path)?;
                    MessageEnvelope::audio(samples_to_pcm16_le(&waveform.samples))
                }
            };
            let bytes = envelope.encode()?;
            println!("{}", String::from_utf8_lossy(&bytes));
            if frame {
                let framed = encode_frame(&bytes, config.peer.max_frame_bytes)?;
                let hex: String = framed.iter().map(|b| format!("{:02x}", b)).collect();
                println!("{}", hex);
            }
        }
        Commands::Listen { addr } => {
            let addr = addr.unwrap_or_else(|| config.peer.addr.clone());
            run_listen(&config, &addr, cli.quiet).await?;
        }
        Commands::Say {
            text,
            addr,
            from,
            to,
        } => {
            let addr = addr.unwrap_or_else(|| config.peer.addr.clone());
            let from = from.unwrap_or_else(|| config.translation.source_lang.clone());
            let to = to.unwrap_or_else(|| config.translation.target_lang.clone());
            run_say(&config, &addr, &text, &from, &to, cli.quiet).await?;
        }
        Commands::Config { action } => handle_config_command(action, &config, cli.config)?,
    }
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/voxbridge/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match (custom_path, Config::default_path()) {
        (Some(path), _) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        (None, Some(default_path)) => Config::load_or_default(&default_path)?,
        (None, None) => Config::default(),
    };
    Ok(config.with_env_overrides())
}

fn run_features(config: &Config, wav: &Path, raw: bool, verbose: u8) -> Result<()> {
    let waveform = load_wav(wav)?;
    let extractor = FeatureExtractor::new(config.features.clone())?;
    let matrix = if raw {
        extractor.extract_unnormalized(&waveform.samples, waveform.sample_rate)?
    } else {
        extractor.extract(&waveform.samples, waveform.sample_rate)?
    };

    let (mean, std) = matrix.mean_and_std();
    println!("{}", wav.display().bold());
    println!(
        "  {}  {:.3}s at {} Hz",
        "Audio:".dimmed(),
        waveform.duration_secs(),
        waveform.sample_rate
    );
    println!(
        "  {}  {} frames x {} bands",
        "Shape:".dimmed(),
        matrix.num_frames(),
        matrix.num_bands()
    );
    println!("  {}   mean {:.4}, std {:.4}", "Stats:".dimmed(), mean, std);

    if verbose >= 2 {
        for index in 0..matrix.num_frames() {
            if let Some(frame) = matrix.frame(index) {
                let row: Vec<String> = frame.iter().map(|v| format!("{:.2}", v)).collect();
                println!("{:>5}: {}", index, row.join(" "));
            }
        }
    }
    Ok(())
}

fn run_visemes(text: &str, lang: &str, duration: f64, json: bool) -> Result<()> {
    let events = generate(text, lang, duration);

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", "(no visemes)".yellow());
        return Ok(());
    }
    for event in &events {
        println!(
            "  {:>7.3} - {:>7.3}  {}",
            event.start_time,
            event.end_time,
            event.symbol.as_str().green()
        );
    }
    println!(
        "{}",
        format!("{} events over {:.3}s", events.len(), total_span(&events)).dimmed()
    );
    Ok(())
}

fn load_dictionary(config: &Config) -> Result<DictionaryTranslator> {
    Ok(match &config.translation.dictionary {
        Some(path) => DictionaryTranslator::with_file(path)?,
        None => DictionaryTranslator::builtin(),
    })
}

/// Serve one peer until it hangs up. The CLI is its own rendezvous: the
/// offer is applied locally as soon as the socket is accepted.
async fn run_listen(config: &Config, addr: &str, quiet: bool) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    if !quiet {
        eprintln!("{}", format!("Listening on {}", addr).dimmed());
    }

    let link = TcpTransport::accept(&listener, config.peer.max_frame_bytes).await?;
    let peer_addr = link.transport.peer_addr();
    if !quiet {
        eprintln!("{}", format!("Peer connected from {}", peer_addr).dimmed());
    }

    let (tx, rx) = crossbeam_channel::unbounded();
    let relay = PeerRelay::new(Arc::new(MonotonicClock::new()), config.peer.audio_sample_rate)
        .with_events(tx);
    let mut channel = PeerMessageChannel::new(link.transport.clone());
    channel.set_handler(Box::new(relay));
    channel.connect(Role::Responder);
    channel.apply_signal(Signal::Offer {
        session_id: peer_addr.to_string(),
    })?;

    // The relay (and its sender) is dropped when the pump ends, which ends the printer.
    let printer = tokio::task::spawn_blocking(move || {
        for event in rx {
            print_event(&event);
        }
    });
    let delivered = pump_inbound(channel.shared(), link.inbound).await;
    printer.await?;

    if !quiet {
        eprintln!("{}", format!("{} envelopes received", delivered).dimmed());
    }
    Ok(())
}

fn print_event(event: &PeerEvent) {
    match event {
        PeerEvent::Transcript { text, language } => {
            println!("{} [{}] {}", "transcript".cyan(), language, text);
        }
        PeerEvent::Translation {
            original,
            translated,
            source_lang,
            target_lang,
        } => {
            println!(
                "{} [{} -> {}] {} => {}",
                "translation".green(),
                source_lang,
                target_lang,
                original,
                translated
            );
        }
        PeerEvent::Audio {
            duration_secs,
            start_at,
        } => {
            println!(
                "{} {:.3}s at {:.3}",
                "audio".yellow(),
                duration_secs,
                start_at
            );
        }
    }
}

async fn run_say(
    config: &Config,
    addr: &str,
    text: &str,
    from: &str,
    to: &str,
    quiet: bool,
) -> Result<()> {
    let translated = load_dictionary(config)?.translate(text, from, to)?;

    let link = TcpTransport::connect(addr, config.peer.max_frame_bytes)
        .await
        .with_context(|| format!("Failed to reach peer at {}", addr))?;
    let mut channel = PeerMessageChannel::new(link.transport.clone());
    channel.connect(Role::Initiator);
    let session_id = channel
        .session_id()
        .map(str::to_string)
        .context("initiator has no session id")?;
    channel.apply_signal(Signal::Answer { session_id })?;

    channel.send(&MessageEnvelope::transcript(text, from))?;
    channel.send(&MessageEnvelope::translation(text, &translated, from, to))?;
    link.transport.shutdown().await;

    if !quiet {
        eprintln!("{}", format!("Sent to {}: {}", addr, translated).dimmed());
    }
    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    config: &Config,
    custom_path: Option<PathBuf>,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Path => match custom_path.or_else(Config::default_path) {
            Some(path) => println!("{}", path.display()),
            None => {
                eprintln!("Error: no configuration directory on this platform");
                std::process::exit(1);
            }
        },
    }
    Ok(())
}
