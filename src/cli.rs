//! Command-line interface for voxbridge
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Speech-translation core developer tool
#[derive(Parser, Debug)]
#[command(
    name = "voxbridge",
    version,
    about = "Inspect the speech-translation core: features, visemes, translation and envelopes"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: summary, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a duration string into seconds.
///
/// Bare numbers are seconds (`1.5`); anything else goes through `humantime`
/// (`850ms`, `2s`, `1m30s`).
fn parse_duration_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return Ok(secs);
        }
        return Err(format!("invalid duration: {}", s));
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs_f64())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract log-mel features from a WAV file and print shape and statistics
    Features {
        /// WAV file to analyse
        wav: PathBuf,

        /// Skip z-score normalization
        #[arg(long)]
        raw: bool,
    },

    /// Print the viseme timeline for a piece of text
    Visemes {
        /// Text to animate
        #[arg(long)]
        text: String,

        /// Language of the text (default: translation.target_lang)
        #[arg(long, value_name = "LANG")]
        lang: Option<String>,

        /// Spoken duration. Examples: 1.5, 850ms, 2s
        #[arg(long, value_name = "DURATION", default_value = "1s", value_parser = parse_duration_secs)]
        duration: f64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Translate text with the built-in dictionary
    Translate {
        /// Text to translate
        #[arg(long)]
        text: String,

        /// Source language (default: translation.source_lang)
        #[arg(long, value_name = "LANG")]
        from: Option<String>,

        /// Target language (default: translation.target_lang)
        #[arg(long, value_name = "LANG")]
        to: Option<String>,
    },

    /// Print the wire encoding of an envelope
    Envelope {
        /// Envelope kind
        #[arg(long, value_enum)]
        kind: EnvelopeKind,

        /// Transcript text, or the original text of a translation
        #[arg(long, default_value = "")]
        text: String,

        /// Translated text (translation envelopes)
        #[arg(long, default_value = "")]
        translated: String,

        /// Source language
        #[arg(long, value_name = "LANG")]
        from: Option<String>,

        /// Target language (translation envelopes)
        #[arg(long, value_name = "LANG")]
        to: Option<String>,

        /// WAV file whose samples become the audio payload (audio envelopes)
        #[arg(long, value_name = "FILE")]
        wav: Option<PathBuf>,

        /// Include the length-prefixed stream frame as hex
        #[arg(long)]
        frame: bool,
    },

    /// Accept one peer and print every envelope it sends
    Listen {
        /// Address to listen on (default: peer.addr)
        #[arg(long, value_name = "ADDR")]
        addr: Option<String>,
    },

    /// Connect to a listening peer and send a transcript and its translation
    Say {
        /// Text to send
        #[arg(long)]
        text: String,

        /// Peer address (default: peer.addr)
        #[arg(long, value_name = "ADDR")]
        addr: Option<String>,

        /// Source language (default: translation.source_lang)
        #[arg(long, value_name = "LANG")]
        from: Option<String>,

        /// Target language (default: translation.target_lang)
        #[arg(long, value_name = "LANG")]
        to: Option<String>,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Envelope kinds on the wire
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Audio,
    Transcript,
    Translation,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (file + environment overrides) as TOML
    Show,
    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_features() {
        let cli = Cli::try_parse_from(["voxbridge", "features", "speech.wav"]).unwrap();
        match cli.command {
            Commands::Features { wav, raw } => {
                assert_eq!(wav, PathBuf::from("speech.wav"));
                assert!(!raw);
            }
            other => panic!("Expected Features command, got {:?}", other),
        }
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_visemes_with_humantime_duration() {
        let cli = Cli::try_parse_from([
            "voxbridge",
            "visemes",
            "--text",
            "hola",
            "--lang",
            "es",
            "--duration",
            "850ms",
        ])
        .unwrap();
        match cli.command {
            Commands::Visemes {
                text,
                lang,
                duration,
                json,
            } => {
                assert_eq!(text, "hola");
                assert_eq!(lang.as_deref(), Some("es"));
                assert!((duration - 0.85).abs() < 1e-9);
                assert!(!json);
            }
            other => panic!("Expected Visemes command, got {:?}", other),
        }
    }

    #[test]
    fn test_visemes_duration_defaults_to_one_second() {
        let cli = Cli::try_parse_from(["voxbridge", "visemes", "--text", "hi"]).unwrap();
        match cli.command {
            Commands::Visemes { duration, lang, .. } => {
                assert_eq!(duration, 1.0);
                assert!(lang.is_none());
            }
            other => panic!("Expected Visemes command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(parse_duration_secs("1.5").unwrap(), 1.5);
        assert_eq!(parse_duration_secs(" 2s ").unwrap(), 2.0);
        assert!(parse_duration_secs("-1").is_err());
        assert!(parse_duration_secs("soon").is_err());
    }

    #[test]
    fn test_parse_translate() {
        let cli = Cli::try_parse_from([
            "voxbridge",
            "translate",
            "--text",
            "hello world",
            "--from",
            "en",
            "--to",
            "fr",
        ])
        .unwrap();
        match cli.command {
            Commands::Translate { text, from, to } => {
                assert_eq!(text, "hello world");
                assert_eq!(from.as_deref(), Some("en"));
                assert_eq!(to.as_deref(), Some("fr"));
            }
            other => panic!("Expected Translate command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_envelope_kind() {
        let cli = Cli::try_parse_from([
            "voxbridge",
            "envelope",
            "--kind",
            "transcript",
            "--text",
            "hi",
        ])
        .unwrap();
        match cli.command {
            Commands::Envelope {
                kind, text, frame, ..
            } => {
                assert_eq!(kind, EnvelopeKind::Transcript);
                assert_eq!(text, "hi");
                assert!(!frame);
            }
            other => panic!("Expected Envelope command, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_envelope_kind_is_rejected() {
        let err = Cli::try_parse_from(["voxbridge", "envelope", "--kind", "video"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_parse_say_and_listen() {
        let cli = Cli::try_parse_from([
            "voxbridge",
            "say",
            "--text",
            "good morning",
            "--addr",
            "127.0.0.1:9000",
        ])
        .unwrap();
        match cli.command {
            Commands::Say {
                text,
                addr,
                from,
                to,
            } => {
                assert_eq!(text, "good morning");
                assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
                assert!(from.is_none());
                assert!(to.is_none());
            }
            other => panic!("Expected Say command, got {:?}", other),
        }

        let cli = Cli::try_parse_from(["voxbridge", "listen"]).unwrap();
        assert!(matches!(cli.command, Commands::Listen { addr: None }));
    }

    #[test]
    fn test_parse_config_show_with_global_flags() {
        let cli = Cli::try_parse_from([
            "voxbridge",
            "config",
            "show",
            "--config",
            "/tmp/voxbridge.toml",
            "-vv",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/voxbridge.toml")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["voxbridge"]).is_err());
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["voxbridge", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
