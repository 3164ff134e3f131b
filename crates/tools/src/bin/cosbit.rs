//! CosBit - transmit and receive short text messages over an audio AFSK link

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use cosbit_core::protocol;
use cosbit_link::tx::Transmitter;
use cosbit_tools::common::{init_logging, read_wav_file, write_wav_file};
use cosbit_tools::rx::DEFAULT_BLOCK_SIZE;
use cosbit_tools::{
    receive_samples, simulate, ReceiveReport, ReportEntry, SignalAnalyzer, SimulationConfig,
    StationConfig,
};

/// CosBit AFSK link tool
#[derive(Parser)]
#[command(name = "cosbit")]
#[command(about = "CosBit AFSK modem: transmit, receive and test short messages")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Station configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a message into a WAV file
    Tx(TransmitArgs),
    /// Decode messages from a WAV file
    Rx(ReceiveArgs),
    /// Loop a message through a simulated noisy channel
    Simulate(SimulateArgs),
    /// Report the spectrum and tone balance of a WAV file
    Analyze(AnalyzeArgs),
    /// Show wire format constants
    Info,
    /// Write the effective station configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct ModemOverrides {
    /// Tone amplitude (0.0-1.0)
    #[arg(long)]
    amplitude: Option<f32>,

    /// Sync word bit errors tolerated (0-3)
    #[arg(long)]
    sync_tolerance: Option<u32>,

    /// Leave out the lead-in chirp
    #[arg(long)]
    no_chirp: bool,
}

impl ModemOverrides {
    fn apply(&self, config: &mut StationConfig) {
        if let Some(amplitude) = self.amplitude {
            config.modem.amplitude = amplitude;
        }
        if let Some(tolerance) = self.sync_tolerance {
            config.receive.sync_tolerance = tolerance;
        }
        if self.no_chirp {
            config.transmit.chirp = false;
        }
    }
}

#[derive(Args)]
struct TransmitArgs {
    /// Output audio file
    #[arg(short, long)]
    output: PathBuf,

    /// Text to transmit (up to 48 bytes)
    #[arg(short, long)]
    text: Option<String>,

    /// Read the message from a file instead
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: f64,

    #[command(flatten)]
    overrides: ModemOverrides,
}

#[derive(Args)]
struct ReceiveArgs {
    /// Input audio file
    #[arg(short, long)]
    input: PathBuf,

    /// Write decoded text here, one message per line
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Samples handed to the receiver per block
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    overrides: ModemOverrides,
}

#[derive(Args)]
struct SimulateArgs {
    /// Text to transmit
    #[arg(short, long, default_value = "CQ CQ DE TEST")]
    text: String,

    /// Channel SNR in dB against the tone power; clean if omitted
    #[arg(long)]
    snr: Option<f64>,

    /// Payload bytes wiped out by a noise burst
    #[arg(long, default_value_t = 0)]
    burst_bytes: usize,

    /// Random seed for the channel
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: f64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    overrides: ModemOverrides,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Input audio file
    #[arg(short, long)]
    input: PathBuf,

    /// FFT size for spectral analysis
    #[arg(long, default_value = "4096")]
    fft_size: usize,
}

#[derive(Args)]
struct ConfigArgs {
    /// Destination file
    #[arg(long)]
    write: PathBuf,
}

fn message_text(args: &TransmitArgs) -> Result<String> {
    match (&args.text, &args.file) {
        (Some(text), None) => Ok(text.clone()),
        (None, Some(file)) => std::fs::read_to_string(file)
            .map(|s| s.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string())
            .with_context(|| format!("Failed to read message file: {:?}", file)),
        (Some(_), Some(_)) => bail!("Use either --text or --file, not both"),
        (None, None) => bail!("Either --text or --file must be specified"),
    }
}

fn print_report(report: &ReceiveReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.messages.is_empty() {
        println!("No messages decoded");
    }
    for (i, message) in report.messages.iter().enumerate() {
        match message {
            ReportEntry::Delivered {
                text,
                corrected,
                confidence,
            } => println!(
                "✓ {}: {} (corrected {} bytes, confidence {:.2})",
                i + 1,
                text,
                corrected,
                confidence
            ),
            ReportEntry::Failed { reason, confidence } => println!(
                "✗ {}: uncorrectable packet: {} (confidence {:.2})",
                i + 1,
                reason,
                confidence
            ),
        }
    }
    println!(
        "  locks {}, syncs {}, truncated {}, failures {}",
        report.stats.locks,
        report.stats.syncs_found,
        report.stats.payloads_truncated,
        report.stats.failures
    );
    Ok(())
}

/// Show wire format constants
fn show_info() {
    println!("\n=== CosBit AFSK Link ===");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));

    println!("\n=== Modem ===");
    println!("  • Mark  {} Hz (bit 1)", protocol::MARK_HZ);
    println!("  • Space {} Hz (bit 0)", protocol::SPACE_HZ);
    println!("  • {} baud, continuous phase", protocol::BAUD);

    println!("\n=== Frame ===");
    println!("  • Preamble  {} bits 1010...", protocol::PREAMBLE_BITS);
    println!("  • Sync word 0x{:04X}", protocol::SYNC_WORD);
    println!(
        "  • Payload   {} bytes ({} data + {} Reed-Solomon parity)",
        protocol::PACKET_BYTES,
        protocol::DATA_BYTES,
        protocol::ECC_BYTES
    );
    println!(
        "  • Corrects up to {} byte errors, {}x{} byte interleaver",
        protocol::CORRECTABLE_BYTES,
        protocol::INTERLEAVE_ROWS,
        protocol::INTERLEAVE_COLS
    );
    println!("  • Postamble {} zero bits", protocol::POSTAMBLE_BITS);

    println!("\n=== Example Usage ===");
    println!("  Transmit: cosbit tx -o out.wav -t \"CQ CQ DE TEST\"");
    println!("  Receive:  cosbit rx -i out.wav");
    println!("  Simulate: cosbit simulate --snr 3 --burst-bytes 6");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let mut station = StationConfig::load(cli.config.as_deref())?;
    info!("CosBit tool starting");

    match cli.command {
        Commands::Tx(args) => {
            args.overrides.apply(&mut station);
            let text = message_text(&args)?;

            let started = Instant::now();
            let transmitter = Transmitter::new(args.sample_rate, station.modem, station.transmit)?;
            let audio = transmitter.transmit_text(&text)?;
            info!("Burst generated in {:?}", started.elapsed());

            write_wav_file(&audio, &args.output)?;
            println!(
                "✓ Transmission complete: {} samples ({:.2} s) written to {:?}",
                audio.len(),
                audio.duration().as_secs_f64(),
                args.output
            );
        }

        Commands::Rx(args) => {
            args.overrides.apply(&mut station);
            info!("Starting reception from {:?}", args.input);

            let audio = read_wav_file(&args.input)?;
            let report = receive_samples(&audio, &station, args.block_size)?;
            print_report(&report, args.json)?;

            if let Some(ref output) = args.output {
                let text: Vec<&str> = report.delivered().collect();
                std::fs::write(output, text.join("\n"))
                    .with_context(|| format!("Failed to write {:?}", output))?;
                if !args.json {
                    println!("✓ Decoded text written to {:?}", output);
                }
            }
        }

        Commands::Simulate(args) => {
            args.overrides.apply(&mut station);
            let sim = SimulationConfig {
                text: args.text,
                sample_rate: args.sample_rate,
                snr_db: args.snr,
                burst_bytes: args.burst_bytes,
                seed: args.seed,
                ..SimulationConfig::default()
            };
            let report = simulate(&station, &sim)?;
            print_report(&report, args.json)?;
        }

        Commands::Analyze(args) => {
            let audio = read_wav_file(&args.input)?;
            let mut analyzer =
                SignalAnalyzer::new(args.fft_size, audio.sample_rate(), station.modem)?;
            let result = analyzer.analyze(&audio)?;

            println!("✓ Analyzed {} samples ({:.2} s)", result.sample_count, result.duration_secs);
            println!("  Peak amplitude: {:.4}", result.peak_amplitude);
            println!("  Mean power:     {:.1} dB", result.power_db);
            println!("  Peak frequency: {:.1} Hz", result.peak_frequency);
            match result.tone_balance_db {
                Some(balance) => println!("  Mark/space:     {:+.1} dB", balance),
                None => println!("  Mark/space:     no tone energy"),
            }
        }

        Commands::Info => {
            show_info();
        }

        Commands::Config(args) => {
            station.save_to_file(&args.write)?;
            println!("✓ Configuration written to {:?}", args.write);
        }
    }

    Ok(())
}
