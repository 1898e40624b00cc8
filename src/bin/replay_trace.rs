use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use vigia::config::{CursorWrap, DetectorConfig, ScanMode};
use vigia::motion_window::MotionWindow;
use vigia::protocol::OutboundEvent;
use vigia::trace_loader::load_trace_from_csv;

struct ReplayOptions {
    config_path: Option<PathBuf>,
    threshold: Option<u32>,
    cursor_relative: bool,
    wrap_at_scan_width: bool,
    dump_slots: bool,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    const USAGE: &str = "Uso: replay_trace [--config <archivo.json>] [--threshold N] [--cursor-relative] [--wrap-at-scan-width] [--dump-slots] <traza.csv>";

    let mut opts = ReplayOptions {
        config_path: None,
        threshold: None,
        cursor_relative: false,
        wrap_at_scan_width: false,
        dump_slots: false,
    };
    let mut csv_path: Option<PathBuf> = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                opts.config_path = Some(PathBuf::from(args.next().context(USAGE)?));
            }
            "--threshold" => {
                let raw = args.next().context(USAGE)?;
                opts.threshold = Some(
                    raw.parse()
                        .with_context(|| format!("Umbral inválido: {}", raw))?,
                );
            }
            "--cursor-relative" => opts.cursor_relative = true,
            "--wrap-at-scan-width" => opts.wrap_at_scan_width = true,
            "--dump-slots" => opts.dump_slots = true,
            _ => {
                if csv_path.is_some() {
                    bail!(USAGE);
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("Debes especificar una traza CSV"))?;
    Ok((csv_path, opts))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (csv_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo traza desde {:?}", csv_path);

    let mut config = match &opts.config_path {
        Some(path) => DetectorConfig::load(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => DetectorConfig::default(),
    };
    if let Some(threshold) = opts.threshold {
        config.threshold = threshold;
    }
    if opts.cursor_relative {
        config.scan_mode = ScanMode::CursorRelative;
    }
    if opts.wrap_at_scan_width {
        config.cursor_wrap = CursorWrap::ScanWidth;
    }

    let trace = load_trace_from_csv(&csv_path)?;
    let mut window = MotionWindow::from_config(&config)?;

    println!(
        "🔧 W={} K={} umbral={} escaneo={:?} vuelta={:?}\n",
        window.capacity(),
        window.scan_width(),
        window.threshold(),
        window.scan_mode(),
        window.cursor_wrap()
    );

    let mut fired = Vec::new();
    for (tick, sample) in trace.iter().enumerate() {
        let magnitude = sample.magnitude();
        let anomaly = window.push(magnitude);
        let (minimum, maximum) = window.scan_range();

        if anomaly {
            fired.push(tick);
            println!(
                "  ⚠️  tick {:>6}  magnitud {:>10}  rango {:>10}",
                tick,
                magnitude,
                maximum - minimum
            );
        }
        if opts.dump_slots {
            println!("  {:03}: {:?}", tick, window.slots());
        }
    }

    let frame = OutboundEvent::Anomaly.encode_frame()?;
    let frame_hex: Vec<String> = frame.iter().map(|b| format!("{:02x}", b)).collect();

    println!(
        "\n📊 {} muestras, {} caídas",
        trace.len(),
        fired.len()
    );
    if let (Some(first), Some(last)) = (fired.first(), fired.last()) {
        println!("   primera en tick {}, última en tick {}", first, last);
    }
    println!("📦 Trama por caída: {}", frame_hex.join(" "));

    Ok(())
}
