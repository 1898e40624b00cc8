/*
Vigia - Detector de caídas en tiempo real

Sistema que:
1. Lee el acelerómetro del reloj (traza CSV o simulador) a ritmo fijo
2. Detecta caídas con una ventana circular min/max
3. Envía caídas y botones al teléfono como mensajes clave/valor
4. El teléfono cuenta 5 segundos y pide ayuda salvo que se cancele

Para ejecutar con el simulador:
     ./target/release/vigia

Con una traza grabada y configuración propia:
     ./target/release/vigia --config vigia.json --trace caida.csv

Teclas (Enter tras cada una):
  u / s / d → botones arriba / select / abajo
  l         → pulsación larga en select
  v         → el teléfono pide vibrar
  c         → cancelar la ayuda en el teléfono
  q         → salir
*/

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, never, select, tick, unbounded, Receiver, Sender};
use std::env;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use vigia::companion::{Companion, CompanionStatus, LogDispatcher, ABOUT_TO_HELP_TEXT};
use vigia::config::DetectorConfig;
use vigia::gateway::{decode_inbound, inbox_dropped, run_outbound, ChannelOutbox};
use vigia::motion_window::MotionWindow;
use vigia::protocol::{Dictionary, MessageKey, OutboundEvent, TupleValue};
use vigia::sample_ingest::SampleIngest;
use vigia::sensor::{start_sensor_feed, SensorSource, SimulatorParams};
use vigia::trace_loader::load_trace_from_csv;
use vigia::types::AccelSample;
use vigia::ui::{Click, ConsoleDisplay, ConsoleHaptics, WatchUi};

const SENSOR_QUEUE: usize = 100;
const LINK_QUEUE: usize = 32;
const PHONE_TICK: Duration = Duration::from_secs(1);

struct Options {
    config_path: Option<PathBuf>,
    trace_path: Option<PathBuf>,
}

enum ConsoleCommand {
    Click(Click),
    Vibrate,
    CancelHelp,
    Quit,
}

enum PhoneCommand {
    Vibrate,
    Cancel,
}

fn parse_args() -> Result<Options> {
    let mut config_path = None;
    let mut trace_path = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(PathBuf::from(
                    args.next().context("--config necesita un archivo")?,
                ))
            }
            "--trace" => {
                trace_path = Some(PathBuf::from(
                    args.next().context("--trace necesita un archivo")?,
                ))
            }
            _ => bail!("Uso: vigia [--config <archivo.json>] [--trace <archivo.csv>]"),
        }
    }

    Ok(Options {
        config_path,
        trace_path,
    })
}

fn parse_command(line: &str) -> Option<ConsoleCommand> {
    match line.trim() {
        "u" => Some(ConsoleCommand::Click(Click::Up)),
        "s" => Some(ConsoleCommand::Click(Click::Select)),
        "d" => Some(ConsoleCommand::Click(Click::Down)),
        "l" => Some(ConsoleCommand::Click(Click::LongSelect)),
        "v" => Some(ConsoleCommand::Vibrate),
        "c" => Some(ConsoleCommand::CancelHelp),
        "q" => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

fn read_console(tx: Sender<ConsoleCommand>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match parse_command(&line) {
            Some(cmd) => {
                if tx.send(cmd).is_err() {
                    break;
                }
            }
            None => println!("⚠️  Tecla no reconocida: {:?}", line.trim()),
        }
    }
}

/// Hilo del teléfono: recibe tramas del reloj y gestiona la cuenta atrás
fn run_phone(
    frames: Receiver<Vec<u8>>,
    commands: Receiver<PhoneCommand>,
    inbox: Sender<Vec<u8>>,
    help_delay: Duration,
) -> u32 {
    let mut companion = Companion::new(help_delay, LogDispatcher::default());
    let mut frames = frames;
    let mut commands = commands;
    let mut link_closed = false;
    let ticker = tick(PHONE_TICK);

    loop {
        let mut frames_closed = false;
        let mut commands_closed = false;
        select! {
            recv(frames) -> msg => {
                match msg {
                    Ok(frame) => match Dictionary::decode(&frame) {
                        Ok(dict) => {
                            if companion.on_message(&dict, Instant::now()) {
                                println!("📱 {}", ABOUT_TO_HELP_TEXT);
                            }
                        }
                        Err(e) => log::warn!("Teléfono: trama inválida: {}", e),
                    },
                    Err(_) => frames_closed = true,
                }
            }
            recv(commands) -> cmd => {
                match cmd {
                    Ok(PhoneCommand::Cancel) => companion.cancel(),
                    Ok(PhoneCommand::Vibrate) => {
                        let dict = Dictionary::single(MessageKey::Vibrate as u32, TupleValue::Int(1));
                        match dict.encode() {
                            Ok(frame) => {
                                if inbox.try_send(frame).is_err() {
                                    inbox_dropped("buzón del reloj lleno o cerrado");
                                }
                            }
                            Err(e) => log::error!("Teléfono: no se pudo codificar: {}", e),
                        }
                    }
                    Err(_) => commands_closed = true,
                }
            }
            recv(ticker) -> _ => {
                match companion.tick(Instant::now()) {
                    CompanionStatus::Waiting(text) => println!("📱 {}", text),
                    CompanionStatus::HelpRequested | CompanionStatus::Idle => {}
                }
            }
        }
        if frames_closed {
            link_closed = true;
            frames = never();
            if companion.is_down() {
                log::info!("Enlace cerrado, se espera a que venza la cuenta atrás");
            }
        }
        if commands_closed {
            commands = never();
        }
        // sin enlace sólo queda terminar una alerta en curso
        if link_closed && !companion.is_down() {
            break;
        }
    }

    companion.dispatcher().requests
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("⌚ Vigia - Detector de caídas\n");

    let opts = parse_args()?;
    let config = match &opts.config_path {
        Some(path) => DetectorConfig::load(path)
            .with_context(|| format!("No se pudo cargar la configuración {:?}", path))?,
        None => DetectorConfig::default(),
    };
    let window = MotionWindow::from_config(&config)?;
    println!(
        "🔧 Ventana W={} K={} umbral={} escaneo={:?} vuelta={:?}",
        window.capacity(),
        window.scan_width(),
        window.threshold(),
        window.scan_mode(),
        window.cursor_wrap()
    );

    let source = match &opts.trace_path {
        Some(path) => {
            println!("🎞️  Traza: {:?}", path);
            SensorSource::Trace(load_trace_from_csv(path)?)
        }
        None => {
            println!("🎲 Simulador de acelerómetro");
            SensorSource::Simulated(SimulatorParams::default())
        }
    };

    // Canal del sensor: un único consumidor escribe en la ventana
    let (sample_tx, sample_rx) = bounded::<AccelSample>(SENSOR_QUEUE);
    let period = config.sample_period();
    std::thread::spawn(move || {
        if let Err(e) = start_sensor_feed(source, period, sample_tx) {
            log::error!("Error en el sensor: {}", e);
        }
    });

    // Reloj → teléfono
    let (event_tx, event_rx) = bounded::<OutboundEvent>(LINK_QUEUE);
    let (frame_tx, frame_rx) = bounded::<Vec<u8>>(LINK_QUEUE);
    let gateway = std::thread::spawn(move || run_outbound(event_rx, ChannelOutbox::new(frame_tx)));

    // Teléfono → reloj
    let (inbox_tx, inbox_rx) = bounded::<Vec<u8>>(LINK_QUEUE);
    let (phone_tx, phone_rx) = unbounded::<PhoneCommand>();
    let help_delay = config.help_delay();
    let phone = std::thread::spawn(move || run_phone(frame_rx, phone_rx, inbox_tx, help_delay));

    let (console_tx, console_rx) = unbounded::<ConsoleCommand>();
    std::thread::spawn(move || read_console(console_tx));

    let mut ingest = SampleIngest::new(window, event_tx.clone());
    let mut ui = WatchUi::new(ConsoleDisplay::default(), ConsoleHaptics::default());
    let mut console_rx = console_rx;
    let mut inbox_rx = inbox_rx;

    println!("🎬 Monitorizando...\n");

    let mut sample_rx = sample_rx;
    let mut sensor_done = false;
    let mut console_done = false;

    loop {
        let mut sensor_closed = false;
        let mut console_closed = false;
        let mut inbox_closed = false;
        select! {
            recv(sample_rx) -> msg => {
                match msg {
                    Ok(sample) => {
                        if ingest.on_sample(sample) {
                            println!("⚠️  CAÍDA DETECTADA (muestra {})", ingest.stats().ticks);
                        }
                    }
                    Err(_) => sensor_closed = true,
                }
            }
            recv(console_rx) -> cmd => {
                match cmd {
                    Ok(ConsoleCommand::Click(click)) => {
                        let event = ui.on_click(click);
                        if let Err(e) = event_tx.try_send(event) {
                            log::error!("Evento {:?} descartado: {}", event, e);
                        }
                    }
                    Ok(ConsoleCommand::Vibrate) => {
                        if phone_tx.send(PhoneCommand::Vibrate).is_err() {
                            log::error!("Teléfono desconectado, vibración descartada");
                        }
                    }
                    Ok(ConsoleCommand::CancelHelp) => {
                        if phone_tx.send(PhoneCommand::Cancel).is_err() {
                            log::error!("Teléfono desconectado, cancelación descartada");
                        }
                    }
                    Ok(ConsoleCommand::Quit) => {
                        println!("\n👋 Saliendo...");
                        break;
                    }
                    Err(_) => console_closed = true,
                }
            }
            recv(inbox_rx) -> msg => {
                match msg {
                    Ok(frame) => {
                        for command in decode_inbound(&frame) {
                            ui.apply(command);
                        }
                    }
                    Err(_) => inbox_closed = true,
                }
            }
        }
        if sensor_closed {
            println!("🛑 Fin de la señal del sensor (q para salir)");
            sensor_done = true;
            sample_rx = never();
        }
        if console_closed {
            console_done = true;
            console_rx = never();
        }
        // sin consola ni sensor no queda nada que atender en el reloj
        if sensor_done && console_done {
            break;
        }
        if inbox_closed {
            inbox_rx = never();
        }
    }

    let detector_stats = ingest.stats().clone();
    drop(ingest);
    drop(event_tx);
    drop(phone_tx);

    let gateway_stats = gateway
        .join()
        .map_err(|_| anyhow::anyhow!("El hilo de salida terminó con pánico"))?;
    let help_requests = phone
        .join()
        .map_err(|_| anyhow::anyhow!("El hilo del teléfono terminó con pánico"))?;

    println!(
        "\n📊 muestras={} caídas={} descartadas={} enviados={} fallidos={} ayudas={}",
        detector_stats.ticks,
        detector_stats.anomalies,
        detector_stats.dropped,
        gateway_stats.sent,
        gateway_stats.failed,
        help_requests
    );

    Ok(())
}
