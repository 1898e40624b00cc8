use crossbeam_channel::{SendTimeoutError, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::types::{AccelSample, GRAVITY_MG};

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("Trace is empty")]
    EmptyTrace,

    #[error("Sample period must be greater than zero")]
    ZeroPeriod,
}

/// Parámetros del simulador de reloj en reposo con impactos periódicos
#[derive(Debug, Clone)]
pub struct SimulatorParams {
    pub seed: u64,
    /// Ruido máximo por eje (mili-g)
    pub noise: i32,
    /// Cada cuántas muestras se inyecta un impacto (None = nunca)
    ///
    /// Con un periodo ≡ 1 (mod W) cada impacto cae una ranura más adelante
    /// que el anterior, así que acaban pasando por las ranuras escaneadas.
    pub impact_every: Option<u64>,
    /// Aceleración del impacto en el eje x (mili-g)
    pub impact_mg: i32,
    /// Número de muestras a generar (None = sin fin)
    pub limit: Option<u64>,
}

impl Default for SimulatorParams {
    fn default() -> Self {
        Self {
            seed: 42,
            noise: 40,
            impact_every: Some(1001),
            impact_mg: 4000,
            limit: None,
        }
    }
}

/// Generador determinista de lecturas
pub struct Simulator {
    rng: StdRng,
    params: SimulatorParams,
    tick: u64,
}

impl Simulator {
    pub fn new(params: SimulatorParams) -> Self {
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            params,
            tick: 0,
        }
    }

    pub fn next_sample(&mut self) -> Option<AccelSample> {
        if let Some(limit) = self.params.limit {
            if self.tick >= limit {
                return None;
            }
        }
        self.tick += 1;

        let noise = self.params.noise.max(0);
        let mut jitter = || {
            if noise == 0 {
                0
            } else {
                self.rng.gen_range(-noise..=noise)
            }
        };
        let mut sample = AccelSample::new(jitter(), jitter(), -GRAVITY_MG + jitter());

        if let Some(every) = self.params.impact_every {
            if every > 0 && self.tick % every == 0 {
                sample.x += self.params.impact_mg;
            }
        }
        Some(sample)
    }
}

/// Origen de las lecturas del acelerómetro
pub enum SensorSource {
    Trace(Vec<AccelSample>),
    Simulated(SimulatorParams),
}

/// Publica una muestra por periodo en el canal
///
/// Termina cuando se agota la fuente o el receptor desaparece. Devuelve el
/// número de muestras entregadas.
pub fn start_sensor_feed(
    source: SensorSource,
    period: Duration,
    tx: Sender<AccelSample>,
) -> Result<u64, SensorError> {
    if period.is_zero() {
        return Err(SensorError::ZeroPeriod);
    }

    let mut next: Box<dyn FnMut() -> Option<AccelSample>> = match source {
        SensorSource::Trace(samples) => {
            if samples.is_empty() {
                return Err(SensorError::EmptyTrace);
            }
            log::info!("Reproduciendo traza de {} muestras", samples.len());
            let mut iter = samples.into_iter();
            Box::new(move || iter.next())
        }
        SensorSource::Simulated(params) => {
            log::info!("Simulador de acelerómetro (semilla {})", params.seed);
            let mut sim = Simulator::new(params);
            Box::new(move || sim.next_sample())
        }
    };

    let mut delivered = 0u64;
    let mut lost = 0u64;
    let mut deadline = Instant::now();

    while let Some(sample) = next() {
        match tx.send_timeout(sample, period) {
            Ok(()) => delivered += 1,
            Err(SendTimeoutError::Timeout(_)) => {
                // el detector no da abasto: se pierde la muestra, como en el sensor real
                lost += 1;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                log::warn!("Receptor del sensor cerrado");
                break;
            }
        }

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        } else {
            deadline = now;
        }
    }

    log::info!(
        "Sensor detenido (entregadas={} perdidas={})",
        delivered,
        lost
    );
    Ok(delivered)
}
