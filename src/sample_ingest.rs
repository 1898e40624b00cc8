use crossbeam_channel::{Sender, TrySendError};

use crate::motion_window::MotionWindow;
use crate::protocol::OutboundEvent;
use crate::types::AccelSample;

/// Estadísticas del detector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectorStats {
    pub ticks: u64,
    pub anomalies: u64,
    pub dropped: u64,
}

/// Entrada de muestras: calcula la magnitud y alimenta la ventana
///
/// Es el único escritor de la ventana. Las caídas salen por un canal con
/// `try_send`, así que `on_tick` nunca bloquea al lector del sensor.
pub struct SampleIngest {
    window: MotionWindow,
    events: Sender<OutboundEvent>,
    stats: DetectorStats,
}

impl SampleIngest {
    pub fn new(window: MotionWindow, events: Sender<OutboundEvent>) -> Self {
        Self {
            window,
            events,
            stats: DetectorStats::default(),
        }
    }

    /// Procesa una lectura; devuelve true si esta muestra disparó una caída
    pub fn on_tick(&mut self, x: i32, y: i32, z: i32) -> bool {
        let magnitude = AccelSample::new(x, y, z).magnitude();
        self.stats.ticks += 1;

        if !self.window.push(magnitude) {
            return false;
        }

        self.stats.anomalies += 1;
        log::debug!("caída (magnitud={}, tick={})", magnitude, self.stats.ticks);

        match self.events.try_send(OutboundEvent::Anomaly) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.stats.dropped += 1;
                log::error!("Cola de salida llena, caída descartada");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.dropped += 1;
                log::error!("Gateway desconectado, caída descartada");
            }
        }
        true
    }

    pub fn on_sample(&mut self, sample: AccelSample) -> bool {
        self.on_tick(sample.x, sample.y, sample.z)
    }

    pub fn window(&self) -> &MotionWindow {
        &self.window
    }

    pub fn stats(&self) -> &DetectorStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};

    #[test]
    fn test_on_tick_forwards_squared_magnitude() {
        let (tx, _rx) = unbounded();
        let window = MotionWindow::new(4, 2, u32::MAX).unwrap();
        let mut ingest = SampleIngest::new(window, tx);

        ingest.on_tick(3, -4, 12);
        assert_eq!(ingest.window().slots(), &[169, 0, 0, 0]);
        assert_eq!(ingest.window().cursor(), 1);
    }

    #[test]
    fn test_anomaly_is_sent_as_event() {
        let (tx, rx) = unbounded();
        let window = MotionWindow::new(8, 2, 10_000_000).unwrap();
        let mut ingest = SampleIngest::new(window, tx);

        assert!(!ingest.on_tick(0, 0, -1000));
        assert!(ingest.on_tick(4000, 0, 0)); // 16e6 contra 1e6

        assert_eq!(rx.try_recv(), Ok(OutboundEvent::Anomaly));
        assert!(rx.try_recv().is_err());
        assert_eq!(ingest.stats().anomalies, 1);
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let (tx, rx) = bounded(1);
        let window = MotionWindow::new(2, 2, 0).unwrap();
        let mut ingest = SampleIngest::new(window, tx);

        // con umbral 0 cualquier diferencia dispara
        assert!(ingest.on_tick(1, 0, 0));
        assert!(ingest.on_tick(5, 0, 0));
        assert_eq!(ingest.stats().dropped, 1);
        assert_eq!(rx.len(), 1);
    }
}
