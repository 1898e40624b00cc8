use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;

use crate::protocol::{Dictionary, MessageKey, OutboundEvent, ProtocolError};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Outbox full")]
    Full,

    #[error("Companion link disconnected")]
    Disconnected,

    #[error("Outbox rejected message: {0}")]
    Rejected(String),
}

/// Salida de tramas hacia el teléfono
pub trait Outbox {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}

/// Comandos que el teléfono puede mandar al reloj
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundCommand {
    Vibrate,
}

/// Estadísticas de envío
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub sent: u32,
    pub failed: u32,
}

/// Envía un evento; los fallos se registran y el evento se pierde, sin reintentos
pub fn deliver(outbox: &mut impl Outbox, event: OutboundEvent, stats: &mut GatewayStats) {
    let result = event
        .encode_frame()
        .map_err(TransportError::from)
        .and_then(|frame| outbox.send(&frame));

    match result {
        Ok(()) => {
            stats.sent += 1;
            log::info!("Outbox: envío correcto ({:?})", event);
        }
        Err(e) => {
            stats.failed += 1;
            log::error!("Outbox: fallo al enviar {:?}: {}", event, e);
        }
    }
}

/// Hilo de salida: consume eventos hasta que se cierren todos los emisores
pub fn run_outbound(rx: Receiver<OutboundEvent>, mut outbox: impl Outbox) -> GatewayStats {
    let mut stats = GatewayStats::default();

    while let Ok(event) = rx.recv() {
        deliver(&mut outbox, event, &mut stats);
    }

    log::warn!(
        "Canal de salida cerrado (enviados={} fallidos={})",
        stats.sent,
        stats.failed
    );
    stats
}

/// Decodifica un mensaje entrante; las claves desconocidas se ignoran
pub fn decode_inbound(frame: &[u8]) -> Vec<InboundCommand> {
    let dict = match Dictionary::decode(frame) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("Mensaje entrante mal formado: {}", e);
            return Vec::new();
        }
    };

    let mut commands = Vec::new();
    for tuple in &dict.tuples {
        match MessageKey::from_raw(tuple.key) {
            Some(MessageKey::Vibrate) => commands.push(InboundCommand::Vibrate),
            _ => log::info!("Clave desconocida: {}", tuple.key),
        }
    }
    commands
}

/// El transporte descartó un mensaje antes de entregarlo
pub fn inbox_dropped(reason: &str) {
    log::error!("Mensaje entrante perdido: {}", reason);
}

/// Envía las tramas por un canal sin bloquear, hacia el hilo del teléfono
pub struct ChannelOutbox {
    tx: Sender<Vec<u8>>,
}

impl ChannelOutbox {
    pub fn new(tx: Sender<Vec<u8>>) -> Self {
        Self { tx }
    }
}

impl Outbox for ChannelOutbox {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.tx.try_send(frame.to_vec()).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Disconnected(_) => TransportError::Disconnected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ButtonCode, TupleValue};
    use crossbeam_channel::{bounded, unbounded};

    /// Outbox de prueba que rechaza cada `fail_every`-ésimo envío
    struct FakeOutbox {
        frames: Vec<Vec<u8>>,
        calls: usize,
        fail_every: Option<usize>,
    }

    impl FakeOutbox {
        fn new(fail_every: Option<usize>) -> Self {
            Self {
                frames: Vec::new(),
                calls: 0,
                fail_every,
            }
        }
    }

    impl Outbox for FakeOutbox {
        fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            self.calls += 1;
            if let Some(n) = self.fail_every {
                if self.calls % n == 0 {
                    return Err(TransportError::Rejected("busy".to_string()));
                }
            }
            self.frames.push(frame.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_deliver_counts_success_and_failure() {
        let mut outbox = FakeOutbox::new(Some(2));
        let mut stats = GatewayStats::default();

        deliver(&mut outbox, OutboundEvent::Anomaly, &mut stats);
        deliver(&mut outbox, OutboundEvent::Button(ButtonCode::Down), &mut stats);
        deliver(&mut outbox, OutboundEvent::LongPress(ButtonCode::Select), &mut stats);

        assert_eq!(stats, GatewayStats { sent: 2, failed: 1 });
        // el evento rechazado no se reintenta
        assert_eq!(outbox.calls, 3);
        assert_eq!(outbox.frames.len(), 2);
    }

    #[test]
    fn test_run_outbound_drains_until_closed() {
        let (tx, rx) = unbounded();
        tx.send(OutboundEvent::Anomaly).unwrap();
        tx.send(OutboundEvent::Button(ButtonCode::Select)).unwrap();
        drop(tx);

        let (frame_tx, frame_rx) = unbounded();
        let stats = run_outbound(rx, ChannelOutbox::new(frame_tx));

        assert_eq!(stats, GatewayStats { sent: 2, failed: 0 });
        let first = Dictionary::decode(&frame_rx.recv().unwrap()).unwrap();
        assert_eq!(first.get_int(MessageKey::Button), Some(ButtonCode::Up as i64));
        let second = Dictionary::decode(&frame_rx.recv().unwrap()).unwrap();
        assert_eq!(second.get_int(MessageKey::Button), Some(1));
    }

    #[test]
    fn test_channel_outbox_never_blocks() {
        let (tx, rx) = bounded(1);
        let mut outbox = ChannelOutbox::new(tx);
        assert!(outbox.send(&[1]).is_ok());
        assert!(matches!(outbox.send(&[2]), Err(TransportError::Full)));
        drop(rx);
        assert!(matches!(
            outbox.send(&[3]),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn test_decode_inbound_vibrate_and_unknown() {
        let dict = Dictionary {
            tuples: vec![
                crate::protocol::Tuple {
                    key: 42,
                    value: TupleValue::Int(1),
                },
                crate::protocol::Tuple {
                    key: MessageKey::Vibrate as u32,
                    value: TupleValue::Int(123),
                },
            ],
        };
        let frame = dict.encode().unwrap();
        assert_eq!(decode_inbound(&frame), vec![InboundCommand::Vibrate]);
    }

    #[test]
    fn test_decode_inbound_ignores_malformed_frames() {
        assert!(decode_inbound(&[3, 0]).is_empty());
        assert!(decode_inbound(&[]).is_empty());
    }
}
