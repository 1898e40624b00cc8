use std::time::{Duration, Instant};

use crate::protocol::{ButtonCode, Dictionary, MessageKey};

pub const ABOUT_TO_HELP_TEXT: &str = "You are about to receive help";
pub const HELP_ON_THE_WAY_TEXT: &str = "Your help is on the way";

/// Segundos restantes por debajo de los cuales ya se anuncia la ayuda
const ON_THE_WAY_SECS: u64 = 3;

/// Quien pide ayuda cuando vence la cuenta atrás
pub trait HelpDispatcher {
    fn request_help(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlertState {
    Safe,
    Countdown { started: Instant },
}

/// Resultado de avanzar el reloj de la alerta
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanionStatus {
    Idle,
    Waiting(String),
    HelpRequested,
}

/// Lado del teléfono: convierte una caída del reloj en una petición de ayuda
/// con una ventana para cancelarla
pub struct Companion<H: HelpDispatcher> {
    state: AlertState,
    delay: Duration,
    dispatcher: H,
}

impl<H: HelpDispatcher> Companion<H> {
    pub fn new(delay: Duration, dispatcher: H) -> Self {
        Self {
            state: AlertState::Safe,
            delay,
            dispatcher,
        }
    }

    /// Procesa un mensaje del reloj; devuelve true si arrancó una alerta
    pub fn on_message(&mut self, dict: &Dictionary, now: Instant) -> bool {
        if !is_fall_message(dict) {
            return false;
        }
        if self.is_down() {
            log::debug!("Alerta ya en curso, mensaje ignorado");
            return false;
        }

        log::info!("Caída recibida, ayuda en {} s", self.delay.as_secs());
        self.state = AlertState::Countdown { started: now };
        true
    }

    pub fn cancel(&mut self) {
        if self.is_down() {
            log::info!("Ayuda cancelada");
        }
        self.state = AlertState::Safe;
    }

    pub fn tick(&mut self, now: Instant) -> CompanionStatus {
        let started = match self.state {
            AlertState::Safe => return CompanionStatus::Idle,
            AlertState::Countdown { started } => started,
        };

        let elapsed = now.saturating_duration_since(started);
        if elapsed >= self.delay {
            log::info!("Pidiendo ayuda");
            self.dispatcher.request_help();
            self.state = AlertState::Safe;
            return CompanionStatus::HelpRequested;
        }

        let remaining = self.delay.as_secs().saturating_sub(elapsed.as_secs());
        let text = if remaining < ON_THE_WAY_SECS {
            HELP_ON_THE_WAY_TEXT.to_string()
        } else {
            format!("You will get help in {} seconds", remaining)
        };
        CompanionStatus::Waiting(text)
    }

    pub fn is_down(&self) -> bool {
        matches!(self.state, AlertState::Countdown { .. })
    }

    pub fn dispatcher(&self) -> &H {
        &self.dispatcher
    }
}

/// BUTTON=UP (también la caída detectada) o LONG=SELECT
pub fn is_fall_message(dict: &Dictionary) -> bool {
    dict.get_int(MessageKey::Button) == Some(ButtonCode::Up as i64)
        || dict.get_int(MessageKey::Long) == Some(ButtonCode::Select as i64)
}

/// Despachador que sólo deja constancia en el log
#[derive(Debug, Default)]
pub struct LogDispatcher {
    pub requests: u32,
}

impl HelpDispatcher for LogDispatcher {
    fn request_help(&mut self) {
        self.requests += 1;
        println!("🚑 Solicitud de ayuda enviada (#{})", self.requests);
    }
}
