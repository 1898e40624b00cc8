use crate::gateway::InboundCommand;
use crate::protocol::{ButtonCode, OutboundEvent};

pub const WELCOME_TEXT: &str = "Open Android app and press any button.";
pub const VIBRATE_TEXT: &str = "Vibrate!";

pub trait TextDisplay {
    fn set_text(&mut self, text: &str);
}

pub trait Haptics {
    fn short_pulse(&mut self);
}

/// Pulsaciones de los tres botones físicos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    Up,
    Select,
    Down,
    LongSelect,
}

/// Pantalla del reloj: muestra el último botón o la orden de vibrar
pub struct WatchUi<D: TextDisplay, H: Haptics> {
    display: D,
    haptics: H,
}

impl<D: TextDisplay, H: Haptics> WatchUi<D, H> {
    pub fn new(mut display: D, haptics: H) -> Self {
        display.set_text(WELCOME_TEXT);
        Self { display, haptics }
    }

    /// Actualiza la etiqueta y devuelve el evento que debe salir hacia el teléfono
    pub fn on_click(&mut self, click: Click) -> OutboundEvent {
        let event = match click {
            Click::Up => OutboundEvent::Button(ButtonCode::Up),
            Click::Select => OutboundEvent::Button(ButtonCode::Select),
            Click::Down => OutboundEvent::Button(ButtonCode::Down),
            Click::LongSelect => OutboundEvent::LongPress(ButtonCode::Select),
        };

        let (_, code) = event.key_value();
        self.display.set_text(code.label());
        event
    }

    pub fn apply(&mut self, command: InboundCommand) {
        match command {
            InboundCommand::Vibrate => {
                self.display.set_text(VIBRATE_TEXT);
                self.haptics.short_pulse();
            }
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn haptics(&self) -> &H {
        &self.haptics
    }
}

/// Pantalla de consola para el daemon
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    text: String,
}

impl ConsoleDisplay {
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl TextDisplay for ConsoleDisplay {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        println!("📟 {}", text);
    }
}

#[derive(Debug, Default)]
pub struct ConsoleHaptics {
    pub pulses: u32,
}

impl Haptics for ConsoleHaptics {
    fn short_pulse(&mut self) {
        self.pulses += 1;
        println!("📳 bzz");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_ui() -> WatchUi<ConsoleDisplay, ConsoleHaptics> {
        WatchUi::new(ConsoleDisplay::default(), ConsoleHaptics::default())
    }

    #[test]
    fn test_starts_with_welcome_text() {
        let ui = new_ui();
        assert_eq!(ui.display().text(), WELCOME_TEXT);
    }

    #[test]
    fn test_clicks_map_to_labels_and_events() {
        let mut ui = new_ui();

        assert_eq!(ui.on_click(Click::Up), OutboundEvent::Button(ButtonCode::Up));
        assert_eq!(ui.display().text(), "Up");

        assert_eq!(
            ui.on_click(Click::Down),
            OutboundEvent::Button(ButtonCode::Down)
        );
        assert_eq!(ui.display().text(), "Down");

        assert_eq!(
            ui.on_click(Click::Select),
            OutboundEvent::Button(ButtonCode::Select)
        );
        assert_eq!(ui.display().text(), "Select");
    }

    #[test]
    fn test_long_select_sends_long_key() {
        let mut ui = new_ui();
        assert_eq!(
            ui.on_click(Click::LongSelect),
            OutboundEvent::LongPress(ButtonCode::Select)
        );
        assert_eq!(ui.display().text(), "Select");
    }

    #[test]
    fn test_vibrate_updates_text_and_pulses() {
        let mut ui = new_ui();
        ui.apply(InboundCommand::Vibrate);
        ui.apply(InboundCommand::Vibrate);
        assert_eq!(ui.display().text(), VIBRATE_TEXT);
        assert_eq!(ui.haptics().pulses, 2);
    }
}
