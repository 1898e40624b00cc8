//! Detector de caídas para reloj inteligente
//!
//! Una ventana circular de magnitudes del acelerómetro dispara una alerta
//! cuando el rango min/max supera un umbral calibrado. Las alertas y los
//! botones viajan al teléfono como diccionarios clave/valor; el teléfono
//! puede pedir al reloj que vibre.

pub mod companion;
pub mod config;
pub mod gateway;
pub mod motion_window;
pub mod protocol;
pub mod sample_ingest;
pub mod sensor;
pub mod trace_loader;
pub mod types;
pub mod ui;
