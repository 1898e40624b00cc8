use crate::config::{ConfigError, CursorWrap, DetectorConfig, ScanMode};

/// Buffer circular de magnitudes con detección de rango min/max
///
/// Todas las ranuras existen desde el arranque y empiezan a cero, de modo que
/// durante las primeras muestras el detector puede perder una caída pero nunca
/// inventarla. Por defecto el cursor recorre la capacidad completa y el
/// escaneo sólo mira `scan_width` ranuras; con `CursorWrap::ScanWidth` el
/// cursor da la vuelta en `scan_width`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionWindow {
    buffer: Box<[u32]>,
    pos: usize,
    scan_width: usize,
    threshold: u32,
    scan_mode: ScanMode,
    cursor_wrap: CursorWrap,
}

impl MotionWindow {
    /// Crea una ventana con escaneo de prefijo físico
    pub fn new(capacity: usize, scan_width: usize, threshold: u32) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if scan_width == 0 || scan_width > capacity {
            return Err(ConfigError::InvalidScanWidth {
                scan_width,
                capacity,
            });
        }

        Ok(Self {
            buffer: vec![0; capacity].into_boxed_slice(),
            pos: 0,
            scan_width,
            threshold,
            scan_mode: ScanMode::FixedPrefix,
            cursor_wrap: CursorWrap::Capacity,
        })
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.window_capacity, config.scan_width, config.threshold)?
            .with_scan_mode(config.scan_mode)
            .with_cursor_wrap(config.cursor_wrap))
    }

    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }

    pub fn with_cursor_wrap(mut self, cursor_wrap: CursorWrap) -> Self {
        self.cursor_wrap = cursor_wrap;
        self.pos %= self.ring_len();
        self
    }

    /// Registra una magnitud y devuelve true si el rango escaneado supera el umbral
    pub fn push(&mut self, sample: u32) -> bool {
        self.buffer[self.pos] = sample;
        self.pos = (self.pos + 1) % self.ring_len();

        let (minimum, maximum) = self.scan_range();
        maximum - minimum > self.threshold
    }

    /// Mínimo y máximo de las ranuras escaneadas
    ///
    /// En modo `CursorRelative` la última escritura es la ranura anterior al cursor.
    pub fn scan_range(&self) -> (u32, u32) {
        match self.scan_mode {
            ScanMode::FixedPrefix => min_max(self.buffer[..self.scan_width].iter().copied()),
            ScanMode::CursorRelative => {
                let len = self.ring_len();
                min_max((1..=self.scan_width).map(|back| {
                    self.buffer[(self.pos + len - back) % len]
                }))
            }
        }
    }

    /// Posición donde se escribirá la próxima muestra
    pub fn cursor(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn scan_width(&self) -> usize {
        self.scan_width
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }

    pub fn cursor_wrap(&self) -> CursorWrap {
        self.cursor_wrap
    }

    /// Ranuras que recorre el cursor
    fn ring_len(&self) -> usize {
        match self.cursor_wrap {
            CursorWrap::Capacity => self.buffer.len(),
            CursorWrap::ScanWidth => self.scan_width,
        }
    }

    /// Contenido físico del anillo, sin reordenar
    pub fn slots(&self) -> &[u32] {
        &self.buffer
    }
}

fn min_max(mut values: impl Iterator<Item = u32>) -> (u32, u32) {
    let first = values.next().unwrap_or(0);
    values.fold((first, first), |(minimum, maximum), v| {
        (minimum.min(v), maximum.max(v))
    })
}
