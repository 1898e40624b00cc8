/// Lectura de un acelerómetro de 3 ejes en unidades nativas del sensor (mili-g)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccelSample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl AccelSample {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Magnitud al cuadrado x² + y² + z², saturada a u32::MAX
    ///
    /// Los cuadrados se acumulan en 64 bits para que lecturas fuera de rango
    /// nunca den la vuelta: el peor caso se queda en el máximo representable.
    pub fn magnitude(&self) -> u32 {
        let sq = |v: i32| (v as i64) * (v as i64);
        let total = sq(self.x) as u64 + sq(self.y) as u64 + sq(self.z) as u64;
        total.min(u32::MAX as u64) as u32
    }
}

/// Constantes del sistema
pub const WINDOW_CAPACITY: usize = 8;
pub const SCAN_WIDTH: usize = 2;
pub const ANOMALY_THRESHOLD: u32 = 10_000_000; // unidades de aceleración al cuadrado
pub const SAMPLING_RATE: f32 = 100.0; // Hz, la frecuencia más alta del acelerómetro
pub const GRAVITY_MG: i32 = 1000;
pub const HELP_DELAY_SECS: u64 = 5;
