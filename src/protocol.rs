//! Protocolo de eventos reloj ↔ teléfono
//!
//! Cada mensaje es un diccionario de pares clave/valor con el formato binario
//! de los mensajes de aplicación del reloj (little endian):
//!
//! ```text
//! u8 count
//! repetido `count` veces:
//!   u32 key | u8 type | u16 length | length bytes de valor
//! ```
//!
//! Tipos: 0 = bytes, 1 = cadena C, 2 = entero sin signo, 3 = entero con signo.
//! Los enteros ocupan 1, 2 o 4 bytes.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Frame truncated: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("Unknown tuple type: {0}")]
    UnknownType(u8),

    #[error("Invalid integer width: {0}")]
    InvalidIntWidth(u16),

    #[error("Trailing bytes after {count} tuples: {extra}")]
    TrailingBytes { count: u8, extra: usize },

    #[error("C string is not valid UTF-8 or lacks terminator")]
    InvalidCString,

    #[error("Too many tuples: {0}")]
    TooManyTuples(usize),

    #[error("Value too long: {0} bytes")]
    ValueTooLong(usize),
}

/// Claves de mensaje compartidas con la app del teléfono
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageKey {
    Button = 0,
    Vibrate = 1,
    Long = 2,
}

impl MessageKey {
    pub fn from_raw(key: u32) -> Option<Self> {
        match key {
            0 => Some(Self::Button),
            1 => Some(Self::Vibrate),
            2 => Some(Self::Long),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ButtonCode {
    Up = 0,
    Select = 1,
    Down = 2,
}

impl ButtonCode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Select => "Select",
            Self::Down => "Down",
        }
    }
}

/// Eventos que el reloj envía al teléfono
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Caída detectada; viaja con la misma codificación que el botón arriba
    Anomaly,
    Button(ButtonCode),
    LongPress(ButtonCode),
}

impl OutboundEvent {
    pub fn key_value(&self) -> (MessageKey, ButtonCode) {
        match *self {
            Self::Anomaly => (MessageKey::Button, ButtonCode::Up),
            Self::Button(code) => (MessageKey::Button, code),
            Self::LongPress(code) => (MessageKey::Long, code),
        }
    }

    pub fn to_dictionary(&self) -> Dictionary {
        let (key, code) = self.key_value();
        Dictionary::single(key as u32, TupleValue::Int(code as i32))
    }

    pub fn encode_frame(&self) -> Result<Vec<u8>, ProtocolError> {
        self.to_dictionary().encode()
    }
}

const TYPE_BYTES: u8 = 0;
const TYPE_CSTRING: u8 = 1;
const TYPE_UINT: u8 = 2;
const TYPE_INT: u8 = 3;

const TUPLE_HEADER_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleValue {
    Bytes(Vec<u8>),
    CString(String),
    Uint(u32),
    Int(i32),
}

impl TupleValue {
    /// Valor entero, sin importar el signo con que viaje
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Uint(v) => Some(*v as i64),
            Self::Int(v) => Some(*v as i64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub key: u32,
    pub value: TupleValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    pub tuples: Vec<Tuple>,
}

impl Dictionary {
    pub fn single(key: u32, value: TupleValue) -> Self {
        Self {
            tuples: vec![Tuple { key, value }],
        }
    }

    pub fn get(&self, key: u32) -> Option<&TupleValue> {
        self.tuples.iter().find(|t| t.key == key).map(|t| &t.value)
    }

    pub fn get_int(&self, key: MessageKey) -> Option<i64> {
        self.get(key as u32).and_then(TupleValue::as_int)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let count = u8::try_from(self.tuples.len())
            .map_err(|_| ProtocolError::TooManyTuples(self.tuples.len()))?;

        let mut out = vec![count];
        for tuple in &self.tuples {
            let (ty, payload) = match &tuple.value {
                TupleValue::Bytes(b) => (TYPE_BYTES, b.clone()),
                TupleValue::CString(s) => {
                    let mut b = s.as_bytes().to_vec();
                    b.push(0);
                    (TYPE_CSTRING, b)
                }
                TupleValue::Uint(v) => (TYPE_UINT, v.to_le_bytes().to_vec()),
                TupleValue::Int(v) => (TYPE_INT, v.to_le_bytes().to_vec()),
            };
            let len = u16::try_from(payload.len())
                .map_err(|_| ProtocolError::ValueTooLong(payload.len()))?;

            out.extend_from_slice(&tuple.key.to_le_bytes());
            out.push(ty);
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&payload);
        }
        Ok(out)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let count = *frame.first().ok_or(ProtocolError::Truncated {
            offset: 0,
            needed: 1,
        })?;

        let mut tuples = Vec::with_capacity(count as usize);
        let mut offset = 1;

        for _ in 0..count {
            let header = take(frame, offset, TUPLE_HEADER_LEN)?;
            let key = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let ty = header[4];
            let len = u16::from_le_bytes([header[5], header[6]]);
            offset += TUPLE_HEADER_LEN;

            let raw = take(frame, offset, len as usize)?;
            offset += len as usize;

            let value = match ty {
                TYPE_BYTES => TupleValue::Bytes(raw.to_vec()),
                TYPE_CSTRING => TupleValue::CString(decode_cstring(raw)?),
                TYPE_UINT => TupleValue::Uint(match raw {
                    [a] => *a as u32,
                    [a, b] => u16::from_le_bytes([*a, *b]) as u32,
                    [a, b, c, d] => u32::from_le_bytes([*a, *b, *c, *d]),
                    _ => return Err(ProtocolError::InvalidIntWidth(len)),
                }),
                TYPE_INT => TupleValue::Int(match raw {
                    [a] => *a as i8 as i32,
                    [a, b] => i16::from_le_bytes([*a, *b]) as i32,
                    [a, b, c, d] => i32::from_le_bytes([*a, *b, *c, *d]),
                    _ => return Err(ProtocolError::InvalidIntWidth(len)),
                }),
                other => return Err(ProtocolError::UnknownType(other)),
            };

            tuples.push(Tuple { key, value });
        }

        if offset != frame.len() {
            return Err(ProtocolError::TrailingBytes {
                count,
                extra: frame.len() - offset,
            });
        }

        Ok(Self { tuples })
    }
}

fn take(frame: &[u8], offset: usize, needed: usize) -> Result<&[u8], ProtocolError> {
    frame
        .get(offset..offset + needed)
        .ok_or(ProtocolError::Truncated { offset, needed })
}

fn decode_cstring(raw: &[u8]) -> Result<String, ProtocolError> {
    match raw.split_last() {
        Some((&0, text)) => {
            String::from_utf8(text.to_vec()).map_err(|_| ProtocolError::InvalidCString)
        }
        _ => Err(ProtocolError::InvalidCString),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_reuses_button_up() {
        assert_eq!(
            OutboundEvent::Anomaly.key_value(),
            OutboundEvent::Button(ButtonCode::Up).key_value()
        );
        assert_eq!(
            OutboundEvent::Anomaly.encode_frame(),
            OutboundEvent::Button(ButtonCode::Up).encode_frame()
        );
    }

    #[test]
    fn test_long_press_uses_long_key() {
        let dict = OutboundEvent::LongPress(ButtonCode::Select).to_dictionary();
        assert_eq!(dict.get_int(MessageKey::Long), Some(1));
        assert_eq!(dict.get_int(MessageKey::Button), None);
    }

    #[test]
    fn test_outbound_frame_layout() {
        let frame = OutboundEvent::Button(ButtonCode::Down).encode_frame().unwrap();
        assert_eq!(
            frame,
            vec![
                1, // count
                0, 0, 0, 0, // key BUTTON
                3, // int
                4, 0, // length
                2, 0, 0, 0, // DOWN
            ]
        );
    }

    #[test]
    fn test_decode_narrow_integers() {
        let frame = [
            2, //
            1, 0, 0, 0, 3, 1, 0, 0xFF, // VIBRATE = -1 (i8)
            7, 0, 0, 0, 2, 2, 0, 0x34, 0x12, // 7 = 0x1234 (u16)
        ];
        let dict = Dictionary::decode(&frame).unwrap();
        assert_eq!(dict.get_int(MessageKey::Vibrate), Some(-1));
        assert_eq!(dict.get(7), Some(&TupleValue::Uint(0x1234)));
    }

    #[test]
    fn test_decode_cstring_and_bytes() {
        let dict = Dictionary {
            tuples: vec![
                Tuple {
                    key: 10,
                    value: TupleValue::CString("hola".to_string()),
                },
                Tuple {
                    key: 11,
                    value: TupleValue::Bytes(vec![9, 8, 7]),
                },
            ],
        };
        let frame = dict.encode().unwrap();
        assert_eq!(Dictionary::decode(&frame).unwrap(), dict);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Dictionary::decode(&[]),
            Err(ProtocolError::Truncated {
                offset: 0,
                needed: 1
            })
        );
        assert_eq!(
            Dictionary::decode(&[1, 0, 0]),
            Err(ProtocolError::Truncated {
                offset: 1,
                needed: 7
            })
        );
        assert_eq!(
            Dictionary::decode(&[1, 1, 0, 0, 0, 9, 0, 0]),
            Err(ProtocolError::UnknownType(9))
        );
        assert_eq!(
            Dictionary::decode(&[1, 1, 0, 0, 0, 3, 3, 0, 1, 2, 3]),
            Err(ProtocolError::InvalidIntWidth(3))
        );
        assert_eq!(
            Dictionary::decode(&[1, 1, 0, 0, 0, 1, 2, 0, b'a', b'b']),
            Err(ProtocolError::InvalidCString)
        );
        assert_eq!(
            Dictionary::decode(&[0, 42]),
            Err(ProtocolError::TrailingBytes { count: 0, extra: 1 })
        );
    }
}
