/// Incremental Modbus CRC-16 (reflected, polynomial 0xA001, initial value 0xFFFF).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crc16 {
    value: u16,
}

const INITIAL_VALUE: u16 = 0xFFFF;
const POLYNOMIAL: u16 = 0xA001;

impl Crc16 {
    pub fn new() -> Self {
        Crc16 {
            value: INITIAL_VALUE,
        }
    }

    pub fn reset(&mut self) -> &mut Self {
        self.value = INITIAL_VALUE;
        self
    }

    pub fn push(&mut self, bytes: &[u8]) -> &mut Self {
        for byte in bytes {
            self.value ^= u16::from(*byte);
            for _ in 0..8 {
                if (self.value & 0x0001) != 0 {
                    self.value = (self.value >> 1) ^ POLYNOMIAL;
                } else {
                    self.value >>= 1;
                }
            }
        }
        self
    }

    /// Current checksum. On the wire the low byte goes first.
    pub fn value(&self) -> u16 {
        self.value
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Crc16::new()
    }
}

pub fn crc16(data: &[u8]) -> u16 {
    Crc16::new().push(data).value()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_known_answers() {
        assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);
        assert_eq!(crc16(&[0x01, 0x03, 0x08, 0x2B, 0x00, 0x02]), 0x63B6);
        assert_eq!(crc16(&[0x01, 0x03, 0x04, 0x00, 0x20, 0x00, 0x00]), 0xF9FB);
        assert_eq!(crc16(&[0x11, 0x05, 0x00, 0x10, 0xFF, 0x00]), 0x6F8F);
    }

    #[test]
    fn test_empty_input_keeps_initial_value() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let frame = [0x01, 0x03, 0x04, 0x89, 0x02, 0x42, 0xC7];

        let mut crc = Crc16::new();
        for byte in frame {
            crc.push(&[byte]);
        }
        assert_eq!(crc.value(), crc16(&frame));
        assert_eq!(crc.value(), 0x9D00);
    }

    #[test]
    fn test_reset() {
        let mut crc = Crc16::new();
        crc.push(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_ne!(crc.value(), 0xFFFF);

        let value = crc.reset().push(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]).value();
        assert_eq!(value, 0x0A84);
    }
}
