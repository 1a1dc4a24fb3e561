//! Signed bit fields packed into a word, as a C compiler lays out
//! `struct { char green:4, yellow:4, red:4; }`.

/// Extracts a `width`-bit two's-complement field starting at bit `shift`.
pub const fn get_signed(word: u16, shift: u32, width: u32) -> i8 {
    let mask = (1u16 << width) - 1;
    let raw = (word >> shift) & mask;
    let spare = 16 - width;
    (((raw << spare) as i16) >> spare) as i8
}

/// Stores the low `width` bits of `value` at bit `shift`, leaving the other
/// fields untouched.
pub const fn set_signed(word: u16, shift: u32, width: u32, value: i8) -> u16 {
    let mask = ((1u16 << width) - 1) << shift;
    let bits = ((value as u8 as u16) << shift) & mask;
    (word & !mask) | bits
}

macro_rules! signed_fields {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($word:ty) {
            $($get:ident / $set:ident : $shift:expr, $width:expr;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name(pub $word);

        impl $name {
            $(
                pub const fn $get(&self) -> i8 {
                    get_signed(self.0 as u16, $shift, $width)
                }

                pub fn $set(&mut self, value: i8) {
                    self.0 = set_signed(self.0 as u16, $shift, $width, value) as $word;
                }
            )+
        }
    };
}

signed_fields! {
    /// Three signed 4-bit LED levels; `red` spills into the second byte.
    pub struct Leds(u16) {
        green / set_green: 0, 4;
        yellow / set_yellow: 4, 4;
        red / set_red: 8, 4;
    }
}

signed_fields! {
    /// Three signed 2-bit inversion flags in one byte.
    pub struct Invert(u8) {
        green / set_green: 0, 2;
        yellow / set_yellow: 2, 2;
        red / set_red: 4, 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_do_not_overlap() {
        let mut leds = Leds::default();
        leds.set_green(1);
        leds.set_yellow(1);
        leds.set_red(1);
        assert_eq!(leds.0, 0x0111);

        leds.set_green(leds.green() - 1);
        assert_eq!(leds.green(), 0);
        assert_eq!(leds.yellow(), 1);
        assert_eq!(leds.red(), 1);
    }

    #[test]
    fn test_signed_range_wraps() {
        let mut leds = Leds::default();
        leds.set_green(7);
        assert_eq!(leds.green(), 7);
        leds.set_green(8);
        assert_eq!(leds.green(), -8);
        leds.set_yellow(-1);
        assert_eq!(leds.yellow(), -1);
        assert_eq!(leds.green(), -8);
    }

    #[test]
    fn test_two_bit_fields() {
        let mut inv = Invert::default();
        inv.set_green(1);
        inv.set_yellow(1);
        inv.set_red(1);
        assert_eq!(inv.0, 0b01_0101);
        inv.set_green(inv.green() ^ 1);
        assert_eq!(inv.green(), 0);
        inv.set_red(2);
        assert_eq!(inv.red(), -2);
        assert_eq!(inv.yellow(), 1);
    }
}
