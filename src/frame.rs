/*!
 # Command frames

 Every command understood by the strip is a fixed nine byte frame that starts
 with `7e 00` and ends with `ef`. Frames are assembled as hex text and then
 packed into bytes with [`hex_string_to_bytes`].
*/

use std::fmt;

/// Header shared by every frame
pub const FRAME_HEADER: &str = "7e00";
/// Trailer shared by every frame
pub const FRAME_TRAILER: &str = "ef";

/// Converts a hex string into raw bytes, two characters at a time.
///
/// Input is not validated. Each pair is read the way C's `strtol(pair, 16)`
/// reads it: leading whitespace is skipped, a sign is accepted, the longest
/// run of hex digits is used and a pair without digits yields `0`. The value
/// is truncated to a byte. A trailing single character is parsed on its own.
///
/// ```
/// use elk_bledom::hex_string_to_bytes;
///
/// assert_eq!(hex_string_to_bytes("7e00"), vec![0x7e, 0x00]);
/// assert_eq!(hex_string_to_bytes("7e0"), vec![0x7e, 0x00]);
/// ```
pub fn hex_string_to_bytes(hex_string: &str) -> Vec<u8> {
    hex_string.as_bytes().chunks(2).map(parse_pair).collect()
}

fn parse_pair(pair: &[u8]) -> u8 {
    let mut digits = pair.iter().skip_while(|c| is_c_space(**c)).peekable();

    let negative = match digits.peek() {
        Some(b'-') => {
            digits.next();
            true
        }
        Some(b'+') => {
            digits.next();
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for c in digits {
        match (*c as char).to_digit(16) {
            Some(d) => value = value * 16 + i64::from(d),
            None => break,
        }
    }

    if negative {
        value = -value;
    }
    value as u8
}

/// Same set as C's `isspace`, which unlike `is_ascii_whitespace` includes `\v`
fn is_c_space(c: u8) -> bool {
    c.is_ascii_whitespace() || c == 0x0b
}

/// An encoded command, ready to be written to the strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame(Vec<u8>);

impl CommandFrame {
    /// Packs arbitrary hex text into a frame without validation
    pub fn from_hex(command: &str) -> Self {
        Self(hex_string_to_bytes(command))
    }

    /// Power on (`true`) or off (`false`)
    pub fn power(is_on: bool) -> Self {
        let state = if is_on { "01" } else { "00" };
        Self::from_hex(&format!("{FRAME_HEADER}04{state}00000000{FRAME_TRAILER}"))
    }

    /// Brightness, 0-100 (0x00-0x64)
    pub fn brightness(brightness: u8) -> Self {
        Self::from_hex(&format!(
            "{FRAME_HEADER}01{brightness:02x}00000000{FRAME_TRAILER}"
        ))
    }

    /// Effect speed, 0-100 (0x00-0x64)
    pub fn effect_speed(speed: u8) -> Self {
        Self::from_hex(&format!("{FRAME_HEADER}02{speed:02x}00000000{FRAME_TRAILER}"))
    }

    /// White temperature mode, 0x80 (cold) to 0x8a (warm)
    pub fn mode_temperature(temperature: u8) -> Self {
        Self::from_hex(&format!(
            "{FRAME_HEADER}03{temperature:02x}02000000{FRAME_TRAILER}"
        ))
    }

    /// Effect mode, 0x80-0x9c (see [`crate::EFFECTS`])
    pub fn mode_effect(effect: u8) -> Self {
        Self::from_hex(&format!("{FRAME_HEADER}03{effect:02x}03000000{FRAME_TRAILER}"))
    }

    /// Static color in RGB mode
    pub fn rgb_color(red: u8, green: u8, blue: u8) -> Self {
        Self::from_hex(&format!(
            "{FRAME_HEADER}0503{red:02x}{green:02x}{blue:02x}00{FRAME_TRAILER}"
        ))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
