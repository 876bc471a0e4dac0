/*!
 # Effect modes for LED strips

 Codes accepted by the effect mode command (0x80-0x9c) and the bounds of
 the white temperature mode.
*/

/// First effect code understood by the strip
pub const EFFECT_FIRST: u8 = 0x80;
/// Last effect code understood by the strip
pub const EFFECT_LAST: u8 = 0x9c;

/// Coldest white in temperature mode
pub const TEMPERATURE_COLD: u8 = 0x80;
/// Warmest white in temperature mode
pub const TEMPERATURE_WARM: u8 = 0x8a;

/// Represents available effect modes for LED strips
#[derive(Debug, Clone, Copy)]
pub struct Effects {
    /// Static red
    pub red: u8,
    /// Static green
    pub green: u8,
    /// Static blue
    pub blue: u8,
    /// Static yellow
    pub yellow: u8,
    /// Static cyan
    pub cyan: u8,
    /// Static magenta
    pub magenta: u8,
    /// Static white
    pub white: u8,
    /// Red, green, blue jump effect
    pub jump_red_green_blue: u8,
    /// All colors jump effect
    pub jump_red_green_blue_yellow_cyan_magenta_white: u8,
    /// Red, green, blue crossfade effect
    pub crossfade_red_green_blue: u8,
    /// All colors crossfade effect
    pub crossfade_red_green_blue_yellow_cyan_magenta_white: u8,
    /// Red crossfade effect
    pub crossfade_red: u8,
    /// Green crossfade effect
    pub crossfade_green: u8,
    /// Blue crossfade effect
    pub crossfade_blue: u8,
    /// Yellow crossfade effect
    pub crossfade_yellow: u8,
    /// Cyan crossfade effect
    pub crossfade_cyan: u8,
    /// Magenta crossfade effect
    pub crossfade_magenta: u8,
    /// White crossfade effect
    pub crossfade_white: u8,
    /// Red and green crossfade effect
    pub crossfade_red_green: u8,
    /// Red and blue crossfade effect
    pub crossfade_red_blue: u8,
    /// Green and blue crossfade effect
    pub crossfade_green_blue: u8,
    /// All colors blink effect
    pub blink_red_green_blue_yellow_cyan_magenta_white: u8,
    /// Red blink effect
    pub blink_red: u8,
    /// Green blink effect
    pub blink_green: u8,
    /// Blue blink effect
    pub blink_blue: u8,
    /// Yellow blink effect
    pub blink_yellow: u8,
    /// Cyan blink effect
    pub blink_cyan: u8,
    /// Magenta blink effect
    pub blink_magenta: u8,
    /// White blink effect
    pub blink_white: u8,
}

/// Predefined effects with their command values
pub const EFFECTS: Effects = Effects {
    red: 0x80,
    green: 0x81,
    blue: 0x82,
    yellow: 0x83,
    cyan: 0x84,
    magenta: 0x85,
    white: 0x86,
    jump_red_green_blue: 0x87,
    jump_red_green_blue_yellow_cyan_magenta_white: 0x88,
    crossfade_red_green_blue: 0x89,
    crossfade_red_green_blue_yellow_cyan_magenta_white: 0x8a,
    crossfade_red: 0x8b,
    crossfade_green: 0x8c,
    crossfade_blue: 0x8d,
    crossfade_yellow: 0x8e,
    crossfade_cyan: 0x8f,
    crossfade_magenta: 0x90,
    crossfade_white: 0x91,
    crossfade_red_green: 0x92,
    crossfade_red_blue: 0x93,
    crossfade_green_blue: 0x94,
    blink_red_green_blue_yellow_cyan_magenta_white: 0x95,
    blink_red: 0x96,
    blink_green: 0x97,
    blink_blue: 0x98,
    blink_yellow: 0x99,
    blink_cyan: 0x9a,
    blink_magenta: 0x9b,
    blink_white: 0x9c,
};

/// Whether `code` is an effect the strip knows
pub fn is_known_effect(code: u8) -> bool {
    (EFFECT_FIRST..=EFFECT_LAST).contains(&code)
}

/// Whether `value` is inside the temperature mode range
pub fn is_known_temperature(value: u8) -> bool {
    (TEMPERATURE_COLD..=TEMPERATURE_WARM).contains(&value)
}
