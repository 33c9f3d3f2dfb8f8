//! Conversions for the integer-encoded volume scale used throughout the
//! schema (§9 design note: "the source uses an integer-encoded dB scale
//! (0-255) centered near 180 = 0 dB. Keep this encoding in the schema;
//! convert to linear gain only at parameter-application time.").
//!
//! `encoded_db_to_linear` maps 180 to 0 dB, 0 to -96 dB (effectively
//! silent) and 255 to +20 dB, piecewise-linear in dB on either side of the
//! center point, then converts that dB value to a linear amplitude
//! multiplier.

const CENTER: f32 = 180.0;
const MIN_DB: f32 = -96.0;
const MAX_DB: f32 = 20.0;

pub fn encoded_db_to_db(encoded: u8) -> f32 {
    let e = encoded as f32;
    if e <= CENTER {
        (e - CENTER) * (-MIN_DB / CENTER)
    } else {
        (e - CENTER) * (MAX_DB / (255.0 - CENTER))
    }
}

pub fn encoded_db_to_linear(encoded: u8) -> f32 {
    db_to_linear(encoded_db_to_db(encoded))
}

pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
