use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Map a value from one range to another. If the input range is degenerate, returns `y0`.
pub fn map_range(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    let denom = x1 - x0;
    if denom.abs() < f32::EPSILON {
        return y0;
    }
    (x - x0) * (y1 - y0) / denom + y0
}

/// `x * |x|`: a bipolar curve with finer control near zero.
pub fn quadratic_bipolar(x: f32) -> f32 {
    let x2 = x * x;
    if x >= 0.0 { x2 } else { -x2 }
}

/// Clamp that maps NaN to the lower bound.
#[inline(always)]
pub fn clamp_finite(x: f32, lo: f32, hi: f32) -> f32 {
    x.max(lo).min(hi)
}

/// Fast `2^x` for `x >= 0`.
///
/// The integer part is an exact power of two; the fractional part is a
/// fifth-order polynomial fitted on `[0, 1)` (at most 0.00024% error).
/// Negative powers are handled by callers offsetting and rescaling:
/// `approx_exp2_taylor5(x + 30.0) / 2^30`.
#[inline(always)]
pub fn approx_exp2_taylor5(x: f32) -> f32 {
    let x = x.max(0.0);
    let xi = x as i32;
    let xf = x - xi as f32;
    let yi = 2.0f32.powi(xi);
    let yf = 1.0
        + xf * (0.693_151_7
            + xf * (0.240_159_5 + xf * (0.055_817_4 + xf * (0.008_989_34 + xf * 0.001_877_576_7))));
    yi * yf
}

const EXP2_OFFSET: f32 = 30.0;
const EXP2_OFFSET_SCALE: f32 = 1_073_741_824.0; // 2^30

/// How pitch voltages are exponentiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PitchApprox {
    /// Polynomial approximation, trades a little accuracy for speed
    #[default]
    Taylor5,
    /// `f32::exp2`
    Exact,
}

impl PitchApprox {
    #[inline(always)]
    pub fn exp2(self, x: f32) -> f32 {
        match self {
            PitchApprox::Taylor5 => approx_exp2_taylor5(x + EXP2_OFFSET) / EXP2_OFFSET_SCALE,
            PitchApprox::Exact => x.exp2(),
        }
    }
}
