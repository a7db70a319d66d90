// Scene units: one internal unit is 1e6 km.

pub const KM_TO_M: f64 = 1000.0;
pub const M_TO_U: f64 = 1e-9;
pub const KM_TO_U: f64 = KM_TO_M * M_TO_U;
pub const U_TO_KM: f64 = 1.0 / KM_TO_U;
pub const AU_TO_KM: f64 = 149_597_870.7;

pub const D_TO_S: f64 = 86_400.0;
pub const MS_TO_H: f64 = 1.0 / 3_600_000.0;
pub const S_TO_H: f64 = 1.0 / 3_600.0;
pub const H_TO_MS: f64 = 3_600_000.0;
// Julian year.
pub const Y_TO_S: f64 = 365.25 * D_TO_S;
pub const MS_TO_Y: f64 = 1.0 / (Y_TO_S * 1000.0);

pub const J2000_JD: f64 = 2_451_545.0;
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// 2000-01-01T12:00:00Z in unix milliseconds.
pub const J2000_MS: i64 = 946_728_000_000;
pub const D_TO_MS: f64 = D_TO_S * 1000.0;

// https://en.wikipedia.org/wiki/Standard_gravitational_parameter
// in m^3 s^-2
pub const MU_SUN: f64 = 1.32712440041e20;
