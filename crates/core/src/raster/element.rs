//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types a raster cell can hold.
///
/// Elevation, slope and drainage-area surfaces are `f64`; D8 direction
/// codes are `u8`.
pub trait RasterElement:
    Copy + Debug + PartialOrd + NumCast + Zero + Send + Sync + 'static
{
    /// No-data written when a raster declares none
    fn default_nodata() -> Self;

    /// NaN always counts as no-data for floats
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    fn is_float() -> bool;

    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! raster_element {
    (int: $($t:ty),+) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }

            fn is_float() -> bool {
                false
            }
        }
    )+};
    (float: $($t:ty),+) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || nodata.is_some_and(|nd| (self - nd).abs() < <$t>::EPSILON * 100.0)
            }

            fn is_float() -> bool {
                true
            }
        }
    )+};
}

raster_element!(int: i16, i32, u8, u16, u32);
raster_element!(float: f32, f64);
