// pf-core/src/units.rs

use uom::si::f64::{Angle as UomAngle, Time as UomTime};

// Public canonical unit types (SI, f64)
pub type Angle = UomAngle;
pub type Time = UomTime;

#[inline]
pub fn deg(v: f64) -> Angle {
    use uom::si::angle::degree;
    Angle::new::<degree>(v)
}

#[inline]
pub fn rad(v: f64) -> Angle {
    use uom::si::angle::radian;
    Angle::new::<radian>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

/// Angle expressed in degrees, the unit every polar table is keyed on.
#[inline]
pub fn as_deg(a: Angle) -> f64 {
    use uom::si::angle::degree;
    a.get::<degree>()
}

#[inline]
pub fn as_s(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}
