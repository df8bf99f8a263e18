use super::types::{Point, Primitive};

/// Point/primitive distance strategy used by adoption.
pub trait PointPrimitiveDistance {
    fn eval(&self, point: &Point, prim: &Primitive) -> f64;
}

/// Orthogonal distance from the point position to the line or plane.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrthogonalDistance;

impl PointPrimitiveDistance for OrthogonalDistance {
    #[inline]
    fn eval(&self, point: &Point, prim: &Primitive) -> f64 {
        prim.distance_to(&point.pos)
    }
}
