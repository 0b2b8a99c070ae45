//! Rectangle helper over a 4-element PDF array (spec.md §4.3).

use crate::error::{Error, Result};
use crate::object::Object;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Rectangle {
    /// Normalizes an arbitrary pair of corners so that `left <= right` and
    /// `bottom <= top`, as spec.md requires.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Rectangle {
            left: x0.min(x1),
            right: x0.max(x1),
            bottom: y0.min(y1),
            top: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn to_array(self) -> Object {
        Object::Array(vec![
            Object::Real(self.left),
            Object::Real(self.bottom),
            Object::Real(self.right),
            Object::Real(self.top),
        ])
    }

    pub fn from_object(value: &Object) -> Result<Self> {
        let arr = value.as_array()?;
        if arr.len() != 4 {
            return Err(Error::InvalidObject(format!(
                "rectangle array must have 4 elements, found {}",
                arr.len()
            )));
        }
        let n: Result<Vec<f64>> = arr.iter().map(Object::as_f64).collect();
        let n = n?;
        Ok(Rectangle::new(n[0], n[1], n[2], n[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_reversed_corners() {
        let rect = Rectangle::new(10.0, 20.0, 0.0, 0.0);
        assert_eq!(rect, Rectangle { left: 0.0, bottom: 0.0, right: 10.0, top: 20.0 });
    }

    #[test]
    fn round_trips_through_array() {
        let rect = Rectangle::new(0.0, 0.0, 595.0, 842.0);
        let parsed = Rectangle::from_object(&rect.to_array()).unwrap();
        assert_eq!(rect, parsed);
    }
}
