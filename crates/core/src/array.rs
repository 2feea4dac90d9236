//! Bounded multi-dimensional arrays.
//!
//! Array variables are global and live for the life of the program. The
//! store is an index-stable slot arena: `define` hands back a slot index
//! that stays valid forever, so no handle is ever invalidated by growth.
//! Elements are stored flattened in row-major order; each axis carries an
//! inclusive (lower, upper) bound pair and subscripts are checked against
//! them before any indexing happens.

use std::rc::Rc;

use crate::error::ArrayError;
use crate::object::LarkString;
use crate::value::Value;

/// Declared dimensionality cap.
pub const MAX_ARRAY_DIMENSIONS: usize = 3;
/// Registration cap for the store.
pub const MAX_ARRAY_VARIABLES: usize = 64;

/// Number of elements along one axis with inclusive bounds.
pub fn extent(low: i32, high: i32) -> usize {
    1 + (high - low).unsigned_abs() as usize
}

/// One declared array variable: its bounds and its flattened elements.
#[derive(Debug)]
pub struct ArrayVariable {
    pub name: Rc<LarkString>,
    /// Inclusive (lower, upper) bound per dimension; at most
    /// [`MAX_ARRAY_DIMENSIONS`] entries.
    pub bounds: Vec<(i32, i32)>,
    values: Vec<Value>,
}

impl ArrayVariable {
    fn new(name: Rc<LarkString>, bounds: Vec<(i32, i32)>) -> Self {
        let element_count: usize = bounds.iter().map(|&(lo, hi)| extent(lo, hi)).product();
        Self {
            name,
            bounds,
            values: vec![Value::Nil; element_count],
        }
    }

    pub fn dimensions(&self) -> usize {
        self.bounds.len()
    }

    pub fn element_count(&self) -> usize {
        self.values.len()
    }

    fn check_subscript_count(&self, got: usize) -> Result<(), ArrayError> {
        if got != self.bounds.len() {
            return Err(ArrayError::DimensionMismatch {
                expected: self.bounds.len(),
                got,
            });
        }
        Ok(())
    }

    /// Resolve one subscript value against its axis.
    fn axis_offset(&self, axis: usize, value: &Value) -> Result<usize, ArrayError> {
        let number = value.as_number().ok_or(ArrayError::SubscriptNotNumber)?;
        let subscript = number as i32;
        let (low, high) = self.bounds[axis];
        if subscript < low || subscript > high {
            return Err(ArrayError::SubscriptOutOfBounds {
                value: subscript,
                low,
                high,
            });
        }
        Ok((subscript - low) as usize)
    }

    /// Row-major flat index for a fully concrete subscript list.
    fn flat_index(&self, subscripts: &[Value]) -> Result<usize, ArrayError> {
        let mut index = 0;
        for (axis, subscript) in subscripts.iter().enumerate() {
            let (lo, hi) = self.bounds[axis];
            index = index * extent(lo, hi) + self.axis_offset(axis, subscript)?;
        }
        Ok(index)
    }

    /// Bounds-checked element read. The wildcard has no meaning here.
    pub fn get(&self, subscripts: &[Value]) -> Result<Value, ArrayError> {
        self.check_subscript_count(subscripts.len())?;
        if subscripts.iter().any(|s| matches!(s, Value::Star)) {
            return Err(ArrayError::WildcardRead);
        }
        Ok(self.values[self.flat_index(subscripts)?].clone())
    }

    /// Bounds-checked element write. A `*` in any subscript position
    /// broadcasts `value` across every element along that axis, holding
    /// the concrete subscripts fixed.
    pub fn set(&mut self, subscripts: &[Value], value: Value) -> Result<(), ArrayError> {
        self.check_subscript_count(subscripts.len())?;

        // Per-axis offset range: wildcard covers the whole axis, a
        // concrete subscript covers exactly one offset.
        let mut ranges: Vec<(usize, usize)> = Vec::with_capacity(subscripts.len());
        for (axis, subscript) in subscripts.iter().enumerate() {
            let (lo, hi) = self.bounds[axis];
            match subscript {
                Value::Star => ranges.push((0, extent(lo, hi))),
                other => {
                    let offset = self.axis_offset(axis, other)?;
                    ranges.push((offset, offset + 1));
                }
            }
        }

        // Odometer walk over the cartesian product of the ranges.
        let mut offsets: Vec<usize> = ranges.iter().map(|&(start, _)| start).collect();
        loop {
            let mut index = 0;
            for (axis, &offset) in offsets.iter().enumerate() {
                let (lo, hi) = self.bounds[axis];
                index = index * extent(lo, hi) + offset;
            }
            self.values[index] = value.clone();

            let mut axis = offsets.len();
            loop {
                if axis == 0 {
                    return Ok(());
                }
                axis -= 1;
                offsets[axis] += 1;
                if offsets[axis] < ranges[axis].1 {
                    break;
                }
                offsets[axis] = ranges[axis].0;
            }
        }
    }
}

/// The process-wide arena of array variables.
#[derive(Debug, Default)]
pub struct ArrayStore {
    arrays: Vec<ArrayVariable>,
}

impl ArrayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new array and return its stable slot index.
    pub fn define(
        &mut self,
        name: Rc<LarkString>,
        bounds: Vec<(i32, i32)>,
    ) -> Result<usize, ArrayError> {
        if self.arrays.len() >= MAX_ARRAY_VARIABLES {
            return Err(ArrayError::TooManyArrays);
        }
        debug_assert!(!bounds.is_empty() && bounds.len() <= MAX_ARRAY_DIMENSIONS);
        self.arrays.push(ArrayVariable::new(name, bounds));
        Ok(self.arrays.len() - 1)
    }

    pub fn get(&self, slot: usize) -> &ArrayVariable {
        &self.arrays[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut ArrayVariable {
        &mut self.arrays[slot]
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Strings;

    fn store_with(bounds: Vec<(i32, i32)>) -> (ArrayStore, usize) {
        let mut strings = Strings::new();
        let mut store = ArrayStore::new();
        let slot = store.define(strings.intern("a"), bounds).expect("define");
        (store, slot)
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn extent_handles_any_bound_order_signs() {
        assert_eq!(extent(1, 3), 3);
        assert_eq!(extent(-5, -3), 3);
        assert_eq!(extent(-3, 2), 6);
        assert_eq!(extent(4, 4), 1);
    }

    #[test]
    fn fresh_array_is_nil_filled() {
        let (store, slot) = store_with(vec![(1, 3)]);
        let array = store.get(slot);
        assert_eq!(array.element_count(), 3);
        assert_eq!(array.get(&[num(2.0)]).unwrap(), Value::Nil);
    }

    #[test]
    fn set_then_get_round_trips_each_slot() {
        let (mut store, slot) = store_with(vec![(3, 5)]);
        let array = store.get_mut(slot);
        for s in 3..=5 {
            array.set(&[num(s as f64)], num(s as f64 * 10.0)).unwrap();
        }
        for s in 3..=5 {
            assert_eq!(array.get(&[num(s as f64)]).unwrap(), num(s as f64 * 10.0));
        }
    }

    #[test]
    fn out_of_bounds_names_value_and_range() {
        let (store, slot) = store_with(vec![(3, 5)]);
        let err = store.get(slot).get(&[num(2.0)]).unwrap_err();
        assert_eq!(
            err,
            ArrayError::SubscriptOutOfBounds {
                value: 2,
                low: 3,
                high: 5
            }
        );
        let err = store.get(slot).get(&[num(6.0)]).unwrap_err();
        assert_eq!(
            err,
            ArrayError::SubscriptOutOfBounds {
                value: 6,
                low: 3,
                high: 5
            }
        );
    }

    #[test]
    fn subscript_count_must_match_dimensions() {
        let (store, slot) = store_with(vec![(1, 2), (1, 2)]);
        let err = store.get(slot).get(&[num(1.0)]).unwrap_err();
        assert_eq!(
            err,
            ArrayError::DimensionMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn non_numeric_subscript_is_rejected() {
        let (store, slot) = store_with(vec![(1, 2)]);
        let err = store.get(slot).get(&[Value::Bool(true)]).unwrap_err();
        assert_eq!(err, ArrayError::SubscriptNotNumber);
    }

    #[test]
    fn wildcard_read_is_rejected() {
        let (store, slot) = store_with(vec![(1, 3)]);
        let err = store.get(slot).get(&[Value::Star]).unwrap_err();
        assert_eq!(err, ArrayError::WildcardRead);
    }

    #[test]
    fn wildcard_fills_whole_vector() {
        let (mut store, slot) = store_with(vec![(1, 3)]);
        let array = store.get_mut(slot);
        array.set(&[Value::Star], num(7.0)).unwrap();
        for s in 1..=3 {
            assert_eq!(array.get(&[num(s as f64)]).unwrap(), num(7.0));
        }
    }

    #[test]
    fn two_dimensional_row_major_independence() {
        let (mut store, slot) = store_with(vec![(1, 2), (1, 3)]);
        let array = store.get_mut(slot);
        array.set(&[num(1.0), num(2.0)], num(12.0)).unwrap();
        array.set(&[num(2.0), num(2.0)], num(22.0)).unwrap();
        assert_eq!(array.get(&[num(1.0), num(2.0)]).unwrap(), num(12.0));
        assert_eq!(array.get(&[num(2.0), num(2.0)]).unwrap(), num(22.0));
        assert_eq!(array.get(&[num(1.0), num(3.0)]).unwrap(), Value::Nil);
    }

    #[test]
    fn wildcard_on_one_axis_holds_the_other_fixed() {
        let (mut store, slot) = store_with(vec![(1, 2), (1, 3)]);
        let array = store.get_mut(slot);
        array.set(&[num(1.0), Value::Star], num(5.0)).unwrap();
        for col in 1..=3 {
            assert_eq!(array.get(&[num(1.0), num(col as f64)]).unwrap(), num(5.0));
            assert_eq!(
                array.get(&[num(2.0), num(col as f64)]).unwrap(),
                Value::Nil
            );
        }
    }

    #[test]
    fn negative_bounds_index_correctly() {
        let (mut store, slot) = store_with(vec![(-3, -1)]);
        let array = store.get_mut(slot);
        array.set(&[num(-2.0)], num(9.0)).unwrap();
        assert_eq!(array.get(&[num(-2.0)]).unwrap(), num(9.0));
        assert_eq!(array.get(&[num(-3.0)]).unwrap(), Value::Nil);
        let err = array.get(&[num(0.0)]).unwrap_err();
        assert_eq!(
            err,
            ArrayError::SubscriptOutOfBounds {
                value: 0,
                low: -3,
                high: -1
            }
        );
    }

    #[test]
    fn store_enforces_registration_cap() {
        let mut strings = Strings::new();
        let mut store = ArrayStore::new();
        for i in 0..MAX_ARRAY_VARIABLES {
            store
                .define(strings.intern(&format!("a{i}")), vec![(1, 1)])
                .expect("under cap");
        }
        let err = store
            .define(strings.intern("overflow"), vec![(1, 1)])
            .unwrap_err();
        assert_eq!(err, ArrayError::TooManyArrays);
    }
}
