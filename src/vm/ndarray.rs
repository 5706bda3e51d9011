//! N-dimensional arrays for the built-in runtime
//!
//! An `NdArray` is a strided view over shared element storage. Basic
//! indexing (integers and slices) produces views that alias the same storage;
//! advanced indexing (integer arrays, boolean masks) gathers a copy, following
//! the usual placement rule: when the advanced axes are adjacent the result
//! dimension replaces them in place, otherwise it moves to the front.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::runtime::{DType, Exception, ForeignResult, SliceBounds};

/// One array element, tagged with its type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    pub fn dtype(self) -> DType {
        match self {
            Scalar::Bool(_) => DType::Bool,
            Scalar::Int(_) => DType::Int64,
            Scalar::Float(_) => DType::Float64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Bool(b) => b as i64 as f64,
            Scalar::Int(i) => i as f64,
            Scalar::Float(f) => f,
        }
    }

    /// Integer value, truncating floats toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Bool(b) => b as i64,
            Scalar::Int(i) => i,
            Scalar::Float(f) => f as i64,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Float(f) => f != 0.0,
        }
    }

    pub fn cast(self, dtype: DType) -> Scalar {
        match dtype {
            DType::Bool => Scalar::Bool(self.as_bool()),
            DType::Int64 => Scalar::Int(self.as_i64()),
            DType::Float64 => Scalar::Float(self.as_f64()),
        }
    }
}

/// Smallest dtype able to hold every value.
pub fn promote(values: impl IntoIterator<Item = DType>) -> DType {
    values.into_iter().fold(DType::Bool, |acc, d| match (acc, d) {
        (DType::Float64, _) | (_, DType::Float64) => DType::Float64,
        (DType::Int64, _) | (_, DType::Int64) => DType::Int64,
        _ => DType::Bool,
    })
}

#[derive(Debug)]
pub enum Storage {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl Storage {
    fn with_len(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::Bool => Storage::Bool(vec![false; len]),
            DType::Int64 => Storage::Int(vec![0; len]),
            DType::Float64 => Storage::Float(vec![0.0; len]),
        }
    }

    fn get(&self, i: usize) -> Scalar {
        match self {
            Storage::Bool(v) => Scalar::Bool(v[i]),
            Storage::Int(v) => Scalar::Int(v[i]),
            Storage::Float(v) => Scalar::Float(v[i]),
        }
    }

    fn set(&mut self, i: usize, value: Scalar) {
        match self {
            Storage::Bool(v) => v[i] = value.as_bool(),
            Storage::Int(v) => v[i] = value.as_i64(),
            Storage::Float(v) => v[i] = value.as_f64(),
        }
    }

    fn base_addr(&self) -> usize {
        match self {
            Storage::Bool(v) => v.as_ptr() as usize,
            Storage::Int(v) => v.as_ptr() as usize,
            Storage::Float(v) => v.as_ptr() as usize,
        }
    }
}

/// Per-axis index after argument conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    Int(i64),
    Slice(SliceBounds),
    /// Integer index array of any shape, flattened in logical order.
    Fancy { indices: Vec<i64>, shape: Vec<usize> },
    Mask(Vec<bool>),
}

impl Selector {
    /// One-dimensional integer index array.
    pub fn fancy(indices: Vec<i64>) -> Self {
        let shape = vec![indices.len()];
        Selector::Fancy { indices, shape }
    }
}

/// Where an index expression lands.
pub enum Located {
    /// Basic indexing: a view sharing storage.
    View(NdArray),
    /// Advanced indexing: explicit storage offsets in result order.
    Gather { shape: Vec<usize>, offsets: Vec<usize> },
}

#[derive(Clone, Debug)]
pub struct NdArray {
    data: Arc<RwLock<Storage>>,
    dtype: DType,
    shape: Vec<usize>,
    /// Strides in elements; negative for reversed views.
    strides: Vec<isize>,
    offset: usize,
}

pub fn format_shape(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({single},)"),
        _ => {
            let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
            format!("({})", dims.join(", "))
        }
    }
}

/// Element count of `shape`, rejecting shapes whose byte size cannot be
/// addressed.
pub fn checked_size(shape: &[usize]) -> ForeignResult<usize> {
    const MAX_ELEMENTS: usize = isize::MAX as usize / std::mem::size_of::<f64>();
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .filter(|&size| size <= MAX_ELEMENTS)
        .ok_or_else(|| {
            Exception::value_error(format!(
                "array is too big; shape {} exceeds the maximum possible size",
                format_shape(shape)
            ))
        })
}

/// Empty buffer with room for `count` values, or `MemoryError`.
pub fn reserve_values(count: usize) -> ForeignResult<Vec<Scalar>> {
    let mut values = Vec::new();
    values.try_reserve_exact(count).map_err(|_| {
        Exception::new(
            crate::runtime::ExceptionKind::MemoryError,
            format!("unable to allocate an array with {count} elements"),
        )
    })?;
    Ok(values)
}

fn contiguous_strides(shape: &[usize]) -> Vec<isize> {
    let mut strides = vec![0isize; shape.len()];
    let mut acc = 1isize;
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc *= dim.max(1) as isize;
    }
    strides
}

/// Visit every multi-index of `shape` in row-major order.
fn for_each_index(shape: &[usize], mut f: impl FnMut(&[usize])) {
    if shape.contains(&0) {
        return;
    }
    let mut index = vec![0usize; shape.len()];
    loop {
        f(&index);
        let mut axis = shape.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
}

/// Normalize a possibly negative index against an axis length.
pub fn normalize_index(index: i64, len: usize, axis: usize) -> ForeignResult<usize> {
    let len_i = len as i64;
    let resolved = if index < 0 { index + len_i } else { index };
    if resolved < 0 || resolved >= len_i {
        return Err(Exception::index_error(format!(
            "index {index} is out of bounds for axis {axis} with size {len}"
        )));
    }
    Ok(resolved as usize)
}

/// Resolve slice bounds against a length, returning `(start, count, step)`.
pub fn resolve_slice(bounds: SliceBounds, len: usize) -> ForeignResult<(i64, usize, i64)> {
    let step = bounds.step.unwrap_or(1);
    if step == 0 {
        return Err(Exception::value_error("slice step cannot be zero"));
    }
    let len = len as i64;
    let clamp = |value: i64, lower: i64, upper: i64| {
        let value = if value < 0 { value + len } else { value };
        value.clamp(lower, upper)
    };
    let (start, stop) = if step > 0 {
        (
            bounds.start.map_or(0, |s| clamp(s, 0, len)),
            bounds.stop.map_or(len, |s| clamp(s, 0, len)),
        )
    } else {
        (
            bounds.start.map_or(len - 1, |s| clamp(s, -1, len - 1)),
            bounds.stop.map_or(-1, |s| clamp(s, -1, len - 1)),
        )
    };
    // Bounds are clamped to [-1, len], so the differences cannot overflow.
    let count = if step > 0 && stop > start {
        (stop - start - 1) as u64 / step.unsigned_abs() + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) as u64 / step.unsigned_abs() + 1
    } else {
        0
    };
    // A step never taken does not scale the stride.
    let step = if count > 1 { step } else { step.signum() };
    Ok((start, count as usize, step))
}

/// Common shape of two operands under broadcasting.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> ForeignResult<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut shape = vec![0; ndim];
    for i in 0..ndim {
        let da = if i < ndim - a.len() { 1 } else { a[i - (ndim - a.len())] };
        let db = if i < ndim - b.len() { 1 } else { b[i - (ndim - b.len())] };
        shape[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(Exception::value_error(format!(
                    "operands could not be broadcast together with shapes {} {}",
                    format_shape(a),
                    format_shape(b)
                )));
            }
        };
    }
    Ok(shape)
}

impl NdArray {
    /// Build a contiguous array, casting every value to `dtype`.
    pub fn from_values(dtype: DType, values: &[Scalar], shape: Vec<usize>) -> Self {
        let mut storage = Storage::with_len(dtype, values.len());
        for (i, value) in values.iter().enumerate() {
            storage.set(i, *value);
        }
        Self {
            data: Arc::new(RwLock::new(storage)),
            dtype,
            strides: contiguous_strides(&shape),
            shape,
            offset: 0,
        }
    }

    pub fn filled(dtype: DType, shape: Vec<usize>, value: Scalar) -> ForeignResult<Self> {
        let size = checked_size(&shape)?;
        let mut values = reserve_values(size)?;
        values.resize(size, value);
        Ok(Self::from_values(dtype, &values, shape))
    }

    /// Zero-dimensional array holding one value.
    pub fn scalar(value: Scalar) -> Self {
        Self::from_values(value.dtype(), &[value], Vec::new())
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn nbytes(&self) -> usize {
        self.size() * self.dtype.itemsize()
    }

    pub fn data_addr(&self) -> usize {
        self.data.read().base_addr() + self.offset * self.dtype.itemsize()
    }

    pub fn shares_storage(&self, other: &NdArray) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn is_contiguous(&self) -> bool {
        self.size() <= 1 || self.strides == contiguous_strides(&self.shape)
    }

    fn offset_of(&self, index: &[usize]) -> usize {
        let mut offset = self.offset as isize;
        for (i, stride) in index.iter().zip(&self.strides) {
            offset += *i as isize * stride;
        }
        offset as usize
    }

    /// Storage offsets of every element in logical order.
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.size());
        if self.ndim() == 0 {
            offsets.push(self.offset);
            return offsets;
        }
        for_each_index(&self.shape, |index| offsets.push(self.offset_of(index)));
        offsets
    }

    pub fn values(&self) -> Vec<Scalar> {
        let offsets = self.offsets();
        let data = self.data.read();
        offsets.into_iter().map(|offset| data.get(offset)).collect()
    }

    fn values_at(&self, offsets: &[usize]) -> Vec<Scalar> {
        let data = self.data.read();
        offsets.iter().map(|&offset| data.get(offset)).collect()
    }

    /// The single element of a size-1 array.
    pub fn item(&self) -> Option<Scalar> {
        (self.size() == 1).then(|| self.values()[0])
    }

    pub fn copy(&self) -> NdArray {
        NdArray::from_values(self.dtype, &self.values(), self.shape.clone())
    }

    pub fn cast(&self, dtype: DType) -> NdArray {
        NdArray::from_values(dtype, &self.values(), self.shape.clone())
    }

    /// Reshape, inferring at most one `-1` dimension. Contiguous arrays are
    /// reshaped as views.
    pub fn reshape(&self, dims: &[i64]) -> ForeignResult<NdArray> {
        let size = self.size();
        let unknown: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] == -1).collect();
        if unknown.len() > 1 {
            return Err(Exception::value_error("can only specify one unknown dimension"));
        }
        if dims.iter().any(|&d| d < -1) {
            return Err(Exception::value_error("negative dimensions not allowed"));
        }
        let known: usize = dims.iter().filter(|&&d| d >= 0).map(|&d| d as usize).product();
        let mut shape: Vec<usize> = dims.iter().map(|&d| d.max(0) as usize).collect();
        if let Some(&axis) = unknown.first() {
            if known == 0 || size % known != 0 {
                return Err(self.reshape_error(dims));
            }
            shape[axis] = size / known;
        } else if known != size {
            return Err(self.reshape_error(dims));
        }
        let base = if self.is_contiguous() { self.clone() } else { self.copy() };
        Ok(NdArray {
            strides: contiguous_strides(&shape),
            shape,
            ..base
        })
    }

    fn reshape_error(&self, dims: &[i64]) -> Exception {
        let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
        Exception::value_error(format!(
            "cannot reshape array of size {} into shape ({})",
            self.size(),
            dims.join(", ")
        ))
    }

    /// Values of this array broadcast to `target`.
    pub fn broadcast_values(&self, target: &[usize]) -> ForeignResult<Vec<Scalar>> {
        let mismatch = || {
            Exception::value_error(format!(
                "could not broadcast input array from shape {} into shape {}",
                format_shape(&self.shape),
                format_shape(target)
            ))
        };
        let mut source: &[usize] = &self.shape;
        while source.len() > target.len() {
            match source.split_first() {
                Some((1, rest)) => source = rest,
                _ => return Err(mismatch()),
            }
        }
        let lead = target.len() - source.len();
        for (i, &dim) in source.iter().enumerate() {
            if dim != target[lead + i] && dim != 1 {
                return Err(mismatch());
            }
        }
        let values = self.values();
        let source_strides = contiguous_strides(source);
        let mut out = Vec::with_capacity(target.iter().product());
        if target.is_empty() {
            out.extend(values.first().copied());
            return Ok(out);
        }
        for_each_index(target, |index| {
            let mut flat = 0usize;
            for (i, &dim) in source.iter().enumerate() {
                if dim != 1 {
                    flat += index[lead + i] * source_strides[i] as usize;
                }
            }
            out.push(values[flat]);
        });
        Ok(out)
    }

    /// Resolve an index expression against this array.
    pub fn locate(&self, selectors: &[Selector]) -> ForeignResult<Located> {
        let ndim = self.ndim();
        if selectors.len() > ndim {
            return Err(Exception::index_error(format!(
                "too many indices for array: array is {}-dimensional, but {} were indexed",
                ndim,
                selectors.len()
            )));
        }
        let mut selectors = selectors.to_vec();
        selectors.resize(ndim, Selector::Slice(SliceBounds::default()));

        let advanced = selectors
            .iter()
            .any(|s| matches!(s, Selector::Fancy { .. } | Selector::Mask(_)));
        if advanced {
            self.gather(&selectors)
        } else {
            self.view(&selectors).map(Located::View)
        }
    }

    fn view(&self, selectors: &[Selector]) -> ForeignResult<NdArray> {
        let mut offset = self.offset as isize;
        let mut shape = Vec::new();
        let mut strides = Vec::new();
        for (axis, selector) in selectors.iter().enumerate() {
            let len = self.shape[axis];
            let stride = self.strides[axis];
            match selector {
                Selector::Int(i) => {
                    offset += normalize_index(*i, len, axis)? as isize * stride;
                }
                Selector::Slice(bounds) => {
                    let (start, count, step) = resolve_slice(*bounds, len)?;
                    if count > 0 {
                        offset += start as isize * stride;
                    }
                    shape.push(count);
                    strides.push(stride * step as isize);
                }
                Selector::Fancy { .. } | Selector::Mask(_) => {
                    return Err(Exception::index_error("unexpected advanced index"));
                }
            }
        }
        Ok(NdArray {
            data: Arc::clone(&self.data),
            dtype: self.dtype,
            shape,
            strides,
            offset: offset as usize,
        })
    }

    fn gather(&self, selectors: &[Selector]) -> ForeignResult<Located> {
        enum Axis {
            /// Resolved positions laid out over `shape`.
            Advanced { positions: Vec<usize>, shape: Vec<usize> },
            Basic { start: i64, count: usize, step: i64 },
        }

        let mut axes = Vec::with_capacity(selectors.len());
        for (axis, selector) in selectors.iter().enumerate() {
            let len = self.shape[axis];
            let resolved = match selector {
                Selector::Int(i) => Axis::Advanced {
                    positions: vec![normalize_index(*i, len, axis)?],
                    shape: Vec::new(),
                },
                Selector::Fancy { indices, shape } => Axis::Advanced {
                    positions: indices
                        .iter()
                        .map(|&i| normalize_index(i, len, axis))
                        .collect::<ForeignResult<_>>()?,
                    shape: shape.clone(),
                },
                Selector::Mask(mask) => {
                    if mask.len() != len {
                        return Err(Exception::index_error(format!(
                            "boolean index did not match indexed array along axis {axis}; \
                             size of axis is {len} but size of corresponding boolean axis is {}",
                            mask.len()
                        )));
                    }
                    let positions: Vec<usize> = (0..len).filter(|&i| mask[i]).collect();
                    let shape = vec![positions.len()];
                    Axis::Advanced { positions, shape }
                }
                Selector::Slice(bounds) => {
                    let (start, count, step) = resolve_slice(*bounds, len)?;
                    Axis::Basic { start, count, step }
                }
            };
            axes.push(resolved);
        }

        let advanced: Vec<usize> = (0..axes.len())
            .filter(|&i| matches!(axes[i], Axis::Advanced { .. }))
            .collect();
        let shapes: Vec<&[usize]> = advanced
            .iter()
            .filter_map(|&i| match &axes[i] {
                Axis::Advanced { shape, .. } => Some(shape.as_slice()),
                Axis::Basic { .. } => None,
            })
            .collect();
        let mut common: Vec<usize> = Vec::new();
        for shape in &shapes {
            common = broadcast_shapes(&common, shape).map_err(|_| {
                let listed: Vec<String> = shapes.iter().map(|s| format_shape(s)).collect();
                Exception::index_error(format!(
                    "shape mismatch: indexing arrays could not be broadcast together with shapes {}",
                    listed.join(" ")
                ))
            })?;
        }

        // Result dimensions: `None` marks where the broadcast index dimensions go.
        let adjacent = advanced.windows(2).all(|w| w[1] == w[0] + 1);
        let basic: Vec<usize> = (0..axes.len())
            .filter(|&i| matches!(axes[i], Axis::Basic { .. }))
            .collect();
        let mut dims: Vec<Option<usize>> = Vec::new();
        if adjacent {
            let first = advanced[0];
            dims.extend(basic.iter().filter(|&&a| a < first).map(|&a| Some(a)));
            dims.push(None);
            dims.extend(basic.iter().filter(|&&a| a > first).map(|&a| Some(a)));
        } else {
            dims.push(None);
            dims.extend(basic.iter().map(|&a| Some(a)));
        }
        let mut shape: Vec<usize> = Vec::new();
        for dim in &dims {
            match dim {
                None => shape.extend_from_slice(&common),
                Some(axis) => {
                    if let Axis::Basic { count, .. } = axes[*axis] {
                        shape.push(count);
                    }
                }
            }
        }
        let size = checked_size(&shape)?;

        let mut offsets = Vec::with_capacity(size);
        for_each_index(&shape, |index| {
            let mut position = vec![0usize; axes.len()];
            let mut broadcast: &[usize] = &[];
            let mut slot = 0;
            for dim in &dims {
                match dim {
                    None => {
                        broadcast = &index[slot..slot + common.len()];
                        slot += common.len();
                    }
                    Some(axis) => {
                        if let Axis::Basic { start, step, .. } = axes[*axis] {
                            position[*axis] = (start + index[slot] as i64 * step) as usize;
                        }
                        slot += 1;
                    }
                }
            }
            for &axis in &advanced {
                if let Axis::Advanced { positions, shape } = &axes[axis] {
                    // Right-align the index array's shape against the broadcast shape.
                    let lead = common.len() - shape.len();
                    let mut flat = 0;
                    for (d, &dim) in shape.iter().enumerate() {
                        let i = if dim == 1 { 0 } else { broadcast[lead + d] };
                        flat = flat * dim + i;
                    }
                    position[axis] = positions[flat];
                }
            }
            offsets.push(self.offset_of(&position));
        });
        Ok(Located::Gather { shape, offsets })
    }

    /// `self[selectors]` as either a view or a gathered copy.
    pub fn select(&self, selectors: &[Selector]) -> ForeignResult<NdArray> {
        match self.locate(selectors)? {
            Located::View(view) => Ok(view),
            Located::Gather { shape, offsets } => Ok(NdArray::from_values(
                self.dtype,
                &self.values_at(&offsets),
                shape,
            )),
        }
    }

    /// `self[selectors] = value`, broadcasting and casting `value`.
    pub fn assign(&self, selectors: &[Selector], value: &NdArray) -> ForeignResult<()> {
        let (shape, offsets) = match self.locate(selectors)? {
            Located::View(view) => (view.shape.clone(), view.offsets()),
            Located::Gather { shape, offsets } => (shape, offsets),
        };
        let values = value.broadcast_values(&shape)?;
        let mut data = self.data.write();
        for (offset, value) in offsets.into_iter().zip(values) {
            data.set(offset, value);
        }
        Ok(())
    }

    /// Elementwise binary operation with broadcasting.
    pub fn zip_with(
        &self,
        other: &NdArray,
        dtype: DType,
        op: impl Fn(Scalar, Scalar) -> ForeignResult<Scalar>,
    ) -> ForeignResult<NdArray> {
        let shape = broadcast_shapes(&self.shape, &other.shape)?;
        let left = self.broadcast_values(&shape)?;
        let right = other.broadcast_values(&shape)?;
        let values = left
            .into_iter()
            .zip(right)
            .map(|(a, b)| op(a, b))
            .collect::<ForeignResult<Vec<_>>>()?;
        Ok(NdArray::from_values(dtype, &values, shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(n: i64) -> NdArray {
        let values: Vec<Scalar> = (0..n).map(Scalar::Int).collect();
        NdArray::from_values(DType::Int64, &values, vec![n as usize])
    }

    fn ints(array: &NdArray) -> Vec<i64> {
        array.values().into_iter().map(Scalar::as_i64).collect()
    }

    fn slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Selector {
        Selector::Slice(SliceBounds { start, stop, step })
    }

    #[test]
    fn test_strided_slice() {
        let a = arange(10);
        let view = a.select(&[slice(Some(2), Some(8), Some(2))]).unwrap();
        assert_eq!(ints(&view), vec![2, 4, 6]);
        assert!(view.shares_storage(&a));
    }

    #[test]
    fn test_negative_start_slice() {
        let a = arange(10);
        let view = a.select(&[slice(Some(-3), None, None)]).unwrap();
        assert_eq!(ints(&view), vec![7, 8, 9]);
    }

    #[test]
    fn test_reverse_slice() {
        let a = arange(5);
        let view = a.select(&[slice(None, None, Some(-2))]).unwrap();
        assert_eq!(ints(&view), vec![4, 2, 0]);
    }

    #[test]
    fn test_zero_step_is_value_error() {
        let a = arange(5);
        let err = a.select(&[slice(None, None, Some(0))]).err().unwrap();
        assert_eq!(err.kind, crate::runtime::ExceptionKind::ValueError);
    }

    #[test]
    fn test_fancy_placement_adjacent_and_split() {
        let a = arange(24).reshape(&[2, 3, 4]).unwrap();

        // a[:, [0, 2], 1] -> advanced axes adjacent, shape (2, 2)
        let adjacent = a
            .select(&[
                slice(None, None, None),
                Selector::fancy(vec![0, 2]),
                Selector::Int(1),
            ])
            .unwrap();
        assert_eq!(adjacent.shape(), &[2, 2]);
        assert_eq!(ints(&adjacent), vec![1, 9, 13, 21]);

        // a[[0, 1], :, [3, 0]] -> split advanced axes move to the front, shape (2, 3)
        let split = a
            .select(&[
                Selector::fancy(vec![0, 1]),
                slice(None, None, None),
                Selector::fancy(vec![3, 0]),
            ])
            .unwrap();
        assert_eq!(split.shape(), &[2, 3]);
        assert_eq!(ints(&split), vec![3, 7, 11, 12, 16, 20]);
    }

    #[test]
    fn test_resolve_slice_extreme_steps() {
        let bounds = |start, stop, step| SliceBounds { start, stop, step: Some(step) };
        assert_eq!(resolve_slice(bounds(Some(0), Some(10), i64::MAX), 10).unwrap(), (0, 1, 1));
        assert_eq!(resolve_slice(bounds(None, None, i64::MIN), 10).unwrap(), (9, 1, -1));
        assert_eq!(resolve_slice(bounds(None, None, i64::MIN + 1), 0).unwrap().1, 0);
        assert_eq!(
            resolve_slice(bounds(Some(i64::MIN), Some(i64::MAX), 4), 10).unwrap(),
            (0, 3, 4)
        );
        assert_eq!(
            resolve_slice(bounds(Some(i64::MAX), Some(i64::MIN), -3), 10).unwrap(),
            (9, 4, -3)
        );
    }

    #[test]
    fn test_wide_step_view_of_matrix() {
        let a = arange(12).reshape(&[3, 4]).unwrap();
        let view = a
            .select(&[slice(None, None, Some(i64::MAX)), slice(None, None, Some(i64::MIN))])
            .unwrap();
        assert_eq!(view.shape(), &[1, 1]);
        assert_eq!(ints(&view), vec![3]);
    }

    #[test]
    fn test_nd_index_array_shapes_result() {
        let a = arange(24).reshape(&[2, 3, 4]).unwrap();
        let rows = Selector::Fancy { indices: vec![0, 2, 1, 0], shape: vec![2, 2] };

        // a[1, rows] -> shape (2, 2, 4)
        let picked = a.select(&[Selector::Int(1), rows.clone()]).unwrap();
        assert_eq!(picked.shape(), &[2, 2, 4]);
        assert_eq!(&ints(&picked)[..4], &[12, 13, 14, 15]);
        assert_eq!(&ints(&picked)[4..8], &[20, 21, 22, 23]);

        // a[:, rows, [3]] broadcasts the (1,) array against (2, 2)
        let cols = Selector::fancy(vec![3]);
        let mixed = a.select(&[slice(None, None, None), rows, cols]).unwrap();
        assert_eq!(mixed.shape(), &[2, 2, 2]);
        assert_eq!(ints(&mixed), vec![3, 11, 7, 3, 15, 23, 19, 15]);
    }

    #[test]
    fn test_index_arrays_must_broadcast() {
        let a = arange(12).reshape(&[3, 4]).unwrap();
        let err = a
            .select(&[Selector::fancy(vec![0, 1]), Selector::fancy(vec![0, 1, 2])])
            .unwrap_err();
        assert_eq!(err.kind, crate::runtime::ExceptionKind::IndexError);
        assert!(err.message.contains("(2,) (3,)"));
    }

    #[test]
    fn test_checked_size_rejects_overflow() {
        assert_eq!(checked_size(&[2, 3]).unwrap(), 6);
        assert_eq!(checked_size(&[]).unwrap(), 1);
        assert_eq!(checked_size(&[usize::MAX, 0]).unwrap(), 0);
        let err = checked_size(&[usize::MAX, 2]).unwrap_err();
        assert_eq!(err.kind, crate::runtime::ExceptionKind::ValueError);
        assert!(NdArray::filled(DType::Int64, vec![1 << 62], Scalar::Int(0)).is_err());
    }

    #[test]
    fn test_mask_selects_true_positions() {
        let a = arange(4);
        let picked = a
            .select(&[Selector::Mask(vec![true, false, false, true])])
            .unwrap();
        assert_eq!(ints(&picked), vec![0, 3]);
        assert!(!picked.shares_storage(&a));
    }

    #[test]
    fn test_assign_broadcasts_row() {
        let a = NdArray::filled(DType::Float64, vec![2, 3], Scalar::Float(0.0)).unwrap();
        let row = NdArray::from_values(
            DType::Float64,
            &[Scalar::Float(1.0), Scalar::Float(2.0), Scalar::Float(3.0)],
            vec![3],
        );
        a.assign(&[], &row).unwrap();
        let values: Vec<f64> = a.values().into_iter().map(Scalar::as_f64).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_assign_shape_mismatch() {
        let a = arange(6).reshape(&[2, 3]).unwrap();
        let wrong = arange(2);
        let err = a.assign(&[], &wrong).unwrap_err();
        assert_eq!(err.kind, crate::runtime::ExceptionKind::ValueError);
    }

    #[test]
    fn test_assign_through_view_is_visible_in_base() {
        let a = arange(6);
        a.assign(&[slice(Some(1), Some(3), None)], &NdArray::scalar(Scalar::Int(-1)))
            .unwrap();
        assert_eq!(ints(&a), vec![0, -1, -1, 3, 4, 5]);
    }

    #[test]
    fn test_reshape_infers_dimension() {
        let a = arange(12).reshape(&[3, -1]).unwrap();
        assert_eq!(a.shape(), &[3, 4]);
        assert!(arange(12).reshape(&[5, -1]).is_err());
    }

    #[test]
    fn test_format_shape() {
        assert_eq!(format_shape(&[3]), "(3,)");
        assert_eq!(format_shape(&[2, 3]), "(2, 3)");
        assert_eq!(format_shape(&[]), "()");
    }
}
