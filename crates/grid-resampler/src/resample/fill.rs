//! Vertical fill-down of masked cells.
//!
//! Model output is masked below the sea floor, so near a steep bottom the
//! horizontal neighbours of a target can all be dry at deep levels. Copying
//! the deepest wet value down each column before resampling keeps the
//! interpolation from collapsing there.

use num_traits::Float;

use crate::error::{ResampleError, Result};
use crate::types::{DepthAxis, MaskedArray};

/// Fill masked cells from valid cells above them in the same column.
///
/// For `shift = 1, 2, …` every originally masked cell that is still empty
/// takes the originally valid value `shift` levels shallower. Stops once
/// every fillable cell has a value or all shifts are tried. Columns with no
/// valid level stay masked.
///
/// Returns the number of cells filled.
pub fn fill_invalid_shift<T: Float>(slab: &mut MaskedArray<T>, axis: DepthAxis) -> Result<usize> {
    if slab.ndim() != 3 {
        return Err(ResampleError::shape_mismatch("3 dimensions", slab.shape()));
    }
    let shape = slab.shape().to_vec();
    let (nz, columns) = match axis {
        DepthAxis::First => (shape[0], shape[1] * shape[2]),
        DepthAxis::Last => (shape[2], shape[0] * shape[1]),
    };
    let at = |k: usize, c: usize| match axis {
        DepthAxis::First => k * columns + c,
        DepthAxis::Last => c * nz + k,
    };

    let original: Vec<bool> = slab.validity().to_vec();
    let mut pending: Vec<usize> = (0..slab.len()).filter(|&i| !original[i]).collect();
    // only cells with a valid level somewhere above can ever be filled
    pending.retain(|&i| {
        let (k, c) = match axis {
            DepthAxis::First => (i / columns, i % columns),
            DepthAxis::Last => (i % nz, i / nz),
        };
        (0..k).any(|above| original[at(above, c)])
    });

    let mut filled = 0;
    for shift in 1..nz {
        if pending.is_empty() {
            break;
        }
        let mut still_pending = Vec::with_capacity(pending.len());
        for &i in &pending {
            let (k, c) = match axis {
                DepthAxis::First => (i / columns, i % columns),
                DepthAxis::Last => (i % nz, i / nz),
            };
            let source = if k >= shift { Some(at(k - shift, c)) } else { None };
            match source.filter(|&s| original[s]) {
                Some(s) => {
                    let value = slab.get(s);
                    slab.set(i, value);
                    filled += 1;
                }
                None => still_pending.push(i),
            }
        }
        pending = still_pending;
    }

    Ok(filled)
}
