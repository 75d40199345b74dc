use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strided_dtype::{Buffer, DType, Scalar};
use strided_view::geometry::{
    buffer_index, is_contiguous, iteration_order, min_max_view_buffer_index, numel,
    shape_to_strides, strides_to_offset,
};
use strided_view::index::{bind_to_vind, ind_to_sub, vind_to_bind};
use strided_view::{IndexMode, IterationOrder, NdArray, Order, SliceSpec, StridedError};

fn random_shape(rng: &mut StdRng) -> Vec<usize> {
    let rank = rng.gen_range(1..=4);
    (0..rank).map(|_| rng.gen_range(1..=4)).collect()
}

fn all_indices(shape: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![vec![]];
    for &n in shape {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..n).map(move |i| {
                    let mut v = prefix.clone();
                    v.push(i);
                    v
                })
            })
            .collect();
    }
    out
}

#[test]
fn test_offset_round_trip_with_sign_flips() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let shape = random_shape(&mut rng);
        let order = if rng.gen_bool(0.5) {
            Order::RowMajor
        } else {
            Order::ColumnMajor
        };
        let mut strides = shape_to_strides(&shape, order);
        for s in strides.iter_mut() {
            if rng.gen_bool(0.5) {
                *s = -*s;
            }
        }
        let offset = strides_to_offset(&shape, &strides);
        let mut seen: Vec<isize> = all_indices(&shape)
            .iter()
            .map(|idx| buffer_index(idx, &strides, offset))
            .collect();
        seen.sort_unstable();
        let expected: Vec<isize> = (0..numel(&shape) as isize).collect();
        assert_eq!(seen, expected, "shape {shape:?} strides {strides:?}");
    }
}

#[test]
fn test_iteration_order_and_contiguity() {
    assert_eq!(iteration_order(&[0, 0]), IterationOrder::Ascending);
    assert_eq!(iteration_order(&[-3, -1]), IterationOrder::Descending);
    assert_eq!(iteration_order(&[3, -1]), IterationOrder::Unordered);

    // 4x4 window into a 4x8 buffer
    assert!(!is_contiguous(16, &[4, 4], &[2, 1], 0, IterationOrder::Ascending));
    assert!(is_contiguous(16, &[4, 4], &[4, 1], 0, IterationOrder::Ascending));
    assert_eq!(min_max_view_buffer_index(&[4, 4], &[-4, -1], 15), (0, 15));
}

#[test]
fn test_linear_index_inverse_random_views() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..30 {
        let shape = random_shape(&mut rng);
        for order in [Order::RowMajor, Order::ColumnMajor] {
            let mut strides = shape_to_strides(&shape, order);
            for s in strides.iter_mut() {
                if rng.gen_bool(0.5) {
                    *s = -*s;
                }
            }
            let offset = strides_to_offset(&shape, &strides);
            for vind in 0..numel(&shape) as isize {
                let bind = vind_to_bind(&shape, &strides, offset, order, vind, IndexMode::Throw)
                    .unwrap();
                let back = bind_to_vind(
                    &shape,
                    &strides,
                    offset,
                    order,
                    bind as isize,
                    IndexMode::Throw,
                )
                .unwrap();
                assert_eq!(back as isize, vind);
            }
        }
    }
}

#[test]
fn test_zero_sized_shape_rejects_every_mode() {
    for mode in [
        IndexMode::Throw,
        IndexMode::Wrap,
        IndexMode::Clamp,
        IndexMode::Normalize,
    ] {
        assert!(matches!(
            ind_to_sub(&[3, 0], Order::RowMajor, 0, mode),
            Err(StridedError::LinearIndexOutOfBounds { .. })
        ));
    }
}

#[test]
fn test_view_chain_matches_reference() {
    let data: Vec<i32> = (0..24).collect();
    let a = NdArray::from_vec(data, &[2, 3, 4], Order::RowMajor).unwrap();
    let v = a
        .permute(&[2, 0, 1])
        .unwrap()
        .slice(&[
            SliceSpec::range(None, None, -2),
            SliceSpec::Full,
            SliceSpec::Index(-1),
        ])
        .unwrap();
    assert_eq!(v.shape(), &[2, 2]);
    assert!(v.shares_buffer(&a));
    // v[i, j] = a[j, 2, 3 - 2i]
    for i in 0..2 {
        for j in 0..2 {
            assert_eq!(
                v.get(&[i, j]).unwrap(),
                a.get(&[j, 2, 3 - 2 * i]).unwrap()
            );
        }
    }
}

#[test]
fn test_writes_are_visible_through_aliases() {
    let a = NdArray::zeros(DType::Float32, &[3, 3], Order::ColumnMajor);
    let diag_src = a.transpose();
    diag_src.set(&[2, 0], 5.5).unwrap();
    assert_eq!(a.get(&[0, 2]).unwrap(), Scalar::Float(5.5));
    let copy = a.copy();
    a.set(&[0, 2], 0.0).unwrap();
    assert_eq!(copy.get(&[0, 2]).unwrap(), Scalar::Float(5.5));
}

#[test]
fn test_construction_errors() {
    let buf = Buffer::zeros(DType::Int16, 4);
    assert!(matches!(
        NdArray::new(buf.clone(), &[2, 2], &[2, 2], 0, Order::RowMajor),
        Err(StridedError::OutOfBounds { .. })
    ));
    assert!(matches!(
        NdArray::new(buf, &[2], &[isize::MAX], 0, Order::RowMajor),
        Err(StridedError::OutOfBounds { .. }) | Err(StridedError::OffsetOverflow)
    ));
    assert!(matches!(
        NdArray::from_scalars(DType::Bool, &[Scalar::Bool(true)], &[2], Order::RowMajor),
        Err(StridedError::BufferTooShort { required: 2, len: 1 })
    ));
}
