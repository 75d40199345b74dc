use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strided_dtype::{Buffer, ClampedU8, Complex64, DType, Scalar};
use strided_kernel::scan::{cuany_buffer, cuevery_buffer};
use strided_kernel::{
    cusum, map_binary, map_unary, mean, ops, sort, sort2, sum, KernelPath, SortMethod,
    StridedError, SumMethod, UnaryDispatch,
};
use strided_view::{NdArray, Order, SliceSpec};

fn times_ten() -> UnaryDispatch {
    UnaryDispatch::new("times_ten", |v| v * Scalar::Int(10)).with_native::<f64, f64>(|v| v * 10.0)
}

fn floats(buf: &Buffer) -> Vec<f64> {
    buf.to_scalars().into_iter().map(Scalar::to_f64).collect()
}

#[test]
fn test_times_ten_on_both_paths() {
    let op = times_ten();
    let typed = Buffer::Float64(vec![1.0, 2.0, 3.0, 4.0]);
    let generic = Buffer::Generic(typed.to_scalars());
    assert_eq!(op.resolve(DType::Float64, DType::Float64), KernelPath::Native);
    assert_eq!(op.resolve(DType::Generic, DType::Generic), KernelPath::Fallback);

    let mut y1 = Buffer::zeros(DType::Float64, 4);
    let mut y2 = Buffer::zeros(DType::Generic, 4);
    op.apply(4, &typed, 1, 0, &mut y1, 1, 0).unwrap();
    op.apply(4, &generic, 1, 0, &mut y2, 1, 0).unwrap();
    assert_eq!(floats(&y1), vec![10.0, 20.0, 30.0, 40.0]);
    assert_eq!(floats(&y2), vec![10.0, 20.0, 30.0, 40.0]);
}

#[test]
fn test_zero_length_leaves_outputs_untouched() {
    let x = Buffer::Float64(vec![]);
    let before = Buffer::Int16(vec![1, -2, 3]);

    let mut y = before.clone();
    ops::assign(0, &x, 3, 7, &mut y, -4, 99).unwrap();
    ops::fill(5, 0, &mut y, 1, 42).unwrap();
    ops::add(0, &x, 1, 5, &x, 1, 5, &mut y, 1, 5).unwrap();
    cusum(SumMethod::Kbn, 0, 1.0, &x, 1, 9, &mut y, 1, 9).unwrap();
    cuany_buffer(0, &x, 1, 9, &mut y, 1, 9).unwrap();
    sort(SortMethod::Shell, 0, 1.0, &mut y, 1, 9).unwrap();
    assert_eq!(y, before);

    assert_eq!(sum(SumMethod::Kbn, 0, &x, 1, 9).unwrap(), Scalar::Float(0.0));
    assert!(mean(0, &x, 1, 9).unwrap().to_f64().is_nan());
}

#[test]
fn test_operand_validation_names_the_operand() {
    let x = Buffer::Float64(vec![1.0; 4]);
    let mut y = Buffer::zeros(DType::Float64, 4);
    let err = ops::scale(2.0, 3, &x, -2, 3, &mut y, 1, 0).unwrap_err();
    assert_eq!(
        err,
        StridedError::OperandOutOfBounds {
            operand: "x",
            min: -1,
            max: 3,
            len: 4
        }
    );
    assert!(ops::scale(2.0, 2, &x, -2, 3, &mut y, 2, 1).is_ok());
    assert_eq!(floats(&y), vec![0.0, 2.0, 0.0, 2.0]);
}

#[test]
fn test_overflowing_strides_are_rejected() {
    let x = Buffer::Float64(vec![1.0, 2.0, 3.0]);
    let mut y = Buffer::zeros(DType::Float64, 3);
    assert_eq!(
        ops::assign(3, &x, isize::MAX, 0, &mut y, 1, 0).unwrap_err(),
        StridedError::OperandOutOfBounds {
            operand: "x",
            min: 0,
            max: isize::MAX,
            len: 3
        }
    );
    assert!(matches!(
        ops::add(3, &x, 1, 0, &x, isize::MIN, 2, &mut y, 1, 0),
        Err(StridedError::OperandOutOfBounds { operand: "y", .. })
    ));
    assert!(ops::fill(1.0, usize::MAX, &mut y, 1, 0).is_err());
    assert!(sum(SumMethod::Kbn, 3, &x, isize::MAX, 0).is_err());
    assert!(cusum(SumMethod::Ordinary, 3, 0.0, &x, 1, 0, &mut y, isize::MIN, 2).is_err());
    assert!(sort(SortMethod::Heap, 3, 1.0, &mut y, isize::MAX, 0).is_err());
    assert_eq!(floats(&y), vec![0.0; 3]);
}

#[test]
fn test_sort_nan_and_signed_zero() {
    let input = [3.0, f64::NAN, -0.0, 1.0, 0.0, f64::NAN, -2.0];
    for method in [SortMethod::Insertion, SortMethod::Shell, SortMethod::Heap] {
        for dtype in [DType::Float64, DType::Float32, DType::Generic] {
            let values: Vec<Scalar> = input.iter().map(|&v| Scalar::Float(v)).collect();
            let mut x = Buffer::from_scalars(dtype, &values);
            sort(method, 7, 1.0, &mut x, 1, 0).unwrap();
            let got = floats(&x);
            assert_eq!(&got[..5], &[-2.0, -0.0, 0.0, 1.0, 3.0]);
            assert!(got[1].is_sign_negative() && got[2].is_sign_positive());
            assert!(got[5].is_nan() && got[6].is_nan(), "{method:?} {dtype}");
        }
    }
}

#[test]
fn test_sort2_reproduces_permutation() {
    let mut rng = StdRng::seed_from_u64(42);
    for method in [SortMethod::Insertion, SortMethod::Shell, SortMethod::Heap] {
        for &(n, stride) in &[(1usize, 1isize), (40, 3), (257, -1), (900, -2)] {
            let len = n * stride.unsigned_abs();
            let orig: Vec<f64> = (0..len).map(|_| rng.gen_range(-100..100) as f64).collect();
            let offset = if stride < 0 { len - 1 } else { 0 };
            let mut x = Buffer::Float64(orig.clone());
            let mut y = Buffer::Uint32((0..n as u32).collect());
            sort2(method, n, -1.0, &mut x, stride, offset, &mut y, 1, 0).unwrap();

            let sorted = floats(&x);
            let perm = floats(&y);
            let at = |i: usize| (offset as isize + i as isize * stride) as usize;
            for i in 0..n {
                assert_eq!(sorted[at(i)], orig[at(perm[i] as usize)]);
                if i > 0 {
                    assert!(sorted[at(i - 1)] >= sorted[at(i)]);
                }
            }
        }
    }
}

#[test]
fn test_kbn_cancellation() {
    let x = Buffer::Float64(vec![1e100, 1.0, -1e100]);
    assert_eq!(sum(SumMethod::Kbn, 3, &x, 1, 0).unwrap(), Scalar::Float(1.0));
    assert_eq!(sum(SumMethod::Ordinary, 3, &x, 1, 0).unwrap(), Scalar::Float(0.0));

    // large terms cancel pairwise, small ones survive
    let mut values = Vec::new();
    for k in 0..500 {
        values.extend_from_slice(&[1e16 * (k + 1) as f64, 1.0, -1e16 * (k + 1) as f64]);
    }
    let n = values.len();
    let x = Buffer::Float64(values);
    assert_eq!(sum(SumMethod::Kbn, n, &x, 1, 0).unwrap(), Scalar::Float(500.0));
    assert_eq!(sum(SumMethod::Kbn2, n, &x, 1, 0).unwrap(), Scalar::Float(500.0));
    let naive = sum(SumMethod::Ordinary, n, &x, 1, 0).unwrap().to_f64();
    assert!((naive - 500.0).abs() > 1.0);
}

#[test]
fn test_mean_and_complex_sum() {
    let x = Buffer::Int32((1..=100).collect());
    assert_relative_eq!(mean(100, &x, 1, 0).unwrap().to_f64(), 50.5);
    let c = Buffer::Generic(vec![
        Scalar::Complex(Complex64::new(1.0, 1.0)),
        Scalar::Float(2.0),
        Scalar::Int(3),
    ]);
    assert_eq!(
        sum(SumMethod::Pairwise, 3, &c, 1, 0).unwrap(),
        Scalar::Complex(Complex64::new(6.0, 1.0))
    );
}

#[test]
fn test_clamped_assign_and_scans() {
    let x = Buffer::Generic(vec![
        Scalar::Float(300.0),
        Scalar::Float(-5.0),
        Scalar::Float(128.7),
        Scalar::Float(f64::NAN),
    ]);
    let mut y = Buffer::zeros(DType::Uint8c, 4);
    ops::assign(4, &x, 1, 0, &mut y, 1, 0).unwrap();
    assert_eq!(
        y,
        Buffer::Uint8c(vec![ClampedU8(255), ClampedU8(0), ClampedU8(129), ClampedU8(0)])
    );

    let mut flags = Buffer::zeros(DType::Bool, 4);
    cuevery_buffer(4, &y, 1, 0, &mut flags, 1, 0).unwrap();
    assert_eq!(flags, Buffer::Bool(vec![true, false, false, false]));

    let mut running = Buffer::zeros(DType::Float64, 4);
    cusum(SumMethod::Ordinary, 4, 0, &y, -1, 3, &mut running, 1, 0).unwrap();
    assert_eq!(floats(&running), vec![0.0, 129.0, 129.0, 384.0]);
}

fn random_view(rng: &mut StdRng) -> NdArray {
    let shape: [usize; 3] = [rng.gen_range(1..5), rng.gen_range(1..5), rng.gen_range(1..5)];
    let n: usize = shape.iter().product();
    let data: Vec<f64> = (0..n).map(|_| rng.gen_range(-10..10) as f64).collect();
    let order = if rng.gen::<bool>() { Order::RowMajor } else { Order::ColumnMajor };
    let base = NdArray::from_vec(data, &shape, order).unwrap();
    let flip = SliceSpec::range(None, None, -1);
    let view = match rng.gen_range(0..3) {
        0 => base,
        1 => base.slice(&[flip, SliceSpec::Full, flip]).unwrap(),
        _ => base.slice(&[SliceSpec::Full, flip]).unwrap(),
    };
    let perms = [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]];
    view.permute(&perms[rng.gen_range(0..perms.len())]).unwrap()
}

#[test]
fn test_nd_map_matches_elementwise_reference() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let x = random_view(&mut rng);
        let order = if rng.gen::<bool>() { Order::RowMajor } else { Order::ColumnMajor };
        let y = NdArray::zeros(DType::Float64, x.shape(), order);
        let z = NdArray::zeros(DType::Float64, x.shape(), Order::ColumnMajor);

        map_unary(ops::abs_op(), &x, &y).unwrap();
        for idx in x.indices() {
            assert_eq!(y.get(&idx).unwrap().to_f64(), x.get(&idx).unwrap().to_f64().abs());
        }

        map_binary(ops::mul_op(), &x, &y, &z).unwrap();
        for idx in x.indices() {
            let v = x.get(&idx).unwrap().to_f64();
            assert_eq!(z.get(&idx).unwrap().to_f64(), v * v.abs());
        }
    }
}
