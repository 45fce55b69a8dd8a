use std::any::type_name;

use rigor::{Registry, TestDefinition, check, check_eq, params, variant};

fn tparam_gt_5<T, const I: i32>() {
    check!(I > 5);
}

fn gt_5() -> TestDefinition {
    TestDefinition::builder("demo::params::tparam_gt_5").variants(vec![
        variant!(tparam_gt_5::<i32, 10>),
        variant!(tparam_gt_5::<f32, 21>),
    ])
}

fn sized<T, const N: usize>(count: usize) {
    check_eq!(std::mem::size_of::<T>() * count, N * count, "{}", type_name::<T>());
}

/// Two variants, three parameter sets each.
fn sizes() -> TestDefinition {
    TestDefinition::builder("demo::params::sizes")
        .params(params![(1_usize,), (2_usize,), (3_usize,)])
        .variants(vec![variant!(sized::<u8, 1>), variant!(sized::<u64, 8>)])
}

pub fn register(registry: &mut Registry) {
    registry.register(gt_5);
    registry.register(sizes);
}
