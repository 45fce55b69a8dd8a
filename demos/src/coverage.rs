use rigor::{Registry, TestDefinition, check_eq, probe};

fn classify(n: i32) -> &'static str {
    probe!();
    if n < 0 {
        probe!();
        return "negative";
    }
    for _ in 0..n.min(3) {
        probe!();
    }
    "non-negative"
}

fn classify_values() -> TestDefinition {
    TestDefinition::builder("demo::coverage::classify")
        .params([(-1, "negative"), (5, "non-negative")])
        .run(|n: i32, expected: &'static str| check_eq!(classify(n), expected))
}

pub fn register(registry: &mut Registry) {
    registry.register(classify_values);
}
