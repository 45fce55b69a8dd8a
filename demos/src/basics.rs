use rigor::{Registry, TestDefinition, check, check_eq};

fn always_passes() -> TestDefinition {
    TestDefinition::builder("demo::always_passes").run(|| {})
}

fn always_fails() -> TestDefinition {
    TestDefinition::builder("demo::always_fails")
        .expect_failure()
        .run(|| check!(false, "oh no"))
}

fn returns_error() -> TestDefinition {
    TestDefinition::builder("demo::returns_error").run(|| -> Result<(), std::num::ParseIntError> {
        let parsed: i32 = "forty-two".parse()?;
        check_eq!(parsed, 42);
        Ok(())
    })
}

/// Panics with a payload that carries no message.
fn opaque_panic() {
    std::panic::panic_any(7_u8)
}

fn panics_opaquely() -> TestDefinition {
    TestDefinition::builder("demo::panics_opaquely").run(opaque_panic)
}

pub fn register(registry: &mut Registry) {
    registry.register(always_passes);
    registry.register(always_fails);
    registry.register(returns_error);
    registry.register(panics_opaquely);
}
