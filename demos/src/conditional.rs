use rigor::{Registry, TestDefinition, check};

const SKIP: bool = true;

fn never_run() -> TestDefinition {
    TestDefinition::builder("demo::conditional::never_run")
        .skip()
        .run(|| check!(false))
}

fn skip_constant() -> TestDefinition {
    TestDefinition::builder("demo::conditional::skip_constant")
        .skip_if(|| SKIP)
        .run(|| check!(false))
}

/// Decided when the test is about to run.
fn should_skip() -> bool {
    std::env::var_os("DEMO_RUN_SLOW").is_none()
}

fn skip_runtime() -> TestDefinition {
    TestDefinition::builder("demo::conditional::skip_runtime")
        .skip_if(should_skip)
        .run(|| check!(false, "Unset DEMO_RUN_SLOW to skip this test."))
}

pub fn register(registry: &mut Registry) {
    registry.register(never_run);
    registry.register(skip_constant);
    registry.register(skip_runtime);
}
