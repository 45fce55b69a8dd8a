use rigor::{Registry, TestDefinition, check};

fn chatty() -> TestDefinition {
    TestDefinition::builder("demo::output::chatty").run(|| {
        println!("foo");
        eprintln!("bar");
        check!(1 + 1 == 3);
    })
}

fn quiet() -> TestDefinition {
    TestDefinition::builder("demo::output::quiet").run(|| {
        println!("only shown when the test fails");
    })
}

pub fn register(registry: &mut Registry) {
    registry.register(chatty);
    registry.register(quiet);
}
