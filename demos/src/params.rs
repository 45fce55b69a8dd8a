use rigor::{Registry, TestDefinition, cartesian, check, params};

fn test(foo: char, bar: i32) {
    check!(bar > 5 && foo != 'x');
}

fn literal() -> TestDefinition {
    TestDefinition::builder("demo::params::test")
        .params(params![('a', 10), ('c', 12)])
        .run(test)
}

fn product() -> TestDefinition {
    TestDefinition::builder("demo::params::product")
        .params(cartesian!(['a', 'c'], [10, 15, 20]))
        .run(test)
}

fn pairs() -> Vec<(i32, char)> {
    vec![(42, 'd'), (2, 'c')]
}

fn generated() -> TestDefinition {
    TestDefinition::builder("demo::params::generated")
        .generator(pairs)
        .run(|number: i32, letter: char| check!(number > 5, "{letter} came with {number}"))
}

pub fn register(registry: &mut Registry) {
    registry.register(literal);
    registry.register(product);
    registry.register(generated);
}
