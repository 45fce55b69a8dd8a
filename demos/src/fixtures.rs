use rigor::{Fixture, Registry, TestDefinition, check, check_eq};

fn my_fruit() -> Fixture {
    Fixture::new("my_fruit", || "apple".to_string())
}

fn fruit_basket() -> Fixture {
    Fixture::new("fruit_basket", |my_fruit: String| vec!["banana".to_string(), my_fruit]).depends_on(["my_fruit"])
}

fn meta_fixture() -> Fixture {
    Fixture::new("meta_fixture", || 21)
}

fn doubled() -> Fixture {
    Fixture::new("doubled", |meta: i32| meta * 2).depends_on(["meta_fixture"])
}

fn test_my_fruit_in_basket() -> TestDefinition {
    TestDefinition::builder("demo::fixtures::test_my_fruit_in_basket")
        .fixtures(["my_fruit", "fruit_basket"])
        .run(|my_fruit: String, fruit_basket: Vec<String>| check!(fruit_basket.contains(&my_fruit)))
}

fn test_doubled() -> TestDefinition {
    TestDefinition::builder("demo::fixtures::test_doubled")
        .fixtures(["doubled"])
        .run(|doubled: i32| check_eq!(doubled, 42))
}

pub fn register(registry: &mut Registry) {
    registry.register_fixture(my_fruit);
    registry.register_fixture(fruit_basket);
    registry.register_fixture(meta_fixture);
    registry.register_fixture(doubled);
    registry.register(test_my_fruit_in_basket);
    registry.register(test_doubled);
}
