use criterion::*;
use ecsworld::test_util;

fn create_entity(c: &mut Criterion) {
    let mut group = c.benchmark_group("create entity");

    macro_rules! create_entity_batch {
        ($num_comps:literal; $($comps:expr),* $(,)?) => {
            for log_entities in (0..=12).step_by(4) {
                let entities = 1 << log_entities;
                group.throughput(Throughput::Elements(entities));
                group.bench_with_input(BenchmarkId::new(format!("{} components", $num_comps), format!("{entities} entities")), &entities, |b, &entities| {
                    b.iter_batched(
                        test_util::empty_world,
                        |mut world| {
                            for _ in 0..entities {
                                #[allow(unused_variables)]
                                let entity = world.create_entity();
                                $(
                                    world.create_component(entity, $comps).expect("entity is live");
                                )*
                            }
                            world.flush().expect("flush outside update");
                            world
                        },
                        BatchSize::SmallInput,
                    );
                });
            }
        }
    }

    create_entity_batch!(0; );
    create_entity_batch!(1; test_util::Position(1, 1));
    create_entity_batch!(2; test_util::Position(1, 1), test_util::Velocity(2, 2));
    create_entity_batch!(4; test_util::Position(1, 1), test_util::Velocity(2, 2), test_util::Health(3), test_util::Frozen);
}

criterion_group!(benches, create_entity);
criterion_main!(benches);
