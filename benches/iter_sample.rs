use std::time::Duration;

use criterion::*;
use ecsworld::test_util;
use ecsworld::world::Builder;
use rand::Rng;

fn iter_sample_movement(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter sample (a += b)");
    group.measurement_time(Duration::from_secs(10));

    for log_entities in (4..=16).step_by(4) {
        let num_entities = 1 << log_entities;
        group.throughput(Throughput::Elements(num_entities));
        group.bench_with_input(
            BenchmarkId::new("movement", format!("{num_entities} entities")),
            &num_entities,
            |b, &num_entities| {
                test_util::init();

                let mut builder = Builder::new("bench");
                builder.schedule(Box::new(test_util::movement));
                let mut world = builder.build().expect("a single system always builds");

                let mut rng = rand::thread_rng();
                for _ in 0..num_entities {
                    let entity = world.create_entity();
                    world
                        .create_component(
                            entity,
                            test_util::Position(rng.gen_range(-65536..=65536), rng.gen_range(-65536..=65536)),
                        )
                        .expect("entity is live");
                    world
                        .create_component(
                            entity,
                            test_util::Velocity(rng.gen_range(-128..=128), rng.gen_range(-128..=128)),
                        )
                        .expect("entity is live");
                    if rng.gen_bool(0.1) {
                        world.create_component(entity, test_util::Frozen).expect("entity is live");
                    }
                }
                world.flush().expect("flush outside update");

                b.iter(|| world.update(1.0).expect("update from outside the world"));
            },
        );
    }
}

criterion_group!(benches, iter_sample_movement);
criterion_main!(benches);
