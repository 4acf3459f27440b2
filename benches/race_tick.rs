use criterion::{black_box, criterion_group, criterion_main, Criterion};

use turtle_race::race::Race;
use turtle_race::terrain::{Terrain, TerrainSegment, TerrainType};
use turtle_race::turtle::TurtleSpec;

fn make_race(turtle_count: usize) -> Race {
    let terrain = Terrain::new(vec![TerrainSegment {
        start_distance: 0.0,
        end_distance: 1_500.0,
        terrain_type: TerrainType::Grass,
    }])
    .unwrap();
    let specs: Vec<TurtleSpec> = (0..turtle_count)
        .map(|i| TurtleSpec {
            id: format!("T{i}"),
            name: format!("Turtle {i}"),
            genome: String::new(),
            speed: 45.0,
            max_energy: 100.0,
            recovery: 5.0,
            swim: 10.0,
            climb: 10.0,
        })
        .collect();
    Race::new(&specs, terrain, 0.3, 18_000, 60)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("race_tick");
    for turtle_count in [1usize, 8, 32] {
        group.bench_function(format!("step/{turtle_count}_turtles"), |b| {
            b.iter_batched(
                || make_race(turtle_count),
                |mut race| {
                    race.step();
                    black_box(race.snapshot(5));
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
