use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

use lidarcam_3d::camera::{CameraPose, PinholeCamera, PinholeIntrinsics};
use lidarcam_3d::colorize::colorize;
use lidarcam_3d::ops::{par_project_points, project_points};
use lidarcam_image::{ChannelOrder, Image, ImageSize};

fn random_points(num_points: usize) -> Vec<[f64; 3]> {
    let mut rng = rand::rng();
    (0..num_points)
        .map(|_| {
            [
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                rng.random_range(0.5..20.0),
            ]
        })
        .collect()
}

fn bench_project_points(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_points");

    let camera = PinholeCamera::new(
        PinholeIntrinsics::new(600.0, 600.0, 320.0, 240.0),
        None,
        CameraPose::identity(),
    )
    .unwrap();

    for num_points in [1000, 10000, 100000, 500000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_points as u64));
        let parameter_string = format!("{}", num_points);

        let points = random_points(*num_points);

        group.bench_with_input(
            BenchmarkId::new("serial", &parameter_string),
            &points,
            |b, points| b.iter(|| black_box(project_points(points, &camera).unwrap())),
        );

        group.bench_with_input(
            BenchmarkId::new("parallel", &parameter_string),
            &points,
            |b, points| b.iter(|| black_box(par_project_points(points, &camera).unwrap())),
        );
    }
    group.finish();
}

fn bench_colorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("colorize");

    let camera = PinholeCamera::new(
        PinholeIntrinsics::new(600.0, 600.0, 320.0, 240.0),
        None,
        CameraPose::identity(),
    )
    .unwrap();
    let image = Image::<u8, 3>::from_size_val(
        ImageSize {
            width: 640,
            height: 480,
        },
        128,
    )
    .unwrap();

    for num_points in [10000, 100000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_points as u64));
        let points = random_points(*num_points);
        let projections = project_points(&points, &camera).unwrap();

        group.bench_with_input(
            BenchmarkId::new("colorize", num_points),
            &(&points, &projections),
            |b, (points, projections)| {
                b.iter(|| black_box(colorize(points, projections, &image, ChannelOrder::Bgr)))
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_project_points, bench_colorize);
criterion_main!(benches);
