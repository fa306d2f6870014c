//! # Turn Generation Benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Vector2;

use legrun_lib::{
    info::InfoBuffer,
    leg_run::{LegRunCtrl, Params},
    turn_gen::{TurnDir, TurnGen, TurnGenKind},
};
use util::module::State;

fn turn_gen(kind: TurnGenKind, lane_gap_m: f64) -> TurnGen {
    let mut gen = TurnGen::new(kind);
    gen.set_start_pose(Vector2::new(0.0, 0.0), 90.0);
    gen.set_end_pos(Vector2::new(0.0, -lane_gap_m));
    gen.set_turn_radius(15.0);
    gen.set_point_gap(1.0);
    gen.set_dir(TurnDir::Star);
    gen
}

fn turn_gen_benchmark(c: &mut Criterion) {
    let mut narrow = turn_gen(TurnGenKind::Williamson, 5.0);
    c.bench_function("williamson narrow lane", |b| b.iter(|| narrow.generate()));

    let mut wide = turn_gen(TurnGenKind::Williamson, 60.0);
    c.bench_function("williamson wide lane", |b| b.iter(|| wide.generate()));

    let mut simple = turn_gen(TurnGenKind::Simple180, 30.0);
    c.bench_function("simple 180", |b| b.iter(|| simple.generate()));
}

fn ctrl_benchmark(c: &mut Criterion) {
    let mut params = Params::default();
    params.p1 = Some((0.0, 0.0));
    params.p2 = Some((200.0, 0.0));
    params.cruise_speed_ms = 2.0;
    params.turn_pt_gap_m = 2.0;

    let mut ctrl = match LegRunCtrl::new(params) {
        Ok(c) => c,
        Err(e) => panic!("Bad benchmark parameters: {}", e),
    };
    let input = InfoBuffer::with_nav(0.0, Vector2::new(100.0, -10.0), 270.0, 2.0);

    c.bench_function("leg run cycle", |b| b.iter(|| ctrl.proc(&input)));

    let (output, _) = match ctrl.proc(&input) {
        Ok(o) => o,
        Err(e) => panic!("Processing failed: {}", e),
    };
    if let Some(obj) = output.objective {
        let builder = *ctrl.builder();
        c.bench_function("objective search", |b| b.iter(|| obj.best(&builder)));
    }
}

criterion_group!(benches, turn_gen_benchmark, ctrl_benchmark);
criterion_main!(benches);
