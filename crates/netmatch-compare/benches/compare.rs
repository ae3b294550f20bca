//! Benchmarks for netlist comparison.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use netmatch_compare::NetlistComparer;
use netmatch_core::{DeviceClass, Netlist};

/// A chain of `stages` CMOS inverters at the top level.
fn inverter_chain(stages: usize) -> Netlist {
    let mut nl = Netlist::new();
    let pmos = nl.add_device_class(DeviceClass::mos4("PMOS"));
    let nmos = nl.add_device_class(DeviceClass::mos4("NMOS"));
    let top = nl.add_circuit("CHAIN").unwrap();

    let vdd = nl.add_net(top, "VDD").unwrap();
    let vss = nl.add_net(top, "VSS").unwrap();
    nl.add_pin(top, "VDD", Some(vdd));
    nl.add_pin(top, "VSS", Some(vss));

    let mut stage_in = nl.add_net(top, "IN").unwrap();
    nl.add_pin(top, "IN", Some(stage_in));
    for i in 0..stages {
        let stage_out = nl.add_net(top, format!("S{i}")).unwrap();
        nl.add_device(
            top,
            format!("MP{i}"),
            pmos,
            &[Some(vdd), Some(stage_in), Some(stage_out), Some(vdd)],
        )
        .unwrap();
        nl.add_device(
            top,
            format!("MN{i}"),
            nmos,
            &[Some(vss), Some(stage_in), Some(stage_out), Some(vss)],
        )
        .unwrap();
        stage_in = stage_out;
    }
    nl.add_pin(top, "OUT", Some(stage_in));
    nl
}

fn bench_compare_chain(c: &mut Criterion) {
    for stages in [10usize, 50] {
        let a = inverter_chain(stages);
        let b = inverter_chain(stages);
        c.bench_function(&format!("compare_inverter_chain_{stages}"), |bench| {
            let comparer = NetlistComparer::new();
            bench.iter(|| {
                let good = comparer.compare(black_box(&a), black_box(&b));
                assert!(good);
            });
        });
    }
}

fn bench_build_chain(c: &mut Criterion) {
    c.bench_function("build_inverter_chain_50", |bench| {
        bench.iter(|| inverter_chain(black_box(50)));
    });
}

criterion_group!(benches, bench_compare_chain, bench_build_chain);
criterion_main!(benches);
