use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use rectiplot::config::{AnalysisConfig, AxisSpec, PlotConfig, SourceConfig};
use rectiplot::data::efficiency::{dc_power, efficiency};
use rectiplot::data::model::MeasuredQuantity;
use rectiplot::data::slice::sweeps_at_frequency;
use rectiplot::pipeline::{self, load_source, REPORT_FILE};

fn config(loads: &[f64], freqs: &[f64], powers: &[f64], source: SourceConfig) -> AnalysisConfig {
    AnalysisConfig {
        loads: loads.to_vec(),
        frequency: AxisSpec::Values {
            values: freqs.to_vec(),
        },
        power: AxisSpec::Values {
            values: powers.to_vec(),
        },
        source,
        plots: PlotConfig {
            contour: false,
            line_frequencies: Vec::new(),
            ..PlotConfig::default()
        },
        ..AnalysisConfig::default()
    }
}

#[test]
fn raw_voltages_become_efficiency() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("HSMS-286B_Shunt_High");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("HSMS-286B_Shunt_High_1.txt"), "1\t2\n3\t4\n").unwrap();
    fs::write(dir.join("HSMS-286B_Shunt_High_10.txt"), "5\t6\n7\t8\n").unwrap();

    let cfg = config(
        &[1.0, 10.0],
        &[5.2, 5.8],
        &[-10.0, 0.0],
        SourceConfig::Raw {
            path: None,
            quantity: MeasuredQuantity::DcVoltage,
        },
    );
    let axes = cfg.axes().unwrap();
    assert_relative_eq!(axes.powers_watts()[0], 1e-4, max_relative = 1e-12);
    assert_relative_eq!(axes.powers_watts()[1], 1e-3, max_relative = 1e-12);

    let source = &cfg.sources(tmp.path()).unwrap()[0];
    let outcome = load_source(source, &axes).unwrap();
    assert_eq!(outcome.loaded, 2);
    assert!(outcome.failures.is_empty());
    assert!(outcome.assembly.incomplete.is_none());
    let tensor = outcome.assembly.tensor;
    assert_eq!(tensor.unset_cells(), 0);

    let eff = efficiency(&tensor, &axes);
    assert_relative_eq!(eff.get(0, 0, 0), 1e6, max_relative = 1e-9);
    // 8 V across 10 Ω at 0 dBm: 6.4 W / 1 mW
    assert_relative_eq!(eff.get(1, 1, 1), 640_000.0, max_relative = 1e-9);

    let sweeps = sweeps_at_frequency(&eff, &axes, 5.2, &[-10.0]).unwrap();
    let curve = sweeps[0].curve(11).unwrap();
    assert_eq!(curve.points.len(), 2);
    assert_eq!(curve.curve.len(), 11);
    assert_relative_eq!(curve.curve[0].1, 1e6, max_relative = 1e-9);
}

#[test]
fn simulation_efficiency_passes_through() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("sim.csv"), "5.8,100,-10,50\n5.8,100,0,60\n").unwrap();

    let cfg = config(
        &[100.0],
        &[5.8],
        &[-10.0, 0.0],
        SourceConfig::Simulation {
            path: "sim.csv".into(),
            quantity: MeasuredQuantity::Efficiency,
        },
    );
    let axes = cfg.axes().unwrap();
    let source = &cfg.sources(tmp.path()).unwrap()[0];
    let tensor = load_source(source, &axes).unwrap().assembly.tensor;
    let eff = efficiency(&tensor, &axes);
    assert_eq!(eff.load_sweep(0, 0).to_vec(), vec![50.0]);
    assert_eq!(eff.get(0, 0, 1), 60.0);
    assert!(dc_power(&tensor, &axes).is_none());
}

#[test]
fn sheet_millivolts_become_dc_power() {
    let tmp = tempfile::tempdir().unwrap();
    let book = tmp.path().join("book");
    fs::create_dir_all(&book).unwrap();
    fs::write(book.join("Shunt 5.8.csv"), "100,1000\n1000,2000\n").unwrap();

    let cfg = config(
        &[100.0, 1000.0],
        &[5.8],
        &[0.0],
        SourceConfig::Workbook {
            path: "book".into(),
        },
    );
    let axes = cfg.axes().unwrap();
    let sources = cfg.sources(tmp.path()).unwrap();
    assert_eq!(sources.len(), 1);
    let tensor = load_source(&sources[0], &axes).unwrap().assembly.tensor;
    let power = dc_power(&tensor, &axes).unwrap();
    assert_relative_eq!(power[[0, 0, 0]], 0.01, max_relative = 1e-12);
    assert_relative_eq!(power[[1, 0, 0]], 0.004, max_relative = 1e-12);
}

#[test]
fn full_run_from_a_config_file() {
    let tmp = tempfile::tempdir().unwrap();
    let book = tmp.path().join("book");
    fs::create_dir_all(&book).unwrap();
    fs::write(book.join("A.csv"), "1,10\n100,200\n300,400\n").unwrap();
    fs::write(book.join("B.csv"), "1,oops\n100,200\n300,400\n").unwrap();
    fs::write(
        tmp.path().join("rectiplot.toml"),
        r#"
        loads = [1, 10]
        export = "eff.csv"

        [frequency]
        values = [5.8]

        [power]
        values = [-10, 0]

        [source]
        kind = "workbook"
        path = "book"

        [plots]
        contour = false
        line_frequencies = []
        "#,
    )
    .unwrap();

    let cfg = AnalysisConfig::from_file(&tmp.path().join("rectiplot.toml")).unwrap();
    let out = tmp.path().join("out");
    let report = pipeline::run(&cfg, tmp.path(), &out).unwrap();

    assert_eq!(report.sources.len(), 2);
    let a = &report.sources[0];
    assert_eq!(a.name, "A");
    assert!(a.succeeded());
    assert_eq!(a.loaded, 2);
    assert!(Path::new(&out.join("eff_A.csv")).is_file());

    let b = &report.sources[1];
    assert_eq!(b.name, "B");
    assert!(!b.succeeded());
    assert!(b.error.as_deref().unwrap().contains("schema error"));
    assert_eq!(report.failed_sources().count(), 1);

    assert!(out.join(REPORT_FILE).is_file());
}
