//! Reference scenarios and the round-trip properties they exercise

use crate::{open_chest, scalar};
use datachest::engine::classify;
use datachest::{
    Category, Complex64, DataBlock, Error, ParamEntry, ParamValue, Shape, Value, VariableDecl,
};

#[test]
fn scalar_rows_round_trip() {
    let (_dir, mut chest) = open_chest();
    chest
        .create_dataset("runA", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    chest
        .add_data(&[
            vec![Value::from(0.0), Value::from(1.0)],
            vec![Value::from(1.0), Value::from(1.5)],
        ])
        .unwrap();

    assert_eq!(
        chest.get_data(None, None, None).unwrap(),
        DataBlock::Rows(vec![
            vec![Value::from(0.0), Value::from(1.0)],
            vec![Value::from(1.0), Value::from(1.5)],
        ])
    );
    assert_eq!(chest.get_num_rows().unwrap(), 2);
    assert_eq!(chest.get_data_category().unwrap(), Category::ArbitraryScalar);
}

#[test]
fn one_d_scan_expands_linearly() {
    let (_dir, mut chest) = open_chest();
    let indeps = [VariableDecl::new("t", &[2], "float64", "s")];
    let deps = [VariableDecl::new("x", &[5], "float64", "V")];
    chest.create_dataset("scanA", &indeps, &deps).unwrap();
    chest
        .add_data(&[vec![
            Value::from(vec![0.0, 4.0]),
            Value::from(vec![0, 1, 2, 3, 4]),
        ]])
        .unwrap();

    assert_eq!(
        classify(&[Shape::from(vec![2])], &[Shape::from(vec![5])]),
        Category::OneDScan
    );
    assert_eq!(chest.get_data_category().unwrap(), Category::OneDScan);

    let rows = chest.get_scan_data(None, None).unwrap();
    assert_eq!(rows[0][0], Value::from(vec![0.0, 1.0, 2.0, 3.0, 4.0]));

    // Plain reads return the stored range
    let stored = chest.get_data(Some(0), Some(1), None).unwrap();
    assert_eq!(stored.rows().unwrap()[0][0], Value::from(vec![0.0, 4.0]));
}

#[test]
fn unitless_parameter_is_bare() {
    let (_dir, mut chest) = open_chest();
    chest
        .create_dataset("params", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    chest.add_parameter("Gain", 10, "", false).unwrap();
    assert_eq!(
        chest.get_parameter("Gain").unwrap(),
        ParamEntry::Bare(ParamValue::Int(10))
    );
}

#[test]
fn cd_above_root_is_refused() {
    let (_dir, mut chest) = open_chest();
    let err = chest.cd("..").unwrap_err();
    assert!(matches!(err, Error::Confinement { .. }));
    assert_eq!(chest.pwd(), "/");
}

#[test]
fn appends_grow_every_column() {
    let (_dir, mut chest) = open_chest();
    chest
        .create_dataset(
            "growth",
            &[scalar("t", "s")],
            &[scalar("a", ""), VariableDecl::new("n", &[1], "uint16", "")],
        )
        .unwrap();

    let n = 25;
    for i in 0..n {
        chest
            .add_data(&[vec![
                Value::from(i as f64),
                Value::from(i as f64 * 0.5),
                Value::from(i as u16),
            ]])
            .unwrap();
        // Each accepted row reads back as the last row
        let last = chest.get_data(Some(-1), None, None).unwrap();
        assert_eq!(last.rows().unwrap()[0][2], Value::UInt16(i as u16));
    }

    assert_eq!(chest.get_num_rows().unwrap(), n as u64);
    let dataset = chest.dataset().unwrap();
    let file = datachest::storage::Container::open(
        dataset.path(),
        datachest::storage::AccessMode::ReadOnly,
    )
    .unwrap();
    for path in ["independents/t", "dependents/a", "dependents/n"] {
        assert_eq!(file.array(path).unwrap().len(), n);
    }
}

#[test]
fn every_parameter_kind_round_trips() {
    let (_dir, mut chest) = open_chest();
    chest
        .create_dataset("kinds", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();

    let values: Vec<ParamValue> = vec![
        false.into(),
        (-12i64).into(),
        3u32.into(),
        2.5f64.into(),
        Complex64::new(1.0, -1.0).into(),
        "Linear".into(),
        vec![1i64, -1].into(),
        vec![0.5f64, 0.25].into(),
        serde_json::json!(["mixed", 1, null]).into(),
    ];
    for (i, value) in values.iter().enumerate() {
        chest
            .add_parameter(&format!("p{}", i), value.clone(), "", false)
            .unwrap();
    }
    for (i, value) in values.into_iter().enumerate() {
        assert_eq!(
            chest.get_parameter(&format!("p{}", i)).unwrap(),
            ParamEntry::Bare(value)
        );
    }
}
