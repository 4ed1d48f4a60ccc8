//! Reopening, read-only handles, live readers and crash recovery

use crate::{open_chest, scalar};
use datachest::{ChestConfig, DataBlock, DataChest, Error, ParamEntry, ParamValue, Value};
use std::fs::OpenOptions;
use std::io::Write;

fn reader_for(dir: &tempfile::TempDir) -> DataChest {
    DataChest::new(ChestConfig::builder().root(dir.path()).build().unwrap()).unwrap()
}

#[test]
fn reopen_is_read_only_unless_modify() {
    let (dir, mut chest) = open_chest();
    let name = chest
        .create_dataset("persist", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    chest
        .add_data(&[vec![Value::from(0.0), Value::from(2.0)]])
        .unwrap();
    chest.add_parameter("Bias", 0.25, "V", false).unwrap();
    chest.close_dataset().unwrap();

    chest.open_dataset(&name, false).unwrap();
    assert_eq!(chest.get_num_rows().unwrap(), 1);
    assert_eq!(
        chest.get_parameter("Bias").unwrap(),
        ParamEntry::WithUnits(ParamValue::Float(0.25), "V".to_string())
    );
    let err = chest
        .add_data(&[vec![Value::from(1.0), Value::from(3.0)]])
        .unwrap_err();
    assert!(err.is_state_error());

    chest.open_dataset(&name, true).unwrap();
    chest
        .add_data(&[vec![Value::from(1.0), Value::from(3.0)]])
        .unwrap();
    assert_eq!(chest.get_num_rows().unwrap(), 2);
    drop(chest);

    let mut other = reader_for(&dir);
    other.open_dataset(&name, false).unwrap();
    let (indeps, deps) = other.get_variables().unwrap();
    assert_eq!(indeps.names(), vec!["t"]);
    assert_eq!(deps.units(), vec!["V"]);
    assert_eq!(
        other.get_data(Some(-1), None, None).unwrap(),
        DataBlock::Rows(vec![vec![Value::from(1.0), Value::from(3.0)]])
    );
}

#[test]
fn reader_follows_live_writer() {
    let (dir, mut writer) = open_chest();
    let name = writer
        .create_dataset("live", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    writer
        .add_data(&[vec![Value::from(0.0), Value::from(0.0)]])
        .unwrap();

    let mut reader = reader_for(&dir);
    reader.open_dataset(&name, false).unwrap();
    assert_eq!(reader.get_num_rows().unwrap(), 1);

    writer
        .add_data(&[vec![Value::from(1.0), Value::from(1.0)]])
        .unwrap();
    assert_eq!(reader.get_num_rows().unwrap(), 1);
    assert!(reader.refresh().unwrap() > 0);
    assert_eq!(reader.get_num_rows().unwrap(), 2);
}

#[test]
fn torn_tail_is_dropped_on_reopen() {
    let (dir, mut chest) = open_chest();
    let name = chest
        .create_dataset("torn", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    chest
        .add_data(&[vec![Value::from(0.0), Value::from(5.0)]])
        .unwrap();
    chest.close_dataset().unwrap();

    // A crash mid-append leaves a partial frame at the end of the file
    let path = dir.path().join(&name);
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0x40, 0, 0, 0, 0xde, 0xad, 0xbe, 0xef, 1, 2, 3])
        .unwrap();
    drop(file);

    chest.open_dataset(&name, true).unwrap();
    assert_eq!(chest.get_num_rows().unwrap(), 1);
    chest
        .add_data(&[vec![Value::from(1.0), Value::from(6.0)]])
        .unwrap();
    chest.close_dataset().unwrap();

    chest.open_dataset(&name, false).unwrap();
    assert_eq!(chest.get_num_rows().unwrap(), 2);
    assert_eq!(
        chest.get_data(Some(1), None, None).unwrap(),
        DataBlock::Rows(vec![vec![Value::from(1.0), Value::from(6.0)]])
    );
}

#[test]
fn opening_a_missing_dataset_never_creates_it() {
    let (dir, mut chest) = open_chest();
    assert!(matches!(
        chest.open_dataset("nothing_here", true),
        Err(Error::NotFound(_))
    ));
    assert!(!dir.path().join("nothing_here.chest").exists());
    assert!(chest.ls().unwrap().datasets.is_empty());
}

#[test]
fn open_is_confined_to_the_working_directory() {
    let (_dir, mut chest) = open_chest();
    let name = chest
        .create_dataset("inner", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    chest.close_dataset().unwrap();
    chest.mkdir("sub").unwrap();
    chest.cd("sub").unwrap();
    assert!(chest.ls().unwrap().datasets.is_empty());
    assert!(chest
        .open_dataset(&format!("../{}", name), false)
        .unwrap_err()
        .is_not_found());

    // A dataset in a directory that is not under the root at all
    let (outside, mut other) = open_chest();
    let secret = other
        .create_dataset("secret", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    other
        .add_data(&[vec![Value::from(1.0), Value::from(42.0)]])
        .unwrap();
    drop(other);

    chest.cd("").unwrap();
    let absolute = outside.path().join(&secret);
    let sibling = outside.path().file_name().unwrap().to_str().unwrap();
    let relative = format!("../{}/{}", sibling, secret);
    for attempt in [absolute.to_str().unwrap(), relative.as_str()] {
        assert!(chest.open_dataset(attempt, false).unwrap_err().is_not_found());
        assert!(chest.dataset().is_none());
    }
}
