//! Directory navigation through the facade

use crate::{open_chest, scalar};
use datachest::{Error, PathSpec};
use proptest::prelude::*;

#[test]
fn mkdir_cd_ls() {
    let (_dir, mut chest) = open_chest();
    chest.mkdir("Cooldown 3").unwrap();
    chest.mkdir("alpha").unwrap();
    assert!(matches!(chest.mkdir("ALPHA"), Err(Error::AlreadyExists(_))));
    assert_eq!(chest.ls().unwrap().directories, vec!["alpha", "Cooldown 3"]);

    chest.cd("Cooldown 3").unwrap();
    assert_eq!(chest.pwd(), "/Cooldown 3");
    chest
        .create_dataset("a", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    chest
        .create_dataset("a", &[scalar("t", "s")], &[scalar("v", "V")])
        .unwrap();
    assert_eq!(chest.ls().unwrap().datasets.len(), 2);

    chest.cd(PathSpec::Segments(vec!["".into()])).unwrap();
    assert_eq!(chest.pwd(), "/");
    assert!(chest.ls().unwrap().datasets.is_empty());
}

#[test]
fn failed_navigation_is_classified() {
    let (_dir, mut chest) = open_chest();
    chest.mkdir("a").unwrap();
    chest.cd("a").unwrap();

    let err = chest.cd("missing").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(chest.pwd(), "/a");

    let err = chest.cd(vec!["..", ".."]).unwrap_err();
    assert!(err.is_state_error());
    assert_eq!(chest.pwd(), "/");
    assert!(chest.cwd().ends_with(chest.config().root().file_name().unwrap()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn open_never_reaches_outside_the_working_directory(
        segments in proptest::collection::vec(
            prop_oneof![
                Just(".."),
                Just("."),
                Just("sub"),
                Just(""),
                Just("aaa0000aaa_secret"),
                Just("aaa0000aaa_secret.chest"),
            ],
            1..5,
        )
    ) {
        let (_dir, mut chest) = open_chest();
        chest
            .create_dataset_with_stamp(
                "secret",
                &[scalar("t", "s")],
                &[scalar("v", "V")],
                Some("aaa0000aaa"),
            )
            .unwrap();
        chest.close_dataset().unwrap();
        chest.mkdir("sub").unwrap();
        chest.cd("sub").unwrap();

        let name = segments.join("/");
        let err = chest.open_dataset(&name, false).unwrap_err();
        prop_assert!(err.is_not_found(), "{:?} opened: {:?}", name, err);
        prop_assert!(chest.dataset().is_none());
        prop_assert_eq!(chest.pwd(), "/sub");
    }
}
