//! Rip workflow integration tests.
//!
//! Runs the movie and TV workflows end to end against [`FakeDisc`] and a
//! temporary library root.

mod common;

use common::{disc_info, FakeDisc, FixedSpace, Library};
use ripforge::workflow::{run_job, RipContext, RipJob, RipStep};
use ripforge::RipError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn names(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

#[test]
fn movie_rip_lands_in_category_folder() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("INCEPTION", &[(0, 600), (1, 8880), (2, 8880)]),
        rips: vec![("title_t01.mkv".to_string(), 8880.0)],
        lookup: Some("Inception (2010)".to_string()),
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let job = RipJob::movie("/dev/sr0", "SciFi", "Inception");
    let report = run_job(&ctx, &job).unwrap();

    let expected = lib.root().join("SciFi").join("Inception (2010)");
    assert_eq!(report.output_dir, expected);
    assert_eq!(report.final_name, "Inception (2010)");
    assert!(expected.is_dir());
    assert_eq!(names(&report.kept_files), vec!["title_t01.mkv"]);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    // Ties go to the first title listed
    let extract = runner
        .calls("makemkvcon")
        .into_iter()
        .find(|a| a[0] == "mkv")
        .unwrap();
    assert_eq!(
        extract,
        vec![
            "mkv".to_string(),
            "disc:0".to_string(),
            "1".to_string(),
            expected.to_string_lossy().to_string(),
            "--minlength=3600".to_string(),
        ]
    );

    let lookup = &runner.calls("filebot")[0];
    assert_eq!(
        lookup,
        &["-list", "--db", "TheMovieDB", "--q", "Inception", "--format", "{n} ({y})"]
    );
    assert_eq!(runner.calls("eject"), vec![vec!["/dev/sr0".to_string()]]);
}

#[test]
fn movie_name_comes_from_disc_label() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("THE_MATRIX", &[(0, 8160)]),
        rips: vec![("title_t00.mkv".to_string(), 8160.0)],
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let report = run_job(&ctx, &RipJob::movie("/dev/sr0", "Action", "")).unwrap();

    // Lookup missed, so the label is used verbatim
    assert_eq!(report.output_dir, lib.root().join("Action").join("THE_MATRIX"));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("THE_MATRIX"));

    // Disc info is read once and reused for title selection
    let info_calls = runner
        .calls("makemkvcon")
        .into_iter()
        .filter(|a| a[0] == "-r")
        .count();
    assert_eq!(info_calls, 1);
}

#[test]
fn movie_without_name_or_label_fails() {
    let lib = Library::new();
    let runner = FakeDisc::default();
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let err = run_job(&ctx, &RipJob::movie("/dev/sr0", "Action", "  ")).unwrap_err();
    assert!(matches!(err, RipError::NameUnresolved));
    assert!(!runner.extract_started.load(Ordering::SeqCst));
}

#[test]
fn movie_without_category_fails_before_any_tool_runs() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("INCEPTION", &[(0, 8880)]),
        lookup: Some("Inception (2010)".to_string()),
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    for query in ["Inception", ""] {
        let err = run_job(&ctx, &RipJob::movie("/dev/sr0", "  ", query)).unwrap_err();
        assert!(matches!(err, RipError::MissingCategory));
        assert_eq!(err.code(), "missing_category");
    }
    assert!(runner.commands().is_empty(), "{:?}", runner.commands());
    assert!(!runner.extract_started.load(Ordering::SeqCst));
}

#[test]
fn movie_category_cannot_leave_the_root() {
    let lib = Library::new();
    let runner = FakeDisc {
        lookup: Some("Inception (2010)".to_string()),
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    for category in ["../../x", "..", "/tmp", "SciFi/Nested"] {
        let err = run_job(&ctx, &RipJob::movie("/dev/sr0", category, "Inception")).unwrap_err();
        assert!(
            matches!(err, RipError::InvalidCategory(_)),
            "{category:?}: {err}"
        );
    }
    assert!(runner.commands().is_empty(), "{:?}", runner.commands());
    assert_eq!(std::fs::read_dir(lib.root()).unwrap().count(), 0);
}

#[test]
fn movie_name_separators_stay_in_one_folder() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("FACEOFF", &[(0, 8280)]),
        rips: vec![("title_t00.mkv".to_string(), 8280.0)],
        lookup: Some("Face/Off (1997)".to_string()),
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let report = run_job(&ctx, &RipJob::movie("/dev/sr0", "Action", "Face Off")).unwrap();

    let expected = lib.root().join("Action").join("Face-Off (1997)");
    assert_eq!(report.output_dir, expected);
    assert_eq!(report.final_name, "Face-Off (1997)");
    assert!(expected.join("title_t00.mkv").is_file());
    assert!(!lib.root().join("Action").join("Face").exists());
}

#[test]
fn absolute_movie_name_stays_under_the_root() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("EVIL", &[(0, 7200)]),
        rips: vec![("title_t00.mkv".to_string(), 7200.0)],
        lookup: None,
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let report = run_job(&ctx, &RipJob::movie("/dev/sr0", "Action", "/tmp/evil")).unwrap();

    assert_eq!(report.output_dir, lib.root().join("Action").join("tmp-evil"));
    assert!(report.output_dir.starts_with(lib.root()));
}

#[test]
fn movie_without_long_title_rips_title_zero() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("SHORTS", &[(0, 1200), (1, 1500)]),
        rips: vec![("title_t00.mkv".to_string(), 1200.0)],
        lookup: Some("Shorts (2001)".to_string()),
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    run_job(&ctx, &RipJob::movie("/dev/sr0", "Shorts", "Shorts")).unwrap();

    let extract = runner
        .calls("makemkvcon")
        .into_iter()
        .find(|a| a[0] == "mkv")
        .unwrap();
    assert_eq!(extract[2], "0");
}

#[test]
fn movie_is_renamed_locally_without_filebot() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("ALIEN", &[(0, 7020)]),
        rips: vec![("title_t00.mkv".to_string(), 7020.0)],
        filebot_installed: false,
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let report = run_job(&ctx, &RipJob::movie("/dev/sr0", "Horror", "Alien")).unwrap();

    assert_eq!(report.final_name, "Alien");
    assert_eq!(names(&report.kept_files), vec!["Alien.mkv"]);
}

#[test]
fn failed_rename_is_a_warning() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("ALIEN", &[(0, 7020)]),
        rips: vec![("title_t00.mkv".to_string(), 7020.0)],
        lookup: Some("Alien (1979)".to_string()),
        rename_fails: true,
        eject_fails: true,
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let report = run_job(&ctx, &RipJob::movie("/dev/sr0", "Horror", "Alien")).unwrap();

    assert_eq!(report.warnings.len(), 2, "{:?}", report.warnings);
    assert!(report.warnings[0].contains("Failed to match files"));
    assert!(report.warnings[1].contains("eject"));
    assert_eq!(names(&report.kept_files), vec!["title_t00.mkv"]);
}

#[test]
fn extraction_failure_is_fatal() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("ALIEN", &[(0, 7020)]),
        lookup: Some("Alien (1979)".to_string()),
        extract_fails: true,
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let err = run_job(&ctx, &RipJob::movie("/dev/sr0", "Horror", "Alien")).unwrap_err();
    assert!(matches!(err, RipError::Extraction(_)));
    assert_eq!(err.code(), "extraction_failed");
    assert!(runner.calls("eject").is_empty());
}

#[test]
fn missing_storage_root_is_fatal() {
    let lib = Library::new();
    let mut config = lib.config.clone();
    config.storage.path = lib.root().join("not-mounted");
    let runner = FakeDisc::default();
    let space = FixedSpace::default();
    let ctx = RipContext::new(&config, &runner, &space);

    let err = run_job(&ctx, &RipJob::movie("/dev/sr0", "Horror", "Alien")).unwrap_err();
    assert!(matches!(err, RipError::StorageMissing(_)));
}

#[test]
fn storage_must_be_a_mountpoint_when_required() {
    let lib = Library::new();
    let mut config = lib.config.clone();
    config.storage.require_mountpoint = true;
    let runner = FakeDisc {
        is_mountpoint: false,
        ..Default::default()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&config, &runner, &space);

    let err = run_job(&ctx, &RipJob::movie("/dev/sr0", "Horror", "Alien")).unwrap_err();
    assert!(matches!(err, RipError::NotMountpoint(_)));
    assert_eq!(runner.calls("mountpoint")[0][0], "-q");
}

#[test]
fn cancellation_stops_at_next_step() {
    let lib = Library::new();
    let runner = FakeDisc {
        info: disc_info("ALIEN", &[(0, 7020)]),
        rips: vec![("title_t00.mkv".to_string(), 7020.0)],
        lookup: Some("Alien (1979)".to_string()),
        ..Default::default()
    };
    let space = FixedSpace::default();
    let flag = Arc::new(AtomicBool::new(false));
    let trigger = flag.clone();
    let ctx = RipContext::new(&lib.config, &runner, &space)
        .with_cancel_flag(flag)
        .with_step_callback(Box::new(move |step| {
            if step == RipStep::Extract {
                trigger.store(true, Ordering::SeqCst);
            }
        }));

    let err = run_job(&ctx, &RipJob::movie("/dev/sr0", "Horror", "Alien")).unwrap_err();

    // The running extraction is not interrupted; rename never starts
    assert!(matches!(err, RipError::Cancelled));
    assert!(runner.extract_started.load(Ordering::SeqCst));
    assert_eq!(runner.calls("filebot").len(), 1);
    assert!(runner.calls("eject").is_empty());
}

// ---------------------------------------------------------------------------
// TV
// ---------------------------------------------------------------------------

fn tv_disc() -> FakeDisc {
    FakeDisc {
        rips: vec![
            ("title_t00.mkv".to_string(), 2900.0),
            ("title_t01.mkv".to_string(), 2950.5),
            ("title_t02.mkv".to_string(), 8700.0),
            ("title_t03.mkv".to_string(), 120.0),
        ],
        lookup: Some("Drama/Breaking Bad (2008) {tmdb-1234}".to_string()),
        ..Default::default()
    }
}

#[test]
fn tv_rip_keeps_episode_length_files() {
    let lib = Library::new();
    let runner = tv_disc();
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let job = RipJob::tv("/dev/sr1", "Breaking Bad", "1-2").unwrap();
    let report = run_job(&ctx, &job).unwrap();

    let expected = lib
        .root()
        .join("Drama")
        .join("Breaking Bad (2008) {tmdb-1234}")
        .join("Season 01");
    assert_eq!(report.output_dir, expected);
    assert_eq!(names(&report.kept_files), vec!["title_t00.mkv", "title_t01.mkv"]);
    assert_eq!(
        names(&report.removed_files),
        vec!["title_t02.mkv", "title_t03.mkv"]
    );
    assert!(!expected.join("title_t02.mkv").exists());

    let extract = runner
        .calls("makemkvcon")
        .into_iter()
        .find(|a| a[0] == "mkv")
        .unwrap();
    assert_eq!(extract[1], "disc:1");
    assert_eq!(extract[2], "all");
    assert_eq!(extract[4], "--minlength=600");

    let rename = runner
        .calls("filebot")
        .into_iter()
        .find(|a| a[0] == "-rename")
        .unwrap();
    assert!(rename.windows(2).any(|w| w == ["--db", "TheTVDB"]));
    assert!(rename
        .windows(2)
        .any(|w| w == ["--format", "{n} - S01E{e} - {t}"]));
    assert_eq!(runner.calls("eject"), vec![vec!["/dev/sr1".to_string()]]);
}

#[test]
fn tv_lookup_miss_uses_unknown_folder() {
    let lib = Library::new();
    let runner = FakeDisc {
        lookup: None,
        ..tv_disc()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let job = RipJob::tv("/dev/sr0", "the office", "3-1").unwrap();
    let report = run_job(&ctx, &job).unwrap();

    assert_eq!(
        report.output_dir,
        lib.root().join("Unknown").join("TheOffice").join("Season 03")
    );
    assert!(report.warnings.iter().any(|w| w.contains("Unknown/TheOffice")));
}

#[test]
fn tv_without_ffprobe_keeps_everything() {
    let lib = Library::new();
    let runner = FakeDisc {
        ffprobe_installed: false,
        ..tv_disc()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let job = RipJob::tv("/dev/sr0", "Breaking Bad", "1-1").unwrap();
    let report = run_job(&ctx, &job).unwrap();

    assert_eq!(report.kept_files.len(), 4);
    assert!(report.removed_files.is_empty());
    assert!(report.warnings.iter().any(|w| w.contains("ffprobe")));
    assert!(runner.calls("ffprobe").is_empty());
}

#[test]
fn tv_unprobeable_file_is_kept() {
    let lib = Library::new();
    let mut runner = tv_disc();
    runner.rips.push(("broken.mkv".to_string(), f64::NAN));
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let job = RipJob::tv("/dev/sr0", "Breaking Bad", "1-1").unwrap();
    let report = run_job(&ctx, &job).unwrap();

    assert!(names(&report.kept_files).contains(&"broken.mkv".to_string()));
    assert!(report.warnings.iter().any(|w| w.contains("broken.mkv")));
}

#[test]
fn tv_show_path_cannot_leave_the_root() {
    let lib = Library::new();
    let runner = FakeDisc {
        lookup: Some("../../outside/Lost (2004)".to_string()),
        ..tv_disc()
    };
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let job = RipJob::tv("/dev/sr0", "lost", "1-1").unwrap();
    let report = run_job(&ctx, &job).unwrap();

    assert_eq!(
        report.output_dir,
        lib.root().join("Unknown").join("Lost").join("Season 01")
    );
    assert!(report.output_dir.starts_with(lib.root()));
    assert!(report.warnings.iter().any(|w| w.contains("Unknown/Lost")));
}

#[test]
fn tv_rejects_invalid_season() {
    let lib = Library::new();
    let runner = FakeDisc::default();
    let space = FixedSpace::default();
    let ctx = RipContext::new(&lib.config, &runner, &space);

    let mut job = RipJob::tv("/dev/sr0", "Breaking Bad", "1-1").unwrap();
    job.season = Some(0);
    let err = run_job(&ctx, &job).unwrap_err();
    assert!(matches!(err, RipError::InvalidSeasonDisc(_)));
    assert!(runner.commands().is_empty());
}
