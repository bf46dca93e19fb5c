use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;

use daily_publish_core::artwork::SvgArtwork;
use daily_publish_core::config::{GenerationConfig, PathsConfig, PublishConfig};
use daily_publish_core::contract::{
    AudioRecord, DailyRecord, MockArtworkGenerator, MockAudioPlayer, MockRemoteStore,
    MockVersionControl, TextRecord,
};
use daily_publish_core::error::{ArtworkError, PublishError, StoreError};
use daily_publish_core::mirror::MirroredText;
use daily_publish_core::pipeline::{
    outcome_of, publish, Outcome, PublishArgs, Services, Stage, StageStatus,
};
use daily_publish_core::prompt::ScriptedPrompt;

const CORPUS: &str = "Morning rain falls softly on the roof\nEvening light fades slowly over the hills\n";

fn config(root: &Path, text_count: usize) -> PublishConfig {
    fs::write(root.join("corpus.txt"), CORPUS).unwrap();
    PublishConfig {
        paths: PathsConfig {
            incoming_dir: root.join("incoming"),
            backup_dir: root.join("backup"),
            template: root.join("templates/daily.md"),
            content_dir: root.join("content"),
            corpus: root.join("corpus.txt"),
            audio_cache_dir: root.join("local/audio"),
            texts_cache: root.join("local/texts.json"),
            artwork_cache_dir: root.join("local/covers"),
        },
        generation: GenerationConfig {
            text_count,
            max_words: 12,
            seed: Some(7),
        },
        ..PublishConfig::default()
    }
}

fn args(name: &str) -> PublishArgs {
    PublishArgs {
        name: name.to_string(),
        description: "A quiet day".to_string(),
        today: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    }
}

/// Canonical PCM header with `byte_rate` and `data_size`, followed by the payload.
fn wav(byte_rate: u32, data_size: u32) -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(b"RIFF");
    b.extend_from_slice(&(36 + data_size).to_le_bytes());
    b.extend_from_slice(b"WAVE");
    b.extend_from_slice(b"fmt ");
    b.extend_from_slice(&16u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&(byte_rate / 2).to_le_bytes());
    b.extend_from_slice(&byte_rate.to_le_bytes());
    b.extend_from_slice(&2u16.to_le_bytes());
    b.extend_from_slice(&16u16.to_le_bytes());
    b.extend_from_slice(b"data");
    b.extend_from_slice(&data_size.to_le_bytes());
    b.resize(b.len() + data_size as usize, 0);
    b
}

fn failing_artwork() -> MockArtworkGenerator {
    let mut artwork = MockArtworkGenerator::new();
    artwork
        .expect_generate()
        .returning(|_| Err(ArtworkError("renderer offline".to_string())));
    artwork
}

#[tokio::test]
async fn text_only_run_records_texts_and_skips_publish() {
    let root = tempdir().unwrap();
    let config = config(root.path(), 2);

    let mut store = MockRemoteStore::new();
    store
        .expect_insert_daily()
        .withf(|r: &DailyRecord| r.name == "quiet" && r.cover_art_url.is_none())
        .times(1)
        .returning(|_| Ok(7));
    store
        .expect_insert_text()
        .withf(|r: &TextRecord| r.daily_id == 7)
        .times(2)
        .returning(|_| Ok(()));

    let mut vcs = MockVersionControl::new();
    vcs.expect_checkout_or_create_branch()
        .withf(|b: &str| b == "quiet")
        .times(1)
        .returning(|_| Ok(()));
    vcs.expect_commit_all().times(0);
    vcs.expect_push().times(0);

    let prompt = ScriptedPrompt::new(["a", "70", "a", "60"]);
    let player = MockAudioPlayer::new();
    let artwork = failing_artwork();
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let report = publish(&config, services, args("quiet"), &mut rng)
        .await
        .expect("text-only run should complete");

    assert!(prompt.is_exhausted());
    assert_eq!(report.outcome(), Outcome::CompletedWithSkips);
    assert_eq!(report.state.daily_id, Some(7));
    assert!(!report.state.published);
    assert!(report.state.assets.is_empty());
    assert_eq!(report.state.texts.len(), 2);
    assert_eq!(report.state.skipped.len(), 1);
    assert_eq!(report.state.skipped[0].stage, Stage::GenerateArtwork);
    assert!(report
        .state
        .log
        .iter()
        .any(|s| s.stage == Stage::SkipPublish && s.status == StageStatus::Skipped));
    assert!(!report.state.log.iter().any(|s| s.stage == Stage::Publish));

    let document = root.path().join("content/quiet/quiet.md");
    assert_eq!(report.state.document.as_deref(), Some(document.as_path()));
    let body = fs::read_to_string(document).unwrap();
    assert!(body.contains(&report.state.texts[0].content));

    let mirrored: Vec<MirroredText> =
        serde_json::from_str(&fs::read_to_string(root.path().join("local/texts.json")).unwrap())
            .unwrap();
    assert_eq!(mirrored.len(), 2);
    assert_eq!(mirrored[0].id, 1);
    assert_eq!(mirrored[1].coherency_level, 60);
    assert!(mirrored.iter().all(|t| t.daily_id == Some(7)));
    assert!(!root.path().join("local/audio").exists());
    assert!(!root.path().join("local/covers").exists());
}

#[tokio::test]
async fn failed_upload_excludes_only_that_asset() {
    let root = tempdir().unwrap();
    let config = config(root.path(), 1);
    let incoming = root.path().join("incoming/day");
    fs::create_dir_all(&incoming).unwrap();
    fs::write(incoming.join("a.wav"), wav(100, 100)).unwrap();
    fs::write(incoming.join("b.wav"), wav(100, 300)).unwrap();

    let mut store = MockRemoteStore::new();
    store
        .expect_upload_blob()
        .withf(|path: &str, _: &[u8], ct: &str| path == "audio/day/day-1.wav" && ct == "audio/wav")
        .times(1)
        .returning(|path, _, _| Ok(format!("https://store/{path}")));
    store
        .expect_upload_blob()
        .withf(|path: &str, _: &[u8], _: &str| path == "audio/day/day-2.wav")
        .times(1)
        .returning(|path, _, _| {
            Err(StoreError::Status {
                url: path.to_string(),
                status: 500,
                body: "boom".to_string(),
            })
        });
    store
        .expect_upload_blob()
        .withf(|path: &str, _: &[u8], ct: &str| path == "covers/day.svg" && ct == "image/svg+xml")
        .times(1)
        .returning(|path, _, _| Ok(format!("https://store/{path}")));
    store
        .expect_insert_daily()
        .withf(|r: &DailyRecord| r.cover_art_url.as_deref() == Some("https://store/covers/day.svg"))
        .times(1)
        .returning(|_| Ok(3));
    store
        .expect_insert_audio()
        .withf(|r: &AudioRecord| {
            r.daily_id == 3
                && r.file_name == "day-1.wav"
                && r.duration_seconds == Some(1)
                && r.coherency_level == Some(50)
        })
        .times(1)
        .returning(|_| Ok(()));
    store
        .expect_insert_text()
        .times(1)
        .returning(|_| Ok(()));
    store
        .expect_download_blob()
        .withf(|path: &str| path == "audio/day/day-1.wav")
        .times(1)
        .returning(|_| Ok(b"audio".to_vec()));
    store
        .expect_download_blob()
        .withf(|path: &str| path == "covers/day.svg")
        .times(1)
        .returning(|_| Ok(b"<svg/>".to_vec()));

    let mut vcs = MockVersionControl::new();
    vcs.expect_checkout_or_create_branch()
        .times(1)
        .returning(|_| Ok(()));
    vcs.expect_commit_all()
        .withf(|m: &str| m == "Publish day")
        .times(1)
        .returning(|_| Ok(()));
    vcs.expect_push()
        .withf(|b: &str| b == "day")
        .times(1)
        .returning(|_| Ok(()));

    // day-1: no playback, default rating. day-2 never reaches review. Then one text.
    let prompt = ScriptedPrompt::new(["s", "", "a", "90"]);
    let player = MockAudioPlayer::new();
    let artwork = SvgArtwork;
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let report = publish(&config, services, args("day"), &mut rng)
        .await
        .expect("run should complete despite one failed upload");

    assert_eq!(report.outcome(), Outcome::CompletedWithSkips);
    assert!(report.state.published);
    assert_eq!(report.state.assets.len(), 1);
    assert_eq!(report.state.assets[0].file_name, "day-1.wav");
    let skipped = &report.state.skipped;
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].stage, Stage::ProcessAssets);
    assert_eq!(skipped[0].item, "day-2.wav");

    let body = fs::read_to_string(root.path().join("content/day/day.md")).unwrap();
    assert!(body.contains("- [day-1.wav](https://store/audio/day/day-1.wav) (0:01)"));
    assert!(!body.contains("day-2.wav"));
    assert!(body.contains("https://store/covers/day.svg"));

    assert!(root.path().join("backup").read_dir().unwrap().next().is_some());
    assert_eq!(
        fs::read(root.path().join("local/audio/day/day-1.wav")).unwrap(),
        b"audio"
    );
    assert!(root.path().join("local/covers/day.svg").is_file());
    assert!(report.state.mirror_failures.is_empty());
}

#[tokio::test]
async fn daily_record_failure_aborts_before_dependent_writes() {
    let root = tempdir().unwrap();
    let config = config(root.path(), 1);

    let mut store = MockRemoteStore::new();
    store.expect_insert_daily().times(1).returning(|_| {
        Err(StoreError::Transport {
            url: "https://store/rest/v1/dailies".to_string(),
            message: "connection refused".to_string(),
        })
    });
    store.expect_insert_text().times(0);
    store.expect_insert_audio().times(0);

    let mut vcs = MockVersionControl::new();
    vcs.expect_checkout_or_create_branch()
        .returning(|_| Ok(()));
    vcs.expect_commit_all().times(0);

    let prompt = ScriptedPrompt::new(["a", "40"]);
    let player = MockAudioPlayer::new();
    let artwork = failing_artwork();
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let result = publish(&config, services, args("broken"), &mut rng).await;

    assert_eq!(outcome_of(&result), Outcome::Aborted);
    assert!(matches!(result, Err(PublishError::TopLevelRecord(_))));
    assert!(!root.path().join("content/broken").exists());
    assert!(!root.path().join("local/texts.json").exists());
}

#[tokio::test]
async fn empty_name_is_rejected_before_any_side_effect() {
    let root = tempdir().unwrap();
    let config = config(root.path(), 1);

    let store = MockRemoteStore::new();
    let vcs = MockVersionControl::new();
    let prompt = ScriptedPrompt::new(Vec::<String>::new());
    let player = MockAudioPlayer::new();
    let artwork = MockArtworkGenerator::new();
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let result = publish(&config, services, args("   "), &mut rng).await;
    assert!(matches!(result, Err(PublishError::Validation(_))));
    assert!(prompt.questions().is_empty());
}

#[tokio::test]
async fn branch_failure_is_fatal() {
    let root = tempdir().unwrap();
    let config = config(root.path(), 1);

    let store = MockRemoteStore::new();
    let mut vcs = MockVersionControl::new();
    vcs.expect_checkout_or_create_branch().returning(|_| {
        Err(daily_publish_core::error::VcsError::Exit {
            command: "checkout -b day".to_string(),
            status: "non-zero exit".to_string(),
        })
    });
    let prompt = ScriptedPrompt::new(Vec::<String>::new());
    let player = MockAudioPlayer::new();
    let artwork = MockArtworkGenerator::new();
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let result = publish(&config, services, args("day"), &mut rng).await;
    assert!(matches!(
        result,
        Err(PublishError::ExternalTool { stage: "init-branch", .. })
    ));
}

#[tokio::test]
async fn skipped_text_is_dropped_and_reported() {
    let root = tempdir().unwrap();
    let config = config(root.path(), 2);

    let mut store = MockRemoteStore::new();
    store.expect_insert_daily().returning(|_| Ok(1));
    store.expect_insert_text().times(1).returning(|_| Ok(()));

    let mut vcs = MockVersionControl::new();
    vcs.expect_checkout_or_create_branch()
        .returning(|_| Ok(()));

    // First text: regenerate once, then accept. Second text: skip.
    let prompt = ScriptedPrompt::new(["r", "a", "33", "s"]);
    let player = MockAudioPlayer::new();
    let artwork = failing_artwork();
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let report = publish(&config, services, args("mixed"), &mut rng)
        .await
        .unwrap();

    assert_eq!(report.state.texts.len(), 1);
    assert_eq!(report.state.texts[0].coherency_level, 33);
    assert!(report
        .state
        .skipped
        .iter()
        .any(|s| s.stage == Stage::ReviewTexts && s.item == "text 2/2"));
    assert!(report.summary().contains("text 2/2"));
}

#[tokio::test]
async fn missing_corpus_aborts_run() {
    let root = tempdir().unwrap();
    let mut config = config(root.path(), 1);
    config.paths.corpus = root.path().join("nope.txt");

    let store = MockRemoteStore::new();
    let mut vcs = MockVersionControl::new();
    vcs.expect_checkout_or_create_branch()
        .returning(|_| Ok(()));
    let prompt = ScriptedPrompt::new(Vec::<String>::new());
    let player = MockAudioPlayer::new();
    let artwork = MockArtworkGenerator::new();
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let result = publish(&config, services, args("day"), &mut rng).await;
    assert!(matches!(result, Err(PublishError::Corpus { .. })));
}

#[tokio::test]
async fn record_and_mirror_failures_do_not_stop_siblings() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let root = tempdir().unwrap();
    let mut config = config(root.path(), 2);
    // A regular file where the cache directory should be.
    fs::write(root.path().join("blocker"), b"not a directory").unwrap();
    config.paths.texts_cache = root.path().join("blocker/texts.json");

    let mut store = MockRemoteStore::new();
    store.expect_insert_daily().times(1).returning(|_| Ok(5));
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    store
        .expect_insert_text()
        .withf(|r: &TextRecord| r.daily_id == 5)
        .times(2)
        .returning(move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(StoreError::Status {
                    url: "https://store/rest/v1/texts".to_string(),
                    status: 409,
                    body: "conflict".to_string(),
                })
            } else {
                Ok(())
            }
        });

    let mut vcs = MockVersionControl::new();
    vcs.expect_checkout_or_create_branch()
        .returning(|_| Ok(()));
    vcs.expect_commit_all().times(0);

    let prompt = ScriptedPrompt::new(["a", "20", "a", "80"]);
    let player = MockAudioPlayer::new();
    let artwork = failing_artwork();
    let services = Services {
        store: &store,
        vcs: &vcs,
        prompt: &prompt,
        player: &player,
        artwork: &artwork,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let result = publish(&config, services, args("partial"), &mut rng).await;
    assert_ne!(outcome_of(&result), Outcome::Aborted);
    let report = result.expect("record and mirror failures are recovered");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.outcome(), Outcome::CompletedWithSkips);
    assert_eq!(report.state.texts.len(), 2);
    let record_skips: Vec<&str> = report
        .state
        .skipped
        .iter()
        .filter(|s| s.stage == Stage::PersistRecords)
        .map(|s| s.item.as_str())
        .collect();
    assert_eq!(record_skips, ["text record 1"]);
    assert!(report
        .state
        .log
        .iter()
        .any(|s| s.stage == Stage::PersistRecords && s.status == StageStatus::Partial));

    assert_eq!(report.state.mirror_failures.len(), 1);
    assert!(report.state.mirror_failures[0].hint.contains("by hand"));
    assert!(report
        .state
        .log
        .iter()
        .any(|s| s.stage == Stage::MirrorLocal && s.status == StageStatus::Partial));
    assert!(report.state.log.iter().any(|s| s.stage == Stage::Done));
    assert!(report.summary().contains("mirror:"));
    assert!(root.path().join("content/partial/partial.md").is_file());
}
