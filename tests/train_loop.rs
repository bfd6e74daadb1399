use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use image::GrayImage;

use unet_seg::{Mode, RunConfig, run_training};

type Back = Autodiff<NdArray<f32>>;

fn write_split(root: &Path, split: &str, count: usize) {
    let dir = root.join(split);
    std::fs::create_dir_all(&dir).unwrap();
    for index in 0..count {
        let offset = index as u32;
        let input = GrayImage::from_fn(16, 16, |x, y| {
            image::Luma([((x * 13 + y * 7 + offset * 29) % 256) as u8])
        });
        let label = GrayImage::from_fn(16, 16, |x, _| {
            image::Luma([if x >= 8 { 255 } else { 0 }])
        });
        input.save(dir.join(format!("input_{index:03}.png"))).unwrap();
        label.save(dir.join(format!("label_{index:03}.png"))).unwrap();
    }
}

fn test_config(root: &Path) -> RunConfig {
    RunConfig::new(Mode::Train)
        .with_batch_size(4)
        .with_num_epochs(1)
        .with_data_dir(root.join("datasets").to_string_lossy().into_owned())
        .with_ckpt_dir(root.join("checkpoint").to_string_lossy().into_owned())
        .with_log_dir(root.join("log").to_string_lossy().into_owned())
        .with_result_dir(root.join("result").to_string_lossy().into_owned())
        .with_base_channels(2)
}

#[test]
fn one_epoch_over_eight_samples_logs_two_snapshots_and_one_scalar() {
    let dir = tempfile::tempdir().unwrap();
    let datasets = dir.path().join("datasets");
    write_split(&datasets, "train", 8);
    write_split(&datasets, "val", 4);

    let config = test_config(dir.path());
    let report = run_training::<Back>(&config, &Default::default()).unwrap();

    assert_eq!(report.epochs_run, 1);
    assert_eq!(report.train_snapshots, 2);
    assert_eq!(report.train_scalars, 1);
    assert!(report.final_train_loss.unwrap().is_finite());
    assert!(report.final_valid_loss.unwrap().is_finite());

    // Snapshots land at global steps 0 and 1 for epoch one.
    let train_log = dir.path().join("log").join("train");
    for tag in ["label", "input", "output"] {
        assert!(train_log.join(format!("{tag}-000000.png")).exists());
        assert!(train_log.join(format!("{tag}-000001.png")).exists());
    }
    let scalars = std::fs::read_to_string(train_log.join("scalars.csv")).unwrap();
    assert_eq!(scalars.lines().count(), 1);
    assert!(scalars.starts_with("1,loss,"));

    // Validation sink got its own snapshot and scalar.
    let val_log = dir.path().join("log").join("val");
    assert!(val_log.join("label-000000.png").exists());
    assert!(val_log.join("scalars.csv").exists());

    // Epoch 1 is not a checkpoint epoch; only the persisted config is there.
    let ckpt = dir.path().join("checkpoint");
    assert!(ckpt.join("config.json").exists());
    assert!(!ckpt.join("model-1.mpk").exists());
}

#[test]
fn checkpoint_written_on_fifth_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let datasets = dir.path().join("datasets");
    write_split(&datasets, "train", 4);
    write_split(&datasets, "val", 4);

    let config = test_config(dir.path()).with_num_epochs(5);
    let report = run_training::<Back>(&config, &Default::default()).unwrap();

    assert_eq!(report.epochs_run, 5);
    let ckpt = dir.path().join("checkpoint");
    assert!(ckpt.join("model-5.mpk").exists());
    assert!(ckpt.join("optim-5.mpk").exists());
}

#[test]
fn train_continue_resumes_from_last_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let datasets = dir.path().join("datasets");
    write_split(&datasets, "train", 4);
    write_split(&datasets, "val", 4);

    let config = test_config(dir.path()).with_num_epochs(5);
    run_training::<Back>(&config, &Default::default()).unwrap();

    // Resuming at epoch 5 with num_epochs 5 leaves nothing to do.
    let config = test_config(dir.path())
        .with_num_epochs(5)
        .with_train_continue(true);
    let report = run_training::<Back>(&config, &Default::default()).unwrap();
    assert_eq!(report.epochs_run, 0);
    assert_eq!(report.train_snapshots, 0);
    assert!(report.final_train_loss.is_none());
}

#[test]
fn empty_train_split_is_a_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let datasets = dir.path().join("datasets");
    std::fs::create_dir_all(datasets.join("train")).unwrap();
    write_split(&datasets, "val", 4);

    let config = test_config(dir.path());
    let err = run_training::<Back>(&config, &Default::default()).unwrap_err();
    assert!(err.to_string().contains("empty"));
}

#[test]
fn missing_data_directory_is_a_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    assert!(run_training::<Back>(&config, &Default::default()).is_err());
}
