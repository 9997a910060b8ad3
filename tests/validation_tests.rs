use std::fs::File;
use std::io::Write;

use gallery_uploader::errors::AppError;
use gallery_uploader::security::InputValidator;
use gallery_uploader::session::CapturedItem;
use gallery_uploader::source::{FileImageSource, ImageSource};

/// Integration tests for file validation and the filesystem image source

#[tokio::test]
async fn source_rejects_missing_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("definitely_not_there.png");

    let source = FileImageSource::new(50);
    let item = CapturedItem::new(missing.to_string_lossy().to_string());

    let err = source.load(&item).await.unwrap_err();
    assert!(matches!(err, AppError::FileNotFound { .. }));
}

#[tokio::test]
async fn source_rejects_non_image_extension() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("notes.txt");
    File::create(&path).unwrap().write_all(b"hello").unwrap();

    let source = FileImageSource::new(50);
    let item = CapturedItem::new(path.to_string_lossy().to_string());

    let err = source.load(&item).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidFileType { .. }));
}

#[tokio::test]
async fn source_rejects_oversized_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("huge.png");

    // 2MB of zeroes against a 1MB limit; the size check fires before any
    // decoding is attempted
    let data = vec![0u8; 2 * 1024 * 1024];
    File::create(&path).unwrap().write_all(&data).unwrap();

    let source = FileImageSource::new(1);
    let item = CapturedItem::new(path.to_string_lossy().to_string());

    let err = source.load(&item).await.unwrap_err();
    assert!(matches!(err, AppError::FileTooLarge { .. }));
}

#[test]
fn validator_rejects_corrupt_image_data() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("fake.png");
    File::create(&path)
        .unwrap()
        .write_all(b"this is not a png")
        .unwrap();

    let err = InputValidator::validate_image_file(&path.to_string_lossy(), 50).unwrap_err();
    assert!(matches!(err, AppError::Image(_)));
}

#[test]
fn filename_sanitization_flows_into_remote_names() {
    let sanitized = InputValidator::sanitize_filename("site visit: 08/28");
    assert!(!sanitized.contains(':'));
    assert!(!sanitized.contains('/'));
    assert!(!sanitized.is_empty());
}
