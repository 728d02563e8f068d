use std::fs;
use tempfile::tempdir;

use umbra::keysearch::{KeySearch, xor_decrypt};

fn create_test_jpeg() -> Vec<u8> {
    let mut jpeg = Vec::new();

    jpeg.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
    jpeg.extend_from_slice(b"JFIF\x00\x01\x01\x00\x00\x48\x00\x48\x00\x00");

    while jpeg.len() < 2048 {
        let idx = jpeg.len();
        jpeg.push(((idx.wrapping_mul(131).wrapping_add(17)) % 251) as u8);
    }

    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

#[test]
fn recovers_known_jpeg_key() {
    let dir = tempdir().unwrap();
    let blob_path = dir.path().join("data.bin");
    let output_dir = dir.path().join("decrypted");

    let jpeg = create_test_jpeg();
    let encrypted = xor_decrypt(&jpeg, (0x31, 0x32));
    fs::write(&blob_path, &encrypted).unwrap();

    let found = KeySearch::new(&blob_path, &output_dir).run(None).unwrap();

    let hit = found
        .iter()
        .find(|r| r.key == (0x31, 0x32))
        .expect("key (0x31, 0x32) should be among the accepted candidates");
    assert_eq!(hit.mime, "image/jpeg");

    let recovered = fs::read(output_dir.join("recovered_31_32.bin")).unwrap();
    assert_eq!(recovered, jpeg, "decrypted candidate should match plaintext");
}

#[test]
fn unrecoverable_blob_reports_nothing() {
    let dir = tempdir().unwrap();
    let blob_path = dir.path().join("noise.bin");
    let output_dir = dir.path().join("decrypted");

    fs::write(&blob_path, [0x00u8, 0x00]).unwrap();

    let found = KeySearch::new(&blob_path, &output_dir).run(None).unwrap();
    assert!(found.is_empty(), "no key should decrypt 2 null bytes");

    assert!(output_dir.is_dir(), "output dir is created even on a miss");
    assert_eq!(fs::read_dir(&output_dir).unwrap().count(), 0);
}

#[test]
fn missing_blob_is_fatal() {
    let dir = tempdir().unwrap();
    let search = KeySearch::new(dir.path().join("absent.bin"), dir.path().join("out"));
    assert!(search.run(None).is_err());
}

#[test]
fn rerun_overwrites_candidates() {
    let dir = tempdir().unwrap();
    let blob_path = dir.path().join("data.bin");
    let output_dir = dir.path().join("decrypted");

    let jpeg = create_test_jpeg();
    fs::write(&blob_path, xor_decrypt(&jpeg, (0x35, 0x41))).unwrap();

    let search = KeySearch::new(&blob_path, &output_dir);
    let first = search.run(None).unwrap();
    let second = search.run(None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn progress_reaches_all_stripes() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let dir = tempdir().unwrap();
    let blob_path = dir.path().join("data.bin");
    fs::write(&blob_path, [0x00u8, 0x00]).unwrap();

    let max_seen = AtomicUsize::new(0);
    let progress = |done: usize, total: usize| {
        assert_eq!(total, 256);
        max_seen.fetch_max(done, Ordering::Relaxed);
    };

    KeySearch::new(&blob_path, dir.path().join("out"))
        .run(Some(&progress))
        .unwrap();
    assert_eq!(max_seen.load(Ordering::Relaxed), 256);
}
