use std::fs;

use tempfile::tempdir;

use crate::{
    error::Error,
    hash::{hash_bytes, hash_file, HashAlgorithm},
};

#[test]
fn known_digests() {
    assert_eq!(
        hash_bytes(b"abc", HashAlgorithm::Md5),
        "900150983cd24fb0d6963f7d28e17f72"
    );
    assert_eq!(
        hash_bytes(b"abc", HashAlgorithm::Sha256),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(hash_bytes(b"", HashAlgorithm::Sha512).len(), 128);
    assert_eq!(hash_bytes(b"", HashAlgorithm::Blake3).len(), 64);
}

#[tokio::test]
async fn file_hash_matches_bytes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.bin");
    let data = vec![7u8; 200_000];
    fs::write(&path, &data).unwrap();

    for algorithm in [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Blake3,
    ] {
        let from_file = hash_file(path.clone(), algorithm).await.unwrap();
        assert_eq!(from_file, hash_bytes(&data, algorithm));
    }
}

#[tokio::test]
async fn directories_are_rejected() {
    let dir = tempdir().unwrap();
    let result = hash_file(dir.path().to_owned(), HashAlgorithm::Md5).await;
    assert!(matches!(result, Err(Error::FileIsDirectory(_))));
}

#[tokio::test]
async fn missing_files_are_rejected() {
    let dir = tempdir().unwrap();
    let result = hash_file(dir.path().join("nope"), HashAlgorithm::Md5).await;
    assert!(matches!(result, Err(Error::FileDoesNotExist(_))));
}
