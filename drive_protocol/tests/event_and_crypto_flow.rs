//! Exercises the modules together the way `drive_sync`/`drive` compose them:
//! encrypt file bytes, build and sign the DRIVE event describing them, parse
//! it back, and walk the share-link path for the resulting event.

use drive_protocol::event::{parse_drive_content, DriveContent, Event, KIND_DRIVE};
use drive_protocol::hash::Hash;
use drive_protocol::signer::LocalSigner;
use drive_protocol::{crypto, path};

#[test]
fn upload_then_download_round_trip_through_event_model() {
    let signer = LocalSigner::generate();
    let plaintext = b"hello world";

    let encrypted = crypto::encrypt(plaintext);
    let ciphertext_hash = Hash::new(&encrypted.blob);

    let content = DriveContent::File {
        hash: ciphertext_hash.to_hex(),
        path: "/f.txt".to_string(),
        size: encrypted.blob.len() as u64,
        file_type: Some("text/plain".to_string()),
        encryption_algorithm: Some(crypto::ALGORITHM_AES_GCM.to_string()),
        decryption_key: Some(crypto::key_to_b64(&encrypted.key)),
        decryption_nonce: Some(crypto::nonce_to_b64(&encrypted.nonce)),
    };
    let body = serde_json::to_string(&content).unwrap();

    let event = Event::build(&signer, 1_700_000_000, KIND_DRIVE, vec![], body);
    event.validate().unwrap();

    let parsed = parse_drive_content(&event.content).unwrap();
    assert!(parsed.is_file());
    assert_eq!(parsed.path(), "/f.txt");

    let DriveContent::File {
        hash,
        decryption_key,
        decryption_nonce,
        ..
    } = &parsed
    else {
        panic!("expected file content");
    };
    assert_eq!(*hash, ciphertext_hash.to_hex());

    let key = crypto::validate_key_b64(decryption_key.as_ref().unwrap()).unwrap();
    let nonce = crypto::validate_nonce_b64(decryption_nonce.as_ref().unwrap()).unwrap();
    let decrypted = crypto::decrypt(&encrypted.blob, &key, &nonce).unwrap();
    assert_eq!(decrypted, plaintext);
}

#[test]
fn normalized_path_is_used_consistently_in_content() {
    let raw_path = "/Documents/../Documents/report.pdf";
    let normalized = path::normalize(raw_path);
    assert_eq!(normalized, "/Documents/report.pdf");
    assert!(path::is_within("/Documents", &normalized));
}
