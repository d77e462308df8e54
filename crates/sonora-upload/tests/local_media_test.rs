mod helpers;

use helpers::*;
use sonora_core::UploadPhase;
use sonora_document::schema::{AUDIO, BLOCK_QUOTE, PARAGRAPH};
use sonora_document::{EditorModel, MemoryDocument, NewElement, NodeId, Position, Schema};
use sonora_upload::attributes::{SRC, UPLOAD_ID, UPLOAD_STATUS};
use sonora_upload::{BlobStore, LocalFetcher, LocalMediaResolver, UploadEvent};
use std::sync::Arc;

const DATA_URI: &str = "data:audio/mp3;base64,AAAA";

/// Document with one pasted `audio` element pointing at `src`
fn pasted_audio(src: &str) -> (MemoryDocument, NodeId) {
    let mut doc = MemoryDocument::with_empty_paragraph(Arc::new(Schema::with_audio()));
    let audio = doc
        .insert_element(
            NewElement::new(AUDIO)
                .with_attribute("controls", "controls")
                .with_attribute(SRC, src),
            Position::new(doc.root(), 1),
        )
        .unwrap();
    (doc, audio)
}

#[tokio::test]
async fn test_data_uri_resolves_to_mp3_file() {
    let file = LocalMediaResolver::default().resolve(DATA_URI).await.unwrap();
    assert_eq!(file.mime_type, "audio/mp3");
    assert_eq!(file.name, "audio.mp3");
}

#[tokio::test]
async fn test_local_audio_is_read_then_uploaded() {
    let (doc, audio) = pasted_audio(DATA_URI);
    let uploader = ScriptedUploader::new(&[0.5], CDN);
    let mut editing = editing_with(
        doc,
        uploader.clone(),
        &["mp3", "wav"],
        true,
        LocalMediaResolver::default(),
    );

    let ids = editing.upload_local_audios(editing.model().root());
    assert_eq!(ids.len(), 1);
    let id = ids[0];
    assert_eq!(editing.model().attribute(audio, UPLOAD_STATUS), Some("reading"));
    assert_eq!(editing.tracker(id).unwrap().phase(), UploadPhase::Idle);

    assert_eq!(editing.next_event().await, Some(UploadEvent::Started { id }));
    assert_eq!(editing.model().attribute(audio, UPLOAD_STATUS), Some("uploading"));

    let events = editing.run_until_idle().await;
    assert_eq!(
        events.last(),
        Some(&UploadEvent::Succeeded {
            id,
            locator: "https://cdn/audio.mp3".to_string()
        })
    );

    let received = uploader.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].name, "audio.mp3");
    assert_eq!(received[0].mime_type, "audio/mp3");
    assert_eq!(received[0].size, 3);

    let doc = editing.model();
    assert_eq!(doc.attribute(audio, SRC), Some("https://cdn/audio.mp3"));
    assert_eq!(doc.attribute(audio, UPLOAD_ID), None);
    assert_eq!(doc.attribute(audio, UPLOAD_STATUS), None);
}

#[tokio::test]
async fn test_blob_inside_pasted_container_is_uploaded() {
    let blobs = BlobStore::new();
    let url = blobs.register(vec![9u8; 16], Some("audio/wav"));

    let mut doc = MemoryDocument::with_empty_paragraph(Arc::new(Schema::with_audio()));
    let quote = doc
        .insert_element(NewElement::new(BLOCK_QUOTE), Position::new(doc.root(), 1))
        .unwrap();
    doc.insert_element(NewElement::new(PARAGRAPH), Position::new(quote, 0))
        .unwrap();
    let audio = doc
        .insert_element(
            NewElement::new(AUDIO).with_attribute(SRC, url.as_str()),
            Position::new(quote, 1),
        )
        .unwrap();

    let uploader = ScriptedUploader::new(&[], CDN);
    let mut editing = editing_with(
        doc,
        uploader.clone(),
        &["wav"],
        true,
        LocalMediaResolver::new(Arc::new(LocalFetcher::new(blobs))),
    );

    assert_eq!(editing.upload_local_audios(quote).len(), 1);
    editing.run_until_idle().await;

    assert_eq!(uploader.received()[0].name, "audio.wav");
    assert_eq!(editing.model().attribute(audio, SRC), Some("https://cdn/audio.wav"));
}

#[tokio::test]
async fn test_unreadable_local_audio_is_left_untouched() {
    let blobs = BlobStore::new();
    let url = blobs.register(vec![1u8], Some("audio/mp3"));
    blobs.revoke(&url);

    let (doc, audio) = pasted_audio(&url);
    let before = doc.render_html();
    let uploader = ScriptedUploader::new(&[], CDN);
    let mut editing = editing_with(
        doc,
        uploader.clone(),
        &["mp3"],
        true,
        LocalMediaResolver::new(Arc::new(LocalFetcher::new(blobs))),
    );

    let id = editing.upload_local_audios(audio)[0];
    let events = editing.run_until_idle().await;

    assert!(matches!(
        events.as_slice(),
        [UploadEvent::ResolveFailed { id: failed, .. }] if *failed == id
    ));
    assert_eq!(editing.model().render_html(), before);
    assert!(uploader.received().is_empty());
}

#[tokio::test]
async fn test_resolved_type_outside_policy_is_not_uploaded() {
    let (doc, audio) = pasted_audio(DATA_URI);
    let uploader = ScriptedUploader::new(&[], CDN);
    let mut editing = editing_with(doc, uploader.clone(), &["wav"], true, LocalMediaResolver::default());

    editing.upload_local_audios(audio);
    let events = editing.run_until_idle().await;

    assert!(matches!(events.as_slice(), [UploadEvent::ResolveFailed { .. }]));
    assert_eq!(editing.model().attribute(audio, SRC), Some(DATA_URI));
    assert_eq!(editing.model().attribute(audio, UPLOAD_ID), None);
    assert!(uploader.received().is_empty());
}

#[tokio::test]
async fn test_uppercase_data_uri_is_reuploaded() {
    let (doc, audio) = pasted_audio("data:audio/WAV;base64,AAAA");
    let uploader = ScriptedUploader::new(&[], CDN);
    let mut editing = editing_with(doc, uploader.clone(), &["wav"], true, LocalMediaResolver::default());

    assert_eq!(editing.upload_local_audios(audio).len(), 1);
    editing.run_until_idle().await;

    let received = uploader.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].mime_type, "audio/wav");
    assert_eq!(editing.model().attribute(audio, SRC), Some("https://cdn/audio.wav"));
}

#[tokio::test]
async fn test_remote_audio_is_not_reuploaded() {
    let (doc, _audio) = pasted_audio("https://cdn/already.mp3");
    let uploader = ScriptedUploader::new(&[], CDN);
    let mut editing = editing_with(doc, uploader, &["mp3"], true, LocalMediaResolver::default());

    assert!(editing.upload_local_audios(editing.model().root()).is_empty());
    assert!(editing.uploads().is_empty());
}

#[tokio::test]
async fn test_removing_audio_while_reading_cancels() {
    let (doc, audio) = pasted_audio(DATA_URI);
    let uploader = ScriptedUploader::new(&[], CDN);
    let mut editing = editing_with(doc, uploader.clone(), &["mp3"], true, LocalMediaResolver::default());

    let id = editing.upload_local_audios(audio)[0];
    editing.edit(|doc| doc.remove(audio)).unwrap();
    assert!(editing.tracker(id).is_none());

    assert_eq!(editing.run_until_idle().await, Vec::new());
    assert!(uploader.received().is_empty());
}
