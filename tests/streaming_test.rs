use packarc::archive::{pack_folder, PackOptions};
use packarc::stream::{ByteSource, ReadByteSource, StreamDecoder, StreamEvent, StreamFile, VecByteSource};
use std::fs;
use tempfile::tempdir;

fn build_archive() -> Vec<u8> {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"first file contents").unwrap();
    fs::write(src.path().join("b.txt"), b"second file, a bit longer than the first").unwrap();
    let archive_path = tempdir().unwrap().path().join("out.packarc");
    pack_folder(src.path(), &archive_path, PackOptions::default()).unwrap();
    fs::read(&archive_path).unwrap()
}

fn drain<S: ByteSource>(mut decoder: StreamDecoder<S>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = decoder.next_event().unwrap() {
        events.push(event);
    }
    events
}

#[test]
fn streaming_decode_is_identical_across_chunk_sizes() {
    let bytes = build_archive();

    let whole = drain(StreamDecoder::new(VecByteSource::new(vec![bytes.clone()])));

    let chunked: Vec<Vec<u8>> = bytes.chunks(3).map(|c| c.to_vec()).collect();
    let in_threes = drain(StreamDecoder::new(VecByteSource::new(chunked)));

    let one_byte: Vec<Vec<u8>> = bytes.iter().map(|&b| vec![b]).collect();
    let byte_by_byte = drain(StreamDecoder::new(VecByteSource::new(one_byte)));

    assert_eq!(whole.len(), in_threes.len());
    assert_eq!(whole.len(), byte_by_byte.len());

    for event in [&whole, &in_threes, &byte_by_byte] {
        match &event[0] {
            StreamEvent::NormalFile { folder: _, files } => {
                assert_eq!(files.len(), 2);
                let StreamFile::Content { data, .. } = &files[0] else { panic!("expected Content") };
                assert_eq!(data, b"first file contents");
            }
            _ => panic!("expected a NormalFile event"),
        }
    }
}

#[test]
fn read_adapter_drives_the_same_decoder() {
    let bytes = build_archive();
    let source = ReadByteSource::new(std::io::Cursor::new(bytes), 16);
    let events = drain(StreamDecoder::new(source));
    assert_eq!(events.len(), 1);
}
