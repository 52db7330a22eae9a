use milxly2nvg::{
    BufferedEmitter, CollectingDiagnostics, IncrementalEmitter, MappingPolicy, NvgDocument,
    NvgPoint, StreamingTranscoder, TranscodeError, TranscodeOptions,
};

use crate::common::mocks::{FailingReader, FailingWriter, TrickleReader};
use crate::common::test_helpers::{graphic, layer_with_points, milxly_layer, transcode_bytes};

#[test]
fn test_trickling_input_gives_same_document() {
    let mut xml = milxly2nvg::bom::UTF8_BOM.to_vec();
    xml.extend_from_slice(layer_with_points(&[(1.0, 2.0), (3.0, 4.0)]).as_bytes());

    let diagnostics = CollectingDiagnostics::new();
    let mut emitter = BufferedEmitter::new(Vec::new());
    StreamingTranscoder::new(TranscodeOptions::default(), &diagnostics)
        .transcode(TrickleReader::new(&xml[..], 1), &mut emitter)
        .unwrap();

    let (_, expected, _) = transcode_bytes(&xml, TranscodeOptions::default()).unwrap();
    assert_eq!(emitter.document(), &expected);
    assert_eq!(expected.points().len(), 2);
}

#[test]
fn test_read_error_aborts_transcoding() {
    let xml = layer_with_points(&[(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
    let diagnostics = CollectingDiagnostics::new();
    let mut emitter = BufferedEmitter::new(Vec::new());

    let result = StreamingTranscoder::new(TranscodeOptions::default(), &diagnostics)
        .transcode(FailingReader::new(xml.as_bytes(), xml.len() / 2), &mut emitter);

    assert!(matches!(
        result,
        Err(TranscodeError::Io(_)) | Err(TranscodeError::Xml(_))
    ));
    // Nothing was marshalled
    assert!(emitter.into_inner().is_empty());
}

#[test]
fn test_write_error_surfaces_from_incremental_emitter() {
    let xml = layer_with_points(&[(1.0, 2.0); 50]);
    let diagnostics = CollectingDiagnostics::new();
    let mut emitter = IncrementalEmitter::new(FailingWriter::new(256));

    let result = StreamingTranscoder::new(TranscodeOptions::default(), &diagnostics)
        .transcode(xml.as_bytes(), &mut emitter);

    assert!(result.is_err());
}

#[test]
fn test_descriptor_is_reported_at_debug_level() {
    let xml = milxly_layer(&[graphic("SFGPUCI----D", &[(8.5, 47.0)])]);

    let (report, _, diagnostics) = transcode_bytes(xml.as_bytes(), TranscodeOptions::default())
        .unwrap();

    assert_eq!(report.descriptor_failures, 0);
    let entries = diagnostics.entries();
    assert!(
        entries
            .iter()
            .any(|d| d.message.contains("SFGPUCI----D") && d.message.contains("Name:SFGPUCI----D"))
    );
    assert!(diagnostics.warnings().is_empty());
}

#[test]
fn test_records_at_any_depth() {
    let xml = format!(
        "<Root><Folder><Folder>{}</Folder></Folder>{}</Root>",
        graphic("A", &[(1.0, 1.0)]),
        graphic("B", &[(2.0, 2.0)])
    );

    let (report, document, _) = transcode_bytes(xml.as_bytes(), TranscodeOptions::default())
        .unwrap();

    assert_eq!(report.records_seen, 2);
    assert_eq!(
        document.points(),
        vec![NvgPoint { x: 1.0, y: 1.0 }, NvgPoint { x: 2.0, y: 2.0 }]
    );
}

#[test]
fn test_incremental_each_point_matches_buffered() {
    let xml = milxly_layer(&[
        graphic("A", &[(1.0, 1.0), (1.5, 1.5)]),
        graphic("B", &[]),
        graphic("C", &[(3.0, 3.0)]),
    ]);
    let options = TranscodeOptions {
        policy: MappingPolicy::EachPoint,
        ..TranscodeOptions::default()
    };

    let diagnostics = CollectingDiagnostics::new();
    let mut incremental = IncrementalEmitter::new(Vec::new());
    let report = StreamingTranscoder::new(options.clone(), &diagnostics)
        .transcode(xml.as_bytes(), &mut incremental)
        .unwrap();
    let streamed = NvgDocument::read_from(&incremental.into_inner()[..]).unwrap();

    let (_, buffered, _) = transcode_bytes(xml.as_bytes(), options).unwrap();

    assert_eq!(report.nodes_emitted, 3);
    assert_eq!(report.records_unmapped, 1);
    assert_eq!(streamed, buffered);
}

#[test]
fn test_document_without_root_fails() {
    let result = transcode_bytes(b"<?xml version=\"1.0\"?>\n", TranscodeOptions::default());
    assert!(matches!(result, Err(TranscodeError::EmptyDocument)));
}
